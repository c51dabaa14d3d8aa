use anyhow::{Result, bail};

use crate::cli::DedupeArgs;

pub const DEFAULT_THRESHOLD: f64 = 0.60;
pub const DEFAULT_CEILING: f64 = 0.85;
pub const DEFAULT_NUM_PERM: usize = 256;
pub const SHINGLE_SIZE: usize = 3;

/// Tuning shared by every stage of a clustering pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupeConfig {
    /// Estimated Jaccard similarity at which LSH reports a neighbor.
    pub threshold: f64,
    /// Exact similarity ratio above which a cross-source pair is auto-resolved.
    pub ceiling: f64,
    pub num_perm: usize,
    pub max_records: Option<usize>,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            ceiling: DEFAULT_CEILING,
            num_perm: DEFAULT_NUM_PERM,
            max_records: None,
        }
    }
}

impl DedupeConfig {
    pub fn from_args(args: &DedupeArgs) -> Result<Self> {
        let config = Self {
            threshold: args.threshold,
            ceiling: args.ceiling,
            num_perm: args.num_perm,
            max_records: args.max_records,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            bail!("threshold must be in (0, 1], got {}", self.threshold);
        }
        if !(self.ceiling > 0.0 && self.ceiling <= 1.0) {
            bail!("ceiling must be in (0, 1], got {}", self.ceiling);
        }
        if self.num_perm < 2 {
            bail!("num_perm must be at least 2, got {}", self.num_perm);
        }
        if self.max_records == Some(0) {
            bail!("max_records must be positive when set");
        }
        Ok(())
    }
}

/// Which passes the user asked for, before consistency overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunModes {
    pub dedupe_scraped: bool,
    pub dedupe_imported: bool,
    pub cross_source: bool,
    pub only_new: bool,
}

impl RunModes {
    pub fn from_args(args: &DedupeArgs) -> Self {
        Self {
            dedupe_scraped: args.dedupe_scraped,
            dedupe_imported: args.dedupe_imported,
            cross_source: !args.skip_cross_source,
            only_new: args.only_new,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DedupeConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = DedupeConfig::default();
        config.threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = DedupeConfig::default();
        config.ceiling = 1.5;
        assert!(config.validate().is_err());

        let mut config = DedupeConfig::default();
        config.num_perm = 1;
        assert!(config.validate().is_err());

        let mut config = DedupeConfig::default();
        config.max_records = Some(0);
        assert!(config.validate().is_err());
    }
}
