use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    #[serde(alias = "endnote")]
    Imported,
    #[serde(alias = "google")]
    Scraped,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imported => "imported",
            Self::Scraped => "scraped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "imported" | "endnote" => Some(Self::Imported),
            "scraped" | "google" => Some(Self::Scraped),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    pub collection: Collection,
}

impl Record {
    /// Identifying text shared by fingerprinting and exact similarity.
    pub fn metadata_string(&self) -> String {
        format!("{}-{}", self.title, self.authors)
    }

    pub fn display_fields(&self) -> RecordDisplay<'_> {
        RecordDisplay {
            collection: self.collection,
            authors: &self.authors,
            year: &self.year,
            title: &self.title,
            source: &self.source,
            url: &self.url,
        }
    }
}

/// Field order shown to the adjudicator.
#[derive(Debug, Serialize)]
pub struct RecordDisplay<'a> {
    pub collection: Collection,
    pub authors: &'a str,
    pub year: &'a str,
    pub title: &'a str,
    pub source: &'a str,
    pub url: &'a str,
}

/// Summary counts written to the plain-text report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupeCounts {
    pub scraped_ids_retrieved: usize,
    pub retained_after_self_dedup: usize,
    pub retained_after_cross_source: usize,
}
