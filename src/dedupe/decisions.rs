use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::Record;

pub type RecordMap = BTreeMap<String, Record>;

/// Whitelist and blacklist of one population, keyed by record id.
///
/// Serializes as the two-element array `[whitelist, blacklist]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(RecordMap, RecordMap)", into = "(RecordMap, RecordMap)")]
pub struct DecisionSet {
    whitelist: RecordMap,
    blacklist: RecordMap,
}

impl From<(RecordMap, RecordMap)> for DecisionSet {
    fn from((whitelist, blacklist): (RecordMap, RecordMap)) -> Self {
        Self {
            whitelist,
            blacklist,
        }
    }
}

impl From<DecisionSet> for (RecordMap, RecordMap) {
    fn from(set: DecisionSet) -> Self {
        (set.whitelist, set.blacklist)
    }
}

/// Outcome of asking to place a record in one of the two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Committed,
    /// The id sits in the opposite list; an override decision is required.
    NeedsConfirmation,
}

/// Answer to the override-confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideChoice {
    Whitelist,
    Blacklist,
    Unrecognized,
}

impl OverrideChoice {
    pub fn parse(response: &str) -> Self {
        match response.trim().to_lowercase().as_str() {
            "w" => Self::Whitelist,
            "b" => Self::Blacklist,
            _ => Self::Unrecognized,
        }
    }
}

impl DecisionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn whitelist(&self) -> &RecordMap {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &RecordMap {
        &self.blacklist
    }

    pub fn is_whitelisted(&self, id: &str) -> bool {
        self.whitelist.contains_key(id)
    }

    pub fn is_blacklisted(&self, id: &str) -> bool {
        self.blacklist.contains_key(id)
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.is_whitelisted(id) || self.is_blacklisted(id)
    }

    pub fn is_empty(&self) -> bool {
        self.whitelist.is_empty() && self.blacklist.is_empty()
    }

    pub fn bind_whitelist(&mut self, record: &Record) -> Binding {
        if self.is_blacklisted(&record.id) {
            return Binding::NeedsConfirmation;
        }
        self.whitelist.insert(record.id.clone(), record.clone());
        Binding::Committed
    }

    pub fn bind_blacklist(&mut self, record: &Record) -> Binding {
        if self.is_whitelisted(&record.id) {
            return Binding::NeedsConfirmation;
        }
        self.blacklist.insert(record.id.clone(), record.clone());
        Binding::Committed
    }

    /// Applies an override decision for a record claimed by both lists.
    pub fn reconcile(&mut self, record: &Record, choice: OverrideChoice) {
        match choice {
            OverrideChoice::Whitelist => {
                remove_logged(&mut self.blacklist, &record.id, "blacklist");
                self.whitelist.insert(record.id.clone(), record.clone());
            }
            OverrideChoice::Blacklist => {
                remove_logged(&mut self.whitelist, &record.id, "whitelist");
                self.blacklist.insert(record.id.clone(), record.clone());
            }
            OverrideChoice::Unrecognized => {
                warn!(id = %record.id, "unrecognized override key, record left unchanged");
            }
        }
    }

    /// Key-wise union where `newer` wins; an id moved by `newer` leaves the
    /// opposite list.
    pub fn merge(&mut self, newer: DecisionSet) {
        for (id, record) in newer.whitelist {
            self.blacklist.remove(&id);
            self.whitelist.insert(id, record);
        }
        for (id, record) in newer.blacklist {
            self.whitelist.remove(&id);
            self.blacklist.insert(id, record);
        }
    }

    pub fn is_disjoint(&self) -> bool {
        self.whitelist
            .keys()
            .all(|id| !self.blacklist.contains_key(id))
    }
}

fn remove_logged(map: &mut RecordMap, id: &str, list: &str) {
    if map.remove(id).is_none() {
        warn!(id, list, "could not delete missing key");
    }
}
