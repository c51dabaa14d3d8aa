use std::collections::BTreeSet;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use super::decisions::{Binding, DecisionSet, OverrideChoice};
use super::policy::has_both_sources;
use super::prompt::Prompter;
use crate::model::{Collection, Record};

const RULE: &str = "------------------------------------------------------------------";

/// Why a response to a cluster prompt was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("response does not select any record")]
    NoSelection,
    #[error("`{token}` is not a record index")]
    Unparseable { token: String },
    #[error("index {index} is outside 1..={len}")]
    OutOfRange { index: i64, len: usize },
    #[error("when records are duplicates, an imported record must be retained")]
    ImportedNotRetained,
}

/// Zero-based member positions bound for each list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub keep: Vec<usize>,
    pub drop: Vec<usize>,
}

impl Selection {
    fn keep_all(len: usize) -> Self {
        Self {
            keep: (0..len).collect(),
            drop: Vec::new(),
        }
    }

    fn from_kept(kept: BTreeSet<usize>, len: usize) -> Self {
        let drop = (0..len).filter(|index| !kept.contains(index)).collect();
        Self {
            keep: kept.into_iter().collect(),
            drop,
        }
    }
}

/// List a new decision wants to move a record into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideTarget {
    Whitelist,
    Blacklist,
}

/// An ordered ambiguous cluster and where it sits in the pass.
#[derive(Debug, Clone, Copy)]
pub struct ClusterView<'a> {
    pub position: usize,
    pub total: usize,
    pub members: &'a [Record],
    pub similarities: &'a [f64],
}

#[derive(Debug)]
enum AdjudicationState {
    Present,
    AwaitResponse(String),
    Invalid(Rejection),
    Valid(Selection),
}

/// Presents `view` until a valid response arrives, then commits it.
pub fn adjudicate_cluster(
    view: ClusterView<'_>,
    decisions: &mut DecisionSet,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let mut state = AdjudicationState::Present;
    loop {
        state = match state {
            AdjudicationState::Present => {
                AdjudicationState::AwaitResponse(render_prompt(view, decisions)?)
            }
            AdjudicationState::AwaitResponse(message) => {
                let response = prompter.prompt(&message)?;
                match evaluate_response(view.members, &response) {
                    Ok(selection) => AdjudicationState::Valid(selection),
                    Err(rejection) => AdjudicationState::Invalid(rejection),
                }
            }
            AdjudicationState::Invalid(rejection) => {
                warn!(
                    cluster = view.position + 1,
                    reason = %rejection,
                    "invalid response received, try again"
                );
                AdjudicationState::Present
            }
            AdjudicationState::Valid(selection) => {
                commit(view.members, &selection, decisions, prompter)?;
                return Ok(());
            }
        };
    }
}

pub fn evaluate_response(members: &[Record], response: &str) -> Result<Selection, Rejection> {
    let selection = parse_response(response, members.len())?;
    validate_selection(members, &selection)?;
    Ok(selection)
}

pub fn parse_response(response: &str, len: usize) -> Result<Selection, Rejection> {
    let response = response.trim().to_lowercase();
    if response == "a" {
        return Ok(Selection::keep_all(len));
    }

    if !response.chars().any(|character| ('1'..='9').contains(&character)) {
        return Err(Rejection::NoSelection);
    }

    let mut kept = BTreeSet::new();
    for token in response.split(',') {
        let index = token
            .trim()
            .parse::<i64>()
            .map_err(|_| Rejection::Unparseable {
                token: token.trim().to_string(),
            })?;
        if index < 1 || index as u64 > len as u64 {
            return Err(Rejection::OutOfRange { index, len });
        }
        kept.insert(index as usize - 1);
    }

    Ok(Selection::from_kept(kept, len))
}

/// Imported records are curated by hand and must survive a mixed cluster.
pub fn validate_selection(members: &[Record], selection: &Selection) -> Result<(), Rejection> {
    let imported_kept = selection
        .keep
        .iter()
        .any(|index| members[*index].collection == Collection::Imported);
    if has_both_sources(members) && !imported_kept {
        return Err(Rejection::ImportedNotRetained);
    }
    Ok(())
}

fn commit(
    members: &[Record],
    selection: &Selection,
    decisions: &mut DecisionSet,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    for record in selection.keep.iter().map(|index| &members[*index]) {
        if decisions.bind_whitelist(record) == Binding::NeedsConfirmation {
            confirm_override(record, OverrideTarget::Whitelist, decisions, prompter)?;
        }
    }
    for record in selection.drop.iter().map(|index| &members[*index]) {
        if decisions.bind_blacklist(record) == Binding::NeedsConfirmation {
            confirm_override(record, OverrideTarget::Blacklist, decisions, prompter)?;
        }
    }
    Ok(())
}

/// Override sub-dialog for a record that the new decision would move
/// between lists.
pub fn confirm_override(
    record: &Record,
    target: OverrideTarget,
    decisions: &mut DecisionSet,
    prompter: &mut dyn Prompter,
) -> Result<OverrideChoice> {
    let (verb, former) = match target {
        OverrideTarget::Whitelist => ("whitelist", "blacklist"),
        OverrideTarget::Blacklist => ("blacklist", "whitelist"),
    };
    let message = format!(
        " ! Preparing to {verb} former {former} value\n{}. press w/b to whitelist/blacklist:\n",
        record.id
    );

    let choice = OverrideChoice::parse(&prompter.prompt(&message)?);
    debug!(id = %record.id, ?choice, "override decision");
    decisions.reconcile(record, choice);
    Ok(choice)
}

pub fn render_prompt(view: ClusterView<'_>, decisions: &DecisionSet) -> Result<String> {
    let mut message = String::new();
    write!(
        message,
        "\n{RULE}\n\
         Please type a comma-separated list of integers, where each integer\n\
         represents the index position of a record to be treated as unique.\n\
         Type `a` to treat all as unique.\n\
         {RULE}\n\n"
    )?;
    writeln!(
        message,
        " * considering cluster {} of {}",
        view.position + 1,
        view.total
    )?;

    for (index, similarity) in view.similarities.iter().enumerate() {
        write!(
            message,
            " * similarity between {} and {}: {}\n\n",
            index + 1,
            index + 2,
            similarity
        )?;
    }

    for record in view
        .members
        .iter()
        .filter(|record| decisions.is_whitelisted(&record.id))
    {
        write!(
            message,
            "\nAttention: The following records have been whitelisted:\n{}\n\n",
            pretty_record(record)?
        )?;
    }

    for (index, record) in view.members.iter().enumerate() {
        writeln!(message, "{}: {}", index + 1, pretty_record(record)?)?;
    }

    Ok(message)
}

fn pretty_record(record: &Record) -> Result<String> {
    serde_json::to_string_pretty(&record.display_fields())
        .with_context(|| format!("failed to render record {}", record.id))
}
