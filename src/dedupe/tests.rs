use std::collections::VecDeque;

use anyhow::{Context, Result};

use super::adjudicate::{
    OverrideTarget, Rejection, Selection, confirm_override, evaluate_response, parse_response,
    render_prompt,
};
use super::decisions::{Binding, OverrideChoice};
use super::fingerprint::{Permutations, Sketch, shingles};
use super::lsh::{BandParams, LshIndex};
use super::policy::classify;
use super::similarity::sequence_ratio;
use super::*;
use crate::model::Collection;

struct ScriptedPrompter {
    responses: VecDeque<String>,
    messages: Vec<String>,
}

impl ScriptedPrompter {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|value| value.to_string()).collect(),
            messages: Vec::new(),
        }
    }

    fn silent() -> Self {
        Self::new(&[])
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, message: &str) -> Result<String> {
        self.messages.push(message.to_string());
        self.responses
            .pop_front()
            .context("prompted with no scripted response left")
    }
}

fn record(id: &str, collection: Collection, year: &str, title: &str, authors: &str) -> Record {
    Record {
        id: id.to_string(),
        authors: authors.to_string(),
        year: year.to_string(),
        title: title.to_string(),
        source: "Journal of Tests".to_string(),
        url: String::new(),
        collection,
    }
}

fn scraped(id: &str, title: &str) -> Record {
    record(id, Collection::Scraped, "2015", title, "Gaertner, S.")
}

fn imported(id: &str, title: &str) -> Record {
    record(id, Collection::Imported, "2015", title, "Gaertner, S.")
}

#[test]
fn shingles_use_three_character_windows() {
    assert_eq!(shingles("abcd"), vec!["abc", "bcd"]);
    assert_eq!(shingles("héllo").len(), 3);
    assert!(shingles("ab").is_empty());
}

#[test]
fn sketches_are_deterministic_and_comparable() {
    let permutations = Permutations::new(128);
    let left = Sketch::from_text("Reducing intergroup bias-Gaertner", &permutations);
    let right = Sketch::from_text(
        "Reducing intergroup bias-Gaertner",
        &Permutations::new(128),
    );
    assert_eq!(left, right);
    assert_eq!(left.jaccard(&right), 1.0);

    let other = Sketch::from_text("Quantum chromodynamics on the lattice-Wilson", &permutations);
    assert!(left.jaccard(&other) < 0.3);
}

#[test]
fn short_text_yields_empty_sketch() {
    let permutations = Permutations::new(16);
    let sketch = Sketch::from_text("a-", &permutations);
    assert!(sketch.is_empty());
    assert_eq!(sketch, Sketch::empty(16));
}

#[test]
fn optimal_band_params_fit_the_permutation_budget() {
    let params = BandParams::optimal(0.6, 256);
    assert!(params.bands * params.rows <= 256);

    let implied_threshold = (1.0 / params.bands as f64).powf(1.0 / params.rows as f64);
    assert!(implied_threshold > 0.4 && implied_threshold < 0.8);
}

#[test]
fn empty_index_returns_no_candidates() {
    let index = LshIndex::new(0.6, 64).unwrap();
    let sketch = Sketch::from_text("anything at all", &Permutations::new(64));
    assert!(index.query(&sketch).unwrap().is_empty());
}

#[test]
fn index_finds_identical_sketches_and_replaces_reinserted_keys() {
    let permutations = Permutations::new(64);
    let first = Sketch::from_text("A common ingroup identity model-Dovidio", &permutations);
    let second = Sketch::from_text("Zebrafish retina regeneration in vivo-Kim", &permutations);

    let mut index = LshIndex::new(0.6, 64).unwrap();
    index.insert(0, &first).unwrap();
    index.insert(1, &first).unwrap();
    assert_eq!(index.query(&first).unwrap().into_iter().collect::<Vec<_>>(), vec![0, 1]);

    index.insert(1, &second).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.query(&first).unwrap().into_iter().collect::<Vec<_>>(), vec![0]);
    assert!(index.query(&second).unwrap().contains(&1));
}

#[test]
fn index_rejects_mismatched_sketch_width() {
    let mut index = LshIndex::new(0.6, 64).unwrap();
    let sketch = Sketch::from_text("some text", &Permutations::new(32));
    assert!(index.insert(0, &sketch).is_err());
    assert!(index.query(&sketch).is_err());
    assert!(LshIndex::with_params(BandParams { bands: 9, rows: 8 }, 64).is_err());
}

#[test]
fn sequence_ratio_matches_block_matching() {
    assert_eq!(sequence_ratio("abcd", "bcde"), 0.75);
    assert_eq!(sequence_ratio("abc", "abc"), 1.0);
    assert_eq!(sequence_ratio("", ""), 1.0);
    assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
    assert!((sequence_ratio("fooBar", "foobar") - 10.0 / 12.0).abs() < 1e-12);
}

#[test]
fn find_clusters_groups_identical_metadata() {
    let records = vec![
        scraped("g1", "Reducing intergroup bias: the common ingroup identity model"),
        imported("e1", "Reducing intergroup bias: the common ingroup identity model"),
        scraped("g2", "Zebrafish retina regeneration observed in vivo"),
    ];

    let clusters = find_clusters(&records, &DedupeConfig::default()).unwrap();
    assert_eq!(clusters.len(), 3);
    assert_eq!(clusters[0].len(), 2);
    assert_eq!(clusters[1].len(), 2);
    assert_eq!(clusters[2].len(), 1);
    assert_eq!(clusters[2][0].id, "g2");
}

#[test]
fn find_clusters_honors_max_records() {
    let records = vec![
        scraped("g1", "First distinct paper on attitudes"),
        scraped("g2", "Second unrelated study of glaciers"),
        scraped("g3", "Third manuscript about compilers"),
    ];
    let config = DedupeConfig {
        max_records: Some(2),
        ..DedupeConfig::default()
    };

    let clusters = find_clusters(&records, &config).unwrap();
    assert_eq!(clusters.len(), 2);
}

#[test]
fn sort_cluster_puts_imported_first_and_keeps_order() {
    let cluster = vec![
        scraped("g1", "x"),
        imported("e1", "x"),
        scraped("g2", "x"),
        imported("e2", "x"),
    ];
    let ids = policy::sort_cluster(&cluster)
        .into_iter()
        .map(|record| record.id)
        .collect::<Vec<String>>();
    assert_eq!(ids, vec!["e1", "e2", "g1", "g2"]);
}

#[test]
fn classify_separates_automatic_and_ambiguous_clusters() {
    let config = DedupeConfig::default();
    let decisions = DecisionSet::new();

    let pair = vec![imported("e1", "Same title"), scraped("g1", "Same title")];
    let resolution = classify(&pair, &[1.0], &decisions, &config, false);
    assert_eq!(
        resolution,
        Resolution::CrossSourcePair {
            keep: pair[0].clone(),
            drop: pair[1].clone(),
        }
    );

    let mut other_year = pair.clone();
    other_year[1].year = "2016".to_string();
    assert_eq!(
        classify(&other_year, &[1.0], &decisions, &config, false),
        Resolution::Ambiguous
    );

    let low_similarity = classify(&pair, &[0.84], &decisions, &config, false);
    assert_eq!(low_similarity, Resolution::Ambiguous);

    let homogeneous = vec![scraped("g1", "Same title"), scraped("g2", "Same title")];
    assert_eq!(
        classify(&homogeneous, &[1.0], &decisions, &config, true),
        Resolution::PreDeduped
    );
    assert_eq!(
        classify(&homogeneous, &[1.0], &decisions, &config, false),
        Resolution::Ambiguous
    );
}

#[test]
fn classify_escalates_conflicting_cross_source_pair() {
    let config = DedupeConfig::default();
    let pair = vec![imported("e1", "Same title"), scraped("g1", "Same title")];
    let mut decisions = DecisionSet::new();
    decisions.bind_whitelist(&pair[1]);

    assert_eq!(
        classify(&pair, &[1.0], &decisions, &config, false),
        Resolution::Ambiguous
    );
}

#[test]
fn classify_escalates_pair_whose_imported_record_is_blacklisted() {
    let config = DedupeConfig::default();
    let pair = vec![imported("e1", "Same title"), scraped("g1", "Same title")];
    let mut decisions = DecisionSet::new();
    decisions.bind_blacklist(&pair[0]);

    assert_eq!(
        classify(&pair, &[1.0], &decisions, &config, false),
        Resolution::Ambiguous
    );
}

#[test]
fn classify_escalates_pre_deduped_cluster_with_blacklisted_member() {
    let config = DedupeConfig::default();
    let cluster = vec![
        scraped("g1", "Intergroup contact theory"),
        scraped("g2", "Intergroup contact theory."),
        scraped("g3", "Intergroup contact theory (2nd ed.)"),
    ];
    let mut decisions = DecisionSet::new();
    decisions.bind_blacklist(&cluster[1]);

    assert_eq!(
        classify(&cluster, &[0.98, 0.9], &decisions, &config, true),
        Resolution::Ambiguous
    );

    let clean = DecisionSet::new();
    assert_eq!(
        classify(&cluster, &[0.98, 0.9], &clean, &config, true),
        Resolution::PreDeduped
    );
}

#[test]
fn blacklisted_imported_record_in_close_pair_goes_to_adjudication() {
    let original = imported("e1", "Reducing intergroup bias");
    let reprint = imported("e2", "Reducing intergroup bias (reprint)");
    let crawled = scraped("g1", "Reducing intergroup bias");
    // Keep the reprint, then keep e1 from the pair and confirm the move.
    let mut prompter = ScriptedPrompter::new(&["2", "1", "w"]);

    let decisions = resolve_clusters(
        vec![
            vec![original.clone(), reprint.clone()],
            vec![crawled.clone(), original.clone()],
        ],
        &DedupeConfig::default(),
        false,
        &mut prompter,
    )
    .unwrap();

    assert_eq!(prompter.messages.len(), 3);
    assert!(prompter.messages[1].contains("considering cluster 2 of 2"));
    assert!(prompter.messages[2].contains("Preparing to whitelist former blacklist value"));
    assert!(decisions.is_whitelisted("e1"));
    assert!(decisions.is_whitelisted("e2"));
    assert!(decisions.is_blacklisted("g1"));
    assert!(decisions.is_disjoint());
}

#[test]
fn singleton_cluster_is_whitelisted_without_prompting() {
    let only = scraped("g1", "Lonely paper");
    let mut prompter = ScriptedPrompter::silent();

    let decisions = resolve_clusters(
        vec![vec![only.clone()]],
        &DedupeConfig::default(),
        false,
        &mut prompter,
    )
    .unwrap();

    assert!(decisions.is_whitelisted("g1"));
    assert!(!decisions.is_blacklisted("g1"));
    assert!(prompter.messages.is_empty());
}

#[test]
fn cross_source_pair_resolves_without_prompting() {
    let pair = vec![
        scraped("g1", "Reducing intergroup bias"),
        imported("e1", "Reducing intergroup bias"),
    ];
    let mut prompter = ScriptedPrompter::silent();

    let decisions = resolve_clusters(
        vec![pair.clone(), pair.iter().rev().cloned().collect()],
        &DedupeConfig::default(),
        false,
        &mut prompter,
    )
    .unwrap();

    assert!(decisions.is_whitelisted("e1"));
    assert!(decisions.is_blacklisted("g1"));
    assert!(!decisions.is_whitelisted("g1"));
    assert!(prompter.messages.is_empty());
}

#[test]
fn resolved_clusters_are_not_presented_again() {
    let first = scraped("g1", "Contact hypothesis revisited");
    let second = scraped("g2", "Contact hypothesis revisited!");
    let mut prompter = ScriptedPrompter::new(&["1"]);

    let decisions = resolve_clusters(
        vec![
            vec![first.clone(), second.clone()],
            vec![second.clone(), first.clone()],
        ],
        &DedupeConfig::default(),
        false,
        &mut prompter,
    )
    .unwrap();

    assert_eq!(prompter.messages.len(), 1);
    assert!(prompter.messages[0].contains("considering cluster 1 of 2"));
    assert!(decisions.is_whitelisted("g1"));
    assert!(decisions.is_blacklisted("g2"));
    assert!(decisions.is_disjoint());
}

#[test]
fn keep_all_is_accepted_for_single_source_cluster() {
    let cluster = vec![scraped("g1", "Paper one"), scraped("g2", "Paper one, reprint")];
    let mut prompter = ScriptedPrompter::new(&["a"]);

    let decisions =
        resolve_clusters(vec![cluster], &DedupeConfig::default(), false, &mut prompter).unwrap();

    assert_eq!(prompter.messages.len(), 1);
    assert!(decisions.is_whitelisted("g1"));
    assert!(decisions.is_whitelisted("g2"));
    assert!(decisions.blacklist().is_empty());
}

#[test]
fn discarding_every_imported_record_is_rejected() {
    let mut cluster = vec![
        imported("e1", "Aversive racism"),
        scraped("g1", "Aversive racism"),
    ];
    cluster[1].year = "2016".to_string();
    let mut prompter = ScriptedPrompter::new(&["2", "1"]);

    let decisions =
        resolve_clusters(vec![cluster], &DedupeConfig::default(), false, &mut prompter).unwrap();

    assert_eq!(prompter.messages.len(), 2);
    assert_eq!(prompter.messages[0], prompter.messages[1]);
    assert!(decisions.is_whitelisted("e1"));
    assert!(decisions.is_blacklisted("g1"));
}

#[test]
fn invalid_responses_are_classified() {
    let members = vec![imported("e1", "x"), scraped("g1", "y")];

    assert_eq!(parse_response("0", 2), Err(Rejection::NoSelection));
    assert_eq!(parse_response("  ", 2), Err(Rejection::NoSelection));
    assert_eq!(parse_response("b", 2), Err(Rejection::NoSelection));
    assert_eq!(
        parse_response("1,x", 2),
        Err(Rejection::Unparseable {
            token: "x".to_string()
        })
    );
    assert_eq!(
        parse_response("1,", 2),
        Err(Rejection::Unparseable {
            token: String::new()
        })
    );
    assert_eq!(
        parse_response("3", 2),
        Err(Rejection::OutOfRange { index: 3, len: 2 })
    );
    assert_eq!(
        parse_response("1,0", 2),
        Err(Rejection::OutOfRange { index: 0, len: 2 })
    );
    assert_eq!(
        evaluate_response(&members, "2"),
        Err(Rejection::ImportedNotRetained)
    );
}

#[test]
fn valid_responses_split_the_cluster() {
    assert_eq!(
        parse_response(" A \n", 3),
        Ok(Selection {
            keep: vec![0, 1, 2],
            drop: vec![],
        })
    );
    assert_eq!(
        parse_response("3, 1,3", 3),
        Ok(Selection {
            keep: vec![0, 2],
            drop: vec![1],
        })
    );
}

#[test]
fn override_dialog_moves_blacklisted_record_to_whitelist() {
    let target = scraped("x", "Disputed record");
    let neighbor = scraped("y", "Disputed record, again");
    let mut decisions = DecisionSet::new();
    decisions.bind_blacklist(&target);

    let members = vec![target.clone(), neighbor.clone()];
    let view = ClusterView {
        position: 0,
        total: 1,
        members: &members,
        similarities: &[0.9],
    };
    let mut prompter = ScriptedPrompter::new(&["1", "w"]);
    adjudicate_cluster(view, &mut decisions, &mut prompter).unwrap();

    assert!(prompter.messages[1].contains("Preparing to whitelist former blacklist value"));
    assert!(decisions.is_whitelisted("x"));
    assert!(!decisions.is_blacklisted("x"));
    assert!(decisions.is_blacklisted("y"));
    assert!(decisions.is_disjoint());
}

#[test]
fn override_dialog_can_keep_record_blacklisted() {
    let target = scraped("x", "Disputed record");
    let mut decisions = DecisionSet::new();
    decisions.bind_blacklist(&target);
    assert_eq!(decisions.bind_whitelist(&target), Binding::NeedsConfirmation);

    let mut prompter = ScriptedPrompter::new(&["B"]);
    let choice = confirm_override(
        &target,
        OverrideTarget::Whitelist,
        &mut decisions,
        &mut prompter,
    )
    .unwrap();

    assert_eq!(choice, OverrideChoice::Blacklist);
    assert!(decisions.is_blacklisted("x"));
    assert!(!decisions.is_whitelisted("x"));
}

#[test]
fn override_dialog_moves_whitelisted_record_to_blacklist() {
    let target = scraped("x", "Disputed record");
    let mut decisions = DecisionSet::new();
    decisions.bind_whitelist(&target);

    let mut prompter = ScriptedPrompter::new(&["b"]);
    confirm_override(
        &target,
        OverrideTarget::Blacklist,
        &mut decisions,
        &mut prompter,
    )
    .unwrap();

    assert!(prompter.messages[0].contains("Preparing to blacklist former whitelist value"));
    assert!(decisions.is_blacklisted("x"));
    assert!(!decisions.is_whitelisted("x"));
}

#[test]
fn unrecognized_override_key_changes_nothing() {
    let target = scraped("x", "Disputed record");
    let mut decisions = DecisionSet::new();
    decisions.bind_blacklist(&target);

    let mut prompter = ScriptedPrompter::new(&["maybe"]);
    let choice = confirm_override(
        &target,
        OverrideTarget::Whitelist,
        &mut decisions,
        &mut prompter,
    )
    .unwrap();

    assert_eq!(choice, OverrideChoice::Unrecognized);
    assert!(decisions.is_blacklisted("x"));
    assert!(!decisions.is_whitelisted("x"));
}

#[test]
fn prompt_lists_members_and_flags_whitelisted_ones() {
    let members = vec![imported("e1", "Title A"), scraped("g1", "Title B")];
    let mut decisions = DecisionSet::new();
    decisions.bind_whitelist(&members[0]);

    let view = ClusterView {
        position: 2,
        total: 5,
        members: &members,
        similarities: &[0.5],
    };
    let message = render_prompt(view, &decisions).unwrap();

    assert!(message.contains("Type `a` to treat all as unique."));
    assert!(message.contains(" * considering cluster 3 of 5\n"));
    assert!(message.contains(" * similarity between 1 and 2: 0.5\n"));
    assert!(message.contains("Attention: The following records have been whitelisted:"));
    assert!(message.contains("1: {"));
    assert!(message.contains("2: {"));

    let listing = &message[message.find("2: {").unwrap()..];
    let collection_at = listing.find("\"collection\": \"scraped\"").unwrap();
    let authors_at = listing.find("\"authors\"").unwrap();
    let url_at = listing.find("\"url\"").unwrap();
    assert!(collection_at < authors_at && authors_at < url_at);
}

#[test]
fn merge_unions_and_prefers_newer_decisions() {
    let a = scraped("a", "A");
    let b = scraped("b", "B");
    let mut prior = DecisionSet::new();
    prior.bind_whitelist(&a);

    let mut newer = DecisionSet::new();
    newer.bind_whitelist(&b);
    prior.merge(newer);
    assert_eq!(
        prior.whitelist().keys().cloned().collect::<Vec<String>>(),
        vec!["a", "b"]
    );

    let mut renamed = a.clone();
    renamed.title = "A, revised".to_string();
    let mut replacement = DecisionSet::new();
    replacement.bind_whitelist(&renamed);
    prior.merge(replacement);
    assert_eq!(prior.whitelist()["a"].title, "A, revised");

    let mut moved = DecisionSet::new();
    moved.bind_blacklist(&b);
    prior.merge(moved);
    assert!(prior.is_blacklisted("b"));
    assert!(!prior.is_whitelisted("b"));
}

#[test]
fn decision_set_serializes_as_pair_of_maps() {
    let mut decisions = DecisionSet::new();
    decisions.bind_whitelist(&imported("e1", "Kept"));
    decisions.bind_blacklist(&scraped("g1", "Dropped"));

    let value = serde_json::to_value(&decisions).unwrap();
    let pair = value.as_array().unwrap();
    assert_eq!(pair.len(), 2);
    assert_eq!(pair[0]["e1"]["collection"], "imported");
    assert_eq!(pair[1]["g1"]["collection"], "scraped");

    let legacy = r#"[{"k": {"id": "k", "title": "t", "collection": "endnote"}}, {}]"#;
    let restored: DecisionSet = serde_json::from_str(legacy).unwrap();
    assert_eq!(restored.whitelist()["k"].collection, Collection::Imported);
}
