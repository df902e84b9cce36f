//! Tests for FilterChain
//!
//! - AND over active, tier-applicable filters
//! - inapplicable tiers are vacuously true
//! - failing predicates count as non-match
//! - persisted state restores only known filters

use std::collections::BTreeMap;

use rstest::rstest;

use mediatree::application::filters::{
    FilterConfig, FilterError, GENRE_FILTER, TEXT_FILTER, WATCHED_FILTER, YEAR_FILTER,
};
use mediatree::application::services::FilterChain;
use mediatree::domain::{
    CatalogEntity, DomainError, Entry, Grouping, Tier, TierSet, Title, TreeNode,
};

fn node(entity: impl Into<CatalogEntity>) -> TreeNode {
    TreeNode {
        entity: entity.into(),
        parent: None,
        children: Vec::new(),
    }
}

fn name_contains(node: &TreeNode, config: &FilterConfig) -> Result<bool, FilterError> {
    match config {
        FilterConfig::Text(t) => Ok(node.entity.display_name().contains(t.as_str())),
        other => Err(FilterError::ConfigMismatch {
            expected: "text",
            found: other.kind(),
        }),
    }
}

fn always_fails(_: &TreeNode, _: &FilterConfig) -> Result<bool, FilterError> {
    Err(FilterError::Failed("backend exploded".into()))
}

fn chain_with(filters: &[(&str, &str)]) -> FilterChain {
    let mut chain = FilterChain::new();
    for (id, needle) in filters {
        chain
            .add_filter(
                *id,
                Box::new(name_contains),
                TierSet::all(),
                FilterConfig::text(*needle),
            )
            .unwrap();
        chain.set_active(id, true).unwrap();
    }
    chain
}

// ============================================================
// registration
// ============================================================

#[test]
fn given_new_filter_when_added_then_starts_inactive() {
    let mut chain = FilterChain::new();

    chain
        .add_filter("f", Box::new(name_contains), TierSet::all(), FilterConfig::text("x"))
        .unwrap();

    assert!(!chain.is_active("f"));
    assert!(!chain.has_active_filters());
    assert!(chain.evaluate(&node(Title::new(1, "nothing"))));
}

#[test]
fn given_duplicate_id_when_added_then_duplicate_filter_error() {
    let mut chain = chain_with(&[("f", "a")]);

    let result = chain.add_filter("f", Box::new(name_contains), TierSet::all(), FilterConfig::None);

    assert_eq!(result, Err(DomainError::DuplicateFilter("f".into())));
    assert_eq!(chain.len(), 1);
}

#[test]
fn given_builtin_chain_when_listing_then_registration_order_is_kept() {
    let chain = FilterChain::with_builtin_filters(false);

    let ids: Vec<&str> = chain.ids().collect();

    assert_eq!(ids, vec![TEXT_FILTER, WATCHED_FILTER, YEAR_FILTER, GENRE_FILTER]);
    assert!(!chain.has_active_filters());
}

#[test]
fn given_unknown_filter_when_toggled_then_unknown_filter_error() {
    let mut chain = FilterChain::new();

    assert_eq!(
        chain.set_active("nope", true),
        Err(DomainError::UnknownFilter("nope".into()))
    );
    assert_eq!(
        chain.remove_filter("nope"),
        Err(DomainError::UnknownFilter("nope".into()))
    );
}

#[test]
fn given_wrong_config_shape_when_set_then_rejected_and_old_config_kept() {
    let mut chain = FilterChain::with_builtin_filters(false);

    let result = chain.set_config(WATCHED_FILTER, FilterConfig::text("yes"));

    assert!(matches!(result, Err(DomainError::InvalidFilterConfig { .. })));
    assert_eq!(chain.config(WATCHED_FILTER), Some(&FilterConfig::Flag(false)));
}

#[test]
fn given_active_filter_when_removed_then_no_longer_votes() {
    let mut chain = chain_with(&[("f", "zzz")]);
    let show = node(Title::new(1, "Show"));
    assert!(!chain.evaluate(&show));

    chain.remove_filter("f").unwrap();

    assert!(chain.evaluate(&show));
    assert!(chain.is_empty());
}

// ============================================================
// evaluation
// ============================================================

#[rstest]
#[case::both_pass("Show A", true)]
#[case::first_fails("Film A", false)]
#[case::second_fails("Show B", false)]
#[case::both_fail("Film B", false)]
fn given_two_filters_when_evaluating_then_and_semantics(#[case] name: &str, #[case] shown: bool) {
    let chain = chain_with(&[("show", "Show"), ("a", "A")]);

    assert_eq!(chain.evaluate(&node(Title::new(1, name))), shown);
}

#[test]
fn given_filter_scoped_to_entries_when_evaluating_title_then_vacuously_true() {
    let mut chain = FilterChain::new();
    chain
        .add_filter(
            "entries",
            Box::new(name_contains),
            TierSet::only(Tier::Entry),
            FilterConfig::text("Pilot"),
        )
        .unwrap();
    chain.set_active("entries", true).unwrap();

    assert!(chain.evaluate(&node(Title::new(1, "Show"))));
    assert!(chain.evaluate(&node(Grouping::new(2, Some(1)))));
    assert!(!chain.evaluate(&node(Entry::new(3, Some(2), "Episode 2"))));
    assert!(chain.evaluate(&node(Entry::new(4, Some(1), "Pilot"))));
}

#[test]
fn given_failing_predicate_when_evaluating_then_counts_as_non_match() {
    let mut chain = FilterChain::new();
    chain
        .add_filter("boom", Box::new(always_fails), TierSet::only(Tier::Entry), FilterConfig::None)
        .unwrap();
    chain.set_active("boom", true).unwrap();

    assert!(!chain.evaluate(&node(Entry::new(1, None, "Pilot"))));
    assert!(chain.evaluate(&node(Title::new(2, "Show"))));
}

#[test]
fn given_closure_predicate_when_added_then_evaluates() {
    let mut chain = FilterChain::new();
    let numbered = |n: &TreeNode, _: &FilterConfig| -> Result<bool, FilterError> {
        Ok(match &n.entity {
            CatalogEntity::Entry(e) => e.number.is_some(),
            _ => true,
        })
    };
    chain
        .add_filter("numbered", Box::new(numbered), TierSet::only(Tier::Entry), FilterConfig::None)
        .unwrap();
    chain.set_active("numbered", true).unwrap();

    assert!(chain.evaluate(&node(Entry::new(1, Some(1), "Pilot"))));
    assert!(!chain.evaluate(&node(Entry::new(2, None, "Extra"))));
}

#[rstest]
#[case::match_lowercase("pilot", true)]
#[case::match_uppercase("PIL", true)]
#[case::no_match("finale", false)]
#[case::blank_matches_all("  ", true)]
fn given_builtin_text_filter_when_evaluating_then_case_insensitive_substring(
    #[case] text: &str,
    #[case] shown: bool,
) {
    let mut chain = FilterChain::with_builtin_filters(false);
    chain.set_config(TEXT_FILTER, FilterConfig::text(text)).unwrap();
    chain.set_active(TEXT_FILTER, true).unwrap();

    assert_eq!(chain.evaluate(&node(Entry::new(1, Some(1), "Pilot"))), shown);
}

#[test]
fn given_metadata_search_when_plot_matches_then_title_passes() {
    let mut title = Title::new(1, "Alpha");
    title.plot = Some("A detective story".into());
    let title = node(title);

    let mut plain = FilterChain::with_builtin_filters(false);
    plain.set_config(TEXT_FILTER, FilterConfig::text("detective")).unwrap();
    plain.set_active(TEXT_FILTER, true).unwrap();
    let mut meta = FilterChain::with_builtin_filters(true);
    meta.set_config(TEXT_FILTER, FilterConfig::text("detective")).unwrap();
    meta.set_active(TEXT_FILTER, true).unwrap();

    assert!(!plain.evaluate(&title));
    assert!(meta.evaluate(&title));
}

#[test]
fn given_year_filter_when_node_has_no_year_then_fails() {
    let mut chain = FilterChain::with_builtin_filters(false);
    chain
        .set_config(YEAR_FILTER, FilterConfig::range(Some(2000), None))
        .unwrap();
    chain.set_active(YEAR_FILTER, true).unwrap();

    let mut dated = Title::new(1, "Dated");
    dated.year = Some(2004);

    assert!(chain.evaluate(&node(dated)));
    assert!(!chain.evaluate(&node(Title::new(2, "Undated"))));
    // groupings carry no year and are not in the filter's tiers
    assert!(chain.evaluate(&node(Grouping::new(3, Some(1)))));
}

// ============================================================
// persisted state
// ============================================================

#[test]
fn given_active_filters_when_exporting_state_then_only_active_ones_are_listed() {
    let mut chain = FilterChain::with_builtin_filters(false);
    chain.set_config(TEXT_FILTER, FilterConfig::text("pilot")).unwrap();
    chain.set_active(TEXT_FILTER, true).unwrap();
    chain.set_config(GENRE_FILTER, FilterConfig::text("drama")).unwrap();

    let state = chain.active_state();

    assert_eq!(state.len(), 1);
    assert_eq!(state.get(TEXT_FILTER), Some(&FilterConfig::text("pilot")));
}

#[test]
fn given_state_with_unknown_ids_when_restoring_then_skips_them() {
    let mut chain = FilterChain::with_builtin_filters(false);
    let mut state = BTreeMap::new();
    state.insert(WATCHED_FILTER.to_string(), FilterConfig::Flag(true));
    state.insert("plugin-filter".to_string(), FilterConfig::Flag(true));
    state.insert(YEAR_FILTER.to_string(), FilterConfig::text("not a range"));

    let skipped = chain.restore_state(&state);

    assert_eq!(skipped, vec!["plugin-filter".to_string(), YEAR_FILTER.to_string()]);
    assert!(chain.is_active(WATCHED_FILTER));
    assert_eq!(chain.config(WATCHED_FILTER), Some(&FilterConfig::Flag(true)));
    assert!(!chain.is_active(YEAR_FILTER));
}
