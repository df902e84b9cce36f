//! Tests for FilteringEngine and ProjectionDiff
//!
//! - bottom-up visibility keeps a matching node's ancestor chain visible
//! - recomputation is idempotent
//! - diffs are minimal and replay to the new projection
//! - subtree refresh touches only the affected title

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rstest::rstest;

use mediatree::application::filters::{FilterConfig, FilterError, TEXT_FILTER};
use mediatree::application::projection::{DiffOp, ProjectionDiff};
use mediatree::application::services::{
    FilterChain, FilteringEngine, TierCounts, TreeDataProvider,
};
use mediatree::domain::{EntityId, Entry, NodeId, Tier, TierSet, TreeNode};
use mediatree::infrastructure::InMemoryCatalog;
use mediatree::util::testing::{init_test_setup, library_catalog, scenario_catalog};

struct Fixture {
    provider: TreeDataProvider,
    chain: FilterChain,
    engine: FilteringEngine,
}

impl Fixture {
    fn new(catalog: InMemoryCatalog) -> Self {
        init_test_setup();
        let mut provider = TreeDataProvider::new(Arc::new(catalog));
        provider.build().unwrap();
        let chain = FilterChain::with_builtin_filters(false);
        let mut engine = FilteringEngine::new();
        engine.recompute(provider.tree(), &chain);
        Self {
            provider,
            chain,
            engine,
        }
    }

    fn search(&mut self, text: &str) -> ProjectionDiff {
        self.chain
            .set_config(TEXT_FILTER, FilterConfig::text(text))
            .unwrap();
        self.chain
            .set_active(TEXT_FILTER, !text.trim().is_empty())
            .unwrap();
        self.engine.recompute(self.provider.tree(), &self.chain)
    }

    fn node(&self, id: u64) -> NodeId {
        self.provider.node_for(EntityId(id)).unwrap()
    }

    fn visible_names(&self) -> Vec<String> {
        self.engine
            .projection()
            .nodes()
            .iter()
            .map(|p| {
                self.provider
                    .tree()
                    .get(p.id)
                    .unwrap()
                    .entity
                    .display_name()
                    .into_owned()
            })
            .collect()
    }

    fn refresh_owner_of(&mut self, node: NodeId) -> ProjectionDiff {
        let title = self.provider.tree().title_of(node).unwrap();
        self.engine
            .refresh_title(self.provider.tree(), &self.chain, title)
    }
}

// ============================================================
// visibility
// ============================================================

#[test]
fn given_scenario_when_searching_pilot_then_ancestor_chain_stays_visible() {
    // Arrange
    let mut fx = Fixture::new(scenario_catalog());

    // Act
    let diff = fx.search("pilot");

    // Assert
    assert_eq!(fx.visible_names(), vec!["Show A", "Season 1", "Pilot"]);
    let removed: Vec<NodeId> = diff.removed().collect();
    assert_eq!(removed, vec![fx.node(101), fx.node(11), fx.node(110)]);
    assert_eq!(diff.inserted().count(), 0);
}

#[test]
fn given_search_when_cleared_then_all_nodes_return_in_catalog_order() {
    // Arrange
    let mut fx = Fixture::new(scenario_catalog());
    fx.search("pilot");

    // Act
    let diff = fx.search("");

    // Assert
    assert_eq!(
        fx.visible_names(),
        vec!["Show A", "Season 1", "Pilot", "Episode 2", "Season 2", "Finale"]
    );
    assert_eq!(
        diff.ops(),
        &[
            DiffOp::Insert {
                id: fx.node(101),
                tier: Tier::Entry,
                parent: Some(fx.node(10)),
                after: Some(fx.node(100)),
            },
            DiffOp::Insert {
                id: fx.node(11),
                tier: Tier::Grouping,
                parent: Some(fx.node(1)),
                after: Some(fx.node(101)),
            },
            DiffOp::Insert {
                id: fx.node(110),
                tier: Tier::Entry,
                parent: Some(fx.node(11)),
                after: Some(fx.node(11)),
            },
        ]
    );
}

#[test]
fn given_only_title_matches_when_searching_then_children_stay_hidden() {
    let mut fx = Fixture::new(scenario_catalog());

    fx.search("show");

    assert_eq!(fx.visible_names(), vec!["Show A"]);
}

#[test]
fn given_nothing_matches_when_searching_then_projection_is_empty() {
    let mut fx = Fixture::new(scenario_catalog());

    let diff = fx.search("zzz");

    assert!(fx.engine.projection().is_empty());
    assert_eq!(diff.removed().count(), 6);
}

#[rstest]
#[case("")]
#[case("pilot")]
#[case("season")]
#[case("zzz")]
fn given_unchanged_tree_and_chain_when_recomputing_then_empty_diff(#[case] text: &str) {
    // Arrange
    let mut fx = Fixture::new(library_catalog());
    fx.search(text);
    let before = fx.engine.projection().clone();

    // Act
    let diff = fx.engine.recompute(fx.provider.tree(), &fx.chain);

    // Assert
    assert!(diff.is_empty());
    assert_eq!(fx.engine.projection(), &before);
}

#[rstest]
#[case("e")]
#[case("a")]
#[case("pilot")]
#[case("season 1")]
fn given_any_search_when_projected_then_ancestors_of_visible_nodes_are_visible(
    #[case] text: &str,
) {
    let mut fx = Fixture::new(library_catalog());

    fx.search(text);

    let projection = fx.engine.projection();
    assert!(!projection.is_empty());
    for p in projection.nodes() {
        for ancestor in fx.provider.tree().ancestors(p.id) {
            assert!(projection.contains(ancestor), "{} lost its ancestor", p.id);
        }
    }
    // projection order is tree pre-order restricted to visible nodes
    let expected: Vec<NodeId> = fx
        .provider
        .tree()
        .iter()
        .map(|(id, _)| id)
        .filter(|id| projection.contains(*id))
        .collect();
    assert_eq!(projection.ids(), expected);
}

#[test]
fn given_failing_predicate_on_one_entry_when_recomputing_then_only_that_entry_hides() {
    // Arrange
    let mut fx = Fixture::new(scenario_catalog());
    let flaky = |n: &TreeNode, _: &FilterConfig| -> Result<bool, FilterError> {
        if n.entity_id() == EntityId(101) {
            Err(FilterError::Failed("metadata unavailable".into()))
        } else {
            Ok(true)
        }
    };
    fx.chain
        .add_filter("flaky", Box::new(flaky), TierSet::only(Tier::Entry), FilterConfig::None)
        .unwrap();
    fx.chain.set_active("flaky", true).unwrap();

    // Act
    let diff = fx.engine.recompute(fx.provider.tree(), &fx.chain);

    // Assert
    assert_eq!(diff.removed().collect::<Vec<_>>(), vec![fx.node(101)]);
    assert_eq!(fx.engine.projection().len(), 5);
}

// ============================================================
// diff replay
// ============================================================

#[rstest]
#[case("", "pilot")]
#[case("pilot", "finale")]
#[case("finale", "")]
#[case("", "zzz")]
#[case("zzz", "e")]
#[case("second", "gala")]
fn given_two_searches_when_applying_diff_then_reproduces_new_projection(
    #[case] from: &str,
    #[case] to: &str,
) {
    // Arrange
    let mut fx = Fixture::new(library_catalog());
    fx.search(from);
    let previous = fx.engine.projection().ids();

    // Act
    let diff = fx.search(to);

    // Assert
    assert_eq!(diff.apply(&previous), fx.engine.projection().ids());
    for op in diff.ops() {
        if let DiffOp::Insert { id, .. } = op {
            assert!(!previous.contains(id), "insert of an already visible node");
        }
    }
}

// ============================================================
// incremental refresh
// ============================================================

#[test]
fn given_hidden_grouping_when_matching_entry_added_then_grouping_and_entry_inserted() {
    // Arrange
    let mut fx = Fixture::new(scenario_catalog());
    fx.search("pilot");
    let previous = fx.engine.projection().ids();

    // Act
    let added = fx
        .provider
        .on_entity_added(Entry::new(111, Some(2), "Pilot redux").into(), Some(EntityId(11)))
        .unwrap();
    let diff = fx.refresh_owner_of(added);

    // Assert
    assert_eq!(
        fx.visible_names(),
        vec!["Show A", "Season 1", "Pilot", "Season 2", "Pilot redux"]
    );
    assert_eq!(diff.inserted().collect::<Vec<_>>(), vec![fx.node(11), added]);
    assert_eq!(diff.removed().count(), 0);
    assert_eq!(diff.apply(&previous), fx.engine.projection().ids());
}

#[test]
fn given_last_match_removed_when_refreshing_then_ancestors_disappear() {
    // Arrange
    let mut fx = Fixture::new(scenario_catalog());
    fx.search("pilot");
    let show = fx.node(1);

    // Act
    let removal = fx.provider.on_entity_removed(EntityId(100)).unwrap();
    fx.engine.discard(&removal.removed);
    let diff = fx
        .engine
        .refresh_title(fx.provider.tree(), &fx.chain, removal.title.unwrap());

    // Assert
    assert!(fx.engine.projection().is_empty());
    assert_eq!(diff.removed().count(), 3);
    assert!(diff.removes(show));
}

#[test]
fn given_title_removed_when_reprojecting_then_its_rows_are_removed() {
    let mut fx = Fixture::new(library_catalog());

    let removal = fx.provider.on_entity_removed(EntityId(2)).unwrap();
    fx.engine.discard(&removal.removed);
    let diff = fx.engine.reproject(fx.provider.tree());

    assert_eq!(diff.removed().count(), 3);
    assert_eq!(fx.engine.projection().len(), 9);
}

#[test]
fn given_refresh_of_one_title_when_evaluating_then_other_titles_are_not_touched() {
    // Arrange
    let mut fx = Fixture::new(library_catalog());
    let seen: Rc<RefCell<Vec<EntityId>>> = Rc::default();
    let log = Rc::clone(&seen);
    let recording = move |n: &TreeNode, _: &FilterConfig| -> Result<bool, FilterError> {
        log.borrow_mut().push(n.entity_id());
        Ok(false)
    };
    fx.chain
        .add_filter("rec", Box::new(recording), TierSet::all(), FilterConfig::None)
        .unwrap();
    fx.chain.set_active("rec", true).unwrap();
    fx.engine.recompute(fx.provider.tree(), &fx.chain);
    seen.borrow_mut().clear();

    // Act
    let alpha = fx.node(1);
    fx.engine.refresh_title(fx.provider.tree(), &fx.chain, alpha);

    // Assert
    let alpha_ids = [1, 10, 11, 100, 101, 110].map(EntityId);
    let seen = seen.borrow();
    assert_eq!(seen.len(), alpha_ids.len());
    assert!(seen.iter().all(|id| alpha_ids.contains(id)));
}

#[test]
fn given_search_when_computing_stats_then_counts_visible_against_total() {
    let mut fx = Fixture::new(library_catalog());

    fx.search("pilot");
    let stats = fx.engine.stats(fx.provider.tree());

    assert_eq!(
        stats.visible,
        TierCounts {
            titles: 1,
            groupings: 1,
            entries: 1
        }
    );
    assert_eq!(
        stats.total,
        TierCounts {
            titles: 3,
            groupings: 4,
            entries: 5
        }
    );
}
