//! Filtering engine
//!
//! Bottom-up visibility with ancestor propagation:
//!
//! ```text
//! entry    visible = chain passes
//! grouping visible = chain passes || any entry visible
//! title    visible = chain passes || any grouping visible
//! ```
//!
//! A single matching entry therefore keeps its grouping and title in the
//! projection even when their own names fail the filters.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::application::projection::{ProjectedNode, Projection, ProjectionDiff};
use crate::application::services::FilterChain;
use crate::domain::{NodeId, NodeTree, Tier};

/// Per-tier node counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub titles: usize,
    pub groupings: usize,
    pub entries: usize,
}

impl TierCounts {
    fn bump(&mut self, tier: Tier) {
        match tier {
            Tier::Title => self.titles += 1,
            Tier::Grouping => self.groupings += 1,
            Tier::Entry => self.entries += 1,
        }
    }
}

/// Visible vs. total counts of the current projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    pub visible: TierCounts,
    pub total: TierCounts,
}

/// Recomputes the visible projection and diffs it against the previous one.
#[derive(Debug, Default)]
pub struct FilteringEngine {
    projection: Projection,
    visibility: HashMap<NodeId, bool>,
}

impl FilteringEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last computed projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Full recomputation: every node is re-evaluated against the chain.
    #[instrument(level = "debug", skip_all, fields(nodes = tree.len()))]
    pub fn recompute(&mut self, tree: &NodeTree, chain: &FilterChain) -> ProjectionDiff {
        self.visibility.clear();
        for &title in tree.titles() {
            self.evaluate(tree, chain, title);
        }
        self.reproject(tree)
    }

    /// Re-evaluate a single title subtree after a catalog mutation under it.
    ///
    /// Other titles keep their cached visibility; predicates are not called for them.
    #[instrument(level = "debug", skip(self, tree, chain))]
    pub fn refresh_title(
        &mut self,
        tree: &NodeTree,
        chain: &FilterChain,
        title: NodeId,
    ) -> ProjectionDiff {
        for (id, _) in tree.iter_from(title) {
            self.visibility.remove(&id);
        }
        if tree.contains(title) {
            self.evaluate(tree, chain, title);
        }
        self.reproject(tree)
    }

    /// Drop cached visibility for nodes that left the tree.
    pub fn discard(&mut self, removed: &[NodeId]) {
        for id in removed {
            self.visibility.remove(id);
        }
    }

    /// Counts of the current projection against the whole tree.
    pub fn stats(&self, tree: &NodeTree) -> ProjectionStats {
        let mut stats = ProjectionStats::default();
        for node in self.projection.nodes() {
            stats.visible.bump(node.tier);
        }
        for (_, node) in tree.iter() {
            stats.total.bump(node.tier());
        }
        stats
    }

    fn evaluate(&mut self, tree: &NodeTree, chain: &FilterChain, id: NodeId) -> bool {
        let Some(node) = tree.get(id) else {
            return false;
        };
        // every child must be evaluated, so no short-circuit here
        let mut descendant_visible = false;
        for &child in &node.children {
            descendant_visible |= self.evaluate(tree, chain, child);
        }
        let visible = descendant_visible || chain.evaluate(node);
        trace!("evaluate: {} {} -> {}", node.tier(), id, visible);
        self.visibility.insert(id, visible);
        visible
    }

    /// Rebuild the ordered projection from cached visibility and diff it.
    pub fn reproject(&mut self, tree: &NodeTree) -> ProjectionDiff {
        let mut nodes = Vec::with_capacity(self.projection.len());
        for (id, node) in tree.iter() {
            if self.visibility.get(&id).copied().unwrap_or(false) {
                nodes.push(ProjectedNode {
                    id,
                    tier: node.tier(),
                    parent: node.parent,
                });
            }
        }
        let next = Projection::new(nodes);
        let diff = self.projection.diff(&next);
        debug!(
            "reproject: {} visible, {} ops",
            next.len(),
            diff.len()
        );
        self.projection = next;
        diff
    }
}
