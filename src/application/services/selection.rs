//! Selection coordinator
//!
//! Holds at most one (node, tier) selection and keeps it inside the current
//! projection. When the selected node disappears the selection climbs to the
//! nearest ancestor that is still visible, or clears.

use tracing::{debug, warn};

use crate::application::events::SelectionChanged;
use crate::application::projection::{Projection, ProjectionDiff};
use crate::domain::{NodeId, NodeTree, Tier};

/// The authoritative selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub node: NodeId,
    pub tier: Tier,
}

#[derive(Debug, Default)]
pub struct SelectionCoordinator {
    current: Option<Selection>,
    /// Ancestors of the selected node, nearest first. Captured on select so the
    /// chain is still known after the node itself left the tree.
    lineage: Vec<NodeId>,
    auto_select_first: bool,
}

impl SelectionCoordinator {
    pub fn new(auto_select_first: bool) -> Self {
        Self {
            auto_select_first,
            ..Default::default()
        }
    }

    pub fn current(&self) -> Option<Selection> {
        self.current
    }

    /// Tier whose detail view should be active.
    pub fn active_tier(&self) -> Option<Tier> {
        self.current.map(|s| s.tier)
    }

    /// Select `node`. Re-selecting the current node emits nothing.
    ///
    /// A node that is not in the projection, or whose tier differs, is a stale
    /// reference and degrades to "no selection".
    pub fn select(
        &mut self,
        node: NodeId,
        tier: Tier,
        tree: &NodeTree,
        projection: &Projection,
    ) -> Option<SelectionChanged> {
        let wanted = Selection { node, tier };
        if self.current == Some(wanted) {
            return None;
        }
        let valid = projection.get(node).is_some_and(|p| p.tier == tier);
        if !valid {
            warn!("select: stale reference {} ({}), clearing selection", node, tier);
            return self.clear();
        }
        self.set(wanted, tree.ancestors(node))
    }

    pub fn clear(&mut self) -> Option<SelectionChanged> {
        self.lineage.clear();
        self.current.take().map(|_| SelectionChanged::empty())
    }

    /// Bring the selection in line with a freshly computed projection.
    pub fn reconcile(
        &mut self,
        diff: &ProjectionDiff,
        tree: &NodeTree,
        projection: &Projection,
    ) -> Option<SelectionChanged> {
        match self.current {
            Some(sel) if projection.contains(sel.node) => None,
            Some(sel) => {
                debug!(
                    "reconcile: {} left the projection (removed by diff: {})",
                    sel.node,
                    diff.removes(sel.node)
                );
                let fallback = self
                    .lineage
                    .iter()
                    .position(|&a| projection.contains(a));
                match fallback {
                    Some(i) => {
                        let ancestor = self.lineage[i];
                        let tier = projection
                            .get(ancestor)
                            .map(|p| p.tier)
                            .unwrap_or(sel.tier);
                        let lineage = self.lineage.split_off(i + 1);
                        self.set(Selection { node: ancestor, tier }, lineage)
                    }
                    None => {
                        let cleared = self.clear();
                        self.auto_select(tree, projection).or(cleared)
                    }
                }
            }
            None => self.auto_select(tree, projection),
        }
    }

    fn auto_select(&mut self, tree: &NodeTree, projection: &Projection) -> Option<SelectionChanged> {
        if !self.auto_select_first {
            return None;
        }
        let first = *projection.first()?;
        self.set(
            Selection {
                node: first.id,
                tier: first.tier,
            },
            tree.ancestors(first.id),
        )
    }

    fn set(&mut self, selection: Selection, lineage: Vec<NodeId>) -> Option<SelectionChanged> {
        debug!("select: {} ({})", selection.node, selection.tier);
        self.current = Some(selection);
        self.lineage = lineage;
        Some(SelectionChanged::to(selection))
    }
}
