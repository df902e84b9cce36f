//! Typed events pushed to registered observers

use crate::application::projection::{Projection, ProjectionDiff};
use crate::application::services::Selection;
use crate::domain::{NodeId, Tier};

/// Selection moved, or became empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionChanged {
    pub selection: Option<Selection>,
}

impl SelectionChanged {
    pub fn to(selection: Selection) -> Self {
        Self {
            selection: Some(selection),
        }
    }

    pub fn empty() -> Self {
        Self { selection: None }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.selection.map(|s| s.node)
    }

    pub fn tier(&self) -> Option<Tier> {
        self.selection.map(|s| s.tier)
    }
}

/// Display-layer and detail-view hook.
///
/// Both methods default to no-ops so an observer only implements what it needs.
pub trait BrowserObserver {
    /// A non-empty diff; `projection` is the state after applying it.
    fn on_projection_diff(&mut self, _diff: &ProjectionDiff, _projection: &Projection) {}

    fn on_selection_changed(&mut self, _event: &SelectionChanged) {}
}
