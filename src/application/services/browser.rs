//! Catalog browser session
//!
//! Wires provider, filter chain, filtering engine and selection coordinator
//! into one session. Catalog changes arrive on a channel and are queued;
//! [`CatalogBrowser::pump`] applies them strictly in arrival order, each one
//! to completion (tree mutation, projection diff, observer delivery, selection
//! reconciliation) before the next is looked at.
//!
//! Observers receive `&mut self` callbacks and hold no handle to the browser.
//! Anything they want to feed back goes through a cloned [`Sender`] and is
//! picked up by the next pump.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::events::{BrowserObserver, SelectionChanged};
use crate::application::filters::{FilterConfig, FilterPredicate, TEXT_FILTER};
use crate::application::projection::{Projection, ProjectionDiff};
use crate::application::services::{
    BuildReport, FilterChain, FilteringEngine, ProjectionStats, Selection, SelectionCoordinator,
    TreeDataProvider,
};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    CatalogChange, DomainError, DomainResult, EntityId, NodeId, NodeTree, Tier, TierSet,
};
use crate::infrastructure::traits::{CatalogSource, FilterStateStore};

/// Outcome of draining the change queue.
#[derive(Debug, Default)]
pub struct PumpReport {
    pub applied: usize,
    pub failed: Vec<(CatalogChange, ApplicationError)>,
}

impl PumpReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct CatalogBrowser {
    provider: TreeDataProvider,
    chain: FilterChain,
    engine: FilteringEngine,
    selection: SelectionCoordinator,
    observers: Vec<Box<dyn BrowserObserver>>,
    pending: VecDeque<CatalogChange>,
    feed: Receiver<CatalogChange>,
    sender: Sender<CatalogChange>,
    upstream: Vec<Receiver<CatalogChange>>,
    store: Option<Arc<dyn FilterStateStore>>,
}

impl CatalogBrowser {
    pub fn new(source: Arc<dyn CatalogSource>, chain: FilterChain, auto_select_first: bool) -> Self {
        let (sender, feed) = mpsc::channel();
        Self {
            provider: TreeDataProvider::new(source),
            chain,
            engine: FilteringEngine::new(),
            selection: SelectionCoordinator::new(auto_select_first),
            observers: Vec::new(),
            pending: VecDeque::new(),
            feed,
            sender,
            upstream: Vec::new(),
            store: None,
        }
    }

    /// Persist active filters to `store` and restore them on [`open`](Self::open).
    pub fn with_filter_store(mut self, store: Arc<dyn FilterStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an observer. Observers are called in registration order.
    pub fn subscribe(&mut self, observer: Box<dyn BrowserObserver>) {
        self.observers.push(observer);
    }

    /// Listen to an additional change feed, e.g. a catalog subscription.
    pub fn attach_feed(&mut self, feed: Receiver<CatalogChange>) {
        self.upstream.push(feed);
    }

    /// Handle for enqueuing changes from outside the session.
    pub fn change_sender(&self) -> Sender<CatalogChange> {
        self.sender.clone()
    }

    /// Enqueue a change directly.
    pub fn submit(&mut self, change: CatalogChange) {
        self.pending.push_back(change);
    }

    /// Changes received but not yet applied.
    pub fn pending(&mut self) -> usize {
        self.drain_feeds();
        self.pending.len()
    }

    /// Restore persisted filters, build the tree and publish the first projection.
    ///
    /// Changes queued before or during the build are replayed on top of it
    /// afterwards. Whatever the build already reflects is absorbed: a replayed
    /// change that refers to an entity the tree no longer holds is skipped.
    #[instrument(level = "debug", skip(self))]
    pub fn open(&mut self) -> ApplicationResult<BuildReport> {
        self.restore_filters();
        let report = self.provider.build()?;
        let diff = self.engine.recompute(self.provider.tree(), &self.chain);
        self.publish(&diff);
        let replay = self.drain(true);
        if !replay.is_clean() {
            warn!("open: {} replayed changes failed", replay.failed.len());
        }
        info!(
            "open: {} of {} nodes visible, {} changes replayed",
            self.engine.projection().len(),
            self.provider.tree().len(),
            replay.applied
        );
        Ok(report)
    }

    /// Apply every queued change in arrival order.
    ///
    /// A failing change is logged and reported; later changes still apply.
    pub fn pump(&mut self) -> PumpReport {
        self.drain(false)
    }

    /// Full recomputation against the current tree and chain.
    pub fn refresh(&mut self) -> ProjectionDiff {
        self.flush();
        let diff = self.engine.recompute(self.provider.tree(), &self.chain);
        self.publish(&diff);
        diff
    }

    // ------------------------------------------------------------
    // filters
    // ------------------------------------------------------------

    pub fn add_filter(
        &mut self,
        id: impl Into<String>,
        predicate: Box<dyn FilterPredicate>,
        tiers: TierSet,
        config: FilterConfig,
    ) -> ApplicationResult<ProjectionDiff> {
        self.flush();
        self.chain.add_filter(id, predicate, tiers, config)?;
        Ok(self.filters_changed())
    }

    pub fn remove_filter(&mut self, id: &str) -> ApplicationResult<ProjectionDiff> {
        self.flush();
        self.chain.remove_filter(id)?;
        Ok(self.filters_changed())
    }

    pub fn set_filter_active(&mut self, id: &str, active: bool) -> ApplicationResult<ProjectionDiff> {
        self.flush();
        self.chain.set_active(id, active)?;
        Ok(self.filters_changed())
    }

    pub fn set_filter_config(
        &mut self,
        id: &str,
        config: FilterConfig,
    ) -> ApplicationResult<ProjectionDiff> {
        self.flush();
        self.chain.set_config(id, config)?;
        Ok(self.filters_changed())
    }

    /// Configure and toggle the text filter in one step. Blank text deactivates it.
    pub fn set_search_text(&mut self, text: &str) -> ApplicationResult<ProjectionDiff> {
        self.flush();
        let text = text.trim();
        self.chain.set_config(TEXT_FILTER, FilterConfig::text(text))?;
        self.chain.set_active(TEXT_FILTER, !text.is_empty())?;
        Ok(self.filters_changed())
    }

    pub fn filters(&self) -> &FilterChain {
        &self.chain
    }

    // ------------------------------------------------------------
    // selection
    // ------------------------------------------------------------

    pub fn select(&mut self, node: NodeId, tier: Tier) -> Option<SelectionChanged> {
        let event = self.selection.select(
            node,
            tier,
            self.provider.tree(),
            self.engine.projection(),
        );
        if let Some(event) = &event {
            self.notify_selection(event);
        }
        event
    }

    /// Select the node mirroring `entity`. Unknown entities clear the selection.
    pub fn select_entity(&mut self, entity: EntityId) -> Option<SelectionChanged> {
        let target = self
            .provider
            .node_for(entity)
            .and_then(|n| self.provider.tree().get(n).map(|node| (n, node.tier())));
        match target {
            Some((node, tier)) => self.select(node, tier),
            None => {
                warn!("select_entity: {} is not mirrored", entity);
                self.clear_selection()
            }
        }
    }

    pub fn clear_selection(&mut self) -> Option<SelectionChanged> {
        let event = self.selection.clear();
        if let Some(event) = &event {
            self.notify_selection(event);
        }
        event
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection.current()
    }

    /// Detail view to show for the current selection.
    pub fn active_tier(&self) -> Option<Tier> {
        self.selection.active_tier()
    }

    // ------------------------------------------------------------
    // read access
    // ------------------------------------------------------------

    pub fn projection(&self) -> &Projection {
        self.engine.projection()
    }

    pub fn tree(&self) -> &NodeTree {
        self.provider.tree()
    }

    pub fn node_for(&self, entity: EntityId) -> Option<NodeId> {
        self.provider.node_for(entity)
    }

    pub fn children(&self, node: NodeId) -> DomainResult<&[NodeId]> {
        self.provider.children(node)
    }

    pub fn stats(&self) -> ProjectionStats {
        self.engine.stats(self.provider.tree())
    }

    // ------------------------------------------------------------
    // internals
    // ------------------------------------------------------------

    fn drain_feeds(&mut self) {
        while let Ok(change) = self.feed.try_recv() {
            self.pending.push_back(change);
        }
        for feed in &self.upstream {
            while let Ok(change) = feed.try_recv() {
                self.pending.push_back(change);
            }
        }
    }

    fn drain(&mut self, replaying: bool) -> PumpReport {
        let mut report = PumpReport::default();
        loop {
            self.drain_feeds();
            let Some(change) = self.pending.pop_front() else {
                break;
            };
            match self.apply_change(change.clone()) {
                Ok(()) => report.applied += 1,
                Err(e) if replaying && is_stale(&e) => {
                    debug!("replay: skipping {:?}: {}", change, e);
                }
                Err(e) => {
                    warn!("pump: dropping {:?}: {}", change, e);
                    report.failed.push((change, e));
                }
            }
        }
        if report.applied > 0 || !report.failed.is_empty() {
            debug!(
                "pump: applied={} failed={}",
                report.applied,
                report.failed.len()
            );
        }
        report
    }

    /// Apply queued catalog changes before a filter operation so they keep
    /// their place in the order of events.
    fn flush(&mut self) {
        let report = self.pump();
        if !report.is_clean() {
            warn!("flush: {} changes failed", report.failed.len());
        }
    }

    #[instrument(level = "debug", skip(self))]
    fn apply_change(&mut self, change: CatalogChange) -> ApplicationResult<()> {
        let diff = match change {
            CatalogChange::EntityAdded { entity, parent } => {
                let node = self.provider.on_entity_added(entity, parent)?;
                self.refresh_owner(node)
            }
            CatalogChange::EntityUpdated(entity) => {
                let node = self.provider.on_entity_updated(entity)?;
                self.refresh_owner(node)
            }
            CatalogChange::EntityRemoved(id) => {
                let removal = self.provider.on_entity_removed(id)?;
                self.engine.discard(&removal.removed);
                match removal.title {
                    Some(title) => {
                        self.engine
                            .refresh_title(self.provider.tree(), &self.chain, title)
                    }
                    None => self.engine.reproject(self.provider.tree()),
                }
            }
        };
        self.publish(&diff);
        Ok(())
    }

    fn refresh_owner(&mut self, node: NodeId) -> ProjectionDiff {
        let tree = self.provider.tree();
        match tree.title_of(node) {
            Some(title) => self.engine.refresh_title(tree, &self.chain, title),
            None => self.engine.recompute(tree, &self.chain),
        }
    }

    fn filters_changed(&mut self) -> ProjectionDiff {
        let diff = self.engine.recompute(self.provider.tree(), &self.chain);
        self.persist_filters();
        self.publish(&diff);
        diff
    }

    fn publish(&mut self, diff: &ProjectionDiff) {
        if !diff.is_empty() {
            let projection = self.engine.projection();
            for observer in self.observers.iter_mut() {
                observer.on_projection_diff(diff, projection);
            }
        }
        let event = self
            .selection
            .reconcile(diff, self.provider.tree(), self.engine.projection());
        if let Some(event) = &event {
            self.notify_selection(event);
        }
    }

    fn notify_selection(&mut self, event: &SelectionChanged) {
        for observer in self.observers.iter_mut() {
            observer.on_selection_changed(event);
        }
    }

    fn persist_filters(&self) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&self.chain.active_state()) {
            warn!("persist_filters: {}", e);
        }
    }

    fn restore_filters(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        match store.load() {
            Ok(state) => {
                let skipped = self.chain.restore_state(&state);
                debug!(
                    "restore_filters: {} restored, {} skipped",
                    state.len() - skipped.len(),
                    skipped.len()
                );
            }
            Err(e) => warn!("restore_filters: {}", e),
        }
    }
}

/// Replayed change whose target the build has already moved past.
fn is_stale(e: &ApplicationError) -> bool {
    matches!(
        e,
        ApplicationError::Domain(
            DomainError::UnknownEntity(_)
                | DomainError::UnknownParent(_)
                | DomainError::ParentMismatch { .. }
        )
    )
}
