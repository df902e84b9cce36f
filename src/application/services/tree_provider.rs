//! Tree data provider
//!
//! Mirrors the catalog source as a [`NodeTree`] and keeps an
//! entity → node index. Every title subtree is read into a snapshot first and
//! only linked once the whole snapshot is in hand, so a failed read never
//! leaves a half-built title behind.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{
    CatalogEntity, DomainError, DomainResult, EntityId, Entry, Grouping, NodeId, NodeTree, Title,
};
use crate::infrastructure::traits::CatalogSource;
use crate::infrastructure::CatalogError;

/// Outcome of a full build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Titles linked into the tree
    pub titles: usize,
    /// Total nodes in the tree
    pub nodes: usize,
    /// Titles left out because their subtree could not be read
    pub skipped: Vec<(EntityId, CatalogError)>,
}

/// Result of removing an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Removed node ids, pre-order
    pub removed: Vec<NodeId>,
    /// Title that owned the removed node, if it is still in the tree
    pub title: Option<NodeId>,
}

/// Consistent copy of one title and everything below it.
#[derive(Debug, Clone)]
struct TitleSnapshot {
    title: Title,
    groupings: Vec<(Grouping, Vec<Entry>)>,
}

impl TitleSnapshot {
    fn ids(&self) -> Vec<EntityId> {
        let mut ids = vec![self.title.id];
        for (grouping, entries) in &self.groupings {
            ids.push(grouping.id);
            ids.extend(entries.iter().map(|e| e.id));
        }
        ids
    }
}

pub struct TreeDataProvider {
    source: Arc<dyn CatalogSource>,
    tree: NodeTree,
    index: HashMap<EntityId, NodeId>,
}

impl TreeDataProvider {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            tree: NodeTree::new(),
            index: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn node_for(&self, entity: EntityId) -> Option<NodeId> {
        self.index.get(&entity).copied()
    }

    /// Ordered children of a node.
    pub fn children(&self, node: NodeId) -> DomainResult<&[NodeId]> {
        self.tree.children(node).ok_or(DomainError::UnknownNode(node))
    }

    /// Bring the whole tree in line with the source.
    ///
    /// The rebuild happens in place: an entity that is still present keeps its
    /// node, everything else is removed so its identity is never handed out
    /// again. Listing titles is fatal and leaves the tree untouched; a title
    /// whose subtree cannot be read is omitted and reported.
    #[instrument(level = "debug", skip(self))]
    pub fn build(&mut self) -> ApplicationResult<BuildReport> {
        let titles = self.source.list_titles()?;
        let mut report = BuildReport::default();
        let mut snapshots = Vec::with_capacity(titles.len());
        for title in titles {
            let id = title.id;
            match self.snapshot_title(title) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!("build: omitting title {}: {}", id, e);
                    report.skipped.push((id, e));
                }
            }
        }

        let present: HashSet<EntityId> = snapshots.iter().flat_map(TitleSnapshot::ids).collect();
        let stale: Vec<NodeId> = self
            .index
            .iter()
            .filter(|(id, _)| !present.contains(id))
            .map(|(_, &node)| node)
            .collect();
        for node in stale {
            // an earlier removal may already have taken it along
            if self.tree.contains(node) {
                self.unlink(node)?;
            }
        }

        let mut seen = HashSet::new();
        for snapshot in snapshots {
            let id = snapshot.title.id;
            match self.sync_title(snapshot, &mut seen) {
                Ok(_) => report.titles += 1,
                Err(e) => {
                    warn!("build: omitting title {}: {}", id, e);
                    report.skipped.push((id, CatalogError::rejected(e.to_string())));
                }
            }
        }

        report.nodes = self.tree.len();
        info!(
            "build: {} titles, {} nodes, {} skipped",
            report.titles,
            report.nodes,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Mirror a newly added entity under `parent`.
    ///
    /// Titles and groupings bring along whatever the source already holds below
    /// them. An entity that is already mirrored under the same parent is
    /// refreshed in place; under a different parent it is rejected.
    #[instrument(level = "debug", skip(self, entity), fields(entity = %entity.id()))]
    pub fn on_entity_added(
        &mut self,
        entity: CatalogEntity,
        parent: Option<EntityId>,
    ) -> ApplicationResult<NodeId> {
        if let Some(node) = self.node_for(entity.id()) {
            let mirrored = self
                .tree
                .parent(node)
                .and_then(|p| self.tree.get(p))
                .map(|n| n.entity_id());
            if mirrored != parent {
                warn!(
                    "on_entity_added: {} announced under {:?}, mirrored under {:?}",
                    entity.id(),
                    parent,
                    mirrored
                );
                return Err(DomainError::ParentMismatch {
                    entity: entity.id(),
                    mirrored,
                    announced: parent,
                }
                .into());
            }
            debug!("on_entity_added: {} already mirrored, refreshing", entity.id());
            return self.on_entity_updated(entity);
        }
        let parent_node = match parent {
            Some(p) => Some(self.node_for(p).ok_or(DomainError::UnknownParent(p))?),
            None => None,
        };
        let parent_tier = parent_node.and_then(|p| self.tree.get(p)).map(|n| n.tier());
        if entity.tier().parent() != parent_tier {
            return Err(DomainError::InvalidParent {
                entity: entity.id(),
                tier: entity.tier(),
                parent: parent_tier,
            }
            .into());
        }

        let mut seen = HashSet::new();
        match (entity, parent_node) {
            (CatalogEntity::Title(title), _) => {
                let snapshot = self.snapshot_title(title)?;
                Ok(self.sync_title(snapshot, &mut seen)?)
            }
            (CatalogEntity::Grouping(grouping), Some(parent)) => {
                let entries = self.existing_entries(grouping.id)?;
                Ok(self.sync_grouping(parent, grouping, entries, &mut seen)?)
            }
            (entity, parent) => Ok(self.upsert(entity, parent, &mut seen)?),
        }
    }

    /// Remove the entity's node and its whole subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn on_entity_removed(&mut self, entity: EntityId) -> ApplicationResult<Removal> {
        let node = self
            .node_for(entity)
            .ok_or(DomainError::UnknownEntity(entity))?;
        let title = self.tree.title_of(node).filter(|&t| t != node);
        let removed = self.unlink(node)?;
        debug!("on_entity_removed: {} dropped {} nodes", entity, removed.len());
        Ok(Removal { removed, title })
    }

    /// Refresh mirrored data for an entity, keeping its node identity.
    pub fn on_entity_updated(&mut self, entity: CatalogEntity) -> ApplicationResult<NodeId> {
        let id = entity.id();
        let node = self.node_for(id).ok_or(DomainError::UnknownEntity(id))?;
        let moved = self.tree.replace_entity(node, entity)?;
        debug!("on_entity_updated: {} (moved={})", id, moved);
        Ok(node)
    }

    /// Read a title's whole subtree from the source before touching the tree.
    fn snapshot_title(&self, title: Title) -> Result<TitleSnapshot, CatalogError> {
        let groupings = match self.source.list_groupings(title.id) {
            Ok(g) => g,
            // announced before the source exposes it: nothing below yet
            Err(CatalogError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut snapshot = TitleSnapshot {
            title,
            groupings: Vec::with_capacity(groupings.len()),
        };
        for grouping in groupings {
            let entries = self.existing_entries(grouping.id)?;
            snapshot.groupings.push((grouping, entries));
        }
        Ok(snapshot)
    }

    fn existing_entries(&self, grouping: EntityId) -> Result<Vec<Entry>, CatalogError> {
        match self.source.list_entries(grouping) {
            Ok(entries) => Ok(entries),
            Err(CatalogError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Link a snapshot, reusing nodes of entities that are already mirrored in
    /// the same place. On failure the title is unlinked again.
    fn sync_title(
        &mut self,
        snapshot: TitleSnapshot,
        seen: &mut HashSet<EntityId>,
    ) -> DomainResult<NodeId> {
        let node = self.upsert(snapshot.title.into(), None, seen)?;
        for (grouping, entries) in snapshot.groupings {
            if let Err(e) = self.sync_grouping(node, grouping, entries, seen) {
                self.unlink(node)?;
                return Err(e);
            }
        }
        Ok(node)
    }

    fn sync_grouping(
        &mut self,
        parent: NodeId,
        grouping: Grouping,
        entries: Vec<Entry>,
        seen: &mut HashSet<EntityId>,
    ) -> DomainResult<NodeId> {
        let node = self.upsert(grouping.into(), Some(parent), seen)?;
        let wanted: HashSet<EntityId> = entries.iter().map(|e| e.id).collect();
        let gone: Vec<NodeId> = self
            .tree
            .children(node)
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|&c| self.tree.get(c).is_some_and(|n| !wanted.contains(&n.entity_id())))
            .collect();
        for child in gone {
            self.unlink(child)?;
        }
        for entry in entries {
            if seen.contains(&entry.id) {
                warn!("sync_grouping: skipping duplicate entry {}", entry.id);
                continue;
            }
            if let Err(e) = self.upsert(entry.into(), Some(node), seen) {
                self.unlink(node)?;
                return Err(e);
            }
        }
        Ok(node)
    }

    /// Insert `entity` under `parent`, or refresh its node when it is already
    /// mirrored there. A node found elsewhere is unlinked and inserted anew.
    fn upsert(
        &mut self,
        entity: CatalogEntity,
        parent: Option<NodeId>,
        seen: &mut HashSet<EntityId>,
    ) -> DomainResult<NodeId> {
        let id = entity.id();
        if !seen.insert(id) {
            return Err(DomainError::DuplicateEntity(id));
        }
        if let Some(node) = self.node_for(id) {
            let in_place = self
                .tree
                .get(node)
                .is_some_and(|n| n.parent == parent && n.tier() == entity.tier());
            if in_place {
                self.tree.replace_entity(node, entity)?;
                return Ok(node);
            }
            debug!("upsert: {} changed place, relinking", id);
            self.unlink(node)?;
        }
        let node = self.tree.insert(entity, parent)?;
        self.index.insert(id, node);
        Ok(node)
    }

    /// Remove a node with its subtree from both tree and index.
    fn unlink(&mut self, node: NodeId) -> DomainResult<Vec<NodeId>> {
        let entities: Vec<EntityId> = self
            .tree
            .iter_from(node)
            .map(|(_, n)| n.entity_id())
            .collect();
        let removed = self.tree.remove_subtree(node)?;
        for id in &entities {
            self.index.remove(id);
        }
        Ok(removed)
    }
}
