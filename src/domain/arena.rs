use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{CatalogEntity, EntityId, Tier};

/// Stable, opaque node identity.
///
/// Backed by a generational index: once a node is removed its id never
/// resolves again, even if the arena slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Index);

impl NodeId {
    pub fn into_raw_parts(self) -> (usize, u64) {
        self.0.into_raw_parts()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "n{slot}g{generation}")
    }
}

/// Tree node in the arena-based catalog mirror.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Mirrored catalog entity (the tier tag lives in the variant)
    pub entity: CatalogEntity,
    /// Parent node, None for titles (children of the implicit root)
    pub parent: Option<NodeId>,
    /// Children in sibling order
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn tier(&self) -> Tier {
        self.entity.tier()
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity.id()
    }
}

/// Arena-based title/grouping/entry tree.
///
/// The root is implicit: `titles()` are its children. Depth below the root is
/// at most 3 because every insert is checked against the tier of its parent.
#[derive(Debug, Default)]
pub struct NodeTree {
    arena: Arena<TreeNode>,
    titles: Vec<NodeId>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent`, keeping siblings in `sibling_cmp` order.
    #[instrument(level = "trace", skip(self, entity), fields(entity = %entity.id()))]
    pub fn insert(&mut self, entity: CatalogEntity, parent: Option<NodeId>) -> DomainResult<NodeId> {
        let parent_tier = match parent {
            Some(p) => Some(self.get(p).ok_or(DomainError::UnknownNode(p))?.tier()),
            None => None,
        };
        if entity.tier().parent() != parent_tier {
            return Err(DomainError::InvalidParent {
                entity: entity.id(),
                tier: entity.tier(),
                parent: parent_tier,
            });
        }

        let pos = self.insert_position(parent, &entity);
        let id = NodeId(self.arena.insert(TreeNode {
            entity,
            parent,
            children: Vec::new(),
        }));
        self.siblings_mut(parent).insert(pos, id);
        Ok(id)
    }

    /// Remove a node and its whole subtree. Returns removed ids in pre-order.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let parent = self.get(id).ok_or(DomainError::UnknownNode(id))?.parent;
        self.siblings_mut(parent).retain(|&s| s != id);

        let removed: Vec<NodeId> = self.iter_from(id).map(|(nid, _)| nid).collect();
        for nid in &removed {
            self.arena.remove(nid.0);
        }
        Ok(removed)
    }

    /// Swap in fresh entity data, keeping the node identity.
    ///
    /// Returns true when the node moved among its siblings.
    pub fn replace_entity(&mut self, id: NodeId, entity: CatalogEntity) -> DomainResult<bool> {
        let node = self.get(id).ok_or(DomainError::UnknownNode(id))?;
        if node.tier() != entity.tier() {
            return Err(DomainError::TierMismatch {
                entity: entity.id(),
                expected: node.tier(),
                found: entity.tier(),
            });
        }
        let parent = node.parent;

        let old_pos = self
            .siblings(parent)
            .iter()
            .position(|&s| s == id)
            .ok_or(DomainError::UnknownNode(id))?;
        self.siblings_mut(parent).remove(old_pos);
        let new_pos = self.insert_position(parent, &entity);
        self.siblings_mut(parent).insert(new_pos, id);

        if let Some(node) = self.arena.get_mut(id.0) {
            node.entity = entity;
        }
        Ok(old_pos != new_pos)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.arena.get(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn titles(&self) -> &[NodeId] {
        &self.titles
    }

    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.get(id).map(|n| n.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            chain.push(p);
            current = self.parent(p);
        }
        chain
    }

    /// Title at the top of `id`'s ancestor chain (itself for titles).
    pub fn title_of(&self, id: NodeId) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        Some(self.ancestors(id).last().copied().unwrap_or(id))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Depth-first pre-order over the whole tree, in sibling order.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.titles.iter().rev().copied().collect())
    }

    /// Depth-first pre-order over the subtree rooted at `id`.
    pub fn iter_from(&self, id: NodeId) -> TreeIterator<'_> {
        TreeIterator::new(self, vec![id])
    }

    /// Number of levels below the implicit root.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.titles
            .iter()
            .map(|&t| self.calculate_depth(t))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(node) => {
                1 + node
                    .children
                    .iter()
                    .map(|&child| self.calculate_depth(child))
                    .max()
                    .unwrap_or(0)
            }
            None => 0,
        }
    }

    fn insert_position(&self, parent: Option<NodeId>, entity: &CatalogEntity) -> usize {
        self.siblings(parent).partition_point(|&s| {
            self.get(s)
                .map(|n| n.entity.sibling_cmp(entity).is_le())
                .unwrap_or(true)
        })
    }

    fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            Some(p) => self.children(p).unwrap_or(&[]),
            None => &self.titles,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent.and_then(|p| self.arena.get_mut(p.0)) {
            Some(node) => &mut node.children,
            None => &mut self.titles,
        }
    }
}

pub struct TreeIterator<'a> {
    tree: &'a NodeTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a NodeTree, stack: Vec<NodeId>) -> Self {
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entry, Grouping, Title};

    fn names(tree: &NodeTree) -> Vec<String> {
        tree.iter()
            .map(|(_, n)| n.entity.display_name().into_owned())
            .collect()
    }

    #[test]
    fn given_entries_out_of_order_when_inserted_then_siblings_are_sorted() {
        let mut tree = NodeTree::new();
        let show = tree.insert(Title::new(1, "Show").into(), None).unwrap();
        let season = tree.insert(Grouping::new(2, Some(1)).into(), Some(show)).unwrap();
        tree.insert(Entry::new(5, Some(2), "Second").into(), Some(season))
            .unwrap();
        tree.insert(Entry::new(4, Some(1), "First").into(), Some(season))
            .unwrap();

        assert_eq!(names(&tree), vec!["Show", "Season 1", "First", "Second"]);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn given_entry_without_grouping_when_inserted_then_rejects() {
        let mut tree = NodeTree::new();
        let show = tree.insert(Title::new(1, "Show").into(), None).unwrap();
        let err = tree
            .insert(Entry::new(2, Some(1), "Pilot").into(), Some(show))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidParent { .. }));
    }

    #[test]
    fn given_removed_subtree_when_looking_up_then_ids_do_not_resolve() {
        let mut tree = NodeTree::new();
        let show = tree.insert(Title::new(1, "Show").into(), None).unwrap();
        let season = tree.insert(Grouping::new(2, Some(1)).into(), Some(show)).unwrap();
        let ep = tree
            .insert(Entry::new(3, Some(1), "Pilot").into(), Some(season))
            .unwrap();

        let removed = tree.remove_subtree(season).unwrap();

        assert_eq!(removed, vec![season, ep]);
        assert!(!tree.contains(ep));
        assert_eq!(tree.children(show).unwrap().len(), 0);
        // slot reuse must not resurrect the old identity
        let other = tree.insert(Grouping::new(9, Some(2)).into(), Some(show)).unwrap();
        assert_ne!(other, season);
        assert!(tree.get(season).is_none());
    }

    #[test]
    fn given_renamed_title_when_replaced_then_keeps_identity_and_moves() {
        let mut tree = NodeTree::new();
        let a = tree.insert(Title::new(1, "Alpha").into(), None).unwrap();
        let b = tree.insert(Title::new(2, "Beta").into(), None).unwrap();

        let moved = tree.replace_entity(a, Title::new(1, "Zulu").into()).unwrap();

        assert!(moved);
        assert_eq!(tree.titles(), &[b, a]);
        assert_eq!(tree.ancestors(a), Vec::<NodeId>::new());
    }
}
