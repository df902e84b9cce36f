//! Projection and projection diff
//!
//! A projection is the depth-first ordered list of visible nodes. Diffs between
//! two projections are expressed in node identities: inserts name the node they
//! follow instead of an index, so a consumer never depends on positions.

use std::collections::{HashMap, HashSet};

use crate::domain::{NodeId, Tier};

/// One visible row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectedNode {
    pub id: NodeId,
    pub tier: Tier,
    pub parent: Option<NodeId>,
}

/// Visible nodes in depth-first, sibling order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    nodes: Vec<ProjectedNode>,
    positions: HashMap<NodeId, usize>,
}

impl Projection {
    pub fn new(nodes: Vec<ProjectedNode>) -> Self {
        let positions = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        Self { nodes, positions }
    }

    pub fn nodes(&self) -> &[ProjectedNode] {
        &self.nodes
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn get(&self, id: NodeId) -> Option<&ProjectedNode> {
        self.position(id).map(|i| &self.nodes[i])
    }

    pub fn first(&self) -> Option<&ProjectedNode> {
        self.nodes.first()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Minimal insert/remove sequence turning `self` into `next`.
    ///
    /// Identities are unique, so the longest common subsequence of the two
    /// identity lists is the longest increasing run of old positions taken in
    /// new order. Everything outside it is removed (old order) and then inserted
    /// (new order).
    pub fn diff(&self, next: &Projection) -> ProjectionDiff {
        let common: Vec<(usize, usize)> = next
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| self.position(n.id).map(|old| (i, old)))
            .collect();
        let old_positions: Vec<usize> = common.iter().map(|&(_, old)| old).collect();
        let kept: HashSet<NodeId> = longest_increasing(&old_positions)
            .into_iter()
            .map(|k| next.nodes[common[k].0].id)
            .collect();

        let mut ops: Vec<DiffOp> = self
            .nodes
            .iter()
            .filter(|n| !kept.contains(&n.id))
            .map(|n| DiffOp::Remove {
                id: n.id,
                tier: n.tier,
            })
            .collect();
        ops.extend(
            next.nodes
                .iter()
                .enumerate()
                .filter(|(_, n)| !kept.contains(&n.id))
                .map(|(i, n)| DiffOp::Insert {
                    id: n.id,
                    tier: n.tier,
                    parent: n.parent,
                    after: i.checked_sub(1).map(|p| next.nodes[p].id),
                }),
        );
        ProjectionDiff { ops }
    }
}

/// Indices (into `seq`) of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<usize> {
    // tails[k]: index in seq of the smallest tail of an increasing run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &v) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < v);
        prev[i] = k.checked_sub(1).map(|p| tails[p]);
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }
    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

/// Single structural change delivered to the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    /// Show `id` right after `after` (`None`: at the top).
    Insert {
        id: NodeId,
        tier: Tier,
        parent: Option<NodeId>,
        after: Option<NodeId>,
    },
    Remove {
        id: NodeId,
        tier: Tier,
    },
}

impl DiffOp {
    pub fn id(&self) -> NodeId {
        match self {
            DiffOp::Insert { id, .. } | DiffOp::Remove { id, .. } => *id,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            DiffOp::Insert { tier, .. } | DiffOp::Remove { tier, .. } => *tier,
        }
    }
}

/// Ordered operations between two successive projections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionDiff {
    ops: Vec<DiffOp>,
}

impl ProjectionDiff {
    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn inserted(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DiffOp::Insert { id, .. } => Some(*id),
            DiffOp::Remove { .. } => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DiffOp::Remove { id, .. } => Some(*id),
            DiffOp::Insert { .. } => None,
        })
    }

    pub fn removes(&self, id: NodeId) -> bool {
        self.removed().any(|r| r == id)
    }

    /// Replay the diff on the previous identity list.
    pub fn apply(&self, previous: &[NodeId]) -> Vec<NodeId> {
        let mut rows = previous.to_vec();
        for op in &self.ops {
            match *op {
                DiffOp::Remove { id, .. } => rows.retain(|&r| r != id),
                DiffOp::Insert { id, after, .. } => {
                    let at = after
                        .and_then(|a| rows.iter().position(|&r| r == a))
                        .map_or(0, |p| p + 1);
                    rows.insert(at, id);
                }
            }
        }
        rows
    }
}
