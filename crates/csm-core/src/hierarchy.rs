//! Rigid-part hierarchy and its top-down traversal order.
//!
//! Parts are stored as an arena indexed by part id. Each part has at most one
//! parent; parts without a parent are roots. The hierarchy must be a forest:
//! every part reaches a root by repeated parent lookup.
//!
//! [`build_order`] produces the breadth-first traversal used by the kinematic
//! composer. Every part appears after its parent, so a single ordered pass can
//! resolve global transforms from local ones.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors describing a malformed part hierarchy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The parent map has no entries.
    #[error("part hierarchy is empty")]
    Empty,
    /// A parent id is neither the sentinel nor a valid part id.
    #[error("part {part} has parent {parent}, but only {num_parts} parts exist")]
    ParentOutOfRange {
        part: usize,
        parent: i64,
        num_parts: usize,
    },
    /// The parent relation loops back on itself.
    ///
    /// With every parent in range this is the only way a part can miss
    /// every root.
    #[error("parent relation contains a cycle through parts {parts:?}")]
    Cycle { parts: Vec<usize> },
}

/// Mapping from part id to parent part id (`None` for roots).
///
/// Serialized as an integer array where `-1` marks a root, matching how
/// category mean-shape configurations store the relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct ParentMap(Vec<Option<usize>>);

impl ParentMap {
    /// Sentinel used in the integer encoding for "no parent".
    pub const NO_PARENT: i64 = -1;

    /// Build from explicit parent ids, checking that every parent is in range.
    pub fn new(parents: Vec<Option<usize>>) -> Result<Self, HierarchyError> {
        let n = parents.len();
        for (part, parent) in parents.iter().enumerate() {
            if let Some(p) = *parent {
                if p >= n {
                    return Err(HierarchyError::ParentOutOfRange {
                        part,
                        parent: p as i64,
                        num_parts: n,
                    });
                }
            }
        }
        Ok(Self(parents))
    }

    /// Build from the integer encoding (`-1` = root).
    pub fn from_sentinel(parents: &[i64]) -> Result<Self, HierarchyError> {
        let n = parents.len();
        let mut out = Vec::with_capacity(n);
        for (part, &parent) in parents.iter().enumerate() {
            if parent == Self::NO_PARENT {
                out.push(None);
            } else if parent >= 0 && (parent as usize) < n {
                out.push(Some(parent as usize));
            } else {
                return Err(HierarchyError::ParentOutOfRange {
                    part,
                    parent,
                    num_parts: n,
                });
            }
        }
        Ok(Self(out))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn parent(&self, part: usize) -> Option<usize> {
        self.0[part]
    }

    #[inline]
    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.0
    }

    /// Root parts in ascending id order.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.len()).filter(|&k| self.0[k].is_none()).collect()
    }
}

impl TryFrom<Vec<i64>> for ParentMap {
    type Error = HierarchyError;

    fn try_from(value: Vec<i64>) -> Result<Self, Self::Error> {
        ParentMap::from_sentinel(&value)
    }
}

impl From<ParentMap> for Vec<i64> {
    fn from(map: ParentMap) -> Self {
        map.0
            .into_iter()
            .map(|p| p.map_or(ParentMap::NO_PARENT, |p| p as i64))
            .collect()
    }
}

/// Compute a top-down traversal order of the parts in `parents`.
///
/// Roots come first in ascending id order. The frontier is then expanded
/// breadth-first: for each fixed part, all of its children (ascending id) are
/// appended. Fails if any part is not reachable from a root, which for an
/// in-range parent map means it sits on a cycle.
pub fn build_order(parents: &ParentMap) -> Result<Vec<usize>, HierarchyError> {
    let n = parents.len();
    if n == 0 {
        return Err(HierarchyError::Empty);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for part in 0..n {
        if let Some(p) = parents.parent(part) {
            children[p].push(part);
        }
    }

    let mut order = parents.roots();
    let mut head = 0;
    while head < order.len() {
        let fixed = order[head];
        order.extend_from_slice(&children[fixed]);
        head += 1;
    }

    let mut placed = vec![false; n];
    for &k in &order {
        placed[k] = true;
    }
    if let Some(first) = placed.iter().position(|&p| !p) {
        return Err(HierarchyError::Cycle {
            parts: find_cycle(parents, first),
        });
    }

    Ok(order)
}

/// Sorted parts of the loop reached from `start` by following parent links.
///
/// `start` must be a part the breadth-first pass left unplaced: none of its
/// ancestors is a root, so after `n` steps the walk is inside the loop.
fn find_cycle(parents: &ParentMap, start: usize) -> Vec<usize> {
    let step = |k: usize| parents.parent(k).unwrap_or(k);
    let mut cur = start;
    for _ in 0..parents.len() {
        cur = step(cur);
    }
    let mut cycle = vec![cur];
    let mut next = step(cur);
    while next != cur {
        cycle.push(next);
        next = step(next);
    }
    cycle.sort_unstable();
    cycle
}

/// Validated part hierarchy with its cached traversal order.
///
/// The order is computed once at construction and shared immutably; a changed
/// hierarchy is a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartHierarchy {
    parents: ParentMap,
    order: Arc<[usize]>,
    depth: Vec<usize>,
}

impl PartHierarchy {
    /// Validate `parents` and precompute the traversal order.
    pub fn new(parents: ParentMap) -> Result<Self, HierarchyError> {
        let order = build_order(&parents)?;
        let mut depth = vec![0usize; parents.len()];
        for &k in &order {
            if let Some(p) = parents.parent(k) {
                depth[k] = depth[p] + 1;
            }
        }
        Ok(Self {
            parents,
            order: order.into(),
            depth,
        })
    }

    /// Build from the `-1`-sentinel integer encoding.
    pub fn from_sentinel(parents: &[i64]) -> Result<Self, HierarchyError> {
        Self::new(ParentMap::from_sentinel(parents)?)
    }

    #[inline]
    pub fn num_parts(&self) -> usize {
        self.parents.len()
    }

    #[inline]
    pub fn parent(&self, part: usize) -> Option<usize> {
        self.parents.parent(part)
    }

    #[inline]
    pub fn parents(&self) -> &ParentMap {
        &self.parents
    }

    /// Parent-before-child traversal order.
    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Shared handle to the traversal order.
    pub fn shared_order(&self) -> Arc<[usize]> {
        Arc::clone(&self.order)
    }

    pub fn roots(&self) -> Vec<usize> {
        self.parents.roots()
    }

    /// Direct children of `part` in ascending id order.
    pub fn children(&self, part: usize) -> Vec<usize> {
        (0..self.num_parts())
            .filter(|&k| self.parents.parent(k) == Some(part))
            .collect()
    }

    /// Number of edges between `part` and its root.
    #[inline]
    pub fn depth(&self, part: usize) -> usize {
        self.depth[part]
    }

    /// Chain of part ids from the root down to `part` (inclusive).
    pub fn ancestors(&self, part: usize) -> Vec<usize> {
        let mut chain = Vec::with_capacity(self.depth[part] + 1);
        let mut cur = Some(part);
        while let Some(k) = cur {
            chain.push(k);
            cur = self.parents.parent(k);
        }
        chain.reverse();
        chain
    }
}
