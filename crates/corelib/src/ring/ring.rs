//! Hash ring data structure.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeBounds;

use crate::node::NodeAddress;
use crate::ring::position::MAX_POINT;

/// Nodes owning one point, ordered by their `host:port` text.
pub type OwnerSet = BTreeSet<NodeAddress>;

/// Ordered map from ring point to the nodes owning it.
///
/// Invariant: no point maps to an empty owner set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ring {
    points: BTreeMap<u32, OwnerSet>,
}

impl Ring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Add `node` to the owners of `point`. Returns false if it was already there.
    pub fn insert(&mut self, point: u32, node: NodeAddress) -> bool {
        self.points.entry(point).or_default().insert(node)
    }

    /// Remove `node` from the owners of `point`, pruning the point if it
    /// empties. Returns false if `node` did not own `point`.
    pub fn remove(&mut self, point: u32, node: &NodeAddress) -> bool {
        let Some(owners) = self.points.get_mut(&point) else {
            return false;
        };
        let removed = owners.remove(node);
        if owners.is_empty() {
            self.points.remove(&point);
        }
        removed
    }

    pub fn contains(&self, point: u32, node: &NodeAddress) -> bool {
        self.points
            .get(&point)
            .map_or(false, |owners| owners.contains(node))
    }

    #[cfg(test)]
    fn owners_at(&self, point: u32) -> Option<&OwnerSet> {
        self.points.get(&point)
    }

    /// Owner of `hash`: the first owner at the smallest point `>= hash`,
    /// wrapping to the smallest point when `hash` is past the last one.
    ///
    /// `None` only when the ring is empty.
    pub fn owner(&self, hash: u32) -> Option<&NodeAddress> {
        self.points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
            .and_then(|(_, owners)| owners.first())
    }

    /// Remove every point in `range` and return it with its owners.
    pub fn take_range<R: RangeBounds<u32>>(&mut self, range: R) -> Vec<(u32, OwnerSet)> {
        let keys: Vec<u32> = self.points.range(range).map(|(point, _)| *point).collect();
        keys.into_iter()
            .filter_map(|point| self.points.remove(&point).map(|owners| (point, owners)))
            .collect()
    }

    /// Remove the owners in `range` for which `keep` is false, leaving
    /// co-located owners that `keep` accepts in place.
    pub fn take_owners_in_range<R, F>(&mut self, range: R, keep: F) -> Vec<(u32, NodeAddress)>
    where
        R: RangeBounds<u32>,
        F: Fn(&NodeAddress) -> bool,
    {
        let mut taken = Vec::new();
        let mut emptied = Vec::new();

        for (point, owners) in self.points.range_mut(range) {
            let leaving: Vec<NodeAddress> =
                owners.iter().filter(|node| !keep(node)).cloned().collect();
            for node in leaving {
                owners.remove(&node);
                taken.push((*point, node));
            }
            if owners.is_empty() {
                emptied.push(*point);
            }
        }

        for point in emptied {
            self.points.remove(&point);
        }
        taken
    }

    /// Union `owners` into the owner set at `point`.
    pub fn merge(&mut self, point: u32, owners: OwnerSet) {
        if owners.is_empty() {
            return;
        }
        self.points.entry(point).or_default().extend(owners);
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &OwnerSet)> + '_ {
        self.points.iter().map(|(point, owners)| (*point, owners))
    }

    /// Points owned (possibly jointly) by `node`. Linear scan.
    pub fn points_of(&self, node: &NodeAddress) -> Vec<u32> {
        self.iter()
            .filter(|(_, owners)| owners.contains(node))
            .map(|(point, _)| point)
            .collect()
    }

    /// Size of the hash space each primary owner answers for.
    ///
    /// A point owns `(previous point, point]`; the first point also owns the
    /// wrapped span past the last point. The values sum to 2^32 for a
    /// non-empty ring.
    pub fn ownership(&self) -> BTreeMap<NodeAddress, u64> {
        let mut shares = BTreeMap::new();
        let (Some((&first, _)), Some((&last, _))) =
            (self.points.iter().next(), self.points.iter().next_back())
        else {
            return shares;
        };

        let mut prev: Option<u32> = None;
        for (&point, owners) in &self.points {
            let span = match prev {
                Some(p) => u64::from(point - p),
                None => u64::from(MAX_POINT - last) + u64::from(first) + 1,
            };
            if let Some(owner) = owners.first() {
                *shares.entry(owner.clone()).or_insert(0) += span;
            }
            prev = Some(point);
        }
        shares
    }
}
