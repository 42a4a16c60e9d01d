//! Failover sequence for a key.

use std::iter::FusedIterator;

use crate::hash::{fold64, HashAlgorithm};
use crate::node::NodeAddress;
use crate::ring::Ring;

/// Candidate nodes for a key, primary first.
///
/// Each step re-hashes `"<attempt><key>"` and adds the folded value to the
/// running hash, so retries for one key hop around the ring instead of
/// walking clockwise into the same neighbour every time. Yields at most one
/// item per active node and stops early only if the ring is empty.
pub struct KeySequence<'a, H: HashAlgorithm> {
    ring: &'a Ring,
    hasher: &'a H,
    key: &'a str,
    hash: u32,
    attempt: usize,
    remaining: usize,
}

impl<'a, H: HashAlgorithm> KeySequence<'a, H> {
    pub(crate) fn new(ring: &'a Ring, hasher: &'a H, key: &'a str, tries: usize) -> Self {
        Self {
            ring,
            hasher,
            key,
            hash: hasher.hash(key),
            attempt: 0,
            remaining: tries,
        }
    }

    fn advance(&mut self) {
        let next = self.hasher.hash(&format!("{}{}", self.attempt, self.key));
        self.attempt += 1;
        self.hash = self.hash.wrapping_add(fold64(u64::from(next)));
        self.remaining -= 1;
    }
}

impl<'a, H: HashAlgorithm> Iterator for KeySequence<'a, H> {
    type Item = &'a NodeAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let Some(node) = self.ring.owner(self.hash) else {
            self.remaining = 0;
            return None;
        };
        self.advance();
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<H: HashAlgorithm> FusedIterator for KeySequence<'_, H> {}
