//! Live migration of hash ranges between the ring and a staging ring.
//!
//! # Protocol
//!
//! A migration starts with `prepare` (JOIN or LEAVE, plus the alter nodes)
//! and advances through range notifications `(spoint, epoint)` sent by the
//! cluster as it commits data transfer. The cursor only moves one way
//! around the circle:
//!
//! - **JOIN** sweeps clockwise. Staged points of joining nodes in
//!   `(cursor, epoint]` move into the live ring, then the cursor is `epoint`.
//! - **LEAVE** sweeps counter-clockwise. Leaving owners at live points in
//!   `(spoint, cursor]` move into staging, then the cursor is `spoint`.
//!
//! A range that crosses `u32::MAX` is split into the tail up to the maximum
//! and the head from zero. Notifications are cumulative from the base
//! point, so redelivered or stale ones fail [`MigrationState::needs_range`]
//! and are dropped without touching either ring.

use std::collections::HashSet;
use std::fmt;
use std::ops::Bound::{self, Excluded, Included};
use std::str::FromStr;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::node::NodeAddress;
use crate::ring::{Cursor, Ring, MAX_POINT, MIN_POINT};

type PointRange = (Bound<u32>, Bound<u32>);

/// Direction of a migration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationType {
    /// Nodes are being added.
    Join,
    /// Nodes are being removed.
    Leave,
}

impl MigrationType {
    pub fn as_str(self) -> &'static str {
        match self {
            MigrationType::Join => "join",
            MigrationType::Leave => "leave",
        }
    }
}

impl fmt::Display for MigrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "join" => Ok(MigrationType::Join),
            "leave" => Ok(MigrationType::Leave),
            other => Err(Error::InvalidConfig(format!("unknown migration type '{}'", other))),
        }
    }
}

/// Bookkeeping for the migration in progress, if any.
///
/// While a migration runs, each point of an alter node lives in exactly one
/// of the live ring and [`staging`](Self::staging).
#[derive(Debug, Clone, Default)]
pub struct MigrationState {
    pub(crate) kind: Option<MigrationType>,
    pub(crate) base: Cursor,
    pub(crate) last: Cursor,
    pub(crate) alter: HashSet<NodeAddress>,
    pub(crate) existing: HashSet<NodeAddress>,
    pub(crate) staging: Ring,
}

impl MigrationState {
    /// `None` when no migration is running.
    pub fn kind(&self) -> Option<MigrationType> {
        self.kind
    }

    pub fn in_progress(&self) -> bool {
        self.kind.is_some()
    }

    /// Where the sweep began.
    pub fn base(&self) -> Cursor {
        self.base
    }

    /// Last boundary applied.
    pub fn last(&self) -> Cursor {
        self.last
    }

    /// Nodes joining or leaving.
    pub fn alter(&self) -> &HashSet<NodeAddress> {
        &self.alter
    }

    /// Nodes that stay in the cluster for the whole migration.
    pub fn existing(&self) -> &HashSet<NodeAddress> {
        &self.existing
    }

    /// Points not (yet) served from the live ring.
    pub fn staging(&self) -> &Ring {
        &self.staging
    }

    pub(crate) fn clear(&mut self) {
        self.kind = None;
        self.base = Cursor::Unset;
        self.last = Cursor::Unset;
        self.alter.clear();
        self.existing.clear();
        self.staging.clear();
    }

    pub(crate) fn begin(&mut self, kind: MigrationType) {
        self.clear();
        self.kind = Some(kind);
    }

    /// Whether `(spoint, epoint)` moves the cursor forward.
    ///
    /// `(0, 0)` is never a range. Any other `spoint == epoint` is the full
    /// circle, accepted once per distinct point.
    pub fn needs_range(&self, spoint: u32, epoint: u32) -> bool {
        if spoint == 0 && epoint == 0 {
            return false;
        }
        let Some(last) = self.last.point() else {
            return true;
        };
        if spoint == epoint {
            return spoint != last;
        }
        if spoint < epoint {
            spoint < last && last < epoint
        } else {
            spoint < last || last < epoint
        }
    }

    /// Apply a range notification. Returns false if it was ignored.
    pub(crate) fn apply_range(&mut self, ring: &mut Ring, spoint: u32, epoint: u32) -> bool {
        let Some(kind) = self.kind else {
            debug!(spoint, epoint, "no migration in progress; range ignored");
            return false;
        };
        if !self.needs_range(spoint, epoint) {
            debug!(%kind, spoint, epoint, last = ?self.last, "stale migration range ignored");
            counter!("locator_migration_ranges_total", "kind" => kind.as_str(), "outcome" => "ignored")
                .increment(1);
            return false;
        }

        match kind {
            MigrationType::Join => self.apply_join(ring, spoint, epoint),
            MigrationType::Leave => self.apply_leave(ring, spoint, epoint),
        }
        counter!("locator_migration_ranges_total", "kind" => kind.as_str(), "outcome" => "applied")
            .increment(1);
        true
    }

    fn apply_join(&mut self, ring: &mut Ring, spoint: u32, epoint: u32) {
        let start = match self.last {
            Cursor::Unset => {
                self.base = Cursor::At(spoint);
                spoint
            }
            Cursor::At(last) => last,
        };

        let moved = if start < epoint {
            self.move_staged_into(ring, (Excluded(start), Included(epoint)))
        } else {
            self.move_staged_into(ring, (Excluded(start), Included(MAX_POINT)))
                + self.move_staged_into(ring, (Included(MIN_POINT), Included(epoint)))
        };

        self.last = Cursor::At(epoint);
        info!(start, epoint, moved, "applied JOIN range");
    }

    fn apply_leave(&mut self, ring: &mut Ring, spoint: u32, epoint: u32) {
        let end = match self.last {
            Cursor::Unset => {
                self.base = Cursor::At(epoint);
                epoint
            }
            Cursor::At(last) => last,
        };

        let moved = if spoint < end {
            self.move_leaving_out_of(ring, (Excluded(spoint), Included(end)))
        } else {
            self.move_leaving_out_of(ring, (Included(MIN_POINT), Included(end)))
                + self.move_leaving_out_of(ring, (Excluded(spoint), Included(MAX_POINT)))
        };

        self.last = Cursor::At(spoint);
        info!(spoint, end, moved, "applied LEAVE range");
    }

    /// Staged points in `range` join the live ring.
    fn move_staged_into(&mut self, ring: &mut Ring, range: PointRange) -> usize {
        let staged = self.staging.take_range(range);
        let moved = staged.len();
        for (point, owners) in staged {
            ring.merge(point, owners);
        }
        moved
    }

    /// Leaving owners of live points in `range` go to staging.
    fn move_leaving_out_of(&mut self, ring: &mut Ring, range: PointRange) -> usize {
        let existing = &self.existing;
        let taken = ring.take_owners_in_range(range, |node| existing.contains(node));
        let moved = taken.len();
        for (point, node) in taken {
            self.staging.insert(point, node);
        }
        moved
    }

    /// Put a joining node's points in staging.
    pub(crate) fn stage(&mut self, node: &NodeAddress, points: &[u32]) {
        for &point in points {
            self.staging.insert(point, node.clone());
        }
    }

    /// Move whatever is still staged for `node` into the live ring.
    pub(crate) fn promote(&mut self, ring: &mut Ring, node: &NodeAddress, points: &[u32]) -> usize {
        let mut promoted = 0;
        for &point in points {
            if self.staging.remove(point, node) {
                ring.insert(point, node.clone());
                promoted += 1;
            }
        }
        promoted
    }

    /// Drop every point of an alter node, staged or live.
    pub(crate) fn purge(&mut self, ring: &mut Ring, node: &NodeAddress, points: &[u32]) -> Result<()> {
        let mut missing = 0usize;
        for &point in points {
            if !self.staging.remove(point, node) && !ring.remove(point, node) {
                missing += 1;
            }
        }
        if missing > 0 {
            return Err(Error::Invariant(format!(
                "{} of {} points of alter node {} found in neither ring",
                missing,
                points.len(),
                node
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(last: Cursor) -> MigrationState {
        MigrationState {
            kind: Some(MigrationType::Join),
            last,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_range_is_noop() {
        assert!(!state_at(Cursor::Unset).needs_range(0, 0));
        assert!(!state_at(Cursor::At(5)).needs_range(0, 0));
    }

    #[test]
    fn test_first_range_always_accepted() {
        let state = state_at(Cursor::Unset);
        assert!(state.needs_range(10, 20));
        assert!(state.needs_range(20, 10));
        assert!(state.needs_range(7, 7));
    }

    #[test]
    fn test_full_circle_once_per_point() {
        let state = state_at(Cursor::At(7));
        assert!(!state.needs_range(7, 7));
        assert!(state.needs_range(8, 8));
    }

    #[test]
    fn test_forward_range_needs_cursor_inside() {
        let state = state_at(Cursor::At(100));
        assert!(state.needs_range(50, 200));
        // Cursor on a boundary is not strictly inside.
        assert!(!state.needs_range(100, 200));
        assert!(!state.needs_range(50, 100));
        assert!(!state.needs_range(150, 200));
    }

    #[test]
    fn test_wrapped_range() {
        let state = state_at(Cursor::At(50));
        assert!(state.needs_range(4_000_000_000, 100));
        assert!(!state.needs_range(4_000_000_000, 50));

        let state = state_at(Cursor::At(4_100_000_000));
        assert!(state.needs_range(4_000_000_000, 100));
        assert!(!state.needs_range(4_200_000_000, 100));
    }

    #[test]
    fn test_migration_type_parse() {
        assert_eq!("JOIN".parse::<MigrationType>().unwrap(), MigrationType::Join);
        assert_eq!("leave".parse::<MigrationType>().unwrap(), MigrationType::Leave);
        assert!("unknown".parse::<MigrationType>().is_err());
    }

    #[test]
    fn test_begin_resets_state() {
        let mut state = state_at(Cursor::At(3));
        state.base = Cursor::At(1);
        state.staging.insert(1, NodeAddress::parse("a:1").unwrap());

        state.begin(MigrationType::Leave);

        assert_eq!(state.kind(), Some(MigrationType::Leave));
        assert_eq!(state.last(), Cursor::Unset);
        assert_eq!(state.base(), Cursor::Unset);
        assert!(state.staging().is_empty());
    }
}
