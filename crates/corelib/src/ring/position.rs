//! Positions on the 32-bit ring and how nodes are placed on it.

use crate::config::{LocatorConfig, POINTS_PER_DIGEST};
use crate::hash::{point_from_digest, HashAlgorithm};
use crate::node::NodeAddress;

/// Smallest point on the ring.
pub const MIN_POINT: u32 = u32::MIN;

/// Largest point on the ring; lookups past it wrap to [`MIN_POINT`].
pub const MAX_POINT: u32 = u32::MAX;

/// A migration sweep position.
///
/// `Unset` means no range has been applied yet. Every `u32` is a real
/// point, so there is no sentinel value inside the point space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Unset,
    At(u32),
}

impl Cursor {
    pub fn point(self) -> Option<u32> {
        match self {
            Cursor::Unset => None,
            Cursor::At(p) => Some(p),
        }
    }
}

/// Compute the ring points of `node`.
///
/// Each digest of `"<host:port>-<i>"` yields four little-endian words, so
/// `node_repetitions` points cost `node_repetitions / 4` digests. The
/// result is sorted and deduplicated; a node whose digests collide on
/// itself owns that point once.
pub fn node_points<H: HashAlgorithm>(
    hasher: &H,
    config: &LocatorConfig,
    node: &NodeAddress,
) -> Vec<u32> {
    let mut points = Vec::with_capacity(config.node_repetitions);
    for i in 0..config.digests_per_node() {
        let digest = hasher.digest(&format!("{}-{}", node, i));
        for h in 0..POINTS_PER_DIGEST {
            points.push(point_from_digest(&digest, h));
        }
    }
    points.sort_unstable();
    points.dedup();
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::KetamaHash;

    #[test]
    fn test_cursor_default_unset() {
        assert_eq!(Cursor::default(), Cursor::Unset);
        assert_eq!(Cursor::Unset.point(), None);
        assert_eq!(Cursor::At(0).point(), Some(0));
        assert_eq!(Cursor::At(MAX_POINT).point(), Some(MAX_POINT));
    }

    #[test]
    fn test_node_points_count_and_determinism() {
        let config = LocatorConfig::default();
        let node = NodeAddress::parse("10.0.0.1:11211").unwrap();

        let first = node_points(&KetamaHash, &config, &node);
        let second = node_points(&KetamaHash, &config, &node);

        assert_eq!(first, second);
        assert_eq!(first.len(), config.node_repetitions);
    }

    #[test]
    fn test_node_points_reuse_digest() {
        let config = LocatorConfig::with_repetitions(4).unwrap();
        let node = NodeAddress::parse("10.0.0.1:11211").unwrap();
        let digest = KetamaHash.digest("10.0.0.1:11211-0");

        let mut expected: Vec<u32> = (0..4).map(|h| point_from_digest(&digest, h)).collect();
        expected.sort_unstable();

        assert_eq!(node_points(&KetamaHash, &config, &node), expected);
    }
}
