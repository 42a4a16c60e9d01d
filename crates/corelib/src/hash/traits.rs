//! Core hash algorithm trait definitions.

use std::fmt::Debug;

/// A hash algorithm places keys and node points on the ring.
///
/// Algorithms are stateless and thread-safe, so one instance can be shared
/// by every locator copy without synchronization.
pub trait HashAlgorithm: Clone + Debug + Send + Sync + 'static {
    /// 32-bit ring position of a key.
    fn hash(&self, key: &str) -> u32;

    /// 128-bit digest used to derive four ring points at a time.
    fn digest(&self, input: &str) -> [u8; 16];

    /// Returns the name of this algorithm.
    fn name(&self) -> &'static str;
}

/// Read the `h`-th little-endian 32-bit word out of a digest.
///
/// `h` must be in `0..4`.
#[inline]
pub fn point_from_digest(digest: &[u8; 16], h: usize) -> u32 {
    let off = h * 4;
    u32::from(digest[off + 3]) << 24
        | u32::from(digest[off + 2]) << 16
        | u32::from(digest[off + 1]) << 8
        | u32::from(digest[off])
}

/// Fold a 64-bit hash into 32 bits by xoring its halves.
#[inline]
pub fn fold64(value: u64) -> u32 {
    (value ^ (value >> 32)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_digest_little_endian() {
        let mut digest = [0u8; 16];
        digest[4..8].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(point_from_digest(&digest, 0), 0);
        assert_eq!(point_from_digest(&digest, 1), 0x1234_5678);
    }

    #[test]
    fn test_fold64() {
        assert_eq!(fold64(0xdead_beef), 0xdead_beef);
        assert_eq!(fold64(0x0000_0001_0000_0001), 0);
        assert_eq!(fold64(0xffff_0000_0000_ffff), 0xffff_ffff);
    }
}
