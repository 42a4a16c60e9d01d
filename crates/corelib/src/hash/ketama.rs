//! MD5-based ketama hashing.

use crate::hash::traits::{point_from_digest, HashAlgorithm};

/// Classic ketama: MD5 digests, keys hashed to the digest's first word.
///
/// This is the default because memcached clients across languages agree on
/// it, so mixed client fleets see the same ring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KetamaHash;

impl HashAlgorithm for KetamaHash {
    fn hash(&self, key: &str) -> u32 {
        point_from_digest(&self.digest(key), 0)
    }

    fn digest(&self, input: &str) -> [u8; 16] {
        md5::compute(input.as_bytes()).0
    }

    fn name(&self) -> &'static str {
        "KetamaHash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        // md5("")  = d41d8cd98f00b204e9800998ecf8427e
        // md5("a") = 0cc175b9c0f1b6a831c399e269772661
        assert_eq!(KetamaHash.hash(""), 0xd98c_1dd4);
        assert_eq!(KetamaHash.hash("a"), 0xb975_c10c);
    }

    #[test]
    fn test_hash_matches_first_digest_word() {
        let digest = KetamaHash.digest("some-key");
        assert_eq!(KetamaHash.hash("some-key"), point_from_digest(&digest, 0));
    }
}
