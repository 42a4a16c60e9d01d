//! Hash algorithms for the ketama ring.
//!
//! An algorithm turns keys into 32-bit ring positions and node labels into
//! 128-bit digests that are sliced into ring points. Every client sharing a
//! cluster must use the same algorithm or they will disagree on ownership.

pub mod ketama;
pub mod traits;
pub mod xxh3;

pub use ketama::KetamaHash;
pub use traits::{fold64, point_from_digest, HashAlgorithm};
pub use xxh3::Xxh3Hash;
