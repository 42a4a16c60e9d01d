//! Ketama hash ring.
//!
//! The ring maps 32-bit points to the nodes that own them and answers
//! "who owns this hash" with a clockwise ceiling lookup that wraps past the
//! maximum point back to the minimum.

pub mod position;
pub mod ring;

pub use position::{node_points, Cursor, MAX_POINT, MIN_POINT};
pub use ring::{OwnerSet, Ring};
