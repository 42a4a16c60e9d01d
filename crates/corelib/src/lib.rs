//! Core library for the ketama node locator.
//!
//! This crate provides:
//! - Hash algorithms placing keys and nodes on a 32-bit ring
//! - Node addresses and locator configuration
//! - The ring itself (point map with wrapping ceiling lookup)
//! - The migration state machine for live JOIN/LEAVE range transfer
//! - The locator composing them, and the per-key failover sequence

pub mod config;
pub mod error;
pub mod hash;
pub mod locator;
pub mod migration;
pub mod node;
pub mod ring;
pub mod sequence;

pub use config::LocatorConfig;
pub use error::{Error, Result};
pub use hash::{HashAlgorithm, KetamaHash, Xxh3Hash};
pub use locator::KetamaLocator;
pub use migration::{MigrationState, MigrationType};
pub use node::NodeAddress;
pub use ring::{Cursor, Ring};
pub use sequence::KeySequence;
