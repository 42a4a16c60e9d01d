//! Control-channel plumbing for the ketama locator.
//!
//! This crate provides:
//! - Typed control events (topology, migration prepare/range, alter churn)
//! - A bincode codec for events arriving as byte frames
//! - A topology manager serialising writers and publishing snapshots
//! - An async loop feeding events from a source into the manager

pub mod codec;
pub mod error;
pub mod event;
pub mod manager;
pub mod source;

pub use error::ControlError;
pub use event::ControlEvent;
pub use manager::TopologyManager;
pub use source::{run_control_loop, ControlSource, FrameSource, LoopStats};
