//! Events delivered by the control channel.

use corelib::{MigrationType, NodeAddress};
use serde::{Deserialize, Serialize};

/// One instruction from the cluster coordinator.
///
/// Delivery may repeat; range notifications in particular are safe to
/// redeliver because the locator ignores ones it has already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlEvent {
    /// Nodes attached to or detached from the live topology.
    Topology {
        #[serde(default)]
        attach: Vec<NodeAddress>,
        #[serde(default)]
        detach: Vec<NodeAddress>,
    },
    /// A migration is starting.
    PrepareMigration {
        kind: MigrationType,
        nodes: Vec<NodeAddress>,
    },
    /// The cluster committed migration progress up to this range.
    RangeApplied { spoint: u32, epoint: u32 },
    /// Alter nodes failed or were withdrawn.
    AlterChange {
        #[serde(default)]
        attach: Vec<NodeAddress>,
        #[serde(default)]
        detach: Vec<NodeAddress>,
    },
}

impl ControlEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ControlEvent::Topology { .. } => "topology",
            ControlEvent::PrepareMigration { .. } => "prepare_migration",
            ControlEvent::RangeApplied { .. } => "range_applied",
            ControlEvent::AlterChange { .. } => "alter_change",
        }
    }
}
