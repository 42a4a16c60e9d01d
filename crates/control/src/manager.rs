//! Single-writer topology manager.
//!
//! Writers take the mutex, mutate the locator, then publish a full copy
//! behind an `Arc`. Readers grab the current `Arc` and resolve keys on it
//! without waiting for writers; an old copy stays valid for as long as a
//! reader holds it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use corelib::{HashAlgorithm, KetamaHash, KetamaLocator, NodeAddress};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error};

use crate::error::ControlError;
use crate::event::ControlEvent;

/// Owns the writable locator and the snapshot readers see.
pub struct TopologyManager<H: HashAlgorithm = KetamaHash> {
    writer: Mutex<KetamaLocator<H>>,
    published: RwLock<Arc<KetamaLocator<H>>>,
    version: AtomicU64,
}

impl<H: HashAlgorithm> TopologyManager<H> {
    pub fn new(locator: KetamaLocator<H>) -> Self {
        let published = Arc::new(locator.clone());
        Self {
            writer: Mutex::new(locator),
            published: RwLock::new(published),
            version: AtomicU64::new(0),
        }
    }

    /// The locator readers should use right now.
    pub fn current(&self) -> Arc<KetamaLocator<H>> {
        Arc::clone(&self.published.read())
    }

    /// Number of snapshots published since construction.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Primary node for `key` on the current snapshot.
    pub fn resolve(&self, key: &str) -> Option<NodeAddress> {
        self.current().primary(key).cloned()
    }

    /// Apply one event. Returns whether a new snapshot was published.
    ///
    /// On error the last good snapshot stays published.
    pub fn apply(&self, event: &ControlEvent) -> Result<bool, ControlError> {
        let mut locator = self.writer.lock();

        let changed = match event {
            ControlEvent::Topology { attach, detach } => {
                locator.update(attach, detach).map_err(|e| self.report(event, e))?;
                true
            }
            ControlEvent::PrepareMigration { kind, nodes } => {
                locator.prepare_migration(nodes, *kind);
                true
            }
            ControlEvent::RangeApplied { spoint, epoint } => {
                locator.update_migration(*spoint, *epoint)
            }
            ControlEvent::AlterChange { attach, detach } => {
                locator.update_alter(attach, detach).map_err(|e| self.report(event, e))?;
                true
            }
        };

        if changed {
            *self.published.write() = Arc::new(locator.clone());
            let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(event = event.name(), version, "published locator snapshot");
        }
        Ok(changed)
    }

    fn report(&self, event: &ControlEvent, err: corelib::Error) -> ControlError {
        if err.is_fatal() {
            error!(event = event.name(), error = %err, "locator diverged from cluster topology");
        }
        ControlError::Locator(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::MigrationType;

    fn addrs(list: &str) -> Vec<NodeAddress> {
        NodeAddress::parse_list(list).unwrap()
    }

    #[test]
    fn test_readers_keep_old_snapshot() {
        let manager = TopologyManager::new(KetamaLocator::new(addrs("a:1,b:1")));
        let before = manager.current();

        manager
            .apply(&ControlEvent::Topology {
                attach: addrs("c:1"),
                detach: Vec::new(),
            })
            .unwrap();

        assert_eq!(before.all().len(), 2);
        assert_eq!(manager.current().all().len(), 3);
        assert_eq!(manager.version(), 1);
    }

    #[test]
    fn test_ignored_range_does_not_publish() {
        let manager = TopologyManager::new(KetamaLocator::new(addrs("a:1")));
        let published = manager
            .apply(&ControlEvent::RangeApplied { spoint: 1, epoint: 2 })
            .unwrap();
        assert!(!published);
        assert_eq!(manager.version(), 0);
    }

    #[test]
    fn test_snapshot_carries_migration_progress() {
        let manager = TopologyManager::new(KetamaLocator::new(addrs("a:1")));
        manager
            .apply(&ControlEvent::PrepareMigration {
                kind: MigrationType::Join,
                nodes: addrs("b:1"),
            })
            .unwrap();
        assert!(manager
            .apply(&ControlEvent::RangeApplied { spoint: 9, epoint: 9 })
            .unwrap());

        let current = manager.current();
        assert!(current.migration().in_progress());
        assert!(current.migration().staging().is_empty());
        assert!(!current.ring().points_of(&addrs("b:1")[0]).is_empty());
    }

    #[test]
    fn test_resolve_uses_current_snapshot() {
        let manager = TopologyManager::new(KetamaLocator::new(addrs("a:1")));
        assert_eq!(manager.resolve("key"), Some(addrs("a:1")[0].clone()));

        manager
            .apply(&ControlEvent::Topology {
                attach: Vec::new(),
                detach: addrs("a:1"),
            })
            .unwrap();
        assert_eq!(manager.resolve("key"), None);
    }
}
