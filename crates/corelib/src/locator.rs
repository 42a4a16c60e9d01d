//! Key-to-node resolution with live migration support.
//!
//! [`KetamaLocator`] owns the live ring, the active node set and the
//! migration state. It has no internal locking: mutation takes `&mut self`
//! and is expected to come from one control path at a time, while readers
//! work on an immutable copy (see the `control` crate's topology manager).

use std::collections::{BTreeSet, HashSet};

use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::config::LocatorConfig;
use crate::error::{Error, Result};
use crate::hash::{HashAlgorithm, KetamaHash};
use crate::migration::{MigrationState, MigrationType};
use crate::node::NodeAddress;
use crate::ring::{node_points, Ring};
use crate::sequence::KeySequence;

/// Ketama node locator.
#[derive(Debug, Clone)]
pub struct KetamaLocator<H: HashAlgorithm = KetamaHash> {
    ring: Ring,
    nodes: BTreeSet<NodeAddress>,
    migration: MigrationState,
    config: LocatorConfig,
    hasher: H,
}

impl KetamaLocator<KetamaHash> {
    /// Locator with MD5 ketama hashing and the default configuration.
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        Self::build(nodes, LocatorConfig::default(), KetamaHash)
    }

    pub fn with_config<I>(nodes: I, config: LocatorConfig) -> Result<Self>
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        Self::with_hasher(nodes, config, KetamaHash)
    }
}

impl<H: HashAlgorithm> KetamaLocator<H> {
    pub fn with_hasher<I>(nodes: I, config: LocatorConfig, hasher: H) -> Result<Self>
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        config.validate()?;
        Ok(Self::build(nodes, config, hasher))
    }

    fn build<I>(nodes: I, config: LocatorConfig, hasher: H) -> Self
    where
        I: IntoIterator<Item = NodeAddress>,
    {
        let mut locator = Self {
            ring: Ring::new(),
            nodes: BTreeSet::new(),
            migration: MigrationState::default(),
            config,
            hasher,
        };
        for node in nodes {
            locator.insert_hash(&node);
            locator.nodes.insert(node);
        }
        locator
    }

    // ------------------------------------------------------------------
    // Request path
    // ------------------------------------------------------------------

    /// Node owning `key`, or `None` if the ring is empty.
    pub fn primary(&self, key: &str) -> Option<&NodeAddress> {
        self.ring.owner(self.hasher.hash(key))
    }

    /// Failover candidates for `key`, at most one per active node.
    pub fn sequence<'a>(&'a self, key: &'a str) -> KeySequence<'a, H> {
        KeySequence::new(&self.ring, &self.hasher, key, self.nodes.len())
    }

    /// Active nodes.
    pub fn all(&self) -> &BTreeSet<NodeAddress> {
        &self.nodes
    }

    /// Independent locator rebuilt from the active nodes.
    ///
    /// Points are recomputed from scratch and migration state is not
    /// carried over, so the copy reflects the steady-state ring of the
    /// current members.
    pub fn snapshot(&self) -> Self {
        Self::build(self.nodes.iter().cloned(), self.config.clone(), self.hasher.clone())
    }

    // ------------------------------------------------------------------
    // Topology updates
    // ------------------------------------------------------------------

    /// Attach and detach nodes.
    ///
    /// Finishes the running migration once no alter node is left.
    pub fn update(&mut self, to_attach: &[NodeAddress], to_delete: &[NodeAddress]) -> Result<()> {
        for node in to_attach {
            // Re-attaching an active node is harmless on the ring, and for a
            // leaving alter node it restores the ranges already handed off.
            self.nodes.insert(node.clone());
            self.insert_hash(node);
        }
        for node in to_delete {
            // A joining node is not active yet but may already serve swept ranges.
            let joining = self.migration.in_progress() && self.migration.alter.contains(node);
            if !self.nodes.remove(node) && !joining {
                warn!(%node, "detach of inactive node ignored");
                continue;
            }
            self.remove_hash(node)?;
        }

        self.finish_migration_if_done();
        gauge!("locator_ring_points").set(self.ring.len() as f64);
        Ok(())
    }

    fn insert_hash(&mut self, node: &NodeAddress) {
        let points = self.points(node);

        if self.migration.in_progress() && self.migration.alter.remove(node) {
            let promoted = self.migration.promote(&mut self.ring, node, &points);
            info!(%node, promoted, "alter node attached; remaining staged points promoted");
            return;
        }

        for &point in &points {
            self.ring.insert(point, node.clone());
        }
        debug!(%node, points = points.len(), "inserted node into ring");
    }

    fn remove_hash(&mut self, node: &NodeAddress) -> Result<()> {
        let points = self.points(node);

        if self.migration.in_progress() && self.migration.alter.remove(node) {
            if self.migration.kind() == Some(MigrationType::Join) {
                warn!(%node, "joining node detached before migration finished");
            }
            self.migration.purge(&mut self.ring, node, &points)?;
            info!(%node, "alter node detached; its points were purged");
            return Ok(());
        }

        let mut missing = 0usize;
        for &point in &points {
            if !self.ring.remove(point, node) {
                missing += 1;
            }
        }
        if missing > 0 {
            return Err(Error::Invariant(format!(
                "{} of {} points of {} were not in the ring",
                missing,
                points.len(),
                node
            )));
        }
        debug!(%node, points = points.len(), "removed node from ring");
        Ok(())
    }

    fn finish_migration_if_done(&mut self) {
        let Some(kind) = self.migration.kind() else {
            return;
        };
        if self.migration.alter.is_empty() {
            info!(%kind, "migration has been finished");
            counter!("locator_migrations_finished_total", "kind" => kind.as_str()).increment(1);
            self.migration.clear();
        }
    }

    // ------------------------------------------------------------------
    // Migration
    // ------------------------------------------------------------------

    /// Start a migration, discarding any previous migration state.
    ///
    /// JOIN stages the alter nodes' points without making them visible.
    /// LEAVE keeps the alter nodes serving until their ranges are cut over.
    pub fn prepare_migration(&mut self, alter_nodes: &[NodeAddress], kind: MigrationType) {
        info!(%kind, alter = alter_nodes.len(), "preparing ketama ring for migration");
        self.migration.begin(kind);

        match kind {
            MigrationType::Join => {
                for node in alter_nodes {
                    if self.nodes.contains(node) {
                        warn!(%node, "joining node is already active; not staged");
                        continue;
                    }
                    let points = self.points(node);
                    self.migration.stage(node, &points);
                    self.migration.alter.insert(node.clone());
                }
                self.migration.existing.extend(self.nodes.iter().cloned());
            }
            MigrationType::Leave => {
                self.migration.alter.extend(alter_nodes.iter().cloned());
                let alter = &self.migration.alter;
                let existing: Vec<NodeAddress> = self
                    .nodes
                    .iter()
                    .filter(|node| !alter.contains(*node))
                    .cloned()
                    .collect();
                self.migration.existing.extend(existing);
            }
        }
    }

    /// Apply a committed range boundary. Returns false if it was ignored
    /// (no migration, `(0, 0)`, or stale/duplicate).
    pub fn update_migration(&mut self, spoint: u32, epoint: u32) -> bool {
        self.migration.apply_range(&mut self.ring, spoint, epoint)
    }

    /// Drop alter nodes that failed or were withdrawn mid-migration.
    ///
    /// Newly reported alter nodes in `to_attach` are not picked up here;
    /// they arrive through a fresh `prepare_migration`.
    pub fn update_alter(&mut self, to_attach: &[NodeAddress], to_delete: &[NodeAddress]) -> Result<()> {
        if !to_attach.is_empty() {
            debug!(count = to_attach.len(), "alter attach notifications ignored");
        }
        for node in to_delete {
            if !self.migration.alter.remove(node) {
                debug!(%node, "not an alter node");
                continue;
            }
            let points = self.points(node);
            self.migration.purge(&mut self.ring, node, &points)?;
            // A purged leaving node has no points left anywhere. Keeping it
            // active would count it in the failover length and make the
            // later topology detach fail on points it no longer owns.
            if self.migration.kind() == Some(MigrationType::Leave) {
                self.nodes.remove(node);
            }
            info!(%node, "alter node removed from migration");
        }

        self.finish_migration_if_done();
        Ok(())
    }

    pub fn alter_all(&self) -> &HashSet<NodeAddress> {
        &self.migration.alter
    }

    pub fn alter_node(&self, addr: &NodeAddress) -> Option<&NodeAddress> {
        self.migration.alter.get(addr)
    }

    /// The node named `owner` (`host:port`) taking part in a migration of
    /// `kind`: a joining node for JOIN, a remaining node for LEAVE.
    pub fn owner_node(&self, owner: &str, kind: MigrationType) -> Result<Option<&NodeAddress>> {
        let addr = NodeAddress::parse(owner)?;
        let candidates = match kind {
            MigrationType::Join => &self.migration.alter,
            MigrationType::Leave => &self.migration.existing,
        };
        Ok(candidates.get(&addr))
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn migration(&self) -> &MigrationState {
        &self.migration
    }

    /// Ring points `node` owns when fully placed.
    pub fn points(&self, node: &NodeAddress) -> Vec<u32> {
        node_points(&self.hasher, &self.config, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(list: &str) -> Vec<NodeAddress> {
        NodeAddress::parse_list(list).unwrap()
    }

    #[test]
    fn test_build_places_all_points() {
        let locator = KetamaLocator::new(addrs("a:1,b:1"));
        for node in locator.all() {
            let points = locator.points(node);
            assert!(points.iter().all(|&p| locator.ring().contains(p, node)));
        }
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = LocatorConfig {
            node_repetitions: 10,
        };
        assert!(KetamaLocator::with_config(addrs("a:1"), config).is_err());
    }

    #[test]
    fn test_detach_unknown_node_is_ignored() {
        let mut locator = KetamaLocator::new(addrs("a:1"));
        let before = locator.ring().clone();
        locator.update(&[], &addrs("zzz:1")).unwrap();
        assert_eq!(locator.ring(), &before);
    }

    #[test]
    fn test_owner_node_lookup() {
        let mut locator = KetamaLocator::new(addrs("a:1,b:1"));
        locator.prepare_migration(&addrs("c:1"), MigrationType::Join);

        assert_eq!(
            locator.owner_node("c:1", MigrationType::Join).unwrap(),
            Some(&addrs("c:1")[0])
        );
        assert_eq!(locator.owner_node("a:1", MigrationType::Join).unwrap(), None);
        assert!(locator.owner_node("garbage", MigrationType::Join).is_err());

        locator.prepare_migration(&addrs("b:1"), MigrationType::Leave);
        assert!(locator.owner_node("a:1", MigrationType::Leave).unwrap().is_some());
        assert!(locator.owner_node("b:1", MigrationType::Leave).unwrap().is_none());
    }

    #[test]
    fn test_range_without_migration_is_ignored() {
        let mut locator = KetamaLocator::new(addrs("a:1"));
        assert!(!locator.update_migration(10, 20));
    }
}
