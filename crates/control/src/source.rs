//! Event sources and the loop driving them into a topology manager.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use corelib::HashAlgorithm;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::codec;
use crate::error::ControlError;
use crate::event::ControlEvent;
use crate::manager::TopologyManager;

/// Anything that yields control events until the channel closes.
#[async_trait]
pub trait ControlSource: Send {
    /// Next event, or `None` once the channel is closed.
    async fn next_event(&mut self) -> Option<ControlEvent>;
}

#[async_trait]
impl ControlSource for mpsc::Receiver<ControlEvent> {
    async fn next_event(&mut self) -> Option<ControlEvent> {
        self.recv().await
    }
}

/// Decodes bincode frames from a byte channel.
///
/// Frames that fail to decode are logged and skipped; the coordinator
/// redelivers state it cares about.
pub struct FrameSource {
    frames: mpsc::Receiver<Bytes>,
    skipped: u64,
}

impl FrameSource {
    pub fn new(frames: mpsc::Receiver<Bytes>) -> Self {
        Self { frames, skipped: 0 }
    }

    /// Frames dropped because they did not decode.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[async_trait]
impl ControlSource for FrameSource {
    async fn next_event(&mut self) -> Option<ControlEvent> {
        while let Some(frame) = self.frames.recv().await {
            match codec::decode(&frame) {
                Ok(event) => return Some(event),
                Err(e) => {
                    self.skipped += 1;
                    warn!(error = %e, len = frame.len(), "dropping undecodable control frame");
                }
            }
        }
        None
    }
}

/// What a finished control loop did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Events that published a new snapshot.
    pub published: u64,
    /// Events that left the locator unchanged.
    pub unchanged: u64,
}

/// Apply events from `source` until it closes.
///
/// Stops early and returns the error if the locator reports an invariant
/// violation; other errors are logged and the loop continues.
pub async fn run_control_loop<H, S>(
    manager: Arc<TopologyManager<H>>,
    mut source: S,
) -> Result<LoopStats, ControlError>
where
    H: HashAlgorithm,
    S: ControlSource,
{
    let mut stats = LoopStats::default();

    while let Some(event) = source.next_event().await {
        match manager.apply(&event) {
            Ok(true) => stats.published += 1,
            Ok(false) => stats.unchanged += 1,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(event = event.name(), error = %e, "control event rejected");
                stats.unchanged += 1;
            }
        }
    }

    info!(
        published = stats.published,
        unchanged = stats.unchanged,
        "control channel closed"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{KetamaLocator, MigrationType, NodeAddress};

    fn addrs(list: &str) -> Vec<NodeAddress> {
        NodeAddress::parse_list(list).unwrap()
    }

    #[tokio::test]
    async fn test_loop_applies_join_migration() {
        let manager = Arc::new(TopologyManager::new(KetamaLocator::new(addrs("a:1,b:1"))));
        let (tx, rx) = mpsc::channel(16);

        let events = vec![
            ControlEvent::PrepareMigration {
                kind: MigrationType::Join,
                nodes: addrs("c:1"),
            },
            ControlEvent::RangeApplied { spoint: 10, epoint: 2_000_000_000 },
            // Redelivered.
            ControlEvent::RangeApplied { spoint: 10, epoint: 2_000_000_000 },
            ControlEvent::RangeApplied { spoint: 10, epoint: 10 },
            ControlEvent::Topology {
                attach: addrs("c:1"),
                detach: Vec::new(),
            },
        ];
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let stats = run_control_loop(Arc::clone(&manager), rx).await.unwrap();

        assert_eq!(stats, LoopStats { published: 4, unchanged: 1 });
        let current = manager.current();
        assert!(!current.migration().in_progress());
        assert_eq!(
            current.ring(),
            KetamaLocator::new(addrs("a:1,b:1,c:1")).ring()
        );
    }

    #[tokio::test]
    async fn test_frame_source_skips_garbage() {
        let manager = Arc::new(TopologyManager::new(KetamaLocator::new(addrs("a:1"))));
        let (tx, rx) = mpsc::channel(4);

        tx.send(Bytes::from_static(&[0xff])).await.unwrap();
        let attach = ControlEvent::Topology {
            attach: addrs("b:1"),
            detach: Vec::new(),
        };
        tx.send(codec::encode(&attach).unwrap()).await.unwrap();
        drop(tx);

        let mut source = FrameSource::new(rx);
        let event = source.next_event().await;
        assert_eq!(event, Some(attach));
        assert_eq!(source.skipped(), 1);
        assert_eq!(source.next_event().await, None);

        let stats = run_control_loop(manager, source).await.unwrap();
        assert_eq!(stats, LoopStats::default());
    }

    #[tokio::test]
    async fn test_loop_stops_on_invariant_violation() {
        let manager = Arc::new(TopologyManager::new(KetamaLocator::new(addrs("a:1,b:1"))));
        let (tx, rx) = mpsc::channel(8);

        // Restarting the migration after b's ranges were handed off loses the
        // staged points, so detaching b can no longer find them.
        let events = vec![
            ControlEvent::PrepareMigration {
                kind: MigrationType::Leave,
                nodes: addrs("b:1"),
            },
            ControlEvent::RangeApplied { spoint: 7, epoint: 7 },
            ControlEvent::PrepareMigration {
                kind: MigrationType::Join,
                nodes: addrs("d:1"),
            },
            ControlEvent::Topology {
                attach: Vec::new(),
                detach: addrs("b:1"),
            },
            ControlEvent::Topology {
                attach: addrs("e:1"),
                detach: Vec::new(),
            },
        ];
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        let err = run_control_loop(Arc::clone(&manager), rx).await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(manager.version(), 3);
        assert!(!manager.current().all().contains(&addrs("e:1")[0]));
    }
}
