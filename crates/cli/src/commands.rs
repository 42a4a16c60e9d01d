//! CLI subcommands.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use control::{run_control_loop, ControlEvent, LoopStats, TopologyManager};
use corelib::{HashAlgorithm, KetamaLocator, MigrationType, NodeAddress};
use tokio::sync::mpsc;

const RING_SIZE: f64 = 4_294_967_296.0;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the primary node of each key.
    Locate { keys: Vec<String> },
    /// Print the failover sequence of a key.
    Sequence { key: String },
    /// Print ring points and hash-space share per node.
    Inspect,
    /// Apply a JSON-lines file of control events, then locate keys.
    Replay {
        events: PathBuf,
        #[arg(short, long)]
        keys: Vec<String>,
    },
}

/// Per-node line of `inspect`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: NodeAddress,
    pub points: usize,
    pub staged: usize,
    /// Percent of the hash space this node answers for.
    pub share: f64,
}

#[derive(Debug)]
pub enum CommandResult {
    Located(Vec<(String, Option<NodeAddress>)>),
    Sequence {
        key: String,
        nodes: Vec<NodeAddress>,
    },
    Inspect(Vec<NodeReport>),
    Replayed {
        stats: LoopStats,
        migration: Option<MigrationType>,
        located: Vec<(String, Option<NodeAddress>)>,
    },
}

impl Command {
    pub fn execute<H: HashAlgorithm>(
        &self,
        locator: KetamaLocator<H>,
    ) -> anyhow::Result<CommandResult> {
        match self {
            Command::Locate { keys } => Ok(CommandResult::Located(locate(&locator, keys))),
            Command::Sequence { key } => Ok(CommandResult::Sequence {
                key: key.clone(),
                nodes: locator.sequence(key).cloned().collect(),
            }),
            Command::Inspect => Ok(CommandResult::Inspect(inspect(&locator))),
            Command::Replay { events, keys } => {
                let script = fs::read_to_string(events)
                    .with_context(|| format!("reading events {}", events.display()))?;
                let events = parse_events(&script)?;
                replay(locator, events, keys)
            }
        }
    }
}

fn locate<H: HashAlgorithm>(
    locator: &KetamaLocator<H>,
    keys: &[String],
) -> Vec<(String, Option<NodeAddress>)> {
    keys.iter()
        .map(|key| (key.clone(), locator.primary(key).cloned()))
        .collect()
}

pub fn inspect<H: HashAlgorithm>(locator: &KetamaLocator<H>) -> Vec<NodeReport> {
    let shares = locator.ring().ownership();
    let staging = locator.migration().staging();

    let mut nodes: Vec<NodeAddress> = locator.all().iter().cloned().collect();
    nodes.extend(locator.alter_all().iter().cloned());
    nodes.sort();
    nodes.dedup();

    nodes
        .into_iter()
        .map(|node| NodeReport {
            points: locator.ring().points_of(&node).len(),
            staged: staging.points_of(&node).len(),
            share: shares.get(&node).copied().unwrap_or(0) as f64 / RING_SIZE * 100.0,
            node,
        })
        .collect()
}

/// Parse one JSON event per line. Blank lines and `#` comments are skipped.
pub fn parse_events(script: &str) -> anyhow::Result<Vec<ControlEvent>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("event on line {}", n + 1))
        })
        .collect()
}

/// Feed `events` through the control loop and locate `keys` on the result.
pub fn replay<H: HashAlgorithm>(
    locator: KetamaLocator<H>,
    events: Vec<ControlEvent>,
    keys: &[String],
) -> anyhow::Result<CommandResult> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;

    let manager = Arc::new(TopologyManager::new(locator));
    let stats = runtime.block_on(async {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        let control = tokio::spawn(run_control_loop(Arc::clone(&manager), rx));
        for event in events {
            if tx.send(event).await.is_err() {
                // The loop stopped on a fatal error; its result says why.
                break;
            }
        }
        drop(tx);
        control.await.context("control loop panicked")
    })??;

    let current = manager.current();
    Ok(CommandResult::Replayed {
        stats,
        migration: current.migration().kind(),
        located: locate(&current, keys),
    })
}

fn write_located(
    f: &mut fmt::Formatter<'_>,
    located: &[(String, Option<NodeAddress>)],
) -> fmt::Result {
    for (key, node) in located {
        match node {
            Some(node) => writeln!(f, "{}\t{}", key, node)?,
            None => writeln!(f, "{}\t<no node>", key)?,
        }
    }
    Ok(())
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Located(located) => write_located(f, located),
            CommandResult::Sequence { key, nodes } => {
                writeln!(f, "{}", key)?;
                for (i, node) in nodes.iter().enumerate() {
                    writeln!(f, "  {}\t{}", i, node)?;
                }
                Ok(())
            }
            CommandResult::Inspect(reports) => {
                writeln!(f, "{:<24} {:>7} {:>7} {:>8}", "node", "points", "staged", "share%")?;
                for r in reports {
                    writeln!(
                        f,
                        "{:<24} {:>7} {:>7} {:>8.3}",
                        r.node.as_str(),
                        r.points,
                        r.staged,
                        r.share
                    )?;
                }
                Ok(())
            }
            CommandResult::Replayed {
                stats,
                migration,
                located,
            } => {
                writeln!(
                    f,
                    "published={} unchanged={} migration={}",
                    stats.published,
                    stats.unchanged,
                    migration.map_or("none", MigrationType::as_str)
                )?;
                write_located(f, located)
            }
        }
    }
}
