//! Command-line configuration.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use corelib::{HashAlgorithm, KetamaHash, KetamaLocator, LocatorConfig, NodeAddress, Xxh3Hash};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

/// Hash algorithm selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HashKind {
    /// MD5 ketama, compatible with other memcached clients.
    Ketama,
    /// XXH3-128.
    Xxh3,
}

#[derive(Debug, Parser)]
#[command(name = "ketama", version, about = "Inspect and exercise a ketama node locator")]
pub struct CliConfig {
    /// Active nodes, comma separated `host:port`.
    #[arg(short, long, global = true, default_value = "")]
    pub nodes: String,

    /// JSON locator configuration, e.g. `{"node_repetitions": 160}`.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, global = true, default_value_t = HashKind::Ketama)]
    pub hash: HashKind,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(self) -> anyhow::Result<()> {
        init_tracing(self.verbose);

        let locator_config = self.locator_config()?;
        let nodes = NodeAddress::parse_list(&self.nodes).context("parsing --nodes")?;
        debug!(
            nodes = nodes.len(),
            hash = ?self.hash,
            repetitions = locator_config.node_repetitions,
            "building locator"
        );

        let output = match self.hash {
            HashKind::Ketama => self.execute(nodes, locator_config, KetamaHash)?,
            HashKind::Xxh3 => self.execute(nodes, locator_config, Xxh3Hash)?,
        };
        print!("{}", output);
        Ok(())
    }

    fn execute<H: HashAlgorithm>(
        &self,
        nodes: Vec<NodeAddress>,
        config: LocatorConfig,
        hasher: H,
    ) -> anyhow::Result<crate::CommandResult> {
        let locator = KetamaLocator::with_hasher(nodes, config, hasher)?;
        self.command.execute(locator)
    }

    /// Locator settings from `--config`, or the defaults.
    pub fn locator_config(&self) -> anyhow::Result<LocatorConfig> {
        let Some(path) = &self.config else {
            return Ok(LocatorConfig::default());
        };
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        LocatorConfig::from_json_str(&json)
            .with_context(|| format!("loading config {}", path.display()))
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
