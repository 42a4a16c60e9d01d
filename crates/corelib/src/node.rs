//! Node addresses for the ketama ring.
//!
//! A node is identified by its `host:port` pair. Two addresses built from
//! separate updates compare equal when host and port match, and they order
//! by their canonical `host:port` text. That text order is what breaks ties
//! between owners sharing a hash point, so it must stay stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Address of a cache server.
///
/// Cheap to clone; heavy per-node state (connections, queues) lives with
/// the connection manager, not here.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeAddress {
    // Field order matters: the derived `Ord` compares `repr` first.
    repr: String,
    host: String,
    port: u16,
}

impl NodeAddress {
    /// Build an address from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(Error::InvalidNode(format!("empty host in ':{}'", port)));
        }
        Ok(Self {
            repr: format!("{}:{}", host, port),
            host,
            port,
        })
    }

    /// Parse a `host:port` string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidNode(format!("missing port in '{}'", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::InvalidNode(format!("bad port in '{}': {}", s, e)))?;
        Self::new(host, port)
    }

    /// Parse a comma or whitespace separated address list.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Canonical `host:port` text; the input to point derivation.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.repr
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self.repr)
    }
}

impl FromStr for NodeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NodeAddress {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<NodeAddress> for String {
    fn from(addr: NodeAddress) -> String {
        addr.repr
    }
}
