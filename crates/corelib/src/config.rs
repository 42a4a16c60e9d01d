//! Locator configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of ring points per node.
pub const DEFAULT_NODE_REPETITIONS: usize = 160;

/// Points derived from one digest.
pub const POINTS_PER_DIGEST: usize = 4;

/// Settings shared by every locator built for one cluster.
///
/// All clients of a cluster must agree on these values, otherwise they
/// compute different rings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Ring points per node. A positive multiple of 4.
    pub node_repetitions: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            node_repetitions: DEFAULT_NODE_REPETITIONS,
        }
    }
}

impl LocatorConfig {
    pub fn with_repetitions(node_repetitions: usize) -> Result<Self> {
        let config = Self { node_repetitions };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_repetitions == 0 || self.node_repetitions % POINTS_PER_DIGEST != 0 {
            return Err(Error::InvalidConfig(format!(
                "node_repetitions must be a positive multiple of {}, got {}",
                POINTS_PER_DIGEST, self.node_repetitions
            )));
        }
        Ok(())
    }

    /// Digests computed per node.
    #[inline]
    pub fn digests_per_node(&self) -> usize {
        self.node_repetitions / POINTS_PER_DIGEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LocatorConfig::default();
        assert_eq!(config.node_repetitions, 160);
        assert!(config.validate().is_ok());
        assert_eq!(config.digests_per_node(), 40);
    }

    #[test]
    fn test_rejects_non_multiple_of_four() {
        assert!(LocatorConfig::with_repetitions(0).is_err());
        assert!(LocatorConfig::with_repetitions(6).is_err());
        assert!(LocatorConfig::with_repetitions(8).is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = LocatorConfig::from_json_str(r#"{"node_repetitions": 40}"#).unwrap();
        assert_eq!(config.node_repetitions, 40);

        let defaulted = LocatorConfig::from_json_str("{}").unwrap();
        assert_eq!(defaulted, LocatorConfig::default());

        let err = LocatorConfig::from_json_str(r#"{"node_repetitions": 3}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
