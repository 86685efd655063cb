//! Deployment snapshots.
//!
//! A snapshot is the full simulated deployment plus a version and a save
//! time. JSON is the on-disk format; bincode is used for the compact form and
//! for the state hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::sim::Deployment;
use crate::utils::address::sha256_hex;
use crate::utils::constants::SNAPSHOT_VERSION;

/// Versioned deployment snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version
    pub version: u32,
    /// Wall-clock save time
    pub saved_at: DateTime<Utc>,
    /// Deployment state
    pub deployment: Deployment,
}

impl Snapshot {
    /// Capture `deployment` now
    pub fn capture(deployment: &Deployment) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            deployment: deployment.clone(),
        }
    }

    fn check_version(self) -> Result<Self> {
        if self.version > SNAPSHOT_VERSION {
            return Err(Error::Deserialization(format!(
                "snapshot version {} not supported (max: {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        Ok(self)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        info!(path = %path.display(), hash = %self.state_hash()?, "snapshot saved");
        Ok(())
    }

    /// Read a JSON snapshot
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        snapshot.check_version()
    }

    /// Compact binary form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode the compact binary form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
        snapshot.check_version()
    }

    /// SHA-256 of the bincode-encoded deployment; independent of `saved_at`
    pub fn state_hash(&self) -> Result<String> {
        let bytes = bincode::serialize(&self.deployment)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(sha256_hex(&bytes))
    }
}
