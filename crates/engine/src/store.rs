//! JSON file persistence for the destination registry.
//!
//! Layout: `{"destinations": [{"destination_id", "channel_id", "enabled", "valid"}]}`
//! sorted by destination id. Writes go to a sibling temp file which is then
//! renamed over the target, so a crash mid-write never leaves a truncated file.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cqc_common::types::{Destination, DestinationId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Registry file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    destinations: Vec<Destination>,
}

/// File-backed store for destination records.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records. A missing file is an empty registry.
    pub async fn load(&self) -> Result<HashMap<DestinationId, Destination>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No registry file found, starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: RegistryFile = serde_json::from_slice(&raw)?;
        let mut records = HashMap::with_capacity(file.destinations.len());

        for mut dest in file.destinations {
            if dest.enabled && dest.channel_id.is_none() {
                tracing::warn!(
                    destination_id = %dest.destination_id,
                    "Stored destination enabled without a channel, disabling"
                );
                dest.enabled = false;
            }
            records.entry(dest.destination_id).or_insert(dest);
        }

        tracing::info!(
            path = %self.path.display(),
            destinations = records.len(),
            "Loaded destination registry"
        );
        Ok(records)
    }

    /// Replace the file contents with `records`.
    pub async fn save(&self, records: &HashMap<DestinationId, Destination>) -> Result<(), StoreError> {
        let mut destinations: Vec<Destination> = records.values().cloned().collect();
        destinations.sort_by_key(|d| d.destination_id);

        let json = serde_json::to_vec_pretty(&RegistryFile { destinations })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
