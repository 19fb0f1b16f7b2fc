//! Destination registry — the single owner of per-server delivery configuration.
//!
//! All records sit behind one registry-wide `RwLock`. Mutations take the write
//! lock, apply the change, and persist the full record set before releasing it,
//! so every operation is linearizable and readers never observe a half-applied
//! update. Persistence failures are logged; the in-memory state stays
//! authoritative and the next successful write catches the file up.

use std::collections::HashMap;

use tokio::sync::RwLock;

use cqc_common::error::RegistryError;
use cqc_common::types::{ChannelId, Destination, DestinationId, RegistryStats};

use crate::store::{RegistryStore, StoreError};

pub struct DestinationRegistry {
    records: RwLock<HashMap<DestinationId, Destination>>,
    store: Option<RegistryStore>,
}

impl DestinationRegistry {
    /// A registry that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Open a file-backed registry, loading any existing records.
    pub async fn open(store: RegistryStore) -> Result<Self, StoreError> {
        let records = store.load().await?;
        Ok(Self {
            records: RwLock::new(records),
            store: Some(store),
        })
    }

    /// Create the destination if absent. Existing records are left untouched.
    pub async fn upsert(&self, id: DestinationId) -> Destination {
        let mut records = self.records.write().await;
        if let Some(existing) = records.get(&id) {
            return existing.clone();
        }

        let dest = Destination::new(id);
        records.insert(id, dest.clone());
        tracing::info!(destination_id = %id, "Destination registered");
        self.persist(&records).await;
        dest
    }

    /// Point the destination at a channel. A new channel clears any earlier
    /// invalid marking, since the old target is what failed.
    pub async fn set_channel(
        &self,
        id: DestinationId,
        channel_id: ChannelId,
    ) -> Result<Destination, RegistryError> {
        self.mutate(id, |dest| {
            dest.channel_id = Some(channel_id);
            dest.valid = true;
            Ok(())
        })
        .await
        .inspect(|_| {
            tracing::info!(destination_id = %id, channel_id = %channel_id, "Destination channel set");
        })
    }

    /// Enable delivery. Requires a channel; re-enabling clears the invalid mark.
    pub async fn enable(&self, id: DestinationId) -> Result<Destination, RegistryError> {
        self.mutate(id, |dest| {
            if dest.channel_id.is_none() {
                return Err(RegistryError::InvalidState(format!(
                    "destination {} has no channel configured",
                    id
                )));
            }
            dest.enabled = true;
            dest.valid = true;
            Ok(())
        })
        .await
        .inspect(|_| tracing::info!(destination_id = %id, "Destination enabled"))
    }

    pub async fn disable(&self, id: DestinationId) -> Result<Destination, RegistryError> {
        self.mutate(id, |dest| {
            dest.enabled = false;
            Ok(())
        })
        .await
        .inspect(|_| tracing::info!(destination_id = %id, "Destination disabled"))
    }

    /// Record a permanent delivery failure. Also disables the destination.
    ///
    /// Returns `false` when the id is unknown (e.g. removed mid-dispatch).
    pub async fn mark_invalid(&self, id: DestinationId) -> bool {
        let mut records = self.records.write().await;
        let Some(dest) = records.get_mut(&id) else {
            tracing::debug!(destination_id = %id, "Ignoring invalidation of unknown destination");
            return false;
        };

        if !dest.valid && !dest.enabled {
            return true;
        }

        dest.valid = false;
        dest.enabled = false;
        tracing::warn!(destination_id = %id, "Destination marked invalid and disabled");
        self.persist(&records).await;
        true
    }

    /// Drop the destination. Unknown ids are a no-op.
    pub async fn remove(&self, id: DestinationId) -> bool {
        let mut records = self.records.write().await;
        if records.remove(&id).is_none() {
            tracing::debug!(destination_id = %id, "Remove of unknown destination ignored");
            return false;
        }

        tracing::info!(destination_id = %id, "Destination removed");
        self.persist(&records).await;
        true
    }

    pub async fn get(&self, id: DestinationId) -> Option<Destination> {
        self.records.read().await.get(&id).cloned()
    }

    /// All destinations, sorted by id.
    pub async fn list(&self) -> Vec<Destination> {
        let mut all: Vec<Destination> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|d| d.destination_id);
        all
    }

    /// Destinations that are enabled and valid, sorted by id.
    pub async fn list_enabled(&self) -> Vec<Destination> {
        let mut enabled: Vec<Destination> = self
            .records
            .read()
            .await
            .values()
            .filter(|d| d.is_deliverable())
            .cloned()
            .collect();
        enabled.sort_by_key(|d| d.destination_id);
        enabled
    }

    pub async fn stats(&self) -> RegistryStats {
        let records = self.records.read().await;
        RegistryStats {
            total: records.len(),
            enabled: records.values().filter(|d| d.is_deliverable()).count(),
            invalid: records.values().filter(|d| !d.valid).count(),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn mutate<F>(&self, id: DestinationId, apply: F) -> Result<Destination, RegistryError>
    where
        F: FnOnce(&mut Destination) -> Result<(), RegistryError>,
    {
        let mut records = self.records.write().await;
        let dest = records.get_mut(&id).ok_or(RegistryError::NotFound(id))?;

        let before = dest.clone();
        apply(dest)?;
        let after = dest.clone();

        if after != before {
            self.persist(&records).await;
        }
        Ok(after)
    }

    async fn persist(&self, records: &HashMap<DestinationId, Destination>) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(records).await {
            tracing::error!(
                path = %store.path().display(),
                error = %e,
                "Failed to persist destination registry"
            );
        }
    }
}
