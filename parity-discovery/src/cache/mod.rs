//! Durable copy of the last resolved endpoint set.
//!
//! The record lives under one fixed key as a JSON blob. Only this module
//! touches that key.

pub mod db;
pub mod store;

use std::path::Path;
use anyhow::{Context, Result};
use chrono::Utc;
use shared::protocol::CACHE_KEY;
use shared::types::{CacheRecord, EndpointSet};
use self::db::KvDb;
use self::store::StoreHandle;

#[derive(Clone)]
pub struct DiscoveryCache {
    store: StoreHandle,
}

impl DiscoveryCache {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Open the SQLite-backed store at `path` (`:memory:` for an ephemeral one).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = KvDb::open(path)?;
        Ok(Self::new(StoreHandle::spawn(db)))
    }

    /// Read the stored record. An unreadable blob counts as a cold start.
    pub async fn load(&self) -> Result<Option<CacheRecord>> {
        let Some(blob) = self.store.get(CACHE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<CacheRecord>(&blob) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!("Discarding unreadable endpoint cache record: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, endpoints: &EndpointSet, discovered_at: Option<&str>) -> Result<CacheRecord> {
        let record = CacheRecord {
            endpoints: endpoints.clone(),
            discovered_at: discovered_at.map(str::to_string),
            written_at: Utc::now(),
        };
        let blob = serde_json::to_string(&record)
            .context("Failed to serialize endpoint cache record")?;

        self.store.put(CACHE_KEY, blob).await?;
        Ok(record)
    }

    pub async fn clear(&self) -> Result<()> {
        if self.store.delete(CACHE_KEY).await? {
            tracing::debug!("Cleared endpoint cache");
        }
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.store.shutdown().await
    }

    #[cfg(test)]
    pub(crate) async fn write_raw(&self, blob: &str) -> Result<()> {
        self.store.put(CACHE_KEY, blob.to_string()).await
    }
}
