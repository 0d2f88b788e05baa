use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::selection::SelectionError;

const LIST_PREFIX: &str = "pdf-selections";
const RECENT_PREFIX: &str = "recent-pdf-selection";

/// One captured region, as persisted and as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSelection {
    pub image_data: String,
    pub timestamp: DateTime<Utc>,
    pub page: u32,
}

/// Append-only capture list plus a "most recent" slot, both keyed by owner.
#[async_trait]
pub trait CaptureStore: Send + Sync {
    async fn append(&self, owner: &str, selection: &StoredSelection) -> Result<(), SelectionError>;
    async fn list(&self, owner: &str) -> Result<Vec<StoredSelection>, SelectionError>;
    async fn recent(&self, owner: &str) -> Result<Option<StoredSelection>, SelectionError>;
}

fn list_key(owner: &str) -> String {
    format!("{LIST_PREFIX}:{owner}")
}

fn recent_key(owner: &str) -> String {
    format!("{RECENT_PREFIX}:{owner}")
}

/// List push and recent-slot write in one MULTI/EXEC so the two never disagree.
fn append_pipeline(owner: &str, encoded: &str) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .rpush(list_key(owner), encoded)
        .ignore()
        .set(recent_key(owner), encoded)
        .ignore();
    pipe
}

pub struct RedisCaptureStore {
    client: redis::Client,
}

impl RedisCaptureStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CaptureStore for RedisCaptureStore {
    async fn append(&self, owner: &str, selection: &StoredSelection) -> Result<(), SelectionError> {
        let encoded = serde_json::to_string(selection)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        append_pipeline(owner, &encoded)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!("Stored selection for {owner} (page {})", selection.page);
        Ok(())
    }

    async fn list(&self, owner: &str) -> Result<Vec<StoredSelection>, SelectionError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Vec<String> = conn.lrange(list_key(owner), 0, -1).await?;
        // A malformed entry should not hide the rest of the list.
        Ok(raw
            .iter()
            .filter_map(|entry| {
                serde_json::from_str(entry)
                    .map_err(|e| warn!("Skipping unreadable selection for {owner}: {e}"))
                    .ok()
            })
            .collect())
    }

    async fn recent(&self, owner: &str) -> Result<Option<StoredSelection>, SelectionError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(recent_key(owner)).await?;
        raw.map(|entry| serde_json::from_str(&entry).map_err(SelectionError::from))
            .transpose()
    }
}

/// Process-local store, used in tests and when no Redis is wired in.
#[derive(Default)]
pub struct InMemoryCaptureStore {
    lists: RwLock<HashMap<String, Vec<StoredSelection>>>,
}

impl InMemoryCaptureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaptureStore for InMemoryCaptureStore {
    async fn append(&self, owner: &str, selection: &StoredSelection) -> Result<(), SelectionError> {
        self.lists
            .write()
            .await
            .entry(owner.to_string())
            .or_default()
            .push(selection.clone());
        Ok(())
    }

    async fn list(&self, owner: &str) -> Result<Vec<StoredSelection>, SelectionError> {
        Ok(self.lists.read().await.get(owner).cloned().unwrap_or_default())
    }

    async fn recent(&self, owner: &str) -> Result<Option<StoredSelection>, SelectionError> {
        Ok(self
            .lists
            .read()
            .await
            .get(owner)
            .and_then(|list| list.last().cloned()))
    }
}
