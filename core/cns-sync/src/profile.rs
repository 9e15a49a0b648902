//! Lazily populated profile document cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::ProfileSource;

/// Caches profile documents by name.
///
/// The first read of a name fetches it from the [`ProfileSource`]. Both
/// successful and failed fetches are cached for the life of the process; a
/// cached failure reads as [`SyncError::NotFound`].
pub struct ProfileCache {
    source: Arc<dyn ProfileSource>,
    entries: RwLock<HashMap<String, Option<Value>>>,
}

impl ProfileCache {
    /// Creates an empty cache backed by `source`.
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the profile document for `name`, fetching it on first use.
    pub async fn get(&self, name: &str) -> SyncResult<Value> {
        if let Some(entry) = self.entries.read().await.get(name) {
            return entry
                .clone()
                .ok_or_else(|| SyncError::NotFound(format!("profile {name}")));
        }

        debug!("Fetching profile {}", name);
        let fetched = match self.source.fetch_profile(name).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Failed to fetch profile {}: {}", name, e);
                None
            }
        };

        // A concurrent reader may have filled the entry meanwhile; keep the
        // first result so every caller sees the same document.
        self.entries
            .write()
            .await
            .entry(name.to_string())
            .or_insert(fetched)
            .clone()
            .ok_or_else(|| SyncError::NotFound(format!("profile {name}")))
    }

    /// Whether `name` has been looked up before (successfully or not).
    pub async fn is_cached(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    /// Successfully fetched documents, keyed by name.
    pub async fn snapshot(&self) -> Value {
        let entries = self.entries.read().await;
        let docs: Map<String, Value> = entries
            .iter()
            .filter_map(|(name, doc)| doc.clone().map(|d| (name.clone(), d)))
            .collect();
        Value::Object(docs)
    }
}
