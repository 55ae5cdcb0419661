// SPDX-License-Identifier: MIT
//! Persisted favorites.
//!
//! A like/unlike set keyed by quote id, independent of monetization state.
//! Every mutation writes the full serialized list to durable storage before
//! returning — overwrite, never append. Persistence is best-effort: on a
//! write failure the in-memory set stays authoritative for the session.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::events::EventBroadcaster;
use crate::feed::Quote;
use crate::observability::LatencyTracker;
use crate::storage::KeyValue;

/// Fixed storage namespace for the serialized favorites list.
pub const FAVORITES_KEY: &str = "favorites.quotes";

pub struct FavoritesStore {
    kv: Arc<dyn KeyValue>,
    broadcaster: Arc<EventBroadcaster>,
    quotes: RwLock<Vec<Quote>>,
}

impl FavoritesStore {
    /// Load the persisted set once. A missing key is an empty set; a corrupt
    /// blob is logged and treated as empty rather than failing startup.
    pub async fn load(kv: Arc<dyn KeyValue>, broadcaster: Arc<EventBroadcaster>) -> Self {
        let quotes = match kv.get(FAVORITES_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(list) => list,
                Err(e) => {
                    warn!(err = %e, "corrupt favorites blob — starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(err = %e, "failed to read favorites — starting empty");
                Vec::new()
            }
        };
        Self {
            kv,
            broadcaster,
            quotes: RwLock::new(quotes),
        }
    }

    pub async fn contains(&self, quote: &Quote) -> bool {
        self.quotes.read().await.iter().any(|q| q.id == quote.id)
    }

    /// Snapshot of the favorites in like order.
    pub async fn all(&self) -> Vec<Quote> {
        self.quotes.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.quotes.read().await.len()
    }

    /// Like if unliked, unlike if liked. Returns true if the quote is a
    /// favorite afterwards.
    pub async fn toggle(&self, quote: &Quote) -> bool {
        if self.contains(quote).await {
            self.remove(quote.id).await;
            false
        } else {
            self.add(quote.clone()).await;
            true
        }
    }

    /// Add if absent. Persists before returning.
    pub async fn add(&self, quote: Quote) {
        {
            let mut quotes = self.quotes.write().await;
            if quotes.iter().any(|q| q.id == quote.id) {
                return;
            }
            quotes.push(quote);
        }
        self.persist().await;
    }

    /// Remove by id. Persists before returning.
    pub async fn remove(&self, id: Uuid) {
        let removed = {
            let mut quotes = self.quotes.write().await;
            let before = quotes.len();
            quotes.retain(|q| q.id != id);
            quotes.len() != before
        };
        if removed {
            self.persist().await;
        }
    }

    async fn persist(&self) {
        let (bytes, count) = {
            let quotes = self.quotes.read().await;
            match serde_json::to_vec(&*quotes) {
                Ok(bytes) => (bytes, quotes.len()),
                Err(e) => {
                    warn!(err = %e, "failed to encode favorites");
                    return;
                }
            }
        };
        let tracker = LatencyTracker::start("favorites.persist");
        if let Err(e) = self.kv.set(FAVORITES_KEY, &bytes).await {
            // In-memory state stays authoritative for this session.
            warn!(err = %e, "failed to persist favorites");
        }
        tracker.finish();
        self.broadcaster
            .broadcast("favorites.changed", serde_json::json!({ "count": count }));
    }
}
