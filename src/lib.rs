// SPDX-License-Identifier: MIT
//! QuoteFeed core.
//!
//! The monetization and persisted-state core of a short-form quotes app:
//! a fixed product catalog, an entitlement store reconciled from the external
//! purchase ledger, the ad gate derived from it, persisted favorites, and the
//! daily notification preference. Rendering, the ad SDK itself, audio, and OS
//! notification delivery live in the embedding application.

pub mod adgate;
pub mod catalog;
pub mod config;
pub mod entitlements;
pub mod events;
pub mod favorites;
pub mod feed;
pub mod notifications;
pub mod observability;
pub mod storage;
pub mod storefront;

use std::sync::Arc;

use anyhow::Result;

use adgate::AdGate;
use catalog::ProductCatalog;
use config::AppConfig;
use entitlements::EntitlementStore;
use events::EventBroadcaster;
use favorites::FavoritesStore;
use notifications::NotificationSettings;
use storage::Storage;
use storefront::StoreFront;

/// Shared application state, wired by explicit injection.
///
/// One instance per process; every consumer gets its stores handed to it —
/// there are no hidden shared singletons, so every ad surface reads the same
/// entitlement state.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub catalog: Arc<ProductCatalog>,
    pub entitlements: Arc<EntitlementStore>,
    pub ad_gate: AdGate,
    pub favorites: Arc<FavoritesStore>,
    pub notifications: Arc<NotificationSettings>,
}

impl AppContext {
    /// Construct and wire the whole core against an external store.
    ///
    /// The transaction-update listener starts before the first catalog fetch
    /// and reconciliation so no update delivered during startup is missed.
    pub async fn init(config: AppConfig, store: Arc<dyn StoreFront>) -> Result<Self> {
        let config = Arc::new(config);
        let storage = Arc::new(
            Storage::new_with_slow_query(
                &config.data_dir,
                config.observability.slow_query_threshold_ms,
            )
            .await?,
        );
        let broadcaster = Arc::new(EventBroadcaster::new());

        let catalog = Arc::new(ProductCatalog::new(Arc::clone(&store), &config.store));
        let entitlements = Arc::new(EntitlementStore::new(
            store,
            Arc::clone(&catalog),
            Arc::clone(&broadcaster),
        ));
        entitlements.spawn_listener();

        catalog.refresh().await;
        entitlements.reconcile().await;

        let kv: Arc<dyn storage::KeyValue> = storage.clone();
        let favorites =
            Arc::new(FavoritesStore::load(Arc::clone(&kv), Arc::clone(&broadcaster)).await);
        let notifications = Arc::new(NotificationSettings::load(kv).await);

        let ad_gate = AdGate::new(Arc::clone(&entitlements));

        Ok(Self {
            config,
            storage,
            broadcaster,
            catalog,
            entitlements,
            ad_gate,
            favorites,
            notifications,
        })
    }

    /// Tear down background work. Safe to call more than once.
    pub fn shutdown(&self) {
        self.entitlements.shutdown();
    }
}
