// SPDX-License-Identifier: MIT
//! Product catalog.
//!
//! Resolves the two fixed subscription SKUs (monthly + yearly) into priced
//! [`Product`] records via the external store. The catalog never grows at
//! runtime; a refresh that fails keeps the last-known list.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::storefront::{Product, StoreFront};

/// Cached, priced view of the purchasable subscriptions.
pub struct ProductCatalog {
    store: Arc<dyn StoreFront>,
    monthly_sku: String,
    yearly_sku: String,
    products: RwLock<Vec<Product>>,
}

impl ProductCatalog {
    pub fn new(store: Arc<dyn StoreFront>, config: &StoreConfig) -> Self {
        Self {
            store,
            monthly_sku: config.monthly_sku.clone(),
            yearly_sku: config.yearly_sku.clone(),
            products: RwLock::new(Vec::new()),
        }
    }

    /// The two SKUs this catalog resolves.
    pub fn skus(&self) -> [&str; 2] {
        [&self.monthly_sku, &self.yearly_sku]
    }

    /// Query the store for the known SKUs and replace the cached list,
    /// sorted by descending price.
    ///
    /// One external call per invocation. On store failure the previous
    /// (possibly empty) list is retained — the failure is logged, never
    /// surfaced to the caller.
    pub async fn refresh(&self) {
        match self.store.list_products(&self.skus()).await {
            Ok(mut list) => {
                list.sort_by(|a, b| b.price_cents.cmp(&a.price_cents));
                let count = list.len();
                *self.products.write().await = list;
                info!(count, "product catalog refreshed");
            }
            Err(e) => {
                warn!(err = %e, "product request failed — keeping last-known catalog");
            }
        }
    }

    /// Current priced products, descending by price. Empty until the first
    /// successful [`refresh`](Self::refresh).
    pub async fn products(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    /// Look up a cached product by SKU.
    pub async fn product(&self, id: &str) -> Option<Product> {
        self.products.read().await.iter().find(|p| p.id == id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::{ProductKind, PurchaseResult, StoreError, VerificationOutcome};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    struct StubStore {
        fail: AtomicBool,
        calls: AtomicUsize,
        updates: broadcast::Sender<VerificationOutcome>,
    }

    impl StubStore {
        fn new() -> Self {
            let (updates, _) = broadcast::channel(8);
            Self {
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                updates,
            }
        }
    }

    #[async_trait]
    impl StoreFront for StubStore {
        async fn list_products(&self, ids: &[&str]) -> Result<Vec<Product>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("offline".to_string()));
            }
            // Deliberately unsorted: monthly first.
            Ok(vec![
                Product {
                    id: ids[0].to_string(),
                    display_price: "$4.99".to_string(),
                    price_cents: 499,
                    kind: ProductKind::Monthly,
                },
                Product {
                    id: ids[1].to_string(),
                    display_price: "$39.99".to_string(),
                    price_cents: 3999,
                    kind: ProductKind::Yearly,
                },
            ])
        }

        async fn current_entitlements(&self) -> Vec<VerificationOutcome> {
            Vec::new()
        }

        fn transaction_updates(&self) -> broadcast::Receiver<VerificationOutcome> {
            self.updates.subscribe()
        }

        async fn buy(&self, _product_id: &str) -> Result<PurchaseResult, StoreError> {
            Ok(PurchaseResult::Cancelled)
        }

        async fn finish(&self, _transaction_id: u64) {}
    }

    fn catalog_with(store: Arc<StubStore>) -> ProductCatalog {
        ProductCatalog::new(store, &StoreConfig::default())
    }

    #[tokio::test]
    async fn refresh_sorts_by_descending_price() {
        let store = Arc::new(StubStore::new());
        let catalog = catalog_with(store);
        assert!(catalog.is_empty().await, "empty before the first refresh");

        catalog.refresh().await;
        assert!(!catalog.is_empty().await);
        let products = catalog.products().await;
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].kind, ProductKind::Yearly);
        assert_eq!(products[0].display_price, "$39.99");
        assert_eq!(products[1].kind, ProductKind::Monthly);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_list() {
        let store = Arc::new(StubStore::new());
        let catalog = catalog_with(Arc::clone(&store));

        catalog.refresh().await;
        assert_eq!(catalog.products().await.len(), 2);

        store.fail.store(true, Ordering::SeqCst);
        catalog.refresh().await;
        assert_eq!(catalog.products().await.len(), 2, "last-known list retained");
    }

    #[tokio::test]
    async fn one_store_call_per_refresh() {
        let store = Arc::new(StubStore::new());
        let catalog = catalog_with(Arc::clone(&store));

        catalog.refresh().await;
        catalog.refresh().await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn lookup_by_sku() {
        let store = Arc::new(StubStore::new());
        let catalog = catalog_with(store);
        catalog.refresh().await;

        let yearly = catalog.product(&StoreConfig::default().yearly_sku).await;
        assert_eq!(yearly.unwrap().price_cents, 3999);
        assert!(catalog.product("nope").await.is_none());
    }
}
