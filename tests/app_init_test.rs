//! Smoke test for full AppContext wiring against a stub store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use quotefeed::config::AppConfig;
use quotefeed::storefront::{
    Product, ProductKind, PurchaseResult, StoreError, StoreFront, VerificationOutcome,
};
use quotefeed::AppContext;

struct StubStore {
    updates: broadcast::Sender<VerificationOutcome>,
}

impl StubStore {
    fn new() -> Self {
        let (updates, _) = broadcast::channel(8);
        Self { updates }
    }
}

#[async_trait]
impl StoreFront for StubStore {
    async fn list_products(&self, ids: &[&str]) -> Result<Vec<Product>, StoreError> {
        Ok(ids
            .iter()
            .enumerate()
            .map(|(i, id)| Product {
                id: id.to_string(),
                display_price: if i == 0 { "$4.99" } else { "$39.99" }.to_string(),
                price_cents: if i == 0 { 499 } else { 3999 },
                kind: if i == 0 {
                    ProductKind::Monthly
                } else {
                    ProductKind::Yearly
                },
            })
            .collect())
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

#[tokio::test]
async fn init_wires_catalog_entitlements_and_gate() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::new(Some(dir.path().to_path_buf()));

    let ctx = AppContext::init(config, Arc::new(StubStore::new()))
        .await
        .unwrap();

    // Catalog fetched and sorted by descending price.
    let products = ctx.catalog.products().await;
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].price_cents, 3999);

    // Fresh install: nothing owned, ads on, no favorites, no notification choice.
    assert!(ctx.ad_gate.should_show_ads().await);
    assert!(ctx.entitlements.owned_ids().await.is_empty());
    assert_eq!(ctx.favorites.count().await, 0);
    assert!(!ctx.notifications.has_user_chosen().await);

    ctx.shutdown();
}
