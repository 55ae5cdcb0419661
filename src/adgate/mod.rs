// SPDX-License-Identifier: MIT
//! The ad gate.
//!
//! Single source of truth for "should ads be shown". Every ad surface —
//! banner, interstitial, the settings badge — reads the same injected
//! [`EntitlementStore`]; nothing re-derives premium status on its own, so the
//! answer cannot diverge between surfaces.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::entitlements::EntitlementStore;

/// Test ad unit ids. Replace with production ids at release.
pub const BANNER_AD_UNIT_ID: &str = "ca-app-pub-3940256099942544/2934735716";
pub const INTERSTITIAL_AD_UNIT_ID: &str = "ca-app-pub-3940256099942544/4411468910";

/// Boolean decision point controlling whether advertising surfaces render.
#[derive(Clone)]
pub struct AdGate {
    entitlements: Arc<EntitlementStore>,
}

impl AdGate {
    pub fn new(entitlements: Arc<EntitlementStore>) -> Self {
        Self { entitlements }
    }

    /// True iff no subscription is owned. Pure function of the entitlement
    /// store's state — no caching here, so the next read after a
    /// reconciliation already reflects it.
    pub async fn should_show_ads(&self) -> bool {
        !self.entitlements.any_owned().await
    }

    pub async fn is_premium(&self) -> bool {
        self.entitlements.any_owned().await
    }

    /// Status line for the settings screen.
    pub async fn status_text(&self) -> &'static str {
        if self.is_premium().await {
            "Premium User - Ads Disabled"
        } else {
            "Free User - Ads Enabled"
        }
    }

    /// Symbol name matching the status line.
    pub async fn status_icon(&self) -> &'static str {
        if self.is_premium().await {
            "checkmark.circle.fill"
        } else {
            "xmark.circle.fill"
        }
    }
}

// ─── Interstitial preload slot ────────────────────────────────────────────────

/// Preload state of the single interstitial slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No ad loaded — `show` is a no-op.
    Empty,
    /// An ad is loaded and ready to present.
    Ready,
}

/// One-deep interstitial ad slot.
///
/// Mirrors the SDK lifecycle without the SDK: preload fills the slot, show
/// presents it, dismissal empties it so the next preload can start. Premium
/// users never load or see anything.
pub struct InterstitialSlot {
    gate: AdGate,
    state: RwLock<SlotState>,
}

impl InterstitialSlot {
    pub fn new(gate: AdGate) -> Self {
        Self {
            gate,
            state: RwLock::new(SlotState::Empty),
        }
    }

    pub async fn state(&self) -> SlotState {
        *self.state.read().await
    }

    /// Fill the slot. Returns false (and loads nothing) for premium users or
    /// when an ad is already loaded.
    pub async fn preload(&self) -> bool {
        if !self.gate.should_show_ads().await {
            debug!("ads disabled for premium user — skipping interstitial load");
            return false;
        }
        let mut state = self.state.write().await;
        if *state == SlotState::Ready {
            return false;
        }
        *state = SlotState::Ready;
        debug!("interstitial loaded");
        true
    }

    /// Present the loaded ad. Returns false when the slot is empty or the
    /// user is premium; the slot stays filled until [`dismissed`](Self::dismissed).
    pub async fn show(&self) -> bool {
        if !self.gate.should_show_ads().await {
            debug!("ads disabled for premium user — not showing interstitial");
            return false;
        }
        let shown = *self.state.read().await == SlotState::Ready;
        if !shown {
            debug!("interstitial not ready");
        }
        shown
    }

    /// The presented ad was dismissed — empty the slot and preload the next.
    pub async fn dismissed(&self) {
        info!("interstitial dismissed");
        *self.state.write().await = SlotState::Empty;
        self.preload().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductCatalog;
    use crate::config::StoreConfig;
    use crate::events::EventBroadcaster;
    use crate::storefront::{
        Entitlement, Product, ProductKind, PurchaseResult, StoreError, StoreFront,
        VerificationOutcome,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::broadcast;

    struct StubStore {
        premium: AtomicBool,
        updates: broadcast::Sender<VerificationOutcome>,
    }

    impl StubStore {
        fn new() -> Self {
            let (updates, _) = broadcast::channel(8);
            Self {
                premium: AtomicBool::new(false),
                updates,
            }
        }
    }

    #[async_trait]
    impl StoreFront for StubStore {
        async fn list_products(&self, ids: &[&str]) -> Result<Vec<Product>, StoreError> {
            Ok(ids
                .iter()
                .map(|id| Product {
                    id: id.to_string(),
                    display_price: "$4.99".to_string(),
                    price_cents: 499,
                    kind: ProductKind::Monthly,
                })
                .collect())
        }

        async fn current_entitlements(&self) -> Vec<VerificationOutcome> {
            if self.premium.load(Ordering::SeqCst) {
                vec![VerificationOutcome::Verified(Entitlement {
                    product_id: StoreConfig::default().monthly_sku,
                    transaction_id: 1,
                    kind: ProductKind::Monthly,
                    acquired_at: chrono::Utc::now(),
                })]
            } else {
                Vec::new()
            }
        }

        fn transaction_updates(&self) -> broadcast::Receiver<VerificationOutcome> {
            self.updates.subscribe()
        }

        async fn buy(&self, _product_id: &str) -> Result<PurchaseResult, StoreError> {
            Ok(PurchaseResult::Cancelled)
        }

        async fn finish(&self, _transaction_id: u64) {}
    }

    /// A gate over a reconciled store — owning one subscription iff `premium`.
    async fn gate(premium: bool) -> AdGate {
        let store = Arc::new(StubStore::new());
        store.premium.store(premium, Ordering::SeqCst);

        let catalog = Arc::new(ProductCatalog::new(
            Arc::clone(&store) as Arc<dyn StoreFront>,
            &StoreConfig::default(),
        ));
        catalog.refresh().await;

        let entitlements = Arc::new(EntitlementStore::new(
            store,
            catalog,
            Arc::new(EventBroadcaster::new()),
        ));
        entitlements.reconcile().await;
        AdGate::new(entitlements)
    }

    #[tokio::test]
    async fn free_user_sees_ads() {
        let gate = gate(false).await;
        assert!(gate.should_show_ads().await);
        assert!(!gate.is_premium().await);
        assert_eq!(gate.status_text().await, "Free User - Ads Enabled");
        assert_eq!(gate.status_icon().await, "xmark.circle.fill");
    }

    #[tokio::test]
    async fn premium_user_disables_ads() {
        let gate = gate(true).await;
        assert!(!gate.should_show_ads().await);
        assert_eq!(gate.status_text().await, "Premium User - Ads Disabled");
        assert_eq!(gate.status_icon().await, "checkmark.circle.fill");
    }

    #[tokio::test]
    async fn premium_user_never_loads_or_shows() {
        let slot = InterstitialSlot::new(gate(true).await);
        assert!(!slot.preload().await);
        assert_eq!(slot.state().await, SlotState::Empty);
        assert!(!slot.show().await);
    }

    #[tokio::test]
    async fn slot_is_one_deep() {
        let slot = InterstitialSlot::new(gate(false).await);
        assert!(slot.preload().await);
        assert_eq!(slot.state().await, SlotState::Ready);
        assert!(!slot.preload().await, "already loaded");
    }

    #[tokio::test]
    async fn show_requires_a_loaded_ad() {
        let slot = InterstitialSlot::new(gate(false).await);
        assert!(!slot.show().await);

        slot.preload().await;
        assert!(slot.show().await);
        // The slot stays filled until dismissal.
        assert_eq!(slot.state().await, SlotState::Ready);
    }

    #[tokio::test]
    async fn dismissal_empties_then_preloads_the_next() {
        let slot = InterstitialSlot::new(gate(false).await);
        slot.preload().await;
        assert!(slot.show().await);

        slot.dismissed().await;
        assert_eq!(slot.state().await, SlotState::Ready);
        assert!(slot.show().await);
    }

    #[tokio::test]
    async fn dismissal_does_not_reload_for_premium() {
        let slot = InterstitialSlot::new(gate(true).await);
        slot.dismissed().await;
        assert_eq!(slot.state().await, SlotState::Empty);
    }
}
