// SPDX-License-Identifier: MIT
//! Entitlement reconciliation.
//!
//! The owned-product set is a materialized view over the external ledger:
//! every reconciliation pass rebuilds it in full from `current_entitlements`
//! and commits it atomically. Nothing is appended incrementally, so an expired
//! or refunded subscription disappears as soon as the ledger stops listing it,
//! and a crash between passes loses nothing.
//!
//! Lifecycle: construct, [`spawn_listener`](EntitlementStore::spawn_listener)
//! as early as possible so no transaction update is missed, reconcile once at
//! startup, then let the listener drive further passes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::ProductCatalog;
use crate::events::EventBroadcaster;
use crate::observability::LatencyTracker;
use crate::storefront::{Product, PurchaseResult, StoreError, StoreFront, VerificationOutcome};

/// Caller-visible outcome of [`EntitlementStore::purchase`].
///
/// Everything but a hard store/verification failure is a non-error outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// Transaction verified and the owned set reconciled.
    Purchased,
    /// User backed out — nothing changed.
    Cancelled,
    /// Deferred by the store — a later transaction update will deliver it.
    Pending,
    /// Another purchase is already in flight; no second buy call was made.
    AlreadyInFlight,
}

/// Reconciled view of what the user currently owns.
pub struct EntitlementStore {
    store: Arc<dyn StoreFront>,
    catalog: Arc<ProductCatalog>,
    broadcaster: Arc<EventBroadcaster>,
    /// Verified, recurring, catalog-known product ids.
    owned: RwLock<HashSet<String>>,
    /// Single-writer section: one full reconciliation pass at a time.
    reconcile_lock: Mutex<()>,
    /// One buy flow at a time; reentrant calls are rejected, not queued.
    purchase_in_flight: AtomicBool,
    listener: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl EntitlementStore {
    pub fn new(
        store: Arc<dyn StoreFront>,
        catalog: Arc<ProductCatalog>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            store,
            catalog,
            broadcaster,
            owned: RwLock::new(HashSet::new()),
            reconcile_lock: Mutex::new(()),
            purchase_in_flight: AtomicBool::new(false),
            listener: std::sync::Mutex::new(None),
        }
    }

    // ─── Reads ────────────────────────────────────────────────────────────────

    /// O(1) lookup, no side effects.
    pub async fn is_owned(&self, product_id: &str) -> bool {
        self.owned.read().await.contains(product_id)
    }

    /// True if any subscription is owned — the premium signal the ad gate reads.
    pub async fn any_owned(&self) -> bool {
        !self.owned.read().await.is_empty()
    }

    /// Sorted snapshot of the owned product ids.
    pub async fn owned_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.owned.read().await.iter().cloned().collect();
        ids.sort();
        ids
    }

    // ─── Reconciliation ───────────────────────────────────────────────────────

    /// Rebuild the owned set from the ledger's current truth.
    ///
    /// Idempotent: with no new ledger entries, repeated passes leave the set
    /// unchanged. A verification failure on one entitlement never blocks the
    /// rest of the pass. Each verified entitlement is acknowledged with the
    /// store after enumeration so it is not redelivered. The new set is
    /// committed in one write-lock swap — readers never see a partial rebuild.
    pub async fn reconcile(&self) {
        let _pass = self.reconcile_lock.lock().await;
        let tracker = LatencyTracker::start("entitlements.reconcile");

        let mut next: HashSet<String> = HashSet::new();
        let mut processed: Vec<u64> = Vec::new();

        for outcome in self.store.current_entitlements().await {
            match outcome {
                VerificationOutcome::Verified(ent) => {
                    if ent.kind.is_recurring() {
                        if let Some(product) = self.catalog.product(&ent.product_id).await {
                            next.insert(product.id);
                        } else {
                            debug!(
                                product_id = %ent.product_id,
                                "verified entitlement for a product not in the catalog — skipped"
                            );
                        }
                    }
                    processed.push(ent.transaction_id);
                }
                VerificationOutcome::Unverified { entitlement, reason } => {
                    warn!(
                        product_id = %entitlement.product_id,
                        %reason,
                        "dropping unverified entitlement"
                    );
                }
            }
        }

        for transaction_id in processed {
            self.store.finish(transaction_id).await;
        }

        let changed = {
            let mut owned = self.owned.write().await;
            if *owned == next {
                false
            } else {
                *owned = next;
                true
            }
        };

        if changed {
            let ids = self.owned_ids().await;
            info!(owned = ?ids, "entitlements reconciled");
            self.broadcaster
                .broadcast("entitlements.changed", serde_json::json!({ "owned": ids }));
        }
        tracker.finish();
    }

    // ─── Purchase ─────────────────────────────────────────────────────────────

    /// Start the buy flow for one product.
    ///
    /// Serialized per store: a second call while one is outstanding returns
    /// [`PurchaseOutcome::AlreadyInFlight`] without reaching the external
    /// store. Cancellation and deferral are no-op outcomes. A transaction that
    /// fails verification yields [`StoreError::Verification`] and leaves the
    /// owned set untouched.
    pub async fn purchase(&self, product: &Product) -> Result<PurchaseOutcome, StoreError> {
        if self
            .purchase_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(product_id = %product.id, "purchase already in flight — ignoring");
            return Ok(PurchaseOutcome::AlreadyInFlight);
        }

        let result = self.purchase_inner(product).await;
        self.purchase_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn purchase_inner(&self, product: &Product) -> Result<PurchaseOutcome, StoreError> {
        match self.store.buy(&product.id).await? {
            PurchaseResult::Purchased(outcome) => {
                let transaction = outcome.into_verified()?;
                // Deliver first, then acknowledge.
                self.reconcile().await;
                self.store.finish(transaction.transaction_id).await;
                info!(product_id = %product.id, "purchase completed");
                Ok(PurchaseOutcome::Purchased)
            }
            PurchaseResult::Cancelled => {
                debug!(product_id = %product.id, "purchase cancelled by user");
                Ok(PurchaseOutcome::Cancelled)
            }
            PurchaseResult::Pending => {
                info!(product_id = %product.id, "purchase pending external approval");
                Ok(PurchaseOutcome::Pending)
            }
        }
    }

    // ─── Update listener ──────────────────────────────────────────────────────

    /// Spawn the background task that consumes the store's transaction-update
    /// stream for the lifetime of this store.
    ///
    /// Each verified update triggers a reconciliation pass and is then
    /// acknowledged; unverified updates are dropped with a log entry. The task
    /// holds only a weak reference, so dropping the store ends it.
    pub fn spawn_listener(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut rx = self.store.transaction_updates();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(update) => {
                        let Some(store) = weak.upgrade() else { break };
                        store.handle_update(update).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "transaction update stream lagged — reconciling");
                        let Some(store) = weak.upgrade() else { break };
                        store.reconcile().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Some(previous) = lock_unpoisoned(&self.listener).replace(handle) {
            previous.abort();
        }
    }

    async fn handle_update(&self, update: VerificationOutcome) {
        match update {
            VerificationOutcome::Verified(transaction) => {
                self.reconcile().await;
                self.store.finish(transaction.transaction_id).await;
            }
            VerificationOutcome::Unverified { entitlement, reason } => {
                warn!(
                    product_id = %entitlement.product_id,
                    %reason,
                    "transaction update failed verification"
                );
            }
        }
    }

    /// Cancel the background listener. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = lock_unpoisoned(&self.listener).take() {
            handle.abort();
        }
    }
}

impl Drop for EntitlementStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_unpoisoned<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
