// SPDX-License-Identifier: MIT
//! Seam to the external purchase ledger.
//!
//! The ledger is an opaque, already-authenticated service: it knows which
//! products exist, which entitlements the user currently holds, and it pushes
//! transaction updates for purchases made outside a direct `buy` call (renewal,
//! restore on another device, refund). The core never invents entitlement
//! records of its own — everything flows through [`StoreFront`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ─── Products ─────────────────────────────────────────────────────────────────

/// Billing cadence of a product as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Auto-renewing monthly subscription.
    Monthly,
    /// Auto-renewing yearly subscription.
    Yearly,
    /// One-off purchase. Never grants premium status.
    NonRecurring,
}

impl ProductKind {
    /// Only recurring subscriptions count toward premium entitlement.
    pub fn is_recurring(&self) -> bool {
        matches!(self, ProductKind::Monthly | ProductKind::Yearly)
    }
}

/// A priced product as resolved by the external store. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Store SKU, unique.
    pub id: String,
    /// Localized price string for display ("$39.99").
    pub display_price: String,
    /// Price in minor currency units — used for ordering, never arithmetic.
    pub price_cents: i64,
    pub kind: ProductKind,
}

// ─── Entitlements ─────────────────────────────────────────────────────────────

/// A claim, provable via the store, that the user owns a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub product_id: String,
    /// Ledger transaction id — passed back to [`StoreFront::finish`].
    pub transaction_id: u64,
    pub kind: ProductKind,
    pub acquired_at: DateTime<Utc>,
}

/// Result of the store's cryptographic check on one entitlement.
///
/// Unverified entitlements carry the claim but must never be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified(Entitlement),
    Unverified { entitlement: Entitlement, reason: String },
}

impl VerificationOutcome {
    /// The claimed entitlement, regardless of verification status.
    pub fn entitlement(&self) -> &Entitlement {
        match self {
            VerificationOutcome::Verified(e) => e,
            VerificationOutcome::Unverified { entitlement, .. } => entitlement,
        }
    }

    /// Unwrap a verified entitlement, or fail with [`StoreError::Verification`].
    pub fn into_verified(self) -> Result<Entitlement, StoreError> {
        match self {
            VerificationOutcome::Verified(e) => Ok(e),
            VerificationOutcome::Unverified { entitlement, reason } => {
                Err(StoreError::Verification {
                    product_id: entitlement.product_id,
                    reason,
                })
            }
        }
    }
}

/// Outcome of a `buy` call as reported by the store.
///
/// `Cancelled` and `Pending` are not errors — the caller observes a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseResult {
    /// The store produced a transaction; it still has to pass verification.
    Purchased(VerificationOutcome),
    /// The user backed out of the payment sheet.
    Cancelled,
    /// Deferred — e.g. awaiting parental approval. A later transaction update
    /// will deliver the result.
    Pending,
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Errors surfaced by the external store. Never fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("entitlement for {product_id} failed store verification: {reason}")]
    Verification { product_id: String, reason: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ─── The seam ─────────────────────────────────────────────────────────────────

/// Interface to the external purchase ledger.
///
/// Implementations wrap the platform's store client; tests substitute a fake.
#[async_trait]
pub trait StoreFront: Send + Sync {
    /// Resolve product ids into priced [`Product`] records. One call per
    /// invocation; order of the result is unspecified.
    async fn list_products(&self, ids: &[&str]) -> Result<Vec<Product>, StoreError>;

    /// Enumerate every entitlement the ledger currently lists for this user,
    /// each with its verification outcome. An expired or refunded subscription
    /// simply stops appearing here.
    async fn current_entitlements(&self) -> Vec<VerificationOutcome>;

    /// Subscribe to transaction updates that did not come from a direct `buy`
    /// call. The stream lives as long as the store; dropping the receiver
    /// unsubscribes.
    fn transaction_updates(&self) -> broadcast::Receiver<VerificationOutcome>;

    /// Start the buy flow for one product. Bounded by the store's own timeout.
    async fn buy(&self, product_id: &str) -> Result<PurchaseResult, StoreError>;

    /// Acknowledge a processed transaction so the ledger stops redelivering it.
    async fn finish(&self, transaction_id: u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entitlement(product_id: &str) -> Entitlement {
        Entitlement {
            product_id: product_id.to_string(),
            transaction_id: 1,
            kind: ProductKind::Yearly,
            acquired_at: Utc::now(),
        }
    }

    #[test]
    fn recurring_kinds() {
        assert!(ProductKind::Monthly.is_recurring());
        assert!(ProductKind::Yearly.is_recurring());
        assert!(!ProductKind::NonRecurring.is_recurring());
    }

    #[test]
    fn into_verified_unwraps() {
        let outcome = VerificationOutcome::Verified(entitlement("p1"));
        assert_eq!(outcome.into_verified().unwrap().product_id, "p1");
    }

    #[test]
    fn into_verified_rejects_unverified() {
        let outcome = VerificationOutcome::Unverified {
            entitlement: entitlement("p1"),
            reason: "bad signature".to_string(),
        };
        let err = outcome.into_verified().unwrap_err();
        assert!(matches!(err, StoreError::Verification { .. }));
        assert!(err.to_string().contains("bad signature"));
    }
}
