// SPDX-License-Identifier: MIT
//! Daily notification preference and schedule.
//!
//! The OS owns actual delivery; this module owns the persisted opt-in flag,
//! its first-launch semantics, and the pure computation of when the next
//! daily reminder should fire and what it should say.
//!
//! First-launch semantics: until the user has explicitly chosen, the flag is
//! absent from storage. The first authorization grant then enables
//! notifications by default; after that, only the user's own toggle changes it.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::config::NotificationsConfig;
use crate::storage::KeyValue;

/// Fixed storage key for the opt-in flag.
pub const NOTIFICATIONS_ENABLED_KEY: &str = "notifications.enabled";

const MESSAGES: [&str; 8] = [
    "Start your day with a fresh quote",
    "A new day brings new words worth keeping",
    "Find a thought to carry with you today",
    "Let today's quote set the tone",
    "A little wisdom goes a long way",
    "Today is a good day for reflection",
    "Discover something worth remembering",
    "One line can change the whole day",
];

// ─── Preference ───────────────────────────────────────────────────────────────

/// Persisted notification opt-in. `None` means the user has never chosen.
pub struct NotificationSettings {
    kv: Arc<dyn KeyValue>,
    enabled: RwLock<Option<bool>>,
}

impl NotificationSettings {
    /// Load the persisted flag once. Read failures are treated as "never
    /// chosen" rather than failing startup.
    pub async fn load(kv: Arc<dyn KeyValue>) -> Self {
        let enabled = match kv.get(NOTIFICATIONS_ENABLED_KEY).await {
            Ok(Some(bytes)) => Some(bytes.first().is_some_and(|b| *b != 0)),
            Ok(None) => None,
            Err(e) => {
                warn!(err = %e, "failed to read notification preference");
                None
            }
        };
        Self {
            kv,
            enabled: RwLock::new(enabled),
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.enabled.read().await.unwrap_or(false)
    }

    /// True once the user has explicitly toggled the preference.
    pub async fn has_user_chosen(&self) -> bool {
        self.enabled.read().await.is_some()
    }

    /// Record an explicit user choice. Persists best-effort before returning.
    pub async fn set_enabled(&self, enabled: bool) {
        *self.enabled.write().await = Some(enabled);
        let byte = [u8::from(enabled)];
        if let Err(e) = self.kv.set(NOTIFICATIONS_ENABLED_KEY, &byte).await {
            warn!(err = %e, "failed to persist notification preference");
        }
    }

    /// Reconcile the flag with the platform's authorization state.
    ///
    /// Revoked authorization turns the flag off; the first grant ever turns it
    /// on (the user has made no choice yet). Returns whether notifications are
    /// enabled afterwards.
    pub async fn sync_authorization(&self, authorized: bool) -> bool {
        if !authorized {
            if self.is_enabled().await {
                self.set_enabled(false).await;
            }
            return false;
        }
        if !self.has_user_chosen().await {
            self.set_enabled(true).await;
        }
        self.is_enabled().await
    }

    /// Forget the user's choice (testing/support flows).
    pub async fn reset_choice(&self) {
        *self.enabled.write().await = None;
        if let Err(e) = self.kv.remove(NOTIFICATIONS_ENABLED_KEY).await {
            warn!(err = %e, "failed to clear notification preference");
        }
    }
}

/// Settings-screen status line.
pub fn status_text(authorized: bool, enabled: bool) -> &'static str {
    if !authorized {
        "Notifications not authorized"
    } else if !enabled {
        "Get notified about new content"
    } else {
        "Notifications are enabled"
    }
}

// ─── Schedule ─────────────────────────────────────────────────────────────────

/// The next daily reminder: when it fires and what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPlan {
    pub fire_at: NaiveDateTime,
    pub message: &'static str,
}

/// Compute the next fire time strictly after `now`.
///
/// Each day gets one slot inside the configured window (default 06:30–07:30),
/// offset by a per-day deterministic jitter so the reminder does not land at
/// the identical minute every morning. If today's slot has already passed,
/// tomorrow's is used.
pub fn next_fire_time(now: NaiveDateTime, config: &NotificationsConfig) -> NaiveDateTime {
    let today = slot_for(now.date(), config);
    if today > now {
        today
    } else {
        slot_for(now.date().succ_opt().unwrap_or(now.date()), config)
    }
}

/// Message for a given day — deterministic rotation over the fixed list.
pub fn message_for(date: NaiveDate) -> &'static str {
    let day = date.num_days_from_ce().unsigned_abs() as usize;
    MESSAGES[day % MESSAGES.len()]
}

/// The full plan for the next reminder after `now`.
pub fn plan(now: NaiveDateTime, config: &NotificationsConfig) -> NotificationPlan {
    let fire_at = next_fire_time(now, config);
    NotificationPlan {
        fire_at,
        message: message_for(fire_at.date()),
    }
}

fn slot_for(date: NaiveDate, config: &NotificationsConfig) -> NaiveDateTime {
    let hour = config.window_hour.min(23);
    let minute = config.window_minute.min(59);
    let base = date
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| date.and_hms_opt(6, 30, 0).expect("06:30 is always valid"));
    base + Duration::minutes(i64::from(jitter_minutes(date, config)))
}

// Stable within a day, spread across days.
fn jitter_minutes(date: NaiveDate, config: &NotificationsConfig) -> u32 {
    // Configured jitter is clamped like the window fields in `slot_for`:
    // saturating keeps a u32::MAX config from overflowing, and the cap keeps
    // the slot within roughly a day of the window start.
    let span = config.jitter_minutes.saturating_add(1).min(24 * 60);
    let day = date.num_days_from_ce().unsigned_abs();
    day.wrapping_mul(37) % span
}
