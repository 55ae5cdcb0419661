// SPDX-License-Identifier: MIT
//! App configuration.
//!
//! Priority (highest to lowest): `QUOTEFEED_*` env vars, then
//! `{data_dir}/config.toml`, then built-in defaults. All TOML fields are
//! optional overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_MONTHLY_SKU: &str = "app.quotefeed.premium.monthly";
const DEFAULT_YEARLY_SKU: &str = "app.quotefeed.premium.yearly";

// ─── StoreConfig ──────────────────────────────────────────────────────────────

/// External store SKUs (`[store]` in config.toml).
///
/// Exactly two subscriptions exist; overrides are for staging storefronts,
/// not for growing the catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub monthly_sku: String,
    pub yearly_sku: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            monthly_sku: DEFAULT_MONTHLY_SKU.to_string(),
            yearly_sku: DEFAULT_YEARLY_SKU.to_string(),
        }
    }
}

// ─── NotificationsConfig ──────────────────────────────────────────────────────

/// Daily notification window (`[notifications]` in config.toml).
///
/// The daily reminder fires between `window_hour:window_minute` and
/// `jitter_minutes` later (default: 06:30–07:30).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub window_hour: u32,
    pub window_minute: u32,
    pub jitter_minutes: u32,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            window_hour: 6,
            window_minute: 30,
            jitter_minutes: 60,
        }
    }
}

// ─── ObservabilityConfig ──────────────────────────────────────────────────────

/// Observability knobs (`[observability]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log SQLite queries that exceed this threshold (milliseconds). Default: 100.
    /// Set to 0 to disable slow query logging.
    pub slow_query_threshold_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 100,
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    log: Option<String>,
    log_format: Option<String>,
    store: Option<StoreConfig>,
    notifications: Option<NotificationsConfig>,
    observability: Option<ObservabilityConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let raw = std::fs::read_to_string(&path).ok()?;
    match toml::from_str(&raw) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── AppConfig ────────────────────────────────────────────────────────────────

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the SQLite database and config.toml.
    pub data_dir: PathBuf,
    /// Log filter (`QUOTEFEED_LOG` env var, default: "info").
    pub log: String,
    /// Log output format: "pretty" (default) | "json".
    pub log_format: String,
    pub store: StoreConfig,
    pub notifications: NotificationsConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Build config from an optional explicit data dir + env + TOML file.
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir
            .or_else(|| std::env::var("QUOTEFEED_DATA_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let log = std::env::var("QUOTEFEED_LOG")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log)
            .unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("QUOTEFEED_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let store = toml.store.unwrap_or_default();
        let notifications = toml.notifications.unwrap_or_default();
        let observability = toml.observability.unwrap_or_default();

        Self {
            data_dir,
            log,
            log_format,
            store,
            notifications,
            observability,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/quotefeed
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("quotefeed");
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        // $XDG_DATA_HOME/quotefeed or ~/.local/share/quotefeed
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            if !xdg.is_empty() {
                return PathBuf::from(xdg).join("quotefeed");
            }
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("quotefeed");
        }
    }
    PathBuf::from(".quotefeed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_two_skus() {
        let cfg = StoreConfig::default();
        assert_ne!(cfg.monthly_sku, cfg.yearly_sku);
    }

    #[test]
    fn toml_overrides_store_skus() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
log = "debug"

[store]
monthly_sku = "staging.monthly"
yearly_sku = "staging.yearly"
"#,
        )
        .unwrap();

        let cfg = AppConfig::new(Some(dir.path().to_path_buf()));
        assert_eq!(cfg.store.monthly_sku, "staging.monthly");
        assert_eq!(cfg.store.yearly_sku, "staging.yearly");
        assert_eq!(cfg.notifications.window_hour, 6);
    }

    #[test]
    fn bad_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "not valid toml [[[").unwrap();

        let cfg = AppConfig::new(Some(dir.path().to_path_buf()));
        assert_eq!(cfg.store.monthly_sku, DEFAULT_MONTHLY_SKU);
    }
}
