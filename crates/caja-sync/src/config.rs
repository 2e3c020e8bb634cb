//! # Sync Configuration
//!
//! Configuration for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CAJA_ENDPOINT_URL=https://...                                      │
//! │     CAJA_STOCK_POLICY=reject                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/caja-pos/sync.toml (Linux)                               │
//! │     ~/Library/Application Support/com.caja.caja-pos/sync.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     8s fetch timeout, 200ms pacing, clamp stock policy                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [remote]
//! endpoint_url = "https://script.example.com/macros/s/XXX/exec"
//! fetch_timeout_secs = 8
//!
//! [queue]
//! pacing_delay_ms = 200
//! max_attempts = 3
//! initial_backoff_ms = 500
//! max_backoff_secs = 30
//!
//! [policy]
//! stock = "clamp"          # clamp | reject
//! purchase_restock = false
//!
//! [snapshot]
//! persist = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use caja_core::StockPolicy;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote Settings
// =============================================================================

/// Settings for the remote sheet endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Full URL of the deployed sheet web app.
    ///
    /// Fetches GET this URL; mutations POST to it. Required before the
    /// service can start.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Timeout for snapshot fetches (seconds).
    ///
    /// Kept short on purpose: a register must not stall behind a dead
    /// link, and the cache answers when the fetch gives up.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    8
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            endpoint_url: None,
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

// =============================================================================
// Queue Settings
// =============================================================================

/// Settings for the write queue worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Delay between consecutive deliveries (milliseconds).
    ///
    /// Sheet backends rate-limit aggressively; spacing writes out keeps a
    /// burst of checkout mutations under the limit.
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_ms: u64,

    /// Delivery attempts per mutation before it is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff duration (milliseconds) between retries.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds) between retries.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_pacing_delay() -> u64 {
    200
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    30
}

impl Default for QueueSettings {
    fn default() -> Self {
        QueueSettings {
            pacing_delay_ms: default_pacing_delay(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl QueueSettings {
    /// Returns the pacing delay as a [`Duration`].
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Returns the initial retry backoff as a [`Duration`].
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Returns the maximum retry backoff as a [`Duration`].
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Policy Settings
// =============================================================================

/// Business policy knobs that vary per shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    /// What happens when a sale asks for more units than are in stock.
    #[serde(default)]
    pub stock: StockPolicy,

    /// Whether recording a supplier purchase raises local stock levels.
    ///
    /// Off by default: many shops reconcile purchases against deliveries
    /// by hand and treat the purchase record as paperwork only.
    #[serde(default)]
    pub purchase_restock: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        PolicySettings {
            stock: StockPolicy::default(),
            purchase_restock: false,
        }
    }
}

// =============================================================================
// Snapshot Settings
// =============================================================================

/// Settings for snapshot persistence between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Whether to persist the cache to disk after successful fetches.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Explicit snapshot file path. Defaults to the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        SnapshotSettings {
            persist: true,
            path: None,
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
///
/// ## Example Config File
/// ```toml
/// [remote]
/// endpoint_url = "https://script.example.com/macros/s/XXX/exec"
///
/// [queue]
/// pacing_delay_ms = 200
///
/// [policy]
/// stock = "clamp"
/// purchase_restock = false
///
/// [snapshot]
/// persist = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote endpoint settings.
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Write queue settings.
    #[serde(default)]
    pub queue: QueueSettings,

    /// Business policy settings.
    #[serde(default)]
    pub policy: PolicySettings,

    /// Snapshot persistence settings.
    #[serde(default)]
    pub snapshot: SnapshotSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if let Some(ref endpoint) = self.remote.endpoint_url {
            let parsed = url::Url::parse(endpoint)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "Endpoint must be http or https, got: {}",
                    endpoint
                )));
            }
        }

        if self.remote.fetch_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "fetch_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.queue.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CAJA_ENDPOINT_URL") {
            debug!(url = %url, "Overriding endpoint URL from environment");
            self.remote.endpoint_url = Some(url);
        }

        if let Ok(secs) = std::env::var("CAJA_FETCH_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.remote.fetch_timeout_secs = s;
            }
        }

        if let Ok(ms) = std::env::var("CAJA_PACING_MS") {
            if let Ok(m) = ms.parse::<u64>() {
                debug!(pacing_ms = m, "Overriding pacing delay from environment");
                self.queue.pacing_delay_ms = m;
            }
        }

        if let Ok(policy) = std::env::var("CAJA_STOCK_POLICY") {
            match policy.parse::<StockPolicy>() {
                Ok(parsed) => self.policy.stock = parsed,
                Err(_) => warn!(policy = %policy, "Unknown stock policy in environment"),
            }
        }

        if let Ok(restock) = std::env::var("CAJA_PURCHASE_RESTOCK") {
            if let Ok(b) = restock.parse::<bool>() {
                self.policy.purchase_restock = b;
            }
        }

        if let Ok(persist) = std::env::var("CAJA_SNAPSHOT_PERSIST") {
            if let Ok(b) = persist.parse::<bool>() {
                self.snapshot.persist = b;
            }
        }

        if let Ok(path) = std::env::var("CAJA_SNAPSHOT_PATH") {
            self.snapshot.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "caja", "caja-pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the endpoint URL if configured.
    pub fn endpoint_url(&self) -> Option<&str> {
        self.remote.endpoint_url.as_deref()
    }

    /// Returns the fetch timeout as a [`Duration`].
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.fetch_timeout_secs)
    }

    /// Returns the stock policy for checkout.
    pub fn stock_policy(&self) -> StockPolicy {
        self.policy.stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(config.remote.endpoint_url.is_none());
        assert_eq!(config.remote.fetch_timeout_secs, 8);
        assert_eq!(config.queue.pacing_delay_ms, 200);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.policy.stock, StockPolicy::ClampToZero);
        assert!(!config.policy.purchase_restock);
        assert!(config.snapshot.persist);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        assert!(config.validate().is_ok());

        // Non-HTTP scheme should fail
        config.remote.endpoint_url = Some("ftp://example.com/app".to_string());
        assert!(config.validate().is_err());

        // Valid HTTPS URL should pass
        config.remote.endpoint_url = Some("https://script.example.com/exec".to_string());
        assert!(config.validate().is_ok());

        // Zero retry budget should fail
        config.queue.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [remote]
            endpoint_url = "https://script.example.com/exec"

            [policy]
            stock = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.endpoint_url(),
            Some("https://script.example.com/exec")
        );
        assert_eq!(config.policy.stock, StockPolicy::RejectInsufficient);
        // Unspecified sections keep defaults
        assert_eq!(config.queue.pacing_delay_ms, 200);
        assert!(config.snapshot.persist);
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[remote]"));
        assert!(toml_str.contains("[queue]"));
        assert!(toml_str.contains("[policy]"));
    }

    #[test]
    fn test_env_overrides_take_priority() {
        // The only test touching these variables, so no parallel-test race.
        std::env::set_var("CAJA_PACING_MS", "450");
        std::env::set_var("CAJA_STOCK_POLICY", "reject");

        let mut config = SyncConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.queue.pacing_delay_ms, 450);
        assert_eq!(config.policy.stock, StockPolicy::RejectInsufficient);

        // An unparseable value is ignored; the rest still apply
        std::env::set_var("CAJA_STOCK_POLICY", "half-price");
        let mut config = SyncConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.policy.stock, StockPolicy::ClampToZero);
        assert_eq!(config.queue.pacing_delay_ms, 450);

        std::env::remove_var("CAJA_PACING_MS");
        std::env::remove_var("CAJA_STOCK_POLICY");
    }
}
