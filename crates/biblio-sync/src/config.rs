//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BIBLIO_DEVICE_ID=kiosk-north-wing                                  │
//! │     BIBLIO_REMOTE_ENDPOINT=https://ledger.example.edu/api              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/biblio-kiosk/sync.toml (Linux)                           │
//! │     ~/Library/Application Support/org.biblio.kiosk/sync.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     10s interval, batch 100, auto-generated device_id                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "North Wing Kiosk"
//!
//! [remote]
//! endpoint = "https://ledger.example.edu/api"
//! probe_timeout_secs = 3
//! request_timeout_secs = 10
//!
//! [sync]
//! enabled = true
//! interval_secs = 10
//! batch_size = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this kiosk device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier, stamped on every loan and transaction.
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "North Wing Kiosk").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Lending Kiosk".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Settings for the remote reconciliation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Endpoint URL of the remote store, if configured.
    /// When absent, the kiosk runs fully offline with a no-op remote.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Reachability probe timeout (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Upsert request timeout (seconds). No remote call blocks longer.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            endpoint: None,
            probe_timeout_secs: default_probe_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl RemoteSettings {
    /// Probe timeout as a Duration.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Whether background sync runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between sync cycles (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum transactions submitted per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u64 {
    10
}

fn default_batch_size() -> u32 {
    100
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: true,
            interval_secs: default_interval(),
            batch_size: default_batch_size(),
        }
    }
}

impl SyncSettings {
    /// Tick interval as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Remote endpoint settings.
    #[serde(default)]
    pub remote: RemoteSettings,

    /// Sync behavior settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        // Try to load from config file
        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        // Override with environment variables
        config.apply_env_overrides();

        // Validate the configuration
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

        // Ensure parent directory exists
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
        // Device ID must be present
        if self.device.id.is_empty() {
            return Err(SyncError::MissingDeviceId);
        }

        // If an endpoint is set, it must be a well-formed http(s) URL
        if let Some(ref endpoint) = self.remote.endpoint {
            let parsed = url::Url::parse(endpoint)?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(SyncError::InvalidUrl(format!(
                    "Endpoint must use http or https, got: {}",
                    endpoint
                )));
            }
        }

        // Intervals and batch size must be non-zero
        if self.sync.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }
        if self.sync.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "batch_size must be greater than 0".into(),
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // Device ID
        if let Ok(id) = std::env::var("BIBLIO_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        // Device name
        if let Ok(name) = std::env::var("BIBLIO_DEVICE_NAME") {
            self.device.name = name;
        }

        // Remote endpoint
        if let Ok(endpoint) = std::env::var("BIBLIO_REMOTE_ENDPOINT") {
            debug!(endpoint = %endpoint, "Overriding remote endpoint from environment");
            self.remote.endpoint = Some(endpoint);
        }

        // Sync enabled
        if let Ok(enabled) = std::env::var("BIBLIO_SYNC_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.sync.enabled = true,
                "0" | "false" | "no" => self.sync.enabled = false,
                other => warn!(value = %other, "Unknown BIBLIO_SYNC_ENABLED value"),
            }
        }

        // Sync interval
        if let Ok(interval) = std::env::var("BIBLIO_SYNC_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse::<u64>() {
                debug!(interval_secs = secs, "Overriding sync interval from environment");
                self.sync.interval_secs = secs;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "biblio", "kiosk").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("sync.toml")
        })
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns true if background sync should run.
    pub fn is_sync_enabled(&self) -> bool {
        self.sync.enabled
    }

    /// Returns the remote endpoint if configured.
    pub fn endpoint(&self) -> Option<&str> {
        self.remote.endpoint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.device.id.is_empty()); // Auto-generated
        assert!(config.sync.enabled);
        assert_eq!(config.sync.interval_secs, 10);
        assert_eq!(config.sync.batch_size, 100);
        assert!(config.remote.endpoint.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SyncConfig::default();
        assert!(config.validate().is_ok());

        // Empty device ID should fail
        config.device.id = String::new();
        assert!(config.validate().is_err());
        config.device.id = "kiosk-01".to_string();

        // Non-http endpoint should fail
        config.remote.endpoint = Some("ftp://ledger.example.edu".to_string());
        assert!(config.validate().is_err());

        // Valid https endpoint should pass
        config.remote.endpoint = Some("https://ledger.example.edu/api".to_string());
        assert!(config.validate().is_ok());

        // Zero interval should fail
        config.sync.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let config = SyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[sync]"));

        let parsed: SyncConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.device.id, config.device.id);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: SyncConfig = toml::from_str(
            r#"
            [device]
            id = "kiosk-front-desk"

            [remote]
            endpoint = "https://ledger.example.edu/api"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.device.id, "kiosk-front-desk");
        assert_eq!(parsed.sync.interval_secs, 10);
        assert_eq!(parsed.remote.probe_timeout_secs, 3);
        assert!(parsed.validate().is_ok());
    }
}
