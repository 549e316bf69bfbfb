//! # Kiosk Configuration
//!
//! App-level configuration: where the ledger lives and which borrowing
//! policy applies. Sync has its own file (see `biblio_sync::SyncConfig`);
//! this one covers everything else the daemon needs.
//!
//! ## File Format
//! ```toml
//! # kiosk.toml
//! [storage]
//! database_path = "/var/lib/biblio/ledger.db"
//!
//! [policy]
//! max_active_loans = 3
//! default_loan_days = 14
//! due_soon_horizon_days = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use biblio_core::LoanPolicy;

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the local ledger database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path to the SQLite ledger file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("org", "biblio", "kiosk")
        .map(|dirs| dirs.data_dir().join("ledger.db"))
        .unwrap_or_else(|| PathBuf::from("ledger.db"))
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: default_database_path(),
        }
    }
}

// =============================================================================
// Kiosk Configuration
// =============================================================================

/// Complete kiosk configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KioskConfig {
    /// Ledger storage settings.
    #[serde(default)]
    pub storage: StorageSettings,

    /// Borrowing policy (ceiling, durations, due-soon horizon).
    #[serde(default)]
    pub policy: LoanPolicy,
}

impl KioskConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// Same layering as the sync config: defaults, then file, then env.
    pub fn load(config_path: Option<PathBuf>) -> Self {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading kiosk config from file");
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str(&contents) {
                        Ok(parsed) => config = parsed,
                        Err(e) => warn!(?path, error = %e, "Bad kiosk config, using defaults"),
                    },
                    Err(e) => warn!(?path, error = %e, "Unreadable kiosk config, using defaults"),
                }
            } else {
                debug!(?path, "Kiosk config not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("BIBLIO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = PathBuf::from(path);
        }

        if let Ok(limit) = std::env::var("BIBLIO_LOAN_LIMIT") {
            if let Ok(n) = limit.parse::<u32>() {
                self.policy.max_active_loans = n;
            }
        }

        if let Ok(days) = std::env::var("BIBLIO_LOAN_DAYS") {
            if let Ok(n) = days.parse::<i64>() {
                self.policy.default_loan_days = n;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "biblio", "kiosk")
            .map(|dirs| dirs.config_dir().join("kiosk.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.policy.max_active_loans, 3);
        assert_eq!(config.policy.default_loan_days, 14);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: KioskConfig = toml::from_str(
            r#"
            [storage]
            database_path = "/tmp/ledger.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.database_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.policy.max_active_loans, 3);
    }
}
