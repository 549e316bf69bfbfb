//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Remote      │  │     Local               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RemoteRejected │  │  DatabaseError          │ │
//! │  │  MissingDeviceId│  │  Timeout        │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │                 │  │  ChannelError           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Remote errors are SOFT: the agent logs them, leaves the batch         │
//! │  unsynced, and retries on the next tick. They never reach the          │
//! │  foreground borrow/return path.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Missing device ID (required for sync).
    #[error("Device ID not configured. Run initial setup first.")]
    MissingDeviceId,

    /// Invalid remote endpoint URL.
    #[error("Invalid remote endpoint: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Remote Errors (soft - retried on the next tick)
    // =========================================================================
    /// The remote store rejected the batch.
    #[error("Remote rejected batch: {0}")]
    RemoteRejected(String),

    /// Remote call exceeded its bounded timeout.
    #[error("Remote call timed out after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Ledger store query failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Failed to serialize a transaction record.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Channel send/receive failed (agent shut down).
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<biblio_db::DbError> for SyncError {
    fn from(err: biblio_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if this error is recoverable and the cycle can simply
    /// run again on the next tick.
    ///
    /// ## Retryable Errors
    /// - Remote rejections and timeouts (network or server trouble)
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Local storage failures (need operator attention)
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::RemoteRejected(_) | SyncError::Timeout(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingDeviceId
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
