//! # Sync Error Types
//!
//! Error types for remote fetch, mutation delivery, and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Payload             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RequestFailed  │  │  MarkupPayload          │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  SerializationFailed    │ │
//! │  │  ConfigLoad/Save│  │  HttpStatus     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │    Domain       │  │              Internal                       │  │
//! │  │                 │  │                                             │  │
//! │  │  Domain(Core)   │  │  ChannelClosed (queue worker gone)          │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transport errors are absorbed at the service boundary for reads (the
//! cache answers instead) and retried by the write queue for mutations.
//! Domain errors are the only ones a register operator ever sees.

use thiserror::Error;

use caja_core::CoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering fetch, delivery, and configuration failures.
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

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// HTTP request failed before a response arrived.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Server answered with a non-success status code.
    #[error("Server answered with HTTP {status}")]
    HttpStatus { status: u16 },

    // =========================================================================
    // Payload Errors
    // =========================================================================
    /// Server answered with HTML where JSON was expected.
    ///
    /// Sheet backends do this for auth failures and error pages: HTTP 200
    /// with a login or error page as the body.
    #[error("Server answered with an HTML page instead of JSON")]
    MarkupPayload,

    /// Failed to serialize or deserialize a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    /// Business rule violation from caja-core (validation, stock policy).
    #[error(transparent)]
    Domain(#[from] CoreError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Write queue worker is no longer running.
    #[error("Write queue is shut down")]
    ChannelClosed,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if let Some(status) = err.status() {
            SyncError::HttpStatus {
                status: status.as_u16(),
            }
        } else {
            SyncError::RequestFailed(err.to_string())
        }
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
    /// Returns true if this error is transient and the delivery can be retried.
    ///
    /// ## Retryable Errors
    /// - Request failures (connection refused, DNS, reset)
    /// - Timeouts
    /// - Server-side status codes (5xx) and throttling (429)
    ///
    /// ## Non-Retryable Errors
    /// - Client-side status codes (4xx other than 429)
    /// - HTML payloads (auth/deploy problem, retrying soon changes nothing)
    /// - Configuration and domain errors
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::RequestFailed(_) | SyncError::Timeout => true,
            SyncError::HttpStatus { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
