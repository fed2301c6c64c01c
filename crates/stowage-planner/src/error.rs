//! # Planner Error Types
//!
//! Errors of the application layer and the serialisable error callers see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Planner                            │
//! │                                                                         │
//! │  config.rs ── io / toml ──────────► PlannerError ──┐                   │
//! │                                                     │                   │
//! │  commands.rs ── bad JSON ─────────► PlannerError ──┼──► ApiError ──►   │
//! │                                                     │   { code,         │
//! │  stowage-core ── CoreError ─────────────────────────┘     message }     │
//! │                                                                         │
//! │  Rejected tier layouts and overloaded payloads are ApiErrors too:      │
//! │  a command never "succeeds" past a capacity violation.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use stowage_core::CoreError;
use thiserror::Error;

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Failures of the planner itself (config, I/O, request decoding).
#[derive(Debug, Error)]
pub enum PlannerError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration values are inconsistent.
    #[error("Invalid planner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Request file could not be read.
    #[error("Failed to read request: {0}")]
    RequestUnreadable(String),

    /// Request body is not valid JSON for the command.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for PlannerError {
    fn from(err: std::io::Error) -> Self {
        PlannerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for PlannerError {
    fn from(err: toml::de::Error) -> Self {
        PlannerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for PlannerError {
    fn from(err: toml::ser::Error) -> Self {
        PlannerError::ConfigSaveFailed(err.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::InvalidRequest(err.to_string())
    }
}

// =============================================================================
// API Error
// =============================================================================

/// Error returned from planner commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CAPACITY_EXCEEDED",
///   "message": "Payload exceeds capacity of vehicle VAN-1: Weight exceeds capacity by 50 kg (1050 kg / 1000 kg)"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request could not be decoded or had invalid values
    ValidationError,

    /// Tier layout failed validation
    InvalidTierConfiguration,

    /// Payload over vehicle capacity
    CapacityExceeded,

    /// Planner configuration problem
    ConfigError,

    /// Anything else
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts engine errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::CapacityExceeded { .. } => ErrorCode::CapacityExceeded,
            CoreError::InvalidConfiguration(_) => ErrorCode::InvalidTierConfiguration,
            CoreError::InvalidDimension { .. }
            | CoreError::InvalidVolume(_)
            | CoreError::InvalidSlotKey { .. } => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Converts planner errors to API errors.
impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::Core(core) => ApiError::from(core),
            PlannerError::InvalidConfig(_)
            | PlannerError::ConfigLoadFailed(_)
            | PlannerError::ConfigSaveFailed(_) => {
                ApiError::new(ErrorCode::ConfigError, err.to_string())
            }
            PlannerError::RequestUnreadable(_) | PlannerError::InvalidRequest(_) => {
                ApiError::validation(err.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
