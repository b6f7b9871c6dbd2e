//! Core Error Types
//!
//! Defines a unified error type for the correction engine.
//! Parsing errors deliberately do not appear here: malformed subtitle
//! blocks are dropped during parse, never surfaced as errors.

use thiserror::Error;

/// Core engine error type
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider rate limited: {0}")]
    ProviderRateLimited(String),

    #[error("Provider response unparseable: {0}")]
    ProviderResponseUnparseable(String),

    #[error("No provider configured")]
    NoProviderConfigured,

    // =========================================================================
    // Session Errors
    // =========================================================================
    #[error("Cue not found at position {0}")]
    CueNotFound(usize),

    #[error("Invalid candidate index: edit {edit_index}, candidate {candidate_index}")]
    InvalidIndex {
        edit_index: usize,
        candidate_index: usize,
    },

    #[error("Nothing to accept: cue has no corrected preview")]
    NothingToAccept,

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Returns true if the error should trigger a single retry with backoff
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, CoreError::ProviderRateLimited(_))
    }
}
