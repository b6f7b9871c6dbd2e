//! Core Type Definitions
//!
//! Fundamental types shared across the correction engine.

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

// =============================================================================
// Span
// =============================================================================

use serde::{Deserialize, Serialize};

/// A character offset+length region within a specific text snapshot.
///
/// Offsets are 0-based character positions (not bytes) into the text the
/// span was computed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Start position in characters
    pub offset: usize,
    /// Length in characters
    pub length: usize,
}

impl Span {
    /// Creates a new span
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// End position (exclusive) in characters
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Returns true if the span fits entirely within a text of `char_len` characters
    pub fn fits(&self, char_len: usize) -> bool {
        self.end() <= char_len
    }
}

// =============================================================================
// Tests
// =============================================================================
