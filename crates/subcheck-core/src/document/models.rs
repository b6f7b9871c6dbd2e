//! Subtitle Document Data Models
//!
//! Defines the structured records a subtitle file parses into and the
//! suggested-edit model the correction engine operates on.

use serde::{Deserialize, Serialize};

use crate::types::{Span, TimeSec};

// =============================================================================
// Cue Lifecycle
// =============================================================================

/// Per-cue correction lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueLifecycle {
    /// No suggestions known for this cue
    #[default]
    Untouched,
    /// A correction pass found at least one edit
    HasPendingEdits,
    /// The user applied a correction (or edited the text directly)
    Accepted,
}

// =============================================================================
// Edit
// =============================================================================

/// One suggested span replacement within a cue's original text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    /// Span into the original text the edit was computed against
    pub span: Span,
    /// Substring of the original text at that span (for display)
    pub matched_text: String,
    /// Candidate replacements, first is the default choice; never empty
    pub candidates: Vec<String>,
    /// Index of the currently chosen candidate
    pub chosen_index: usize,
    /// Human-readable rationale (rule name / explanation); display-only
    pub reason: String,
}

impl Edit {
    /// Creates a new edit with the default (first) candidate chosen.
    pub fn new(span: Span, matched_text: &str, candidates: Vec<String>, reason: &str) -> Self {
        debug_assert!(!candidates.is_empty(), "edit must have at least one candidate");
        Self {
            span,
            matched_text: matched_text.to_string(),
            candidates,
            chosen_index: 0,
            reason: reason.to_string(),
        }
    }

    /// Returns the currently chosen replacement text.
    pub fn chosen(&self) -> &str {
        self.candidates
            .get(self.chosen_index)
            .or_else(|| self.candidates.first())
            .map(String::as_str)
            .unwrap_or(&self.matched_text)
    }
}

// =============================================================================
// Cue
// =============================================================================

/// A single timed subtitle entry.
///
/// `sequence_number`, the time fields, and `original_text` never change
/// after parse. `display_text` is the working text shown to the user and
/// exported; `corrected_preview` is always derived from `original_text`
/// plus the current edits and is never hand-edited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// Sequence number as given in the source file, preserved verbatim
    /// (not necessarily contiguous or unique)
    pub sequence_number: u32,
    /// Start time in seconds
    pub start_time: TimeSec,
    /// End time in seconds
    pub end_time: TimeSec,
    /// Canonical display string for the start time
    pub start_time_text: String,
    /// Canonical display string for the end time
    pub end_time_text: String,
    /// Current working text; mutated by accept and manual edits
    pub display_text: String,
    /// Immutable snapshot of the text as parsed
    pub original_text: String,
    /// Text produced by reconciling the chosen edits against
    /// `original_text`; recomputed, never hand-edited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_preview: Option<String>,
    /// Edits from the last correction pass; empty after reject or reset
    pub edits: Vec<Edit>,
    /// Correction lifecycle state
    pub lifecycle: CueLifecycle,
    /// Set when the user hand-edits `display_text` directly
    pub manually_edited: bool,
}

impl Cue {
    /// Creates a cue from parsed fields, in the untouched state.
    pub fn new(
        sequence_number: u32,
        start_time: TimeSec,
        end_time: TimeSec,
        start_time_text: &str,
        end_time_text: &str,
        text: &str,
    ) -> Self {
        Self {
            sequence_number,
            start_time,
            end_time,
            start_time_text: start_time_text.to_string(),
            end_time_text: end_time_text.to_string(),
            display_text: text.to_string(),
            original_text: text.to_string(),
            corrected_preview: None,
            edits: vec![],
            lifecycle: CueLifecycle::Untouched,
            manually_edited: false,
        }
    }

    /// Returns the duration of this cue in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_time - self.start_time
    }

    /// Returns true if the cue is visible at the given time
    pub fn is_visible_at(&self, time_sec: TimeSec) -> bool {
        time_sec >= self.start_time && time_sec <= self.end_time
    }

    /// Returns true if the cue has suggestions awaiting a decision
    pub fn has_pending_edits(&self) -> bool {
        self.lifecycle == CueLifecycle::HasPendingEdits
    }
}

// =============================================================================
// Document
// =============================================================================

/// An ordered sequence of cues; insertion order is file order.
///
/// Ordering is load-bearing for export and for the video-time lookup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Cues in file order
    pub cues: Vec<Cue>,
}

impl Document {
    /// Creates a document from parsed cues
    pub fn new(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    /// Returns the number of cues
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Returns true if the document has no cues
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Gets a cue by document position
    pub fn get(&self, position: usize) -> Option<&Cue> {
        self.cues.get(position)
    }

    /// Gets a mutable cue by document position
    pub fn get_mut(&mut self, position: usize) -> Option<&mut Cue> {
        self.cues.get_mut(position)
    }

    /// Returns the first cue visible at the given playhead time
    pub fn cue_at_time(&self, time_sec: TimeSec) -> Option<&Cue> {
        self.cues.iter().find(|c| c.is_visible_at(time_sec))
    }

    /// Returns cues with suggestions awaiting a decision
    pub fn pending(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter().filter(|c| c.has_pending_edits())
    }

    /// Returns the total duration spanned by cues
    pub fn duration(&self) -> TimeSec {
        self.cues.last().map(|c| c.end_time).unwrap_or(0.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
