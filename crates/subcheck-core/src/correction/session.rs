//! Correction Session
//!
//! Owns the document during correction and is the only component that
//! mutates a cue's edits, lifecycle, or display text. Drives correction
//! passes against a [`SuggestionProvider`], sequentially and in document
//! order, with pacing between per-cue calls and one bounded retry on
//! rate-limit failures.

use tracing::{debug, info, warn};

use super::reconcile::reconcile;
use crate::document::{Cue, CueLifecycle, Document, Edit};
use crate::error::{CoreError, CoreResult};
use crate::provider::{BatchItem, SuggestionProvider};

// =============================================================================
// Pass Options
// =============================================================================

/// Tuning knobs for a correction pass
#[derive(Clone, Debug)]
pub struct PassOptions {
    /// Delay between sequential per-cue provider calls, in milliseconds
    pub pacing_ms: u64,
    /// Backoff before the single rate-limit retry, in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            pacing_ms: 100,
            retry_backoff_ms: 2000,
        }
    }
}

// =============================================================================
// Pass Summary
// =============================================================================

/// One recorded per-cue provider failure
#[derive(Clone, Debug)]
pub struct PassError {
    /// Document position of the affected cue
    pub position: usize,
    /// Sequence number of the affected cue
    pub sequence_number: u32,
    /// Error description
    pub message: String,
}

/// Aggregated result of a correction pass.
///
/// Provider failures never abort a pass; they are collected here and
/// reported once at the end.
#[derive(Clone, Debug, Default)]
pub struct PassSummary {
    /// Number of cues processed (monotonically increased during the pass)
    pub processed: usize,
    /// Number of cues that received at least one suggestion
    pub corrected: usize,
    /// Per-cue failures; the affected cues stay untouched for this pass
    pub errors: Vec<PassError>,
}

impl PassSummary {
    /// Returns true if any cue failed during the pass
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// =============================================================================
// Session Stats
// =============================================================================

/// Status-line counters over the current document state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionStats {
    /// Total number of cues
    pub total: usize,
    /// Cues with suggestions awaiting a decision
    pub pending: usize,
    /// Cues the user has accepted (including manual edits)
    pub accepted: usize,
}

// =============================================================================
// Correction Session
// =============================================================================

/// Pass-scoped correction state over a document.
pub struct CorrectionSession {
    document: Document,
}

impl CorrectionSession {
    /// Creates a session over a parsed document
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Returns the document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consumes the session, returning the document
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Status counters for the current document state
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            total: self.document.len(),
            pending: self.document.pending().count(),
            accepted: self
                .document
                .cues
                .iter()
                .filter(|c| c.lifecycle == CueLifecycle::Accepted)
                .count(),
        }
    }

    // -------------------------------------------------------------------------
    // State Machine Operations
    // -------------------------------------------------------------------------

    /// Resets pass-scoped state on every cue.
    ///
    /// Idempotent: re-running correction never accumulates stale edits.
    /// Display text and the manually-edited flag survive across passes.
    pub fn start_pass(&mut self) {
        for cue in &mut self.document.cues {
            cue.edits.clear();
            cue.corrected_preview = None;
            cue.lifecycle = CueLifecycle::Untouched;
        }
    }

    /// Stores a provider's edits on a cue and recomputes its preview.
    ///
    /// A cue only enters `HasPendingEdits` when the edit list is non-empty;
    /// an empty result leaves it untouched.
    pub fn apply_provider_result(&mut self, position: usize, edits: Vec<Edit>) -> CoreResult<()> {
        let cue = self
            .document
            .get_mut(position)
            .ok_or(CoreError::CueNotFound(position))?;

        // Edits with no candidates cannot be applied or displayed.
        let edits: Vec<Edit> = edits.into_iter().filter(|e| !e.candidates.is_empty()).collect();

        if edits.is_empty() {
            cue.edits.clear();
            cue.corrected_preview = None;
            return Ok(());
        }

        cue.corrected_preview = Some(reconcile(&cue.original_text, &edits));
        cue.edits = edits;
        cue.lifecycle = CueLifecycle::HasPendingEdits;
        Ok(())
    }

    /// Selects a different candidate for one edit and recomputes the preview.
    ///
    /// Out-of-range indices leave all state unchanged.
    pub fn choose_replacement(
        &mut self,
        position: usize,
        edit_index: usize,
        candidate_index: usize,
    ) -> CoreResult<()> {
        let cue = self
            .document
            .get_mut(position)
            .ok_or(CoreError::CueNotFound(position))?;

        let valid = cue
            .edits
            .get(edit_index)
            .is_some_and(|e| candidate_index < e.candidates.len());
        if !valid {
            return Err(CoreError::InvalidIndex {
                edit_index,
                candidate_index,
            });
        }

        cue.edits[edit_index].chosen_index = candidate_index;
        cue.corrected_preview = Some(reconcile(&cue.original_text, &cue.edits));
        Ok(())
    }

    /// Applies the corrected preview as the cue's display text.
    pub fn accept(&mut self, position: usize) -> CoreResult<()> {
        let cue = self
            .document
            .get_mut(position)
            .ok_or(CoreError::CueNotFound(position))?;

        let preview = cue
            .corrected_preview
            .clone()
            .ok_or(CoreError::NothingToAccept)?;

        cue.display_text = preview;
        cue.lifecycle = CueLifecycle::Accepted;
        Ok(())
    }

    /// Discards the cue's suggestions and reverts its display text to the
    /// original. A rejected cue is indistinguishable from one that never
    /// received suggestions.
    pub fn reject(&mut self, position: usize) -> CoreResult<()> {
        let cue = self
            .document
            .get_mut(position)
            .ok_or(CoreError::CueNotFound(position))?;

        cue.edits.clear();
        cue.corrected_preview = None;
        cue.display_text = cue.original_text.clone();
        cue.lifecycle = CueLifecycle::Untouched;
        cue.manually_edited = false;
        Ok(())
    }

    /// Accepts every cue with pending suggestions; returns how many
    /// transitioned. Accepted and untouched cues are skipped.
    pub fn accept_all(&mut self) -> usize {
        let positions: Vec<usize> = self.pending_positions();
        let mut count = 0;
        for position in positions {
            if self.accept(position).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Rejects every cue with pending suggestions; returns how many
    /// transitioned. Accepted and untouched cues are skipped.
    pub fn reject_all(&mut self) -> usize {
        let positions: Vec<usize> = self.pending_positions();
        for &position in &positions {
            let _ = self.reject(position);
        }
        positions.len()
    }

    /// Replaces the cue's display text with a user-entered value.
    ///
    /// Trims the input; a no-op when the trimmed text equals the current
    /// display text. A direct edit on a cue with pending suggestions
    /// supersedes them: the cue is promoted to accepted.
    pub fn edit_manually(&mut self, position: usize, new_text: &str) -> CoreResult<()> {
        let cue = self
            .document
            .get_mut(position)
            .ok_or(CoreError::CueNotFound(position))?;

        let trimmed = new_text.trim();
        if trimmed == cue.display_text {
            return Ok(());
        }

        cue.display_text = trimmed.to_string();
        cue.manually_edited = true;
        if cue.lifecycle == CueLifecycle::HasPendingEdits {
            cue.lifecycle = CueLifecycle::Accepted;
        }
        Ok(())
    }

    fn pending_positions(&self) -> Vec<usize> {
        self.document
            .cues
            .iter()
            .enumerate()
            .filter(|(_, c)| c.has_pending_edits())
            .map(|(i, _)| i)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Pass Driver
    // -------------------------------------------------------------------------

    /// Runs one full correction pass over the document.
    ///
    /// Cues are processed in document order. Batch-capable providers get
    /// fixed-size groups; per-cue providers get a pacing delay between
    /// sequential calls. The progress callback fires after each cue or
    /// batch with monotonically increasing processed counts.
    ///
    /// Per-cue failures leave the affected cue untouched for this pass and
    /// are aggregated into the summary; they never abort the pass.
    pub async fn run_pass<F>(
        &mut self,
        provider: &dyn SuggestionProvider,
        options: &PassOptions,
        mut progress: F,
    ) -> CoreResult<PassSummary>
    where
        F: FnMut(usize, usize),
    {
        if !provider.is_available() {
            return Err(CoreError::ProviderUnavailable(provider.name().to_string()));
        }

        info!(provider = provider.name(), cues = self.document.len(), "Starting correction pass");
        self.start_pass();

        let total = self.document.len();
        let mut summary = PassSummary::default();

        if provider.batch_size() > 1 {
            self.run_batched(provider, options, total, &mut summary, &mut progress)
                .await;
        } else {
            self.run_sequential(provider, options, total, &mut summary, &mut progress)
                .await;
        }

        summary.corrected = self.document.pending().count();
        info!(
            processed = summary.processed,
            corrected = summary.corrected,
            failed = summary.errors.len(),
            "Correction pass finished"
        );
        Ok(summary)
    }

    async fn run_sequential<F>(
        &mut self,
        provider: &dyn SuggestionProvider,
        options: &PassOptions,
        total: usize,
        summary: &mut PassSummary,
        progress: &mut F,
    ) where
        F: FnMut(usize, usize),
    {
        for position in 0..total {
            if let Some(text) = self.text_to_check(position) {
                match check_with_retry(provider, &text, options.retry_backoff_ms).await {
                    Ok(edits) => {
                        // Cue exists: position came from the document.
                        let _ = self.apply_provider_result(position, edits);
                    }
                    Err(CoreError::ProviderResponseUnparseable(msg)) => {
                        warn!(position, "Unparseable provider response, treating as no suggestions: {}", msg);
                    }
                    Err(e) => self.record_failure(summary, position, &e),
                }
                tokio::time::sleep(std::time::Duration::from_millis(options.pacing_ms)).await;
            }

            summary.processed += 1;
            progress(summary.processed, total);
        }
    }

    async fn run_batched<F>(
        &mut self,
        provider: &dyn SuggestionProvider,
        options: &PassOptions,
        total: usize,
        summary: &mut PassSummary,
        progress: &mut F,
    ) where
        F: FnMut(usize, usize),
    {
        let positions: Vec<usize> = (0..total).collect();

        for chunk in positions.chunks(provider.batch_size()) {
            let items: Vec<BatchItem> = chunk
                .iter()
                .filter_map(|&position| {
                    self.text_to_check(position)
                        .map(|text| BatchItem { id: position, text })
                })
                .collect();

            if !items.is_empty() {
                match check_batch_with_retry(provider, &items, options.retry_backoff_ms).await {
                    Ok(results) => {
                        for result in results {
                            let _ = self.apply_provider_result(result.id, result.edits);
                        }
                    }
                    Err(CoreError::ProviderResponseUnparseable(msg)) => {
                        warn!("Unparseable provider batch response, treating as no suggestions: {}", msg);
                    }
                    Err(e) => {
                        for item in &items {
                            self.record_failure(summary, item.id, &e);
                        }
                    }
                }
            }

            summary.processed += chunk.len();
            progress(summary.processed, total);
        }
    }

    /// Returns the text to send to the provider, or `None` when the cue
    /// should be skipped this pass.
    ///
    /// Manually edited cues are skipped: the user's direct edit supersedes
    /// suggestions, on this pass and on later ones. Empty cues have
    /// nothing to check.
    fn text_to_check(&self, position: usize) -> Option<String> {
        let cue: &Cue = self.document.get(position)?;
        if cue.manually_edited || cue.original_text.trim().is_empty() {
            debug!(position, "Skipping cue for this pass");
            return None;
        }
        Some(cue.original_text.clone())
    }

    fn record_failure(&self, summary: &mut PassSummary, position: usize, error: &CoreError) {
        let sequence_number = self
            .document
            .get(position)
            .map(|c| c.sequence_number)
            .unwrap_or(0);
        warn!(position, sequence_number, "Cue failed during pass: {}", error);
        summary.errors.push(PassError {
            position,
            sequence_number,
            message: error.to_string(),
        });
    }
}

// =============================================================================
// Retry Helpers
// =============================================================================

async fn check_with_retry(
    provider: &dyn SuggestionProvider,
    text: &str,
    backoff_ms: u64,
) -> CoreResult<Vec<Edit>> {
    match provider.check(text).await {
        Err(e) if e.is_rate_limit() => {
            warn!("Rate limited, retrying once after {} ms", backoff_ms);
            tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
            provider.check(text).await
        }
        other => other,
    }
}

async fn check_batch_with_retry(
    provider: &dyn SuggestionProvider,
    items: &[BatchItem],
    backoff_ms: u64,
) -> CoreResult<Vec<crate::provider::BatchResult>> {
    match provider.check_batch(items).await {
        Err(e) if e.is_rate_limit() => {
            warn!("Rate limited, retrying batch once after {} ms", backoff_ms);
            tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
            provider.check_batch(items).await
        }
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================
