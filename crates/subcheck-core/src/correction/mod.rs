//! Correction Workflow
//!
//! Span-edit reconciliation and the per-document correction session that
//! drives provider passes and the accept/reject lifecycle.

mod reconcile;
mod session;

pub use reconcile::reconcile;
pub use session::{CorrectionSession, PassError, PassOptions, PassSummary, SessionStats};
