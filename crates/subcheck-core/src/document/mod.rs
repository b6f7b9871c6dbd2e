//! Subtitle Document
//!
//! Cue and document data model plus SRT parsing and serialization.

mod format;
mod models;

pub use format::{export_srt, export_srt_original, parse_srt};
pub use models::{Cue, CueLifecycle, Document, Edit};
