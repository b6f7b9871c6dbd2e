//! subcheck-core
//!
//! Core library for subtitle proofreading: SRT parsing and normalization,
//! span-based correction suggestions from pluggable providers, a
//! reviewable accept/reject workflow, and canonical SRT export.
//!
//! The library is UI-agnostic. A frontend (CLI, desktop, service) loads a
//! document with [`document::parse_srt`], wraps it in a
//! [`correction::CorrectionSession`], runs a pass against a
//! [`provider::SuggestionProvider`], applies user decisions, and exports
//! with [`document::export_srt`].

mod error;
pub use error::{CoreError, CoreResult};

mod types;
pub use types::{Span, TimeSec};

pub mod correction;
pub mod document;
pub mod provider;
pub mod settings;
pub mod text;
pub mod timecode;
