//! SRT Parsing and Export
//!
//! Parses loosely-specified SubRip content into a [`Document`] and renders
//! documents back into the canonical text form.
//!
//! Parsing is deliberately lenient: a block that fails structural checks
//! (too few lines, bad index, bad timecode line) is silently dropped rather
//! than failing the whole file. Tolerating garbage from heterogeneous
//! authoring tools is a feature of this format, not an error condition.

use tracing::debug;

use super::models::{Cue, Document};
use crate::text::sanitize;
use crate::timecode::parse_time_range;

// =============================================================================
// Parsing
// =============================================================================

/// Parses raw SRT content into a document.
///
/// Accepts CRLF, LF, and CR line endings. Blocks are separated by one or
/// more blank lines; malformed blocks are dropped without error.
pub fn parse_srt(content: &str) -> Document {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut cues = Vec::new();

    for block in normalized.trim().split("\n\n") {
        match parse_block(block) {
            Some(cue) => cues.push(cue),
            None => {
                if !block.trim().is_empty() {
                    debug!("Dropping malformed subtitle block: {:?}", block);
                }
            }
        }
    }

    Document::new(cues)
}

/// Parses one blank-line-delimited block into a cue, or `None` if the
/// block is structurally malformed.
fn parse_block(block: &str) -> Option<Cue> {
    let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();

    if lines.len() < 2 {
        return None;
    }

    let sequence_number: u32 = lines[0].trim().parse().ok()?;
    let (start_time, end_time, start_time_text, end_time_text) = parse_time_range(lines[1])?;

    let text = sanitize(&lines[2..].join("\n"));

    Some(Cue::new(
        sequence_number,
        start_time,
        end_time,
        &start_time_text,
        &end_time_text,
        &text,
    ))
}

// =============================================================================
// Export
// =============================================================================

/// Serializes a document to canonical SRT text using each cue's current
/// display text.
///
/// Output is deterministic: same cue state, byte-identical text.
pub fn export_srt(document: &Document) -> String {
    render(document, |cue| &cue.display_text)
}

/// Serializes a document using the original (pre-correction) text of
/// every cue.
pub fn export_srt_original(document: &Document) -> String {
    render(document, |cue| &cue.original_text)
}

fn render<'a>(document: &'a Document, text_of: impl Fn(&'a Cue) -> &'a str) -> String {
    document
        .cues
        .iter()
        .map(|cue| {
            format!(
                "{}\n{} --> {}\n{}\n",
                cue.sequence_number,
                cue.start_time_text,
                cue.end_time_text,
                text_of(cue)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Parsing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_basic() {
        let srt = "1\n00:00:01,000 --> 00:00:04,000\nHallo Welt\n\n2\n00:00:05,500 --> 00:00:08,000\nZweiter Untertitel\n";

        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 2);

        assert_eq!(doc.cues[0].sequence_number, 1);
        assert_eq!(doc.cues[0].start_time, 1.0);
        assert_eq!(doc.cues[0].end_time, 4.0);
        assert_eq!(doc.cues[0].display_text, "Hallo Welt");

        assert_eq!(doc.cues[1].sequence_number, 2);
        assert_eq!(doc.cues[1].start_time, 5.5);
    }

    #[test]
    fn test_parse_strips_markup() {
        let srt = "3\n00:00:05,000 --> 00:00:07,000\n<b>Hallo Welt</b>\n";

        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 1);

        let cue = &doc.cues[0];
        assert_eq!(cue.sequence_number, 3);
        assert_eq!(cue.start_time, 5.0);
        assert_eq!(cue.end_time, 7.0);
        assert_eq!(cue.display_text, "Hallo Welt");
        assert_eq!(cue.original_text, "Hallo Welt");
    }

    #[test]
    fn test_parse_multiline_text() {
        let srt = "1\n00:00:00,000 --> 00:00:05,000\nZeile eins\nZeile zwei\n";

        let doc = parse_srt(srt);
        assert_eq!(doc.cues[0].display_text, "Zeile eins\nZeile zwei");
    }

    #[test]
    fn test_parse_line_ending_variants() {
        let crlf = "1\r\n00:00:01,000 --> 00:00:02,000\r\nText\r\n";
        let cr = "1\r00:00:01,000 --> 00:00:02,000\rText\r";

        assert_eq!(parse_srt(crlf).len(), 1);
        assert_eq!(parse_srt(cr).len(), 1);
    }

    #[test]
    fn test_parse_separator_variants() {
        let srt = "1\n00:00:01.000 --> 00:00:02:000\nText\n";

        let doc = parse_srt(srt);
        assert_eq!(doc.cues[0].start_time_text, "00:00:01,000");
        assert_eq!(doc.cues[0].end_time_text, "00:00:02,000");
    }

    #[test]
    fn test_parse_drops_malformed_block_keeps_neighbors() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nGut\n\nnur eine Zeile\n\n7\n00:00:05,000 --> 00:00:06,000\nAuch gut\n";

        let doc = parse_srt(srt);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.cues[0].sequence_number, 1);
        assert_eq!(doc.cues[1].sequence_number, 7);
    }

    #[test]
    fn test_parse_drops_bad_index_and_bad_timecode() {
        let bad_index = "eins\n00:00:01,000 --> 00:00:02,000\nText\n";
        let bad_time = "1\nkeine Zeitangabe\nText\n";

        assert_eq!(parse_srt(bad_index).len(), 0);
        assert_eq!(parse_srt(bad_time).len(), 0);
    }

    #[test]
    fn test_parse_preserves_noncontiguous_sequence_numbers() {
        let srt = "5\n00:00:01,000 --> 00:00:02,000\na\n\n5\n00:00:03,000 --> 00:00:04,000\nb\n\n99\n00:00:05,000 --> 00:00:06,000\nc\n";

        let doc = parse_srt(srt);
        let numbers: Vec<u32> = doc.cues.iter().map(|c| c.sequence_number).collect();
        assert_eq!(numbers, vec![5, 5, 99]);
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(parse_srt("").is_empty());
        assert!(parse_srt("\n\n\n").is_empty());
    }

    // -------------------------------------------------------------------------
    // Export Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_export_canonical_form() {
        let doc = parse_srt("1\n00:00:01.000 --> 00:00:04.000\nHallo\n\n2\n00:00:05,500 --> 00:00:08,000\nWelt\n");

        let out = export_srt(&doc);
        assert_eq!(
            out,
            "1\n00:00:01,000 --> 00:00:04,000\nHallo\n\n2\n00:00:05,500 --> 00:00:08,000\nWelt\n"
        );
    }

    #[test]
    fn test_export_is_deterministic() {
        let doc = parse_srt("1\n00:00:01,000 --> 00:00:02,000\nText\n");
        assert_eq!(export_srt(&doc), export_srt(&doc));
    }

    #[test]
    fn test_export_original_ignores_display_edits() {
        let mut doc = parse_srt("1\n00:00:01,000 --> 00:00:02,000\nOriginal\n");
        doc.cues[0].display_text = "Geändert".to_string();

        assert!(export_srt(&doc).contains("Geändert"));
        assert!(export_srt_original(&doc).contains("Original"));
    }

    // -------------------------------------------------------------------------
    // Roundtrip Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_serialize_parse_is_stable() {
        // Markup stripping is lossy by design; after one parse the
        // document is a fixed point of parse(serialize(..)).
        let srt = "1\n00:00:01,000 --> 00:00:04,000\n<i>Hallo</i>\n\n2\n00:00:05.500 --> 00:00:08.000\nWelt\n";

        let first = parse_srt(srt);
        let second = parse_srt(&export_srt(&first));

        assert_eq!(first, second);
    }
}
