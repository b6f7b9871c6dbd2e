//! Subtitle Text Sanitizer
//!
//! Strips presentational markup and decodes character entities from
//! free-form subtitle text. Sanitizing is lossy by design: exported files
//! never contain markup.
//!
//! Ordering is load-bearing: tags are removed before entities are decoded,
//! otherwise a malformed tag containing an entity would survive the strip.
//! A consequence is that entity-encoded markup decodes to literal brackets
//! instead of being stripped.

use std::sync::LazyLock;

use regex::Regex;

/// Allow-listed presentational tags, removed case-insensitively.
static PRESENTATION_TAGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?b>|</?i>|</?u>|<font[^>]*>|</font>|<span[^>]*>|</span>")
        .expect("valid regex")
});

/// Runs of two or more plain spaces.
static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"  +").expect("valid regex"));

/// Cleans raw subtitle text for display and correction.
///
/// Removes presentational tags, strips any remaining angle-bracket tag,
/// decodes the fixed entity set, collapses space runs, and trims each
/// line and the whole block.
pub fn sanitize(raw: &str) -> String {
    let without_tags = strip_tags(&PRESENTATION_TAGS_RE.replace_all(raw, ""));
    let decoded = decode_entities(&without_tags);
    let collapsed = SPACE_RUN_RE.replace_all(&decoded, " ");

    collapsed
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Strips any remaining `<...>` tag generically.
///
/// A `<` only opens a tag when a closing `>` follows somewhere in the
/// rest of the text; a lone angle bracket (e.g. "5 < 10") is kept.
fn strip_tags(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '<' {
            if let Some(close) = chars[i + 1..].iter().position(|&c| c == '>') {
                i += close + 2;
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }

    result
}

/// Decodes the fixed set of named character entities.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

// =============================================================================
// Tests
// =============================================================================
