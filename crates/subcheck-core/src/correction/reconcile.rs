//! Span-Edit Reconciliation
//!
//! Merges a set of offset/length edits against a shared base string into
//! one result string.
//!
//! Edits are applied from the highest offset to the lowest. Every span was
//! computed against the untouched base text; splicing high-to-low keeps
//! the prefix before each remaining edit untouched, so earlier splices
//! never shift the positions of later ones. Overlapping spans are not
//! detected: the lowest-offset edit runs last and wins positionally.

use crate::document::Edit;

/// Applies all edits (each at its currently chosen candidate) to the base
/// text. An empty edit list returns the base unchanged.
///
/// Offsets and lengths are character positions. Out-of-range spans are
/// clamped to the current text rather than rejected, matching the
/// tolerant-input policy of the rest of the engine.
pub fn reconcile(base: &str, edits: &[Edit]) -> String {
    if edits.is_empty() {
        return base.to_string();
    }

    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.span.offset.cmp(&a.span.offset));

    let mut chars: Vec<char> = base.chars().collect();

    for edit in sorted {
        let start = edit.span.offset.min(chars.len());
        let end = edit.span.end().min(chars.len()).max(start);
        chars.splice(start..end, edit.chosen().chars());
    }

    chars.into_iter().collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Span;

    fn edit(offset: usize, length: usize, replacement: &str) -> Edit {
        Edit::new(
            Span::new(offset, length),
            "",
            vec![replacement.to_string()],
            "Test",
        )
    }

    #[test]
    fn test_empty_edits_returns_base() {
        assert_eq!(reconcile("unverändert", &[]), "unverändert");
    }

    #[test]
    fn test_single_edit_splices_only_its_span() {
        // "Der Hund laueft" -> replace chars 9..15 with "läuft"
        let edits = vec![edit(9, 6, "läuft")];
        assert_eq!(reconcile("Der Hund laueft", &edits), "Der Hund läuft");
    }

    #[test]
    fn test_single_edit_mid_string() {
        let edits = vec![edit(7, 5, "WORLD")];
        assert_eq!(reconcile("hello, world!", &edits), "hello, WORLD!");
    }

    #[test]
    fn test_order_independent_for_disjoint_edits() {
        let base = "ab123efg456klm";
        let forward = vec![edit(2, 3, "cd"), edit(8, 3, "hij")];
        let backward = vec![edit(8, 3, "hij"), edit(2, 3, "cd")];

        let expected = "abcdefghijklm";
        assert_eq!(reconcile(base, &forward), expected);
        assert_eq!(reconcile(base, &backward), expected);
    }

    #[test]
    fn test_overlapping_lowest_offset_wins() {
        // Both edits cover position 2; the lower-offset edit is applied
        // last and prevails over the overlapped region.
        let base = "abcdef";
        let edits = vec![edit(2, 3, "XYZ"), edit(0, 3, "!!")];
        assert_eq!(reconcile(base, &edits), "!!Zf");
    }

    #[test]
    fn test_reflects_chosen_candidate() {
        let mut e = Edit::new(
            Span::new(0, 3),
            "foo",
            vec!["bar".to_string(), "baz".to_string()],
            "Test",
        );
        e.chosen_index = 1;
        assert_eq!(reconcile("foo!", &[e]), "baz!");
    }

    #[test]
    fn test_multibyte_offsets_are_character_based() {
        // "läuft" has a multibyte 'ä'; offsets count characters.
        let edits = vec![edit(2, 3, "XXX")];
        assert_eq!(reconcile("läuft", &edits), "läXXX");
    }

    #[test]
    fn test_out_of_range_span_is_clamped() {
        let edits = vec![edit(3, 50, "!")];
        assert_eq!(reconcile("abcdef", &edits), "abc!");

        let edits = vec![edit(50, 2, "!")];
        assert_eq!(reconcile("abc", &edits), "abc!");
    }
}
