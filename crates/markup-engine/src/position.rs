//! Mapping between the flat plain-text coordinate space the detectors use
//! and structured document positions.
//!
//! Both sides must agree on the text they address, so [`extract_text`] is
//! the single source of the flat rendition: hard breaks become `'\n'` and
//! every offset is a char offset into that string.

use crate::document::{DocumentModel, SegmentContent};

/// Plain-text rendition of the document, in segment order.
pub fn extract_text<D: DocumentModel + ?Sized>(doc: &D) -> String {
    let mut text = String::new();
    for segment in doc.segments() {
        match segment.content {
            SegmentContent::Text(run) => text.push_str(&run),
            SegmentContent::Break => text.push('\n'),
        }
    }
    text
}

/// Length of the flat rendition in chars.
pub fn flat_len<D: DocumentModel + ?Sized>(doc: &D) -> usize {
    doc.segments().iter().map(|s| s.flat_len()).sum()
}

/// Map a flat-text char offset to a document position.
///
/// The offset belongs to the first segment whose flat range reaches it, so
/// an offset on a node boundary resolves into the earlier node's end rather
/// than the later node's start. This is the right bias for span *ends*
/// (end exclusive); use [`flat_to_doc_start`] for span starts. Returns
/// `None` when the offset lies beyond the flat text; callers treat an
/// unmappable span as skippable, never fatal.
pub fn flat_to_doc<D: DocumentModel + ?Sized>(doc: &D, offset: usize) -> Option<usize> {
    let mut consumed = 0;
    for segment in doc.segments() {
        let len = segment.flat_len();
        if consumed + len >= offset {
            return Some(segment.doc_start + (offset - consumed));
        }
        consumed += len;
    }
    None
}

/// Map a span's start offset to a document position.
///
/// An offset on a node boundary resolves into the *later* node's first
/// position, so a span beginning at a block's first character addresses
/// that block, not the end of the previous one. Without this bias a
/// select-then-insert over such a span would straddle the block boundary
/// and be rejected as a cross-block edit.
pub fn flat_to_doc_start<D: DocumentModel + ?Sized>(doc: &D, offset: usize) -> Option<usize> {
    let mut consumed = 0;
    for segment in doc.segments() {
        let len = segment.flat_len();
        if consumed + len > offset {
            return Some(segment.doc_start + (offset - consumed));
        }
        consumed += len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Inline, MemoryDocument, TextRun};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_extract_text_joins_segments() {
        let doc = MemoryDocument::new(vec![Block::new(vec![
            Inline::Text(TextRun::plain("AB")),
            Inline::HardBreak,
            Inline::Text(TextRun::plain("CD")),
        ])]);
        assert_eq!(extract_text(&doc), "AB\nCD");
        assert_eq!(flat_len(&doc), 5);
    }

    #[test]
    fn test_extract_text_concatenates_paragraphs_without_separator() {
        // Paragraph boundaries carry no flat-text unit of their own; only
        // hard breaks do.
        let doc = MemoryDocument::from_paragraphs(["AB", "CD"]);
        assert_eq!(extract_text(&doc), "ABCD");
    }

    #[test]
    fn test_flat_to_doc_within_first_paragraph() {
        let doc = MemoryDocument::from_paragraphs(["AB", "CD"]);
        assert_eq!(flat_to_doc(&doc, 0), Some(1));
        assert_eq!(flat_to_doc(&doc, 1), Some(2));
        assert_eq!(flat_to_doc(&doc, 2), Some(3));
    }

    #[test]
    fn test_flat_to_doc_resolves_into_second_paragraph() {
        // Two paragraphs "AB" and "CD": flat offset 3 is one char into the
        // second paragraph, whose content starts at doc position 5.
        let doc = MemoryDocument::from_paragraphs(["AB", "CD"]);
        assert_eq!(flat_to_doc(&doc, 3), Some(6));
        assert_eq!(flat_to_doc(&doc, 4), Some(7));
    }

    #[test]
    fn test_start_bias_on_a_block_boundary() {
        // Offset 2 is both the end of "AB" and the start of "CD". The
        // end-biased map lands on the first block's content end, the
        // start-biased map on the second block's content start.
        let doc = MemoryDocument::from_paragraphs(["AB", "CD"]);
        assert_eq!(flat_to_doc(&doc, 2), Some(3));
        assert_eq!(flat_to_doc_start(&doc, 2), Some(5));
        // Inside a block the two agree.
        assert_eq!(flat_to_doc_start(&doc, 1), Some(2));
        assert_eq!(flat_to_doc_start(&doc, 3), Some(6));
    }

    #[test]
    fn test_flat_to_doc_past_end_is_none() {
        let doc = MemoryDocument::from_paragraphs(["AB", "CD"]);
        assert_eq!(flat_to_doc(&doc, 5), None);
        assert_eq!(flat_to_doc(&doc, 100), None);
    }

    #[test]
    fn test_flat_to_doc_counts_hard_break_as_one_unit() {
        let doc = MemoryDocument::new(vec![Block::new(vec![
            Inline::Text(TextRun::plain("AB")),
            Inline::HardBreak,
            Inline::Text(TextRun::plain("CD")),
        ])]);
        // "AB\nCD": offset 3 is the 'C' right after the break.
        assert_eq!(flat_to_doc(&doc, 3), Some(4));
    }

    #[test]
    fn test_flat_to_doc_multibyte_chars() {
        let doc = MemoryDocument::from_paragraphs(["この薬は完全に治ります"]);
        // Char offsets, not byte offsets.
        assert_eq!(flat_to_doc(&doc, 3), Some(4));
        assert_eq!(flat_to_doc(&doc, 7), Some(8));
    }

    proptest! {
        #[test]
        fn prop_mapping_is_strictly_monotone(
            paragraphs in proptest::collection::vec("[a-zあ-ん]{1,8}", 1..4),
        ) {
            let doc = MemoryDocument::from_paragraphs(paragraphs);
            let total = flat_len(&doc);
            let mapped: Vec<usize> = (0..=total)
                .map(|offset| flat_to_doc(&doc, offset).unwrap())
                .collect();
            for pair in mapped.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
        }
    }
}
