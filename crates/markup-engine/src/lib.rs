//! Annotation layer: aligns flat-text issue spans with a structured
//! document's addressing scheme and keeps the rendered annotation set in
//! sync across re-analysis, dismissal, and auto-fix.
//!
//! The hosting editor is consumed abstractly through [`DocumentModel`]; any
//! editor that can enumerate its text-bearing segments and apply an atomic
//! transaction can host the engine. [`MemoryDocument`] is the reference
//! implementation used by tests and headless hosts.

pub mod document;
pub mod marks;
pub mod position;
pub mod session;

pub use document::{
    AnnotationSpan, Block, DocStep, DocTransaction, DocumentError, DocumentModel, Inline,
    IssueMark, MemoryDocument, Segment, SegmentContent, TextRun,
};
pub use marks::{MarkError, MarkManager};
pub use position::{extract_text, flat_len, flat_to_doc, flat_to_doc_start};
pub use session::AnnotationSession;
