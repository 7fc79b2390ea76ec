//! Document model contract and the in-memory reference implementation.
//!
//! A hosting editor satisfies [`DocumentModel`] by exposing its text-bearing
//! segments with their document positions and by applying a
//! [`DocTransaction`] atomically. The capability set is required statically:
//! a host either implements it or does not compile, there is no runtime
//! probing and no silent per-call no-op.

use shared_types::Severity;
use thiserror::Error;

/// Annotation payload bound to a text range.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IssueMark {
    pub issue_id: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<String>,
    pub rule_reference: Option<String>,
}

/// One text-bearing leaf of the document, in walk order.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Document position of the segment's first flat-text unit.
    pub doc_start: usize,
    pub content: SegmentContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SegmentContent {
    Text(String),
    /// Non-text leaf (hard break). Occupies exactly one flat-text unit, to
    /// stay consistent with the plain-text extraction detectors consume.
    Break,
}

impl Segment {
    pub fn flat_len(&self) -> usize {
        match &self.content {
            SegmentContent::Text(text) => text.chars().count(),
            SegmentContent::Break => 1,
        }
    }
}

/// One step of an atomic document transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DocStep {
    /// Strip every compliance mark in the document.
    ClearIssueMarks,
    /// Remove only the marks carrying this issue id.
    RemoveMark { issue_id: String },
    /// Annotate `[from, to)` in document coordinates.
    AddMark {
        from: usize,
        to: usize,
        mark: IssueMark,
    },
    /// Move the selection; also the write cursor for `InsertText`.
    SetSelection { anchor: usize, head: usize },
    /// Replace the current selection with text (select-then-insert).
    InsertText { text: String },
    /// Ask the view to pulse the rendered mark for this issue.
    PulseMark { issue_id: String },
}

/// An ordered list of steps applied as one atomic edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocTransaction {
    pub steps: Vec<DocStep>,
}

impl DocTransaction {
    pub fn new(steps: Vec<DocStep>) -> Self {
        Self { steps }
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("position {0} is outside the document")]
    OutOfBounds(usize),

    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    #[error("range {from}..{to} crosses a block boundary")]
    CrossBlockEdit { from: usize, to: usize },
}

/// Capability contract a hosting editor must satisfy.
pub trait DocumentModel {
    /// Text-bearing segments in document order with their start positions.
    fn segments(&self) -> Vec<Segment>;

    /// Current selection as (anchor, head) document positions.
    fn selection(&self) -> (usize, usize);

    /// Apply all steps as one atomic edit. On error the document is
    /// unchanged; no intermediate state is ever observable.
    fn apply(&mut self, tx: DocTransaction) -> Result<(), DocumentError>;
}

/// A run of text with the marks covering it.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub marks: Vec<IssueMark>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(TextRun),
    HardBreak,
}

/// A block node (paragraph). Opening and closing each cost one document
/// position, ProseMirror style.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub inlines: Vec<Inline>,
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            inlines: vec![Inline::Text(TextRun::plain(text))],
        }
    }

    pub fn new(inlines: Vec<Inline>) -> Self {
        Self { inlines }
    }

    /// Flat-text length of the block content (chars + one per break).
    fn flat_len(&self) -> usize {
        self.inlines
            .iter()
            .map(|inline| match inline {
                Inline::Text(run) => run.text.chars().count(),
                Inline::HardBreak => 1,
            })
            .sum()
    }
}

/// A rendered annotation: one issue over one document range.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSpan {
    pub issue_id: String,
    pub severity: Severity,
    pub from: usize,
    pub to: usize,
}

/// In-memory reference document: paragraphs of text runs and hard breaks.
///
/// Position scheme: +1 entering a block, +1 per character, +1 per hard
/// break, +1 leaving a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocument {
    blocks: Vec<Block>,
    selection: (usize, usize),
    /// Issue id most recently asked to pulse; the hosting view reads and
    /// clears it.
    pulsed: Option<String>,
}

impl MemoryDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            selection: (0, 0),
            pulsed: None,
        }
    }

    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(paragraphs.into_iter().map(Block::text).collect())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pulsed(&self) -> Option<&str> {
        self.pulsed.as_deref()
    }

    pub fn clear_pulse(&mut self) {
        self.pulsed = None;
    }

    /// Total number of document positions.
    pub fn size(&self) -> usize {
        self.blocks.iter().map(|b| 2 + b.flat_len()).sum()
    }

    /// Rendered annotations, merged across adjacent runs carrying the same
    /// issue.
    pub fn annotations(&self) -> Vec<AnnotationSpan> {
        let mut spans: Vec<AnnotationSpan> = Vec::new();
        let mut pos = 0;
        for block in &self.blocks {
            pos += 1;
            for inline in &block.inlines {
                match inline {
                    Inline::HardBreak => pos += 1,
                    Inline::Text(run) => {
                        let len = run.text.chars().count();
                        for mark in &run.marks {
                            let adjacent = spans
                                .iter_mut()
                                .find(|s| s.issue_id == mark.issue_id && s.to == pos);
                            match adjacent {
                                Some(span) => span.to = pos + len,
                                None => spans.push(AnnotationSpan {
                                    issue_id: mark.issue_id.clone(),
                                    severity: mark.severity,
                                    from: pos,
                                    to: pos + len,
                                }),
                            }
                        }
                        pos += len;
                    }
                }
            }
            pos += 1;
        }
        spans
    }

    /// Concatenated text currently covered by an issue's marks.
    pub fn marked_text(&self, issue_id: &str) -> Option<String> {
        let mut covered = String::new();
        let mut found = false;
        for block in &self.blocks {
            for inline in &block.inlines {
                if let Inline::Text(run) = inline {
                    if run.marks.iter().any(|m| m.issue_id == issue_id) {
                        covered.push_str(&run.text);
                        found = true;
                    }
                }
            }
        }
        found.then_some(covered)
    }

    fn apply_step(&mut self, step: DocStep) -> Result<(), DocumentError> {
        match step {
            DocStep::ClearIssueMarks => {
                for block in &mut self.blocks {
                    for inline in &mut block.inlines {
                        if let Inline::Text(run) = inline {
                            run.marks.clear();
                        }
                    }
                }
                Ok(())
            }
            DocStep::RemoveMark { issue_id } => {
                for block in &mut self.blocks {
                    for inline in &mut block.inlines {
                        if let Inline::Text(run) = inline {
                            run.marks.retain(|m| m.issue_id != issue_id);
                        }
                    }
                }
                Ok(())
            }
            DocStep::AddMark { from, to, mark } => self.add_mark(from, to, mark),
            DocStep::SetSelection { anchor, head } => {
                let size = self.size();
                if anchor > size || head > size {
                    return Err(DocumentError::OutOfBounds(anchor.max(head)));
                }
                self.selection = (anchor, head);
                Ok(())
            }
            DocStep::InsertText { text } => self.insert_text(&text),
            DocStep::PulseMark { issue_id } => {
                self.pulsed = Some(issue_id);
                Ok(())
            }
        }
    }

    fn add_mark(&mut self, from: usize, to: usize, mark: IssueMark) -> Result<(), DocumentError> {
        if from >= to {
            return Err(DocumentError::InvalidRange { from, to });
        }
        if to > self.size() {
            return Err(DocumentError::OutOfBounds(to));
        }

        let mut pos = 0;
        for block in &mut self.blocks {
            pos += 1;
            let mut rebuilt = Vec::with_capacity(block.inlines.len());
            for inline in block.inlines.drain(..) {
                match inline {
                    Inline::HardBreak => {
                        pos += 1;
                        rebuilt.push(Inline::HardBreak);
                    }
                    Inline::Text(run) => {
                        let len = run.text.chars().count();
                        let (start, end) = (pos, pos + len);
                        pos = end;

                        let overlap_start = from.max(start);
                        let overlap_end = to.min(end);
                        if overlap_start >= overlap_end {
                            rebuilt.push(Inline::Text(run));
                            continue;
                        }

                        let chars: Vec<char> = run.text.chars().collect();
                        let a = overlap_start - start;
                        let b = overlap_end - start;

                        if a > 0 {
                            rebuilt.push(Inline::Text(TextRun {
                                text: chars[..a].iter().collect(),
                                marks: run.marks.clone(),
                            }));
                        }
                        let mut mid_marks = run.marks.clone();
                        if !mid_marks.contains(&mark) {
                            mid_marks.push(mark.clone());
                        }
                        rebuilt.push(Inline::Text(TextRun {
                            text: chars[a..b].iter().collect(),
                            marks: mid_marks,
                        }));
                        if b < len {
                            rebuilt.push(Inline::Text(TextRun {
                                text: chars[b..].iter().collect(),
                                marks: run.marks,
                            }));
                        }
                    }
                }
            }
            block.inlines = rebuilt;
            pos += 1;
        }
        Ok(())
    }

    /// Replace the current selection with `text`; the selection collapses to
    /// the end of the insertion. The range must stay within one block.
    fn insert_text(&mut self, text: &str) -> Result<(), DocumentError> {
        let (anchor, head) = self.selection;
        let (from, to) = (anchor.min(head), anchor.max(head));

        let mut pos = 0;
        for block in &mut self.blocks {
            let content_start = pos + 1;
            let content_end = content_start + block.flat_len();
            let block_end = content_end + 1;

            if from >= content_start && to <= content_end {
                edit_block(block, from - content_start, to - content_start, text);
                let caret = from + text.chars().count();
                self.selection = (caret, caret);
                return Ok(());
            }
            if from < block_end && to > content_end {
                return Err(DocumentError::CrossBlockEdit { from, to });
            }
            pos = block_end;
        }
        Err(DocumentError::OutOfBounds(from))
    }

    /// Merge adjacent runs with identical mark sets and drop empty runs, so
    /// strip-and-reapply cycles land on the same structure every time.
    fn normalize(&mut self) {
        for block in &mut self.blocks {
            let mut merged: Vec<Inline> = Vec::with_capacity(block.inlines.len());
            for inline in block.inlines.drain(..) {
                match inline {
                    Inline::Text(run) if run.text.is_empty() => {}
                    Inline::Text(run) => match merged.last_mut() {
                        Some(Inline::Text(prev)) if prev.marks == run.marks => {
                            prev.text.push_str(&run.text);
                        }
                        _ => merged.push(Inline::Text(run)),
                    },
                    Inline::HardBreak => merged.push(Inline::HardBreak),
                }
            }
            block.inlines = merged;
        }
    }
}

/// Delete local flat range `[lf, lt)` from the block and insert `text` at
/// `lf`. Offsets are relative to the block's content start.
fn edit_block(block: &mut Block, lf: usize, lt: usize, text: &str) {
    let mut rebuilt: Vec<Inline> = Vec::with_capacity(block.inlines.len() + 1);
    let mut cursor = 0;
    let mut inserted = false;

    let push_insertion = |rebuilt: &mut Vec<Inline>| {
        if !text.is_empty() {
            rebuilt.push(Inline::Text(TextRun::plain(text)));
        }
    };

    for inline in block.inlines.drain(..) {
        match inline {
            Inline::Text(run) => {
                let len = run.text.chars().count();
                let (start, end) = (cursor, cursor + len);
                cursor = end;

                let chars: Vec<char> = run.text.chars().collect();
                let keep_left = lf.clamp(start, end) - start;
                let resume = lt.clamp(start, end) - start;

                if keep_left > 0 {
                    rebuilt.push(Inline::Text(TextRun {
                        text: chars[..keep_left].iter().collect(),
                        marks: run.marks.clone(),
                    }));
                }
                if !inserted && lf >= start && lf <= end {
                    push_insertion(&mut rebuilt);
                    inserted = true;
                }
                if resume < len {
                    rebuilt.push(Inline::Text(TextRun {
                        text: chars[resume..].iter().collect(),
                        marks: run.marks,
                    }));
                }
            }
            Inline::HardBreak => {
                let start = cursor;
                cursor += 1;
                if !inserted && lf == start {
                    push_insertion(&mut rebuilt);
                    inserted = true;
                }
                if start < lf || start >= lt {
                    rebuilt.push(Inline::HardBreak);
                }
            }
        }
    }
    if !inserted {
        push_insertion(&mut rebuilt);
    }
    block.inlines = rebuilt;
}

impl DocumentModel for MemoryDocument {
    fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut pos = 0;
        for block in &self.blocks {
            pos += 1;
            for inline in &block.inlines {
                match inline {
                    Inline::Text(run) => {
                        segments.push(Segment {
                            doc_start: pos,
                            content: SegmentContent::Text(run.text.clone()),
                        });
                        pos += run.text.chars().count();
                    }
                    Inline::HardBreak => {
                        segments.push(Segment {
                            doc_start: pos,
                            content: SegmentContent::Break,
                        });
                        pos += 1;
                    }
                }
            }
            pos += 1;
        }
        segments
    }

    fn selection(&self) -> (usize, usize) {
        self.selection
    }

    fn apply(&mut self, tx: DocTransaction) -> Result<(), DocumentError> {
        // Validate-and-commit on a draft: an error leaves the document
        // untouched, so a transaction is all-or-nothing.
        let mut draft = self.clone();
        for step in tx.steps {
            draft.apply_step(step)?;
        }
        draft.normalize();
        *self = draft;
        Ok(())
    }
}
