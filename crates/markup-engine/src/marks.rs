//! Mark lifecycle: project an analysis batch onto the document, and keep
//! the rendered set consistent through dismissal, auto-fix, and navigation.

use shared_types::{ComplianceIssue, ComplianceReport, TextSpan};
use thiserror::Error;

use crate::document::{DocStep, DocTransaction, DocumentError, DocumentModel, IssueMark};
use crate::position::{flat_to_doc, flat_to_doc_start};
use crate::session::AnnotationSession;

#[derive(Error, Debug)]
pub enum MarkError {
    #[error("no issue with id {0} in the current batch")]
    UnknownIssue(String),

    #[error("issue {0} has no mappable document range")]
    Unmappable(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Owns the projection of the current issue batch onto one document.
///
/// Every re-analysis replaces the batch wholesale: `apply_marks` strips all
/// existing compliance marks and lays down the new set in a single
/// transaction, so the document never shows a mix of two analysis runs.
pub struct MarkManager<D: DocumentModel> {
    doc: D,
    issues: Vec<ComplianceIssue>,
}

impl<D: DocumentModel> MarkManager<D> {
    pub fn new(doc: D) -> Self {
        Self {
            doc,
            issues: Vec::new(),
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    /// Issues currently projected onto the document.
    pub fn issues(&self) -> &[ComplianceIssue] {
        &self.issues
    }

    /// Replace the rendered annotation set with this batch.
    ///
    /// Issues without a position or dismissed in this session are retained
    /// in the batch but not rendered. Issues whose span no longer maps into
    /// the document (the text changed under the batch) are skipped with a
    /// warning. The user's selection is preserved across the rewrite.
    pub fn apply_marks(
        &mut self,
        issues: &[ComplianceIssue],
        session: &AnnotationSession,
    ) -> Result<(), MarkError> {
        let (anchor, head) = self.doc.selection();
        let mut steps = vec![DocStep::ClearIssueMarks];

        for issue in issues {
            if session.is_dismissed(&issue.id) {
                continue;
            }
            let Some(span) = &issue.position else {
                continue;
            };
            if span.is_empty() {
                continue;
            }
            let mapped = flat_to_doc_start(&self.doc, span.start)
                .zip(flat_to_doc(&self.doc, span.end));
            let Some((from, to)) = mapped else {
                tracing::warn!(issue = %issue.id, start = span.start, end = span.end,
                    "issue span no longer maps into the document; skipping");
                continue;
            };
            if from >= to {
                continue;
            }
            steps.push(DocStep::AddMark {
                from,
                to,
                mark: issue_mark(issue),
            });
        }

        steps.push(DocStep::SetSelection { anchor, head });
        self.doc.apply(DocTransaction::new(steps))?;
        self.issues = issues.to_vec();
        Ok(())
    }

    /// Convenience over [`apply_marks`](Self::apply_marks) for a full
    /// report.
    pub fn apply_report(
        &mut self,
        report: &ComplianceReport,
        session: &AnnotationSession,
    ) -> Result<(), MarkError> {
        self.apply_marks(&report.ordered_issues(), session)
    }

    /// Dismiss one issue: record it in the session and remove only its
    /// marks, leaving every other annotation untouched.
    pub fn dismiss_issue(
        &mut self,
        issue_id: &str,
        session: &mut AnnotationSession,
    ) -> Result<(), MarkError> {
        if !self.issues.iter().any(|i| i.id == issue_id) {
            return Err(MarkError::UnknownIssue(issue_id.to_string()));
        }
        session.dismiss(issue_id);
        self.doc.apply(DocTransaction::new(vec![DocStep::RemoveMark {
            issue_id: issue_id.to_string(),
        }]))?;
        self.issues.retain(|i| i.id != issue_id);
        Ok(())
    }

    /// Replace the issue's span with `replacement` and dismiss the issue,
    /// then rebase the remaining batch around the edit.
    ///
    /// Issues entirely after the edited span shift by the length delta;
    /// issues entirely before it keep their spans; issues overlapping it
    /// are dropped, since the text they pointed at no longer exists. An
    /// empty replacement removes the offending text.
    pub fn accept_suggestion(
        &mut self,
        issue_id: &str,
        replacement: &str,
        session: &mut AnnotationSession,
    ) -> Result<(), MarkError> {
        let issue = self
            .issues
            .iter()
            .find(|i| i.id == issue_id)
            .cloned()
            .ok_or_else(|| MarkError::UnknownIssue(issue_id.to_string()))?;
        let span = issue
            .position
            .ok_or_else(|| MarkError::Unmappable(issue_id.to_string()))?;

        let from = flat_to_doc_start(&self.doc, span.start)
            .ok_or_else(|| MarkError::Unmappable(issue_id.to_string()))?;
        let to = flat_to_doc(&self.doc, span.end)
            .ok_or_else(|| MarkError::Unmappable(issue_id.to_string()))?;

        self.doc.apply(DocTransaction::new(vec![
            DocStep::SetSelection {
                anchor: from,
                head: to,
            },
            DocStep::InsertText {
                text: replacement.to_string(),
            },
        ]))?;
        session.dismiss(issue_id);

        let inserted = replacement.chars().count();
        let mut rebased = Vec::with_capacity(self.issues.len());
        for mut other in self.issues.drain(..) {
            if other.id == issue_id {
                continue;
            }
            match other.position {
                Some(p) if p.start >= span.end => {
                    let new_start = span.start + inserted + (p.start - span.end);
                    other.position = Some(TextSpan::new(new_start, new_start + p.len()));
                    rebased.push(other);
                }
                Some(p) if p.end <= span.start => rebased.push(other),
                Some(_) => {
                    tracing::debug!(issue = %other.id, "dropping issue overlapping an accepted fix");
                }
                None => rebased.push(other),
            }
        }
        self.apply_marks(&rebased, session)
    }

    /// Select an issue's text and pulse its mark so the view scrolls to it.
    pub fn scroll_to_issue(&mut self, issue_id: &str) -> Result<(), MarkError> {
        let issue = self
            .issues
            .iter()
            .find(|i| i.id == issue_id)
            .ok_or_else(|| MarkError::UnknownIssue(issue_id.to_string()))?;
        let span = issue
            .position
            .as_ref()
            .ok_or_else(|| MarkError::Unmappable(issue_id.to_string()))?;

        let from = flat_to_doc_start(&self.doc, span.start)
            .ok_or_else(|| MarkError::Unmappable(issue_id.to_string()))?;
        let to = flat_to_doc(&self.doc, span.end)
            .ok_or_else(|| MarkError::Unmappable(issue_id.to_string()))?;

        self.doc.apply(DocTransaction::new(vec![
            DocStep::SetSelection {
                anchor: from,
                head: to,
            },
            DocStep::PulseMark {
                issue_id: issue_id.to_string(),
            },
        ]))?;
        Ok(())
    }

    /// Strip every compliance mark and forget the batch.
    pub fn clear_marks(&mut self) -> Result<(), MarkError> {
        self.doc
            .apply(DocTransaction::new(vec![DocStep::ClearIssueMarks]))?;
        self.issues.clear();
        Ok(())
    }

    /// Tear down: remove all marks and hand the document back to the host.
    pub fn dispose(mut self) -> Result<D, MarkError> {
        self.clear_marks()?;
        Ok(self.doc)
    }
}

fn issue_mark(issue: &ComplianceIssue) -> IssueMark {
    IssueMark {
        issue_id: issue.id.clone(),
        severity: issue.severity,
        message: issue.message.clone(),
        suggestion: issue.suggestion.clone(),
        rule_reference: issue.rule_reference.clone(),
    }
}
