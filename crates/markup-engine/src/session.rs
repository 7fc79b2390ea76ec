//! Per-session dismissal state.

use std::collections::HashSet;

/// Dismissals scoped to one editing session of one content item.
///
/// The hosting view owns the session and drops it when the editor closes;
/// dismissals deliberately do not survive a reopen or carry over to other
/// content items.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSession {
    dismissed: HashSet<String>,
}

impl AnnotationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dismissal. Returns `false` if the issue was already
    /// dismissed.
    pub fn dismiss(&mut self, issue_id: impl Into<String>) -> bool {
        self.dismissed.insert(issue_id.into())
    }

    pub fn is_dismissed(&self, issue_id: &str) -> bool {
        self.dismissed.contains(issue_id)
    }

    /// Forget all dismissals, e.g. when the user reloads the content item.
    pub fn reset(&mut self) {
        self.dismissed.clear();
    }

    pub fn dismissed_ids(&self) -> impl Iterator<Item = &str> {
        self.dismissed.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dismissed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dismissed.is_empty()
    }
}
