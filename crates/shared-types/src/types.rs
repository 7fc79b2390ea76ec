use std::collections::BTreeMap;

/// Severity of a flagged issue.
///
/// Declaration order doubles as the display/sort order: errors first,
/// suggestions last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
        }
    }
}

/// The five weighted compliance assessment dimensions.
///
/// Declaration order is the stable category order used wherever results are
/// flattened or rendered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RegulatoryClaims,
    SafetyInfo,
    FairBalance,
    Substantiation,
    Formatting,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::RegulatoryClaims,
        Category::SafetyInfo,
        Category::FairBalance,
        Category::Substantiation,
        Category::Formatting,
    ];

    /// Fixed aggregation weight. The weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Category::RegulatoryClaims => 0.30,
            Category::SafetyInfo => 0.25,
            Category::FairBalance => 0.20,
            Category::Substantiation => 0.15,
            Category::Formatting => 0.10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::RegulatoryClaims => "regulatory_claims",
            Category::SafetyInfo => "safety_info",
            Category::FairBalance => "fair_balance",
            Category::Substantiation => "substantiation",
            Category::Formatting => "formatting",
        }
    }

    /// Parse a category name as it appears in detector output.
    pub fn from_name(name: &str) -> Option<Category> {
        match name.trim() {
            "regulatory_claims" => Some(Category::RegulatoryClaims),
            "safety_info" => Some(Category::SafetyInfo),
            "fair_balance" => Some(Category::FairBalance),
            "substantiation" => Some(Category::Substantiation),
            "formatting" => Some(Category::Formatting),
            _ => None,
        }
    }
}

/// A flagged span in flat-text coordinates.
///
/// Offsets are **character** offsets into the plain-text extraction of the
/// document, end exclusive. Character rather than byte: the detectors and the
/// position mapper share this coordinate space and content is routinely
/// Japanese.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A single compliance finding, owned by the current analysis batch and
/// replaced wholesale on re-analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComplianceIssue {
    /// Stable id: repeated analysis of byte-identical content yields the
    /// same id, so dismissals survive batch supersession.
    pub id: String,
    pub severity: Severity,
    pub message: String,
    /// Flat-text span of the offending text, when the detector could locate
    /// one. Document-wide findings carry no position.
    pub position: Option<TextSpan>,
    /// Replacement text for auto-fix. An empty string means "remove".
    pub suggestion: Option<String>,
    pub rule_reference: Option<String>,
}

impl ComplianceIssue {
    /// Derive a deterministic issue id from the span and a prefix of the
    /// flagged text.
    pub fn stable_id(position: Option<&TextSpan>, text: &str) -> String {
        let prefix: String = text
            .chars()
            .filter(|c| c.is_alphanumeric())
            .take(12)
            .collect::<String>()
            .to_lowercase();
        match position {
            Some(span) => format!("iss-{}-{}-{}", span.start, span.end, prefix),
            None => format!("iss-{}", prefix),
        }
    }
}

/// Score and findings for one category.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoryResult {
    /// 0–100, clamped by the scorer.
    pub score: f64,
    pub issues: Vec<ComplianceIssue>,
}

impl CategoryResult {
    /// A clean pass: full score, no findings.
    pub fn clean() -> Self {
        Self {
            score: 100.0,
            issues: Vec::new(),
        }
    }

    /// The neutral default used when the AI reply cannot be trusted.
    pub fn neutral() -> Self {
        Self {
            score: 80.0,
            issues: Vec::new(),
        }
    }
}

/// Full analysis output: per-category results plus the weighted aggregate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ComplianceReport {
    pub categories: BTreeMap<Category, CategoryResult>,
    pub aggregate_score: u32,
    pub summary: Option<String>,
    pub checked_at: u64,
}

impl ComplianceReport {
    /// All issues flattened into render order: errors first, then warnings,
    /// then suggestions, with the stable category order inside each class.
    pub fn ordered_issues(&self) -> Vec<ComplianceIssue> {
        let mut issues = Vec::new();
        for severity in [Severity::Error, Severity::Warning, Severity::Suggestion] {
            for category in Category::ALL {
                if let Some(result) = self.categories.get(&category) {
                    issues.extend(
                        result
                            .issues
                            .iter()
                            .filter(|i| i.severity == severity)
                            .cloned(),
                    );
                }
            }
        }
        issues
    }
}

/// Content language hint passed through to the AI detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
}

impl Default for Language {
    fn default() -> Self {
        Language::Ja
    }
}

/// Detector input.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisRequest {
    pub content: String,
    pub industry: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub language: Language,
}

impl AnalysisRequest {
    pub fn new(content: impl Into<String>, industry: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            industry: industry.into(),
            content_type: None,
            language: Language::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_sort_order() {
        let mut severities = vec![Severity::Suggestion, Severity::Error, Severity::Warning];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Error, Severity::Warning, Severity::Suggestion]
        );
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Category::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9, "weights sum to {}", total);
    }

    #[test]
    fn test_category_name_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_name(category.as_str()), Some(category));
        }
        assert_eq!(Category::from_name("unknown"), None);
    }

    #[test]
    fn test_stable_id_is_deterministic() {
        let span = TextSpan::new(4, 9);
        let a = ComplianceIssue::stable_id(Some(&span), "完全に治ります");
        let b = ComplianceIssue::stable_id(Some(&span), "完全に治ります");
        assert_eq!(a, b);
        assert!(a.starts_with("iss-4-9-"));
    }

    #[test]
    fn test_stable_id_distinguishes_spans() {
        let a = ComplianceIssue::stable_id(Some(&TextSpan::new(0, 4)), "100% safe");
        let b = ComplianceIssue::stable_id(Some(&TextSpan::new(10, 14)), "100% safe");
        assert_ne!(a, b);
    }

    #[test]
    fn test_stable_id_without_position() {
        let id = ComplianceIssue::stable_id(None, "safety_info missing terminology");
        assert!(id.starts_with("iss-"));
        assert!(!id.contains(' '));
    }

    #[test]
    fn test_severity_serde_names() {
        assert_eq!(
            serde_json::to_string(&Severity::Error).unwrap(),
            "\"error\""
        );
        assert_eq!(
            serde_json::from_str::<Severity>("\"suggestion\"").unwrap(),
            Severity::Suggestion
        );
    }

    #[test]
    fn test_category_serde_names() {
        assert_eq!(
            serde_json::to_string(&Category::RegulatoryClaims).unwrap(),
            "\"regulatory_claims\""
        );
    }

    #[test]
    fn test_span_len() {
        assert_eq!(TextSpan::new(2, 7).len(), 5);
        assert!(TextSpan::new(3, 3).is_empty());
    }
}
