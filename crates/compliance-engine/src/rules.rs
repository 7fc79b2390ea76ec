//! Local, deterministic phrase scanning.
//!
//! The rule engine is the always-available detector: no network, no model,
//! just phrase tables per regulated vertical. Content in an industry without
//! a registered profile passes every category untouched.

use std::collections::BTreeMap;

use shared_types::{
    AnalysisRequest, Category, CategoryResult, ComplianceIssue, Severity, TextSpan,
};

/// Absolute or guaranteed efficacy claims prohibited in pharmaceutical
/// advertising, with the rule they violate.
const PHARMA_PROHIBITED: &[(&str, &str)] = &[
    ("完全に治", "PMD Act Art. 66"),
    ("完治", "PMD Act Art. 66"),
    ("必ず治", "PMD Act Art. 66"),
    ("絶対に安全", "PMD Act Art. 66"),
    ("100%安全", "PMD Act Art. 66"),
    ("100％安全", "PMD Act Art. 66"),
    ("副作用はありません", "PMD Act Art. 66"),
    ("副作用なし", "PMD Act Art. 66"),
    ("日本一の効果", "PMD Act Art. 66"),
    ("世界一の効果", "PMD Act Art. 66"),
    ("completely cures", "PMD Act Art. 66"),
    ("guaranteed cure", "PMD Act Art. 66"),
    ("100% safe", "PMD Act Art. 66"),
    ("no side effects", "PMD Act Art. 66"),
    ("miracle cure", "PMD Act Art. 66"),
];

/// Softer exaggeration markers. Warning severity, smaller penalty.
const PHARMA_CAUTION: &[(&str, &str)] = &[
    ("効果抜群", "PMD Act Art. 66"),
    ("即効性", "PMD Act Art. 66"),
    ("劇的に改善", "PMD Act Art. 66"),
    ("clinically proven", "PMD Act Art. 66"),
    ("risk-free", "PMD Act Art. 66"),
    ("dramatic results", "PMD Act Art. 66"),
];

/// Terms whose complete absence from long-form pharma copy suggests the
/// draft is missing mandatory safety information.
const PHARMA_SAFETY_TERMS: &[&str] = &[
    "副作用",
    "注意",
    "医師",
    "薬剤師",
    "相談",
    "side effect",
    "consult",
    "caution",
    "physician",
    "doctor",
];

/// One scannable phrase and the rule it enforces.
#[derive(Debug, Clone)]
pub struct PhraseRule {
    pub phrase: String,
    pub rule_reference: String,
}

impl PhraseRule {
    fn new(phrase: &str, rule_reference: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            rule_reference: rule_reference.to_string(),
        }
    }
}

/// Phrase tables for one regulated vertical.
#[derive(Debug, Clone)]
pub struct IndustryProfile {
    /// Industry key, matched case-insensitively against the request.
    pub industry: String,
    pub prohibited: Vec<PhraseRule>,
    pub caution: Vec<PhraseRule>,
    pub safety_terms: Vec<String>,
}

impl IndustryProfile {
    /// The built-in pharmaceutical profile.
    pub fn pharmaceutical() -> Self {
        Self {
            industry: "pharmaceutical".to_string(),
            prohibited: PHARMA_PROHIBITED
                .iter()
                .map(|(p, r)| PhraseRule::new(p, r))
                .collect(),
            caution: PHARMA_CAUTION
                .iter()
                .map(|(p, r)| PhraseRule::new(p, r))
                .collect(),
            safety_terms: PHARMA_SAFETY_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Penalty magnitudes and thresholds. These are policy knobs, not constants:
/// callers tuning a vertical construct the engine with their own values.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    /// Subtracted from regulatory_claims per prohibited-phrase occurrence.
    pub error_penalty: f64,
    /// Subtracted from regulatory_claims per caution-phrase occurrence.
    pub caution_penalty: f64,
    /// Subtracted from safety_info when required terminology is absent.
    pub safety_penalty: f64,
    /// Content length (chars) above which the safety-terminology check runs.
    pub safety_length_threshold: usize,
    pub profiles: Vec<IndustryProfile>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            error_penalty: 15.0,
            caution_penalty: 5.0,
            safety_penalty: 20.0,
            safety_length_threshold: 200,
            profiles: vec![IndustryProfile::pharmaceutical()],
        }
    }
}

/// The local detector.
pub struct RuleEngine {
    config: RuleConfig,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::with_config(RuleConfig::default())
    }

    pub fn with_config(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Profile for an industry key, if it is a registered regulated vertical.
    pub fn profile_for(&self, industry: &str) -> Option<&IndustryProfile> {
        let key = industry.trim();
        self.config
            .profiles
            .iter()
            .find(|p| p.industry.eq_ignore_ascii_case(key))
    }

    /// Scan the content and produce per-category results.
    ///
    /// Always returns all five categories. Unregulated industries get a
    /// clean 100 across the board.
    pub fn evaluate(&self, request: &AnalysisRequest) -> BTreeMap<Category, CategoryResult> {
        let mut categories: BTreeMap<Category, CategoryResult> = Category::ALL
            .iter()
            .map(|c| (*c, CategoryResult::clean()))
            .collect();

        let Some(profile) = self.profile_for(&request.industry) else {
            tracing::debug!(industry = %request.industry, "no rule profile; neutral pass");
            return categories;
        };

        let content = &request.content;
        let folded = ascii_fold(content);

        let mut claims_score = 100.0;
        let mut claims_issues = Vec::new();

        for rule in &profile.prohibited {
            for span in find_occurrences(content, &folded, &rule.phrase) {
                claims_score -= self.config.error_penalty;
                claims_issues.push(ComplianceIssue {
                    id: ComplianceIssue::stable_id(Some(&span), &rule.phrase),
                    severity: Severity::Error,
                    message: format!(
                        "Prohibited claim \"{}\": absolute or guaranteed efficacy claims are not permitted",
                        rule.phrase
                    ),
                    position: Some(span),
                    // Removal: accepting this suggestion deletes the span.
                    suggestion: Some(String::new()),
                    rule_reference: Some(rule.rule_reference.clone()),
                });
            }
        }

        for rule in &profile.caution {
            for span in find_occurrences(content, &folded, &rule.phrase) {
                claims_score -= self.config.caution_penalty;
                claims_issues.push(ComplianceIssue {
                    id: ComplianceIssue::stable_id(Some(&span), &rule.phrase),
                    severity: Severity::Warning,
                    message: format!(
                        "Exaggerated expression \"{}\" may overstate efficacy",
                        rule.phrase
                    ),
                    position: Some(span),
                    suggestion: None,
                    rule_reference: Some(rule.rule_reference.clone()),
                });
            }
        }

        if !claims_issues.is_empty() {
            tracing::debug!(
                count = claims_issues.len(),
                score = claims_score,
                "regulatory claim findings"
            );
        }

        categories.insert(
            Category::RegulatoryClaims,
            CategoryResult {
                score: claims_score.clamp(0.0, 100.0),
                issues: claims_issues,
            },
        );

        // Long-form copy must mention safety somewhere.
        let char_len = content.chars().count();
        if char_len > self.config.safety_length_threshold {
            let has_safety_term = profile
                .safety_terms
                .iter()
                .any(|term| folded.contains(&ascii_fold(term)));
            if !has_safety_term {
                let message =
                    "Content of this length must include safety information (side effects, \
                     precautions, or a direction to consult a professional)"
                        .to_string();
                categories.insert(
                    Category::SafetyInfo,
                    CategoryResult {
                        score: (100.0 - self.config.safety_penalty).clamp(0.0, 100.0),
                        issues: vec![ComplianceIssue {
                            id: ComplianceIssue::stable_id(None, "safety_info missing terminology"),
                            severity: Severity::Warning,
                            message,
                            position: None,
                            suggestion: None,
                            rule_reference: Some("PMD Act Art. 68".to_string()),
                        }],
                    },
                );
            }
        }

        categories
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// ASCII-only case folding. Per-char `to_ascii_lowercase` preserves byte
/// lengths exactly, so offsets found in the folded copy are valid in the
/// original text.
fn ascii_fold(text: &str) -> String {
    text.chars().map(|c| c.to_ascii_lowercase()).collect()
}

/// Every non-overlapping occurrence of `phrase`, as char spans into
/// `content`. `folded` must be `ascii_fold(content)`.
fn find_occurrences(content: &str, folded: &str, phrase: &str) -> Vec<TextSpan> {
    let needle = ascii_fold(phrase);
    if needle.is_empty() {
        return Vec::new();
    }
    let mut spans = Vec::new();
    for (byte_start, matched) in folded.match_indices(needle.as_str()) {
        let start = content[..byte_start].chars().count();
        let end = start + matched.chars().count();
        spans.push(TextSpan::new(start, end));
    }
    spans
}
