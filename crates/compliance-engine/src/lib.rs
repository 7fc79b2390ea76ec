//! Compliance analysis engine.
//!
//! Orchestrates the two detectors: the local rule engine always runs; the
//! AI analyzer is consulted only for content long enough to justify the
//! cost, and any AI failure silently degrades to the rule-engine result.

pub mod ai;
pub mod error;
pub mod rules;
pub mod scoring;

pub use ai::{AiAnalyzer, AiConfig};
pub use error::AnalysisError;
pub use rules::{IndustryProfile, PhraseRule, RuleConfig, RuleEngine};

use std::sync::Arc;

use shared_types::{AnalysisRequest, ComplianceReport};
use tokio::task::JoinHandle;

/// Content shorter than this (chars) never reaches the AI path.
pub const SHORT_CONTENT_THRESHOLD: usize = 50;

#[derive(Default)]
pub struct EngineConfig {
    pub rules: RuleConfig,
    /// `None` disables the AI path entirely.
    pub ai: Option<AiConfig>,
    pub short_content_threshold: Option<usize>,
}

/// ComplianceEngine entry point.
pub struct ComplianceEngine {
    rules: RuleEngine,
    ai: Option<AiAnalyzer>,
    short_content_threshold: usize,
}

impl ComplianceEngine {
    /// Rule engine only, default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            rules: RuleEngine::with_config(config.rules),
            ai: config.ai.map(AiAnalyzer::new),
            short_content_threshold: config
                .short_content_threshold
                .unwrap_or(SHORT_CONTENT_THRESHOLD),
        }
    }

    /// Default rules; AI enabled if the environment carries an API key.
    pub fn from_env() -> Self {
        Self {
            rules: RuleEngine::new(),
            ai: AiAnalyzer::from_env(),
            short_content_threshold: SHORT_CONTENT_THRESHOLD,
        }
    }

    pub fn ai_available(&self) -> bool {
        self.ai.as_ref().is_some_and(|ai| ai.is_available())
    }

    /// Run one analysis. The only suspension point is the AI HTTP call;
    /// short content and AI-less configurations complete synchronously.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ComplianceReport, AnalysisError> {
        validate(request)?;

        let rule_categories = self.rules.evaluate(request);

        let char_len = request.content.chars().count();
        if char_len < self.short_content_threshold {
            tracing::debug!(chars = char_len, "below AI threshold; rule engine only");
            return Ok(scoring::build_report(rule_categories, None));
        }

        if let Some(ai) = &self.ai {
            let prohibited: Vec<&str> = self
                .rules
                .profile_for(&request.industry)
                .map(|profile| {
                    profile
                        .prohibited
                        .iter()
                        .map(|rule| rule.phrase.as_str())
                        .collect()
                })
                .unwrap_or_default();

            if let Some(assessment) = ai.assess(request, &prohibited).await {
                return Ok(scoring::build_report(
                    assessment.categories,
                    assessment.summary,
                ));
            }
        }

        Ok(scoring::build_report(rule_categories, None))
    }

    /// Spawn an analysis as a cancellable task. A caller superseding an
    /// in-flight analysis cancels the old handle before spawning the new
    /// one, so a slow first reply can never overwrite a fast second one.
    pub fn spawn(self: &Arc<Self>, request: AnalysisRequest) -> AnalysisHandle {
        let engine = Arc::clone(self);
        AnalysisHandle {
            task: tokio::spawn(async move { engine.analyze(&request).await }),
        }
    }
}

impl Default for ComplianceEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an in-flight analysis.
pub struct AnalysisHandle {
    task: JoinHandle<Result<ComplianceReport, AnalysisError>>,
}

impl AnalysisHandle {
    /// Abort the analysis. Safe to call after completion.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub async fn join(self) -> Result<ComplianceReport, AnalysisError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(AnalysisError::Cancelled),
            Err(err) => Err(AnalysisError::Internal(err.to_string())),
        }
    }
}

fn validate(request: &AnalysisRequest) -> Result<(), AnalysisError> {
    if request.content.trim().is_empty() {
        return Err(AnalysisError::MissingField("content"));
    }
    if request.industry.trim().is_empty() {
        return Err(AnalysisError::MissingField("industry"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Category;

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let engine = ComplianceEngine::new();
        let result = engine
            .analyze(&AnalysisRequest::new("   ", "pharmaceutical"))
            .await;
        assert!(matches!(result, Err(AnalysisError::MissingField("content"))));
    }

    #[tokio::test]
    async fn test_empty_industry_rejected() {
        let engine = ComplianceEngine::new();
        let result = engine.analyze(&AnalysisRequest::new("テスト", "")).await;
        assert!(matches!(
            result,
            Err(AnalysisError::MissingField("industry"))
        ));
    }

    #[tokio::test]
    async fn test_scenario_a_short_japanese_pharma() {
        let engine = ComplianceEngine::new();
        let report = engine
            .analyze(&AnalysisRequest::new(
                "この薬は完全に治ります。100%安全です。",
                "pharmaceutical",
            ))
            .await
            .unwrap();

        let claims = &report.categories[&Category::RegulatoryClaims];
        assert!(claims.score <= 70.0);
        assert!(claims.issues.len() >= 2);
        assert!(report.aggregate_score < 100);
    }

    #[tokio::test]
    async fn test_scenario_b_unregulated_clean() {
        let engine = ComplianceEngine::new();
        let report = engine
            .analyze(&AnalysisRequest::new(
                "Hello, this is a normal press release about a product launch.",
                "technology",
            ))
            .await
            .unwrap();

        assert_eq!(report.aggregate_score, 100);
        assert!(report.ordered_issues().is_empty());
        for category in Category::ALL {
            assert_eq!(report.categories[&category].score, 100.0);
        }
    }

    #[tokio::test]
    async fn test_short_content_is_rules_only_even_with_ai_configured() {
        // AI configured but unreachable; short content must never touch it,
        // so the result equals the rules-only result.
        let config = EngineConfig {
            ai: Some(AiConfig {
                api_key: Some("test-key".into()),
                endpoint: "http://127.0.0.1:1/v1/chat/completions".into(),
                ..AiConfig::default()
            }),
            ..EngineConfig::default()
        };
        let with_ai = ComplianceEngine::with_config(config);
        let rules_only = ComplianceEngine::new();

        let request = AnalysisRequest::new("完治します。", "pharmaceutical");
        let a = with_ai.analyze(&request).await.unwrap();
        let b = rules_only.analyze(&request).await.unwrap();
        assert_eq!(a.categories, b.categories);
        assert_eq!(a.aggregate_score, b.aggregate_score);
    }

    #[tokio::test]
    async fn test_unreachable_ai_degrades_to_rules() {
        let config = EngineConfig {
            ai: Some(AiConfig {
                api_key: Some("test-key".into()),
                endpoint: "http://127.0.0.1:1/v1/chat/completions".into(),
                timeout_seconds: 2,
                ..AiConfig::default()
            }),
            ..EngineConfig::default()
        };
        let engine = ComplianceEngine::with_config(config);

        // Long enough to cross the AI threshold.
        let content = "この薬は完全に治ります。".repeat(6);
        let request = AnalysisRequest::new(content.clone(), "pharmaceutical");
        let report = engine.analyze(&request).await.unwrap();

        let expected = ComplianceEngine::new().analyze(&request).await.unwrap();
        assert_eq!(report.categories, expected.categories);
        assert_eq!(report.aggregate_score, expected.aggregate_score);
    }

    #[tokio::test]
    async fn test_spawned_analysis_joins() {
        let engine = Arc::new(ComplianceEngine::new());
        let handle = engine.spawn(AnalysisRequest::new("完治します。", "pharmaceutical"));
        let report = handle.join().await.unwrap();
        assert!(report.aggregate_score < 100);
    }

    #[tokio::test]
    async fn test_cancel_is_safe() {
        let engine = Arc::new(ComplianceEngine::new());
        let handle = engine.spawn(AnalysisRequest::new("完治します。", "pharmaceutical"));
        handle.cancel();
        // Depending on scheduling the task may have already finished; both
        // outcomes are acceptable, panicking is not.
        match handle.join().await {
            Ok(_) | Err(AnalysisError::Cancelled) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
