//! AI-assisted compliance assessment.
//!
//! Builds a rubric-constrained prompt, sends it to an OpenAI-compatible
//! chat-completions endpoint, and defensively parses the JSON reply.
//! Failure here is a designed degradation, never an error: transport or
//! status problems return `None` so the caller falls back to the rule
//! engine, and a reply that cannot be parsed yields a neutral default.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use shared_types::{
    AnalysisRequest, Category, CategoryResult, ComplianceIssue, Language, Severity, TextSpan,
};

/// Environment variables probed for an API key, in order.
const API_KEY_ENV_VARS: &[&str] = &["DRAFTCHECK_API_KEY", "OPENAI_API_KEY"];

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 2048,
            timeout_seconds: 30,
        }
    }
}

impl AiConfig {
    /// Discover key/endpoint/model from the environment.
    pub fn from_env() -> Self {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty());
        let endpoint =
            std::env::var("DRAFTCHECK_AI_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let model = std::env::var("DRAFTCHECK_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Self {
            api_key,
            endpoint,
            model,
            ..Self::default()
        }
    }
}

/// Category map plus optional free-text summary from the model.
#[derive(Debug, Clone)]
pub struct AiAssessment {
    pub categories: BTreeMap<Category, CategoryResult>,
    pub summary: Option<String>,
}

impl AiAssessment {
    /// Safe default when the reply cannot be trusted: 80 per category, no
    /// issues.
    fn neutral(summary: Option<String>) -> Self {
        Self {
            categories: Category::ALL
                .iter()
                .map(|c| (*c, CategoryResult::neutral()))
                .collect(),
            summary,
        }
    }
}

/// The AI detector.
pub struct AiAnalyzer {
    config: AiConfig,
    client: reqwest::Client,
}

impl AiAnalyzer {
    pub fn new(config: AiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Construct from the environment; `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        let config = AiConfig::from_env();
        if config.api_key.is_some() {
            Some(Self::new(config))
        } else {
            tracing::info!(
                "no AI API key configured (set DRAFTCHECK_API_KEY or OPENAI_API_KEY); \
                 rule engine only"
            );
            None
        }
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Assess the draft. `prohibited_phrases` is embedded in the prompt so
    /// the model scans for the same claims the rule engine does.
    ///
    /// Returns `None` on any transport or status failure; the caller falls
    /// back to the rule engine.
    pub async fn assess(
        &self,
        request: &AnalysisRequest,
        prohibited_phrases: &[&str],
    ) -> Option<AiAssessment> {
        let key = self.config.api_key.as_deref()?;
        let prompt = build_prompt(request, prohibited_phrases);

        match self.request_completion(key, &prompt).await {
            Ok(reply) => {
                tracing::debug!(chars = reply.len(), model = %self.config.model, "model reply");
                Some(parse_reply(&reply))
            }
            Err(err) => {
                tracing::warn!("AI assessment unavailable, degrading to rule engine: {err}");
                None
            }
        }
    }

    async fn request_completion(&self, key: &str, prompt: &str) -> Result<String, String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": 0.1,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a marketing-compliance reviewer for regulated industries. \
                                Always respond with valid JSON."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {key}"))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(200).collect();
            return Err(format!("API error {status}: {excerpt}"));
        }

        let reply: ChatCompletionReply = response
            .json()
            .await
            .map_err(|e| format!("malformed completion envelope: {e}"))?;

        reply
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| "empty completion".to_string())
    }
}

// Completion envelope (OpenAI-compatible shape).

#[derive(Debug, Deserialize)]
struct ChatCompletionReply {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

// Loosely-typed payload the model is asked to produce. Every field optional:
// the model is only informally contracted.

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    categories: Option<HashMap<String, ReplyCategory>>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyCategory {
    score: Option<f64>,
    #[serde(default)]
    issues: Vec<ReplyIssue>,
}

#[derive(Debug, Deserialize)]
struct ReplyIssue {
    #[serde(rename = "type", alias = "severity")]
    severity: Option<String>,
    message: Option<String>,
    position: Option<ReplySpan>,
    suggestion: Option<String>,
    #[serde(rename = "rule_reference", alias = "ruleReference")]
    rule_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplySpan {
    start: Option<usize>,
    end: Option<usize>,
}

/// Parse the raw model reply into an assessment. Never fails: anything
/// unusable collapses into the neutral default.
pub(crate) fn parse_reply(raw: &str) -> AiAssessment {
    let stripped = strip_code_fences(raw);
    let Some(json) = extract_json_object(&stripped) else {
        tracing::debug!("no JSON object in model reply; using neutral default");
        return AiAssessment::neutral(None);
    };

    let payload: ReplyPayload = match serde_json::from_str(&json) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!("unparsable model reply ({err}); using neutral default");
            return AiAssessment::neutral(None);
        }
    };

    let Some(reply_categories) = payload.categories else {
        return AiAssessment::neutral(payload.summary);
    };

    let mut categories = BTreeMap::new();
    for category in Category::ALL {
        let result = reply_categories
            .get(category.as_str())
            .map(normalize_category)
            .unwrap_or_else(CategoryResult::neutral);
        categories.insert(category, result);
    }

    AiAssessment {
        categories,
        summary: payload.summary,
    }
}

fn normalize_category(reply: &ReplyCategory) -> CategoryResult {
    let score = reply.score.unwrap_or(80.0).clamp(0.0, 100.0);
    let issues = reply
        .issues
        .iter()
        .filter_map(normalize_issue)
        .collect::<Vec<_>>();
    CategoryResult { score, issues }
}

fn normalize_issue(reply: &ReplyIssue) -> Option<ComplianceIssue> {
    let message = reply.message.as_deref()?.trim();
    if message.is_empty() {
        return None;
    }

    let position = reply.position.as_ref().and_then(|span| {
        match (span.start, span.end) {
            (Some(start), Some(end)) if start < end => Some(TextSpan::new(start, end)),
            _ => None,
        }
    });

    Some(ComplianceIssue {
        id: ComplianceIssue::stable_id(position.as_ref(), message),
        severity: normalize_severity(reply.severity.as_deref()),
        message: message.to_string(),
        position,
        suggestion: reply.suggestion.clone(),
        rule_reference: reply.rule_reference.clone(),
    })
}

/// Map whatever the model called the severity onto the three known values.
/// Unknown or missing defaults to warning.
fn normalize_severity(raw: Option<&str>) -> Severity {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("error") | Some("critical") => Severity::Error,
        Some("warning") | Some("caution") => Severity::Warning,
        Some("suggestion") | Some("info") | Some("minor") => Severity::Suggestion,
        _ => Severity::Warning,
    }
}

lazy_static! {
    static ref FENCE_RE: Regex = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap();
}

/// Models often wrap JSON in a fenced code block despite instructions.
fn strip_code_fences(raw: &str) -> String {
    match FENCE_RE.captures(raw) {
        Some(captures) => captures[1].to_string(),
        None => raw.to_string(),
    }
}

/// First balanced `{...}` region, string-aware so braces inside JSON string
/// values do not throw the depth count off.
fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// One prompt: rubric, prohibited phrases, the draft, and a strict
/// JSON-only output instruction.
fn build_prompt(request: &AnalysisRequest, prohibited_phrases: &[&str]) -> String {
    let language = match request.language {
        Language::Ja => "Japanese",
        Language::En => "English",
    };
    let content_type = request
        .content_type
        .as_deref()
        .map(|t| format!(" (content type: {t})"))
        .unwrap_or_default();

    let mut prompt = format!(
        "Review the following {language} marketing draft for the \"{}\" industry{content_type} \
         and score it against the compliance rubric below.\n\n",
        request.industry,
    );

    prompt.push_str("## Rubric (score each category 0-100, 100 = fully compliant)\n");
    for category in Category::ALL {
        prompt.push_str(&format!(
            "- {} (weight {:.2}): {}\n",
            category.as_str(),
            category.weight(),
            rubric_line(category),
        ));
    }

    if !prohibited_phrases.is_empty() {
        prompt.push_str("\n## Prohibited phrases (every occurrence is an error)\n");
        for phrase in prohibited_phrases {
            prompt.push_str(&format!("- \"{phrase}\"\n"));
        }
    }

    prompt.push_str("\n## Draft\n");
    prompt.push_str(&request.content);

    prompt.push_str(
        "\n\n## Output\n\
         Respond with JSON only. No prose, no code fences. Shape:\n\
         {\n\
           \"categories\": {\n\
             \"regulatory_claims\": {\n\
               \"score\": 85,\n\
               \"issues\": [\n\
                 {\n\
                   \"type\": \"error\",\n\
                   \"message\": \"...\",\n\
                   \"position\": { \"start\": 0, \"end\": 10 },\n\
                   \"suggestion\": \"...\",\n\
                   \"rule_reference\": \"...\"\n\
                 }\n\
               ]\n\
             }\n\
           },\n\
           \"summary\": \"...\"\n\
         }\n\
         All five rubric categories must appear. Positions are character \
         offsets into the draft, end exclusive. Issue type is one of error, \
         warning, suggestion. Omit position when you cannot locate the exact \
         span.",
    );

    prompt
}

fn rubric_line(category: Category) -> &'static str {
    match category {
        Category::RegulatoryClaims => {
            "absolute efficacy or guarantee claims, superlatives, off-label promotion"
        }
        Category::SafetyInfo => {
            "presence and adequacy of side-effect, precaution, and consultation information"
        }
        Category::FairBalance => "benefit claims balanced against risks and limitations",
        Category::Substantiation => "claims backed by evidence, data, or cited sources",
        Category::Formatting => "required notices, disclaimers, and legibility conventions",
    }
}
