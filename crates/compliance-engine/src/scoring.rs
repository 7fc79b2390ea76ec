//! Weighted aggregation of per-category results.
//!
//! Pure merge step: the scorer does not care whether the category map came
//! from the rule engine, the AI detector, or a blend.

use std::collections::BTreeMap;

use shared_types::{Category, CategoryResult, ComplianceReport};

/// `round(Σ weight_c · clamp(score_c, 0, 100))`. Categories absent from the
/// map count as a clean 100.
pub fn aggregate_score(categories: &BTreeMap<Category, CategoryResult>) -> u32 {
    let weighted: f64 = Category::ALL
        .iter()
        .map(|c| {
            let score = categories.get(c).map(|r| r.score).unwrap_or(100.0);
            c.weight() * score.clamp(0.0, 100.0)
        })
        .sum();
    weighted.round() as u32
}

/// Assemble the final report: clamp stored scores, compute the aggregate,
/// stamp the check time.
pub fn build_report(
    mut categories: BTreeMap<Category, CategoryResult>,
    summary: Option<String>,
) -> ComplianceReport {
    for result in categories.values_mut() {
        result.score = result.score.clamp(0.0, 100.0);
    }
    let aggregate_score = aggregate_score(&categories);
    ComplianceReport {
        categories,
        aggregate_score,
        summary,
        checked_at: chrono::Utc::now().timestamp() as u64,
    }
}
