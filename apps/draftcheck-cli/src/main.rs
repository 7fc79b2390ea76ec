//! draftcheck - compliance check for marketing copy
//!
//! Usage:
//!   draftcheck <file> [industry]
//!   draftcheck --json <file> [industry]
//!
//! Reads the draft from `<file>` (or stdin when `<file>` is `-`), runs the
//! compliance analysis, and prints the report. The AI analyzer is enabled
//! automatically when an API key is present in the environment.

use std::io::Read;

use anyhow::{bail, Context, Result};
use compliance_engine::ComplianceEngine;
use shared_types::{AnalysisRequest, ComplianceReport};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("draftcheck_cli=info".parse()?)
                .add_directive("compliance_engine=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.first().map(String::as_str) == Some("--json");
    if json {
        args.remove(0);
    }
    let Some(path) = args.first() else {
        bail!("usage: draftcheck [--json] <file> [industry]");
    };
    let industry = args.get(1).cloned().unwrap_or_else(|| "general".to_string());

    let content = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?
    };

    let engine = ComplianceEngine::from_env();
    info!(
        industry = %industry,
        chars = content.chars().count(),
        ai = engine.ai_available(),
        "starting analysis"
    );

    let report = engine
        .analyze(&AnalysisRequest::new(content, industry))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    // Non-zero exit when any error-severity finding is present, so the
    // check can gate a publishing pipeline.
    let has_errors = report
        .ordered_issues()
        .iter()
        .any(|i| i.severity == shared_types::Severity::Error);
    if has_errors {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &ComplianceReport) {
    println!("Compliance score: {}/100", report.aggregate_score);
    if let Some(summary) = &report.summary {
        println!("{summary}");
    }
    println!();

    for (category, result) in &report.categories {
        println!("  {:<20} {:>5.1}", category.as_str(), result.score);
    }

    let issues = report.ordered_issues();
    if issues.is_empty() {
        println!("\nNo issues found.");
        return;
    }

    println!("\n{} issue(s):", issues.len());
    for issue in issues {
        let position = issue
            .position
            .map(|span| format!(" [{}..{}]", span.start, span.end))
            .unwrap_or_default();
        println!("  {:<10} {}{}", issue.severity.as_str(), issue.message, position);
        if let Some(suggestion) = &issue.suggestion {
            if suggestion.is_empty() {
                println!("             fix: remove this text");
            } else {
                println!("             fix: {suggestion}");
            }
        }
        if let Some(reference) = &issue.rule_reference {
            println!("             ref: {reference}");
        }
    }
}
