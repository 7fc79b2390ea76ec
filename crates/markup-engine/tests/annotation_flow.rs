//! End-to-end flow: analyze a document's flat text, project the findings
//! onto the document, then dismiss and auto-fix.

use compliance_engine::ComplianceEngine;
use markup_engine::{extract_text, AnnotationSession, MarkManager, MemoryDocument};
use pretty_assertions::assert_eq;
use shared_types::AnalysisRequest;

fn analyze(content: &str) -> shared_types::ComplianceReport {
    let engine = ComplianceEngine::new();
    let request = AnalysisRequest::new(content, "pharmaceutical");
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(engine.analyze(&request))
        .unwrap()
}

#[test]
fn test_report_projects_onto_document() {
    let doc = MemoryDocument::from_paragraphs(["この薬は完全に治ります。", "100%安全です。"]);
    let content = extract_text(&doc);
    let report = analyze(&content);

    let mut manager = MarkManager::new(doc);
    let session = AnnotationSession::new();
    manager.apply_report(&report, &session).unwrap();

    // Every positioned finding covers exactly the text it flagged.
    let mut rendered = 0;
    for issue in manager.issues().to_vec() {
        let Some(span) = &issue.position else { continue };
        let flagged: String = content
            .chars()
            .skip(span.start)
            .take(span.end - span.start)
            .collect();
        assert_eq!(
            manager.document().marked_text(&issue.id).as_deref(),
            Some(flagged.as_str())
        );
        rendered += 1;
    }
    assert!(rendered >= 2);
}

#[test]
fn test_dismissal_survives_reanalysis_of_identical_content() {
    let doc = MemoryDocument::from_paragraphs(["この薬は完全に治ります。100%安全です。"]);
    let content = extract_text(&doc);
    let report = analyze(&content);

    let mut manager = MarkManager::new(doc);
    let mut session = AnnotationSession::new();
    manager.apply_report(&report, &session).unwrap();

    let first = manager
        .issues()
        .iter()
        .find(|i| i.position.is_some())
        .unwrap()
        .id
        .clone();
    manager.dismiss_issue(&first, &mut session).unwrap();
    assert!(manager.document().marked_text(&first).is_none());

    // Identical content yields identical stable ids on re-analysis.
    let again = analyze(&content);
    manager.apply_report(&again, &session).unwrap();
    assert!(manager.document().marked_text(&first).is_none());
}

#[test]
fn test_accepting_removal_suggestion_cleans_the_text() {
    let doc = MemoryDocument::from_paragraphs(["この薬は完全に治ります。"]);
    let content = extract_text(&doc);
    let report = analyze(&content);

    let mut manager = MarkManager::new(doc);
    let mut session = AnnotationSession::new();
    manager.apply_report(&report, &session).unwrap();

    // Prohibited-phrase findings suggest removal (empty replacement).
    let removable = manager
        .issues()
        .iter()
        .find(|i| i.position.is_some() && i.suggestion.as_deref() == Some(""))
        .unwrap()
        .id
        .clone();
    manager
        .accept_suggestion(&removable, "", &mut session)
        .unwrap();

    let fixed = extract_text(manager.document());
    assert!(!fixed.contains("完全に治"));

    // The cleaned text scores higher on re-analysis.
    let after = analyze(&fixed);
    let before = analyze(&content);
    assert!(after.aggregate_score > before.aggregate_score);
}

#[test]
fn test_clean_report_clears_previous_marks() {
    let doc = MemoryDocument::from_paragraphs(["この薬は完全に治ります。"]);
    let content = extract_text(&doc);
    let report = analyze(&content);

    let mut manager = MarkManager::new(doc);
    let session = AnnotationSession::new();
    manager.apply_report(&report, &session).unwrap();
    assert!(!manager.document().annotations().is_empty());

    let clean = analyze("通常のお知らせ文です。");
    manager.apply_report(&clean, &session).unwrap();
    assert!(manager.document().annotations().is_empty());
}
