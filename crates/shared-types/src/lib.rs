pub mod types;

pub use types::{
    AnalysisRequest, Category, CategoryResult, ComplianceIssue, ComplianceReport, Language,
    Severity, TextSpan,
};
