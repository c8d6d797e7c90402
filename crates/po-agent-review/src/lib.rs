//! Review payload recovery, aggregation and scoring for translation reviews
//! produced by agents.
//!
//! Agents are asked to answer with
//! `{"total_entries": N, "issues": [{"msgid", "msgstr", "score", "description", "suggestion"}]}`
//! where `score` runs from 0 (critical) to 3 (informational). Their output is
//! often wrapped in prose or code fences, or is slightly malformed;
//! [`parse_review_json`] recovers what it can before giving up.

/// Aggregation of several review runs.
pub mod aggregate;
/// Review error types.
pub mod errors;
/// Review payload types.
pub mod model;
/// Tolerant review JSON recovery.
pub mod repair;
/// Plain-text review report.
pub mod report;
/// Review score calculation.
pub mod score;
/// Reading and writing review files.
pub mod store;

pub use aggregate::aggregate_reviews;
pub use errors::{ReviewError, ScoreError};
pub use model::{MAX_ISSUE_SCORE, ReviewIssue, ReviewJsonResult, Severity};
pub use repair::parse_review_json;
pub use report::ReviewReport;
pub use score::{ReviewScore, calculate_review_score, score_breakdown};
pub use store::{load_review_file, save_review_file, to_persisted_json};
