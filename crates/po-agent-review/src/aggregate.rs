use std::collections::HashMap;

use tracing::warn;

use crate::model::{ReviewIssue, ReviewJsonResult};

/// Merges the reviews of several agent runs.
///
/// Issues are merged by `msgid` in first-appearance order; when runs disagree
/// the most severe (lowest) score wins. `ground_truth` is the entry count of
/// the translation file and always overrides what the runs reported;
/// otherwise the first non-zero `total_entries` is used.
///
/// Returns `None` when every input is absent or empty.
pub fn aggregate_reviews(
    results: &[Option<ReviewJsonResult>],
    ground_truth: Option<i64>,
) -> Option<ReviewJsonResult> {
    let present: Vec<&ReviewJsonResult> = results
        .iter()
        .flatten()
        .filter(|result| !result.is_empty())
        .collect();
    if present.is_empty() {
        return None;
    }

    let mut issues: Vec<ReviewIssue> = Vec::new();
    let mut index_by_msgid: HashMap<&str, usize> = HashMap::new();
    for issue in present.iter().flat_map(|result| &result.issues) {
        match index_by_msgid.get(issue.msgid.as_str()) {
            Some(&idx) => {
                let kept = &mut issues[idx];
                warn!(
                    msgid = %issue.msgid,
                    kept_score = kept.score.min(issue.score),
                    dropped_score = kept.score.max(issue.score),
                    "duplicate review issue across runs"
                );
                if issue.score < kept.score {
                    *kept = issue.clone();
                }
            }
            None => {
                index_by_msgid.insert(issue.msgid.as_str(), issues.len());
                issues.push(issue.clone());
            }
        }
    }

    let total_entries = ground_truth.unwrap_or_else(|| {
        present
            .iter()
            .map(|result| result.total_entries)
            .find(|total| *total != 0)
            .unwrap_or(0)
    });

    Some(ReviewJsonResult::new(total_entries, issues))
}
