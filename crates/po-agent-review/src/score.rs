use crate::errors::ScoreError;
use crate::model::{MAX_ISSUE_SCORE, ReviewJsonResult};

const PERFECT_SCORE: u8 = 100;

/// Score of a review with the figures it was computed from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReviewScore {
    /// Normalized 0 to 100 score.
    pub score: u8,
    /// `3 * total_entries`.
    pub max_points: i64,
    /// Points lost to issues.
    pub deduction: i64,
    /// `max_points - deduction`, clamped to `0..=max_points`.
    pub raw_points: i64,
}

/// Computes the score and its intermediate figures.
///
/// A review with `total_entries <= 0` and no issues scores 100. That usually
/// means the caller never supplied the entry count, but the value is kept.
pub fn score_breakdown(result: &ReviewJsonResult) -> Result<ReviewScore, ScoreError> {
    if let Some(issue) = result
        .issues
        .iter()
        .find(|issue| !(0..=MAX_ISSUE_SCORE).contains(&issue.score))
    {
        return Err(ScoreError::ScoreOutOfRange {
            msgid: issue.msgid.clone(),
            score: issue.score,
        });
    }

    if result.total_entries <= 0 {
        if !result.issues.is_empty() {
            return Err(ScoreError::InconsistentEntries {
                total_entries: result.total_entries,
                issues: result.issues.len(),
            });
        }
        return Ok(ReviewScore {
            score: PERFECT_SCORE,
            max_points: 0,
            deduction: 0,
            raw_points: 0,
        });
    }

    let max_points = result.total_entries.saturating_mul(MAX_ISSUE_SCORE);
    let deduction: i64 = result
        .issues
        .iter()
        .map(|issue| MAX_ISSUE_SCORE - issue.score)
        .sum();
    let raw_points = max_points.saturating_sub(deduction).clamp(0, max_points);
    let normalized = (raw_points as f64 * 100.0 / max_points as f64).round();
    let score = normalized.clamp(0.0, f64::from(PERFECT_SCORE)) as u8;

    Ok(ReviewScore {
        score,
        max_points,
        deduction,
        raw_points,
    })
}

/// Normalized 0 to 100 quality score of a review.
pub fn calculate_review_score(result: &ReviewJsonResult) -> Result<u8, ScoreError> {
    score_breakdown(result).map(|breakdown| breakdown.score)
}
