use std::fmt;

use crate::errors::ScoreError;
use crate::model::{ReviewIssue, ReviewJsonResult, Severity};
use crate::score::{ReviewScore, score_breakdown};

/// Plain-text summary of a scored review.
#[derive(Clone, Debug, PartialEq)]
pub struct ReviewReport {
    pub score: ReviewScore,
    pub total_entries: i64,
    /// Issue counts indexed like [`Severity::ALL`].
    pub severity_counts: [usize; 4],
    /// Issues ordered from most to least severe.
    pub issues: Vec<ReviewIssue>,
}

impl ReviewReport {
    pub fn new(result: &ReviewJsonResult) -> Result<Self, ScoreError> {
        let score = score_breakdown(result)?;
        let mut severity_counts = [0usize; 4];
        for issue in &result.issues {
            if let Some(severity) = issue.severity() {
                severity_counts[severity as usize] += 1;
            }
        }
        let mut issues = result.issues.clone();
        issues.sort_by_key(|issue| issue.score);
        Ok(Self {
            score,
            total_entries: result.total_entries,
            severity_counts,
            issues,
        })
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.severity_counts[severity as usize]
    }
}

impl fmt::Display for ReviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Review score: {}/100", self.score.score)?;
        writeln!(
            f,
            "Entries: {}, issues: {} (deduction {} of {} points)",
            self.total_entries,
            self.issues.len(),
            self.score.deduction,
            self.score.max_points
        )?;
        let histogram = Severity::ALL
            .iter()
            .map(|severity| format!("{} {}", severity.as_str(), self.count(*severity)))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Severity: {histogram}")?;
        for issue in &self.issues {
            let label = issue.severity().map_or("invalid", |s| s.as_str());
            write!(f, "\n[{label}] {:?} -> {:?}", issue.msgid, issue.msgstr)?;
            if !issue.description.is_empty() {
                write!(f, "\n    {}", issue.description)?;
            }
            if !issue.suggestion.is_empty() {
                write!(f, "\n    suggestion: {}", issue.suggestion)?;
            }
        }
        Ok(())
    }
}
