use serde::{Deserialize, Serialize};

/// Quality points an entry can carry; also the score of an informational issue.
pub const MAX_ISSUE_SCORE: i64 = 3;

/// One problem reported by a reviewing agent.
///
/// `score` is kept signed and unchecked here so out-of-range values coming
/// from an agent survive parsing and are rejected by the score calculator.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub msgid: String,
    #[serde(default)]
    pub msgstr: String,
    /// 0 is critical, 3 is informational.
    pub score: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggestion: String,
}

impl ReviewIssue {
    pub fn severity(&self) -> Option<Severity> {
        Severity::from_score(self.score)
    }
}

/// Review payload, either from one agent run or merged across several.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReviewJsonResult {
    pub total_entries: i64,
    pub issues: Vec<ReviewIssue>,
}

impl ReviewJsonResult {
    pub fn new(total_entries: i64, issues: Vec<ReviewIssue>) -> Self {
        Self {
            total_entries,
            issues,
        }
    }

    /// No issues and no entry count.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.total_entries == 0
    }
}

/// Named severity levels for issue scores.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
    ];

    pub fn from_score(score: i64) -> Option<Self> {
        match score {
            0 => Some(Severity::Critical),
            1 => Some(Severity::Major),
            2 => Some(Severity::Minor),
            3 => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Info => "info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_text_fields_default_to_empty() {
        let issue: ReviewIssue =
            serde_json::from_str(r#"{"msgid":"Save","score":1}"#).expect("issue");
        assert_eq!(issue.msgstr, "");
        assert_eq!(issue.severity(), Some(Severity::Major));
    }

    #[test]
    fn out_of_range_scores_are_preserved() {
        let issue: ReviewIssue =
            serde_json::from_str(r#"{"msgid":"Save","score":7}"#).expect("issue");
        assert_eq!(issue.score, 7);
        assert_eq!(issue.severity(), None);
    }

    #[test]
    fn emptiness_requires_no_entries_and_no_issues() {
        assert!(ReviewJsonResult::default().is_empty());
        assert!(!ReviewJsonResult::new(4, Vec::new()).is_empty());
    }
}
