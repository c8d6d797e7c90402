use std::path::PathBuf;

/// Errors raised while loading, recovering or persisting review payloads.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("failed to access review file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Every recovery stage failed. `reason` names the likely cause; the
    /// payload itself is never included.
    #[error("could not recover review JSON: {reason}")]
    Unrecoverable { reason: String },
    #[error("failed to serialize review: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Inconsistent review data detected while scoring.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("review lists {issues} issue(s) but total_entries is {total_entries}")]
    InconsistentEntries { total_entries: i64, issues: usize },
    #[error("issue for msgid {msgid:?} has score {score}, expected 0 to 3")]
    ScoreOutOfRange { msgid: String, score: i64 },
}
