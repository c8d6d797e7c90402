use std::fmt;

use crate::parser::StreamOutcome;

/// Terminal failure while reading an agent stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamReadError {
    /// Reading from the underlying pipe or file failed.
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),
    /// A single line exceeded the configured buffer size.
    #[error("stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Stream parse that stopped on a read error.
///
/// `partial` still carries the text and result accumulated before the error,
/// so callers can use them on a best-effort basis.
#[derive(Debug)]
pub struct StreamFailure<R> {
    pub partial: StreamOutcome<R>,
    pub source: StreamReadError,
}

impl<R> StreamFailure<R> {
    pub(crate) fn new(partial: StreamOutcome<R>, source: StreamReadError) -> Self {
        Self { partial, source }
    }

    /// Converts the partial result type, keeping the read error.
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> StreamFailure<T> {
        StreamFailure {
            partial: self.partial.map(f),
            source: self.source,
        }
    }
}

impl<R> fmt::Display for StreamFailure<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent stream aborted: {}", self.source)
    }
}

impl<R: fmt::Debug> std::error::Error for StreamFailure<R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Top-level error type for starting and collecting an agent run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The agent program could not be started.
    #[error("failed to start agent `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// A child pipe was not available after spawning.
    #[error("agent {0} pipe was not captured")]
    MissingPipe(&'static str),
    /// A reader task panicked or was cancelled.
    #[error("agent reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// Waiting for the agent process failed.
    #[error("failed to wait for agent process: {0}")]
    Wait(#[source] std::io::Error),
    /// Invalid command or configuration supplied by the caller.
    #[error("validation error: {0}")]
    Validation(String),
}
