use crate::model::Usage;

/// Normalized events decoded from one line of a vendor stream.
///
/// Events are consumed by the parser state machine within a single pass and
/// are never retained.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// The agent announced its session.
    SessionInit {
        session_id: String,
        model: Option<String>,
    },
    /// A new reasoning/response turn began.
    TurnStart,
    /// The current turn ended. `duration_ms` is a delta for this turn.
    TurnFinish {
        usage: Option<Usage>,
        duration_ms: Option<u64>,
    },
    /// Text produced by the agent. Only terminal chunks (answer text) are
    /// accumulated into the run's result text; reasoning is display-only.
    TextChunk { text: String, terminal: bool },
    /// The agent invoked a tool. `detail` is the command or a short summary
    /// of the arguments.
    ToolInvocation { name: String, detail: String },
    /// A tool finished.
    ToolResult { output: String, is_error: bool },
    /// Explicit terminal result marker. Durations here are absolute.
    FinalResult {
        text: Option<String>,
        usage: Option<Usage>,
        duration_ms: Option<u64>,
        num_turns: Option<u32>,
        session_id: Option<String>,
    },
    /// The agent reported an error.
    Failure { message: String },
    /// Valid JSON with a discriminant this vendor does not know.
    Unknown { kind: String },
}

impl StreamEvent {
    /// Text chunk that contributes to the run's result text.
    pub fn answer(text: impl Into<String>) -> Self {
        Self::TextChunk {
            text: text.into(),
            terminal: true,
        }
    }

    /// Display-only text chunk (reasoning/thinking).
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::TextChunk {
            text: text.into(),
            terminal: false,
        }
    }
}
