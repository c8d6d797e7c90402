use serde::Deserialize;
use serde_json::Value;

use crate::model::Usage;

/// Envelope fields shared by every OpenCode line.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<P> {
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default, rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub part: P,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TextPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ToolPart {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub state: ToolState,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ToolState {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StepFinishPart {
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub tokens: Option<Tokens>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Tokens {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub reasoning: u64,
    #[serde(default)]
    pub cache: CacheTokens,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CacheTokens {
    #[serde(default)]
    pub read: u64,
}

impl From<&Tokens> for Usage {
    fn from(tokens: &Tokens) -> Self {
        Usage::new(tokens.input, tokens.output, tokens.cache.read)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEvent {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<ErrorData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorData {
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> Option<String> {
        self.data
            .and_then(|data| data.message)
            .filter(|message| !message.is_empty())
            .or(self.name)
    }
}

/// `part` payload that is not inspected.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpaquePart {}
