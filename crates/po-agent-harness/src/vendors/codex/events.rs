use serde::Deserialize;

use crate::model::Usage;

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadStarted {
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnCompleted {
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnFailed {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// Top-level `error` line; the message is inline.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamError {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemEvent {
    pub item: Item,
}

/// Thread item. Fields not used by an item kind are left at their defaults.
#[derive(Debug, Deserialize)]
pub(crate) struct Item {
    #[serde(rename = "type", alias = "item_type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub aggregated_output: String,
    #[serde(default)]
    pub exit_code: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub changes: Vec<FileChange>,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub query: String,
}

impl Item {
    pub fn failed(&self) -> bool {
        self.status.as_deref() == Some("failed") || self.exit_code.is_some_and(|code| code != 0)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileChange {
    pub path: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub cached_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl From<WireUsage> for Usage {
    fn from(wire: WireUsage) -> Self {
        Usage::new(wire.input_tokens, wire.output_tokens, wire.cached_input_tokens)
    }
}
