use serde::Deserialize;
use serde_json::Value;

use crate::model::Usage;

#[derive(Debug, Deserialize)]
pub(crate) struct InitEvent {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageEvent {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolUseEvent {
    pub tool_name: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolResultEvent {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEvent {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResultEvent {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub stats: Option<Stats>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Stats {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cached: u64,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub tool_calls: u32,
}

impl From<&Stats> for Usage {
    fn from(stats: &Stats) -> Self {
        Usage::new(stats.input_tokens, stats.output_tokens, stats.cached)
    }
}
