//! Claude Code `stream-json` output.
//!
//! Assistant messages arrive one content block per line, all sharing the
//! message id, so a turn starts whenever the id changes. The closing `result`
//! line is authoritative for usage, duration and final text.
mod events;

use crate::model::Vendor;
use crate::parser::VendorDecoder;
use crate::result::{RunResult, UnifiedResult};
use crate::stream::StreamEvent;
use crate::vendors::summarize_tool_input;

use events::{ContentBlock, MessageEvent, ResultEvent, SystemEvent};

/// Claude run result with the cost and wall-clock time it reports.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct ClaudeResult {
    #[serde(flatten)]
    pub run: RunResult,
    pub total_cost_usd: Option<f64>,
    /// The `result` line was flagged as an error.
    pub is_error: bool,
    /// End-to-end duration including local tool time.
    pub wall_duration_ms: Option<u64>,
}

impl UnifiedResult for ClaudeResult {
    fn run_result(&self) -> Option<&RunResult> {
        Some(&self.run)
    }
}

#[derive(Debug, Default)]
pub struct ClaudeDecoder {
    current_message: Option<String>,
    total_cost_usd: Option<f64>,
    is_error: bool,
    wall_duration_ms: Option<u64>,
}

impl ClaudeDecoder {
    fn starts_turn(&mut self, message_id: Option<String>) -> bool {
        match message_id {
            Some(id) if self.current_message.as_deref() == Some(id.as_str()) => false,
            Some(id) => {
                self.current_message = Some(id);
                true
            }
            None => true,
        }
    }

    fn assistant(&mut self, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: MessageEvent = serde_json::from_str(line)?;
        let mut out = Vec::new();
        if self.starts_turn(event.message.id) {
            out.push(StreamEvent::TurnStart);
        }
        for block in event.message.content {
            match block {
                ContentBlock::Text { text } => out.push(StreamEvent::answer(text)),
                ContentBlock::Thinking { thinking } => out.push(StreamEvent::reasoning(thinking)),
                ContentBlock::ToolUse { name, input } => out.push(StreamEvent::ToolInvocation {
                    detail: summarize_tool_input(&input),
                    name,
                }),
                ContentBlock::ToolResult { .. } | ContentBlock::Other => {}
            }
        }
        Ok(out)
    }

    fn user(line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: MessageEvent = serde_json::from_str(line)?;
        Ok(event
            .message
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult { content, is_error } => Some(StreamEvent::ToolResult {
                    output: content.map(|c| c.into_text()).unwrap_or_default(),
                    is_error: is_error.unwrap_or(false),
                }),
                _ => None,
            })
            .collect())
    }

    fn result(&mut self, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: ResultEvent = serde_json::from_str(line)?;
        self.total_cost_usd = event.total_cost_usd.or(self.total_cost_usd);
        self.is_error |= event.is_error;
        self.wall_duration_ms = event.duration_ms.or(self.wall_duration_ms);

        let mut out = Vec::with_capacity(2);
        if event.is_error {
            let message = event
                .result
                .clone()
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| "agent reported an error result".to_string());
            out.push(StreamEvent::Failure { message });
        }
        out.push(StreamEvent::FinalResult {
            text: event.result,
            usage: event.usage.map(Into::into),
            duration_ms: event.duration_api_ms.or(event.duration_ms),
            num_turns: event.num_turns,
            session_id: event.session_id,
        });
        Ok(out)
    }
}

impl VendorDecoder for ClaudeDecoder {
    type Output = ClaudeResult;

    fn vendor(&self) -> Vendor {
        Vendor::Claude
    }

    fn decode(&mut self, kind: &str, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        match kind {
            "system" => {
                let event: SystemEvent = serde_json::from_str(line)?;
                match (event.subtype.as_deref(), event.session_id) {
                    (Some("init"), Some(session_id)) => Ok(vec![StreamEvent::SessionInit {
                        session_id,
                        model: event.model,
                    }]),
                    _ => Ok(Vec::new()),
                }
            }
            "assistant" => self.assistant(line),
            "user" => Self::user(line),
            "result" => self.result(line),
            other => Ok(vec![StreamEvent::Unknown {
                kind: other.to_string(),
            }]),
        }
    }

    fn finish(self, run: RunResult) -> ClaudeResult {
        ClaudeResult {
            run,
            total_cost_usd: self.total_cost_usd,
            is_error: self.is_error,
            wall_duration_ms: self.wall_duration_ms,
        }
    }
}
