//! OpenCode `run --format json` output.
//!
//! Each step is bracketed by `step_start`/`step_finish`. Steps carry epoch
//! millisecond timestamps, which give the per-turn duration.
mod events;

use crate::model::Vendor;
use crate::parser::VendorDecoder;
use crate::result::{RunResult, UnifiedResult};
use crate::stream::StreamEvent;
use crate::vendors::summarize_tool_input;

use events::{Envelope, ErrorEvent, OpaquePart, StepFinishPart, TextPart, ToolPart};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct OpenCodeResult {
    #[serde(flatten)]
    pub run: RunResult,
    /// Sum of the per-step costs.
    pub cost: f64,
    pub reasoning_tokens: u64,
}

impl UnifiedResult for OpenCodeResult {
    fn run_result(&self) -> Option<&RunResult> {
        Some(&self.run)
    }
}

#[derive(Debug, Default)]
pub struct OpenCodeDecoder {
    session_seen: bool,
    step_started_at: Option<u64>,
    cost: f64,
    reasoning_tokens: u64,
}

impl OpenCodeDecoder {
    fn step_start(&mut self, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: Envelope<OpaquePart> = serde_json::from_str(line)?;
        let mut out = Vec::with_capacity(2);
        if !self.session_seen
            && let Some(session_id) = event.session_id.filter(|id| !id.is_empty())
        {
            self.session_seen = true;
            out.push(StreamEvent::SessionInit {
                session_id,
                model: None,
            });
        }
        self.step_started_at = event.timestamp;
        out.push(StreamEvent::TurnStart);
        Ok(out)
    }

    fn step_finish(&mut self, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: Envelope<StepFinishPart> = serde_json::from_str(line)?;
        let duration_ms = match (self.step_started_at.take(), event.timestamp) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        };
        self.cost += event.part.cost.unwrap_or(0.0);
        let usage = event.part.tokens.as_ref().map(|tokens| {
            self.reasoning_tokens += tokens.reasoning;
            tokens.into()
        });
        Ok(vec![StreamEvent::TurnFinish { usage, duration_ms }])
    }

    fn tool_use(line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: Envelope<ToolPart> = serde_json::from_str(line)?;
        let ToolPart { tool, state } = event.part;
        let mut out = vec![StreamEvent::ToolInvocation {
            detail: summarize_tool_input(&state.input),
            name: tool,
        }];
        match state.status.as_str() {
            "completed" => out.push(StreamEvent::ToolResult {
                output: state.output.unwrap_or_default(),
                is_error: false,
            }),
            "error" => out.push(StreamEvent::ToolResult {
                output: state.error.or(state.output).unwrap_or_default(),
                is_error: true,
            }),
            _ => {}
        }
        Ok(out)
    }
}

impl VendorDecoder for OpenCodeDecoder {
    type Output = OpenCodeResult;

    fn vendor(&self) -> Vendor {
        Vendor::OpenCode
    }

    fn decode(&mut self, kind: &str, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        match kind {
            "step_start" => self.step_start(line),
            "step_finish" => self.step_finish(line),
            "text" => {
                let event: Envelope<TextPart> = serde_json::from_str(line)?;
                Ok(vec![StreamEvent::answer(event.part.text)])
            }
            "reasoning" => {
                let event: Envelope<TextPart> = serde_json::from_str(line)?;
                Ok(vec![StreamEvent::reasoning(event.part.text)])
            }
            "tool_use" => Self::tool_use(line),
            "error" => {
                let event: ErrorEvent = serde_json::from_str(line)?;
                let message = event
                    .error
                    .and_then(|error| error.message())
                    .unwrap_or_else(|| "unknown error".to_string());
                Ok(vec![StreamEvent::Failure { message }])
            }
            other => Ok(vec![StreamEvent::Unknown {
                kind: other.to_string(),
            }]),
        }
    }

    fn finish(self, run: RunResult) -> OpenCodeResult {
        OpenCodeResult {
            run,
            cost: self.cost,
            reasoning_tokens: self.reasoning_tokens,
        }
    }
}
