//! Gemini CLI `stream-json` output.
//!
//! Gemini has no turn markers. A turn starts with the first assistant message
//! after any other event; consecutive assistant deltas belong to the same turn.
mod events;

use crate::model::Vendor;
use crate::parser::VendorDecoder;
use crate::result::{RunResult, UnifiedResult};
use crate::stream::StreamEvent;
use crate::vendors::summarize_tool_input;

use events::{ErrorEvent, InitEvent, MessageEvent, ResultEvent, ToolResultEvent, ToolUseEvent};

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub struct GeminiResult {
    #[serde(flatten)]
    pub run: RunResult,
    pub total_tokens: u64,
    pub tool_calls: u32,
}

impl UnifiedResult for GeminiResult {
    fn run_result(&self) -> Option<&RunResult> {
        Some(&self.run)
    }
}

#[derive(Debug, Default)]
pub struct GeminiDecoder {
    in_assistant_run: bool,
    total_tokens: u64,
    tool_calls: u32,
}

impl GeminiDecoder {
    fn message(&mut self, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: MessageEvent = serde_json::from_str(line)?;
        if event.role != "assistant" {
            self.in_assistant_run = false;
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(2);
        if !self.in_assistant_run {
            self.in_assistant_run = true;
            out.push(StreamEvent::TurnStart);
        }
        out.push(StreamEvent::answer(event.content));
        Ok(out)
    }

    fn result(&mut self, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        let event: ResultEvent = serde_json::from_str(line)?;
        let mut out = Vec::with_capacity(2);
        if event.status == "error" {
            let message = event
                .error
                .map(|error| error.message)
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "agent reported an error result".to_string());
            out.push(StreamEvent::Failure { message });
        }
        let stats = event.stats.unwrap_or_default();
        self.total_tokens = stats.total_tokens;
        self.tool_calls = stats.tool_calls;
        out.push(StreamEvent::FinalResult {
            text: None,
            usage: Some((&stats).into()),
            duration_ms: stats.duration_ms,
            num_turns: None,
            session_id: None,
        });
        Ok(out)
    }
}

impl VendorDecoder for GeminiDecoder {
    type Output = GeminiResult;

    fn vendor(&self) -> Vendor {
        Vendor::Gemini
    }

    fn decode(&mut self, kind: &str, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        if kind == "message" {
            return self.message(line);
        }
        let events = match kind {
            "init" => {
                let event: InitEvent = serde_json::from_str(line)?;
                vec![StreamEvent::SessionInit {
                    session_id: event.session_id,
                    model: event.model,
                }]
            }
            "tool_use" => {
                let event: ToolUseEvent = serde_json::from_str(line)?;
                vec![StreamEvent::ToolInvocation {
                    detail: summarize_tool_input(&event.parameters),
                    name: event.tool_name,
                }]
            }
            "tool_result" => {
                let event: ToolResultEvent = serde_json::from_str(line)?;
                let is_error = event.status == "error";
                let output = if is_error {
                    event
                        .error
                        .map(|error| error.message)
                        .or(event.output)
                        .unwrap_or_default()
                } else {
                    event.output.unwrap_or_default()
                };
                vec![StreamEvent::ToolResult { output, is_error }]
            }
            "error" => {
                let event: ErrorEvent = serde_json::from_str(line)?;
                vec![StreamEvent::Failure {
                    message: event.message,
                }]
            }
            "result" => self.result(line)?,
            other => {
                return Ok(vec![StreamEvent::Unknown {
                    kind: other.to_string(),
                }]);
            }
        };
        self.in_assistant_run = false;
        Ok(events)
    }

    fn finish(self, run: RunResult) -> GeminiResult {
        GeminiResult {
            run,
            total_tokens: self.total_tokens,
            tool_calls: self.tool_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Usage;
    use crate::vendors::VendorResult;
    use crate::vendors::test_support::parse_fixture;

    fn gemini(result: Option<VendorResult>) -> GeminiResult {
        match result {
            Some(VendorResult::Gemini(result)) => result,
            other => panic!("expected a Gemini result, got {other:?}"),
        }
    }

    const SESSION: &str = concat!(
        r#"{"type":"init","timestamp":"2025-10-10T12:00:00Z","session_id":"g-42","model":"gemini-2.5-pro"}"#,
        "\n",
        r#"{"type":"message","role":"user","content":"Review po/pt_BR.po"}"#,
        "\n",
        r#"{"type":"message","role":"assistant","content":"Reading the ","delta":true}"#,
        "\n",
        r#"{"type":"message","role":"assistant","content":"file.","delta":true}"#,
        "\n",
        r#"{"type":"tool_use","tool_name":"read_file","tool_id":"r1","parameters":{"file_path":"po/pt_BR.po"}}"#,
        "\n",
        r#"{"type":"tool_result","tool_id":"r1","status":"success","output":"42 entries"}"#,
        "\n",
        r#"{"type":"message","role":"assistant","content":" Done.","delta":true}"#,
        "\n",
        r#"{"type":"result","status":"success","stats":{"total_tokens":5200,"input_tokens":5000,"output_tokens":200,"cached":1000,"duration_ms":3100,"tool_calls":1}}"#,
        "\n",
    );

    #[tokio::test]
    async fn assistant_runs_become_turns() {
        let (outcome, trace) = parse_fixture(Vendor::Gemini, SESSION).await;
        assert_eq!(outcome.text, "Reading the file. Done.");
        let result = gemini(outcome.result);
        assert_eq!(result.run.num_turns, 2);
        assert_eq!(result.run.usage, Usage::new(5000, 200, 1000));
        assert_eq!(result.run.duration_ms, 3100);
        assert_eq!(result.run.session_id, "g-42");
        assert_eq!(result.total_tokens, 5200);
        assert_eq!(result.tool_calls, 1);

        assert!(!trace.contains("Review po/pt_BR.po"));
        assert!(trace.contains("🔧 read_file: po/pt_BR.po"));
        assert!(trace.contains("📋 42 entries"));
    }

    #[tokio::test]
    async fn failed_tool_and_error_result_are_reported() {
        let input = concat!(
            r#"{"type":"tool_result","tool_id":"x","status":"error","error":{"type":"io","message":"no such file"}}"#,
            "\n",
            r#"{"type":"result","status":"error","error":{"message":"quota exceeded"}}"#,
            "\n",
        );
        let (outcome, trace) = parse_fixture(Vendor::Gemini, input).await;
        assert_eq!(gemini(outcome.result).run.num_turns, 0);
        assert!(trace.contains("❌ no such file"));
        assert!(trace.contains("❌ quota exceeded"));
    }
}
