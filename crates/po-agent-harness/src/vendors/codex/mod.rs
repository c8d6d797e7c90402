//! Codex `exec --json` output.
//!
//! Turns are explicitly bracketed by `turn.started`/`turn.completed`, and the
//! usage attached to each completion is the thread's running total.
mod events;

use crate::model::Vendor;
use crate::parser::VendorDecoder;
use crate::result::{RunResult, UnifiedResult};
use crate::stream::StreamEvent;

use events::{Item, ItemEvent, StreamError, ThreadStarted, TurnCompleted, TurnFailed};

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Serialize)]
pub struct CodexResult {
    #[serde(flatten)]
    pub run: RunResult,
    pub thread_id: Option<String>,
    /// Turns that ended with `turn.failed`.
    pub failed_turns: u32,
}

impl UnifiedResult for CodexResult {
    fn run_result(&self) -> Option<&RunResult> {
        Some(&self.run)
    }
}

#[derive(Debug, Default)]
pub struct CodexDecoder {
    thread_id: Option<String>,
    failed_turns: u32,
}

fn started(item: Item) -> Vec<StreamEvent> {
    let invocation = match item.kind.as_str() {
        "command_execution" => Some(("shell".to_string(), item.command)),
        "mcp_tool_call" => Some((format!("{}.{}", item.server, item.tool), String::new())),
        "web_search" => Some(("web_search".to_string(), item.query)),
        _ => None,
    };
    invocation
        .map(|(name, detail)| StreamEvent::ToolInvocation { name, detail })
        .into_iter()
        .collect()
}

fn completed(item: Item) -> Vec<StreamEvent> {
    let event = match item.kind.as_str() {
        "agent_message" => StreamEvent::answer(item.text),
        "reasoning" => StreamEvent::reasoning(item.text),
        "command_execution" => StreamEvent::ToolResult {
            is_error: item.failed(),
            output: item.aggregated_output,
        },
        "file_change" => {
            let listing = item
                .changes
                .iter()
                .map(|change| format!("{} {}", change.kind, change.path).trim().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            StreamEvent::ToolResult {
                is_error: item.failed(),
                output: listing,
            }
        }
        "mcp_tool_call" => StreamEvent::ToolResult {
            is_error: item.failed(),
            output: item.status.clone().unwrap_or_default(),
        },
        _ => return Vec::new(),
    };
    vec![event]
}

impl VendorDecoder for CodexDecoder {
    type Output = CodexResult;

    fn vendor(&self) -> Vendor {
        Vendor::Codex
    }

    fn decode(&mut self, kind: &str, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
        match kind {
            "thread.started" => {
                let event: ThreadStarted = serde_json::from_str(line)?;
                self.thread_id = Some(event.thread_id.clone());
                Ok(vec![StreamEvent::SessionInit {
                    session_id: event.thread_id,
                    model: None,
                }])
            }
            "turn.started" => Ok(vec![StreamEvent::TurnStart]),
            "turn.completed" => {
                let event: TurnCompleted = serde_json::from_str(line)?;
                Ok(vec![StreamEvent::TurnFinish {
                    usage: event.usage.map(Into::into),
                    duration_ms: None,
                }])
            }
            "turn.failed" => {
                let event: TurnFailed = serde_json::from_str(line)?;
                self.failed_turns += 1;
                let message = event
                    .error
                    .map(|error| error.message)
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| "turn failed".to_string());
                Ok(vec![
                    StreamEvent::Failure { message },
                    StreamEvent::TurnFinish {
                        usage: None,
                        duration_ms: None,
                    },
                ])
            }
            "item.started" => {
                let event: ItemEvent = serde_json::from_str(line)?;
                Ok(started(event.item))
            }
            "item.completed" => {
                let event: ItemEvent = serde_json::from_str(line)?;
                Ok(completed(event.item))
            }
            "item.updated" => Ok(Vec::new()),
            "error" => {
                let event: StreamError = serde_json::from_str(line)?;
                Ok(vec![StreamEvent::Failure {
                    message: event.message,
                }])
            }
            other => Ok(vec![StreamEvent::Unknown {
                kind: other.to_string(),
            }]),
        }
    }

    fn finish(self, run: RunResult) -> CodexResult {
        CodexResult {
            run,
            thread_id: self.thread_id,
            failed_turns: self.failed_turns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Usage;
    use crate::vendors::VendorResult;
    use crate::vendors::test_support::parse_fixture;

    fn codex(result: Option<VendorResult>) -> CodexResult {
        match result {
            Some(VendorResult::Codex(result)) => result,
            other => panic!("expected a Codex result, got {other:?}"),
        }
    }

    const TWO_TURNS: &str = concat!(
        r#"{"type":"thread.started","thread_id":"0199a-thread"}"#,
        "\n",
        r#"{"type":"turn.started"}"#,
        "\n",
        r#"{"type":"item.completed","item":{"id":"item_0","type":"reasoning","text":"Checking plural forms"}}"#,
        "\n",
        r#"{"type":"item.started","item":{"id":"item_1","type":"command_execution","command":"bash -lc 'msgfmt -c de.po'","aggregated_output":"","exit_code":null,"status":"in_progress"}}"#,
        "\n",
        r#"{"type":"item.completed","item":{"id":"item_1","type":"command_execution","command":"bash -lc 'msgfmt -c de.po'","aggregated_output":"de.po:12: missing plural\n","exit_code":1,"status":"failed"}}"#,
        "\n",
        r#"{"type":"turn.completed","usage":{"input_tokens":5000,"cached_input_tokens":4000,"output_tokens":120}}"#,
        "\n",
        r#"{"type":"turn.started"}"#,
        "\n",
        r#"{"type":"item.completed","item":{"id":"item_2","type":"agent_message","text":"Fixed the plural entry."}}"#,
        "\n",
        r#"{"type":"turn.completed","usage":{"input_tokens":9000,"cached_input_tokens":0,"output_tokens":300}}"#,
        "\n",
    );

    #[tokio::test]
    async fn turns_are_counted_and_usage_is_cumulative() {
        let (outcome, trace) = parse_fixture(Vendor::Codex, TWO_TURNS).await;
        assert_eq!(outcome.text, "Fixed the plural entry.");
        let result = codex(outcome.result);
        assert_eq!(result.run.num_turns, 2);
        assert_eq!(result.run.usage, Usage::new(9000, 300, 0));
        assert_eq!(result.thread_id.as_deref(), Some("0199a-thread"));
        assert_eq!(result.failed_turns, 0);

        assert!(trace.contains("🔧 shell: bash -lc 'msgfmt -c de.po'"));
        assert!(trace.contains("❌ de.po:12: missing plural"));
        assert!(trace.contains("💭 Checking plural forms"));
    }

    #[tokio::test]
    async fn activity_outside_a_turn_is_not_displayed() {
        let input = concat!(
            r#"{"type":"item.completed","item":{"type":"agent_message","text":"stray"}}"#,
            "\n",
        );
        let (outcome, trace) = parse_fixture(Vendor::Codex, input).await;
        assert_eq!(outcome.text, "stray");
        assert!(!trace.contains("stray"));
    }

    #[tokio::test]
    async fn failed_turn_is_reported() {
        let input = concat!(
            r#"{"type":"turn.started"}"#,
            "\n",
            r#"{"type":"turn.failed","error":{"message":"stream disconnected"}}"#,
            "\n",
        );
        let (outcome, trace) = parse_fixture(Vendor::Codex, input).await;
        let result = codex(outcome.result);
        assert_eq!(result.failed_turns, 1);
        assert_eq!(result.run.num_turns, 1);
        assert!(trace.contains("❌ stream disconnected"));
    }

    #[tokio::test]
    async fn legacy_item_type_field_is_accepted() {
        let input = concat!(
            r#"{"type":"turn.started"}"#,
            "\n",
            r#"{"type":"item.completed","item":{"item_type":"agent_message","text":"hello"}}"#,
            "\n",
        );
        let (outcome, _) = parse_fixture(Vendor::Codex, input).await;
        assert_eq!(outcome.text, "hello");
    }
}
