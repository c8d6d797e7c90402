//! Generic line-oriented stream state machine shared by every vendor.
//!
//! Each line is probed for its `type` discriminant first. Lines that are not
//! JSON objects with a string discriminant are echoed verbatim and never abort
//! the parse. Recognized discriminants are handed to the vendor decoder, whose
//! normalized events drive a two-state (`Idle`/`InTurn`) machine.

use std::io::Write;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::errors::{StreamFailure, StreamReadError};
use crate::model::{Vendor, VendorBehavior};
use crate::result::{RunResult, UnifiedResult};
use crate::stream::StreamEvent;
use crate::trace::TracePrinter;

const INITIAL_LINE_CAPACITY: usize = 64 * 1024;

/// Decodes one vendor's wire format into normalized events.
///
/// Decoders may keep state between lines (for example to detect when a new
/// assistant message starts a turn) and collect vendor-only extras that end up
/// in `Output`.
pub trait VendorDecoder {
    /// Vendor-specific result type produced at end of stream.
    type Output: UnifiedResult;

    fn vendor(&self) -> Vendor;

    fn behavior(&self) -> VendorBehavior {
        self.vendor().behavior()
    }

    /// Decodes a line whose discriminant is `kind`.
    ///
    /// Unrecognized kinds return `StreamEvent::Unknown`. An error means the
    /// kind was recognized but the payload did not match its schema.
    fn decode(&mut self, kind: &str, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error>;

    /// Combines the finalized run with the decoder's vendor extras.
    fn finish(self, run: RunResult) -> Self::Output;
}

/// Turn-tracking state of the parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnState {
    Idle,
    InTurn,
}

/// Text and result accumulated from a stream.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamOutcome<R> {
    /// Concatenated answer text (or the vendor's explicit final result).
    pub text: String,
    /// `None` when no recognized event was seen.
    pub result: Option<R>,
}

impl<R> StreamOutcome<R> {
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> StreamOutcome<T> {
        StreamOutcome {
            text: self.text,
            result: self.result.map(f),
        }
    }
}

#[derive(Deserialize)]
struct KindProbe {
    #[serde(rename = "type")]
    kind: String,
}

/// Reads only the `type` discriminant of a line.
pub(crate) fn probe_kind(line: &str) -> Option<String> {
    serde_json::from_str::<KindProbe>(line).ok().map(|probe| probe.kind)
}

/// Parser for one stream. Owned by a single task; consumed by `parse`.
pub struct StreamParser<D> {
    decoder: D,
    behavior: VendorBehavior,
    config: ParserConfig,
    state: TurnState,
    run: RunResult,
    text: String,
    reported_turns: Option<u32>,
    recognized: bool,
}

impl<D: VendorDecoder> StreamParser<D> {
    pub fn new(decoder: D) -> Self {
        let behavior = decoder.behavior();
        Self {
            decoder,
            behavior,
            config: ParserConfig::default(),
            state: TurnState::Idle,
            run: RunResult::default(),
            text: String::new(),
            reported_turns: None,
            recognized: false,
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn vendor(&self) -> Vendor {
        self.decoder.vendor()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Consumes the whole stream, printing the trace as events arrive.
    ///
    /// A read error stops the parse; the returned failure still carries what
    /// was accumulated up to that point.
    pub async fn parse<R, W>(
        mut self,
        mut reader: R,
        printer: &mut TracePrinter<W>,
    ) -> Result<StreamOutcome<D::Output>, StreamFailure<D::Output>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let limit = self.config.max_line_bytes;
        let mut buf = Vec::with_capacity(INITIAL_LINE_CAPACITY.min(limit.saturating_add(1)));
        loop {
            buf.clear();
            match read_line_limited(&mut reader, &mut buf, limit).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    self.process_line(line.trim_end_matches(['\n', '\r']), printer);
                }
                Err(err) => {
                    warn!(vendor = %self.vendor(), error = %err, "agent stream read failed");
                    return Err(StreamFailure::new(self.finish(), err));
                }
            }
        }
        Ok(self.finish())
    }

    /// Handles a single line (without its newline).
    pub fn process_line<W: Write>(&mut self, line: &str, printer: &mut TracePrinter<W>) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let Some(kind) = probe_kind(trimmed) else {
            debug!(vendor = %self.vendor(), "line without a type discriminant; echoing as text");
            printer.plain(line);
            return;
        };
        match self.decoder.decode(&kind, trimmed) {
            Ok(events) => {
                for event in events {
                    self.apply(event, printer);
                }
            }
            Err(err) => {
                warn!(vendor = %self.vendor(), kind = %kind, error = %err, "failed to decode event; skipping line");
            }
        }
    }

    fn displays_activity(&self) -> bool {
        !self.behavior.bracketed_turns || self.state == TurnState::InTurn
    }

    fn apply<W: Write>(&mut self, event: StreamEvent, printer: &mut TracePrinter<W>) {
        if let StreamEvent::Unknown { kind } = &event {
            debug!(vendor = %self.vendor(), kind = %kind, "ignoring unknown event type");
            return;
        }
        self.recognized = true;

        match event {
            StreamEvent::SessionInit { session_id, model } => {
                if !session_id.is_empty() {
                    self.run.session_id = session_id;
                }
                printer.session(&self.run.session_id, model.as_deref());
            }
            StreamEvent::TurnStart => {
                self.run.num_turns += 1;
                self.state = TurnState::InTurn;
                printer.turn_start(self.run.num_turns);
            }
            StreamEvent::TurnFinish { usage, duration_ms } => {
                if let Some(usage) = usage {
                    self.run.usage.merge(usage, self.behavior.usage_mode);
                }
                if let Some(delta) = duration_ms {
                    self.run.duration_ms = self.run.duration_ms.saturating_add(delta);
                }
                self.state = TurnState::Idle;
                printer.turn_finish(usage.as_ref());
            }
            StreamEvent::TextChunk { text, terminal } => {
                if terminal {
                    self.text.push_str(&text);
                }
                if self.displays_activity() {
                    printer.text(&text, terminal);
                }
            }
            StreamEvent::ToolInvocation { name, detail } => {
                if self.displays_activity() {
                    printer.tool(&name, &detail);
                }
            }
            StreamEvent::ToolResult { output, is_error } => {
                printer.tool_result(&output, is_error);
            }
            StreamEvent::FinalResult {
                text,
                usage,
                duration_ms,
                num_turns,
                session_id,
            } => {
                if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                    self.text = text.to_string();
                }
                if let Some(usage) = usage {
                    self.run.usage.merge(usage, self.behavior.usage_mode);
                }
                if let Some(total) = duration_ms.filter(|d| *d > 0) {
                    self.run.duration_ms = total;
                }
                if let Some(session_id) = session_id.filter(|s| !s.is_empty()) {
                    self.run.session_id = session_id;
                }
                self.reported_turns = num_turns;
                self.state = TurnState::Idle;
                printer.final_result(text.as_deref());
            }
            StreamEvent::Failure { message } => {
                printer.failure(&message);
            }
            StreamEvent::Unknown { .. } => {}
        }
    }

    fn finish(self) -> StreamOutcome<D::Output> {
        let mut run = self.run;
        if run.num_turns == 0
            && let Some(reported) = self.reported_turns
        {
            run.num_turns = reported;
        }
        run.result_text = self.text.clone();
        let result = self.recognized.then(|| self.decoder.finish(run));
        StreamOutcome {
            text: self.text,
            result,
        }
    }
}

/// Reads one line into `buf`, failing once it grows past `limit` bytes
/// without a newline.
async fn read_line_limited<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> Result<usize, StreamReadError>
where
    R: AsyncBufRead + Unpin,
{
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let read = (&mut *reader).take(cap).read_until(b'\n', buf).await?;
    if buf.len() > limit && buf.last() != Some(&b'\n') {
        return Err(StreamReadError::LineTooLong { limit });
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceConfig;
    use crate::model::Usage;

    /// Minimal decoder speaking a tiny test schema.
    struct ScriptDecoder {
        vendor: Vendor,
    }

    #[derive(Deserialize)]
    struct ScriptLine {
        #[serde(default)]
        text: String,
        #[serde(default)]
        input: u64,
        #[serde(default)]
        output: u64,
    }

    impl VendorDecoder for ScriptDecoder {
        type Output = RunResult;

        fn vendor(&self) -> Vendor {
            self.vendor
        }

        fn decode(&mut self, kind: &str, line: &str) -> Result<Vec<StreamEvent>, serde_json::Error> {
            let events = match kind {
                "start" => vec![StreamEvent::TurnStart],
                "finish" => {
                    let payload: ScriptLine = serde_json::from_str(line)?;
                    vec![StreamEvent::TurnFinish {
                        usage: Some(Usage::new(payload.input, payload.output, 0)),
                        duration_ms: Some(100),
                    }]
                }
                "text" => {
                    let payload: ScriptLine = serde_json::from_str(line)?;
                    vec![StreamEvent::answer(payload.text)]
                }
                other => vec![StreamEvent::Unknown {
                    kind: other.to_string(),
                }],
            };
            Ok(events)
        }

        fn finish(self, run: RunResult) -> RunResult {
            run
        }
    }

    async fn run_script(
        vendor: Vendor,
        input: &str,
    ) -> (Result<StreamOutcome<RunResult>, StreamFailure<RunResult>>, String) {
        let mut printer = TracePrinter::new(Vec::new(), TraceConfig::default());
        let parser = StreamParser::new(ScriptDecoder { vendor });
        let outcome = parser.parse(input.as_bytes(), &mut printer).await;
        let trace = String::from_utf8(printer.into_inner()).expect("utf8");
        (outcome, trace)
    }

    #[test]
    fn probe_reads_only_string_discriminants() {
        assert_eq!(probe_kind(r#"{"type":"x","other":[1,2]}"#).as_deref(), Some("x"));
        assert_eq!(probe_kind(r#"{"type":5}"#), None);
        assert_eq!(probe_kind("[1,2,3]"), None);
        assert_eq!(probe_kind("plain words"), None);
    }

    #[tokio::test]
    async fn non_json_line_is_echoed_and_turn_is_counted() {
        let input = "warming up the agent...\n{\"type\":\"start\"}\n";
        let (outcome, trace) = run_script(Vendor::Claude, input).await;
        let outcome = outcome.expect("clean eof");
        assert_eq!(outcome.result.num_turns(), 1);
        assert!(trace.lines().any(|l| l == "warming up the agent..."));
    }

    #[tokio::test]
    async fn stream_without_recognized_events_has_no_result() {
        let (outcome, _) = run_script(Vendor::Claude, "hello\n{\"type\":\"mystery\"}\n").await;
        let outcome = outcome.expect("clean eof");
        assert!(outcome.result.is_none());
        assert_eq!(outcome.text, "");
    }

    #[tokio::test]
    async fn bad_payload_for_known_kind_is_skipped() {
        let input = "{\"type\":\"text\",\"text\":42}\n{\"type\":\"text\",\"text\":\"ok\"}\n";
        let (outcome, _) = run_script(Vendor::Claude, input).await;
        assert_eq!(outcome.expect("clean eof").text, "ok");
    }

    #[tokio::test]
    async fn bracketed_vendor_hides_text_outside_turns_but_keeps_it() {
        let input = concat!(
            "{\"type\":\"text\",\"text\":\"before \"}\n",
            "{\"type\":\"start\"}\n",
            "{\"type\":\"text\",\"text\":\"inside\"}\n",
            "{\"type\":\"finish\",\"input\":5,\"output\":1}\n",
        );
        let (outcome, trace) = run_script(Vendor::OpenCode, input).await;
        let outcome = outcome.expect("clean eof");
        assert_eq!(outcome.text, "before inside");
        assert!(!trace.contains("before"));
        assert!(trace.contains("🤖 inside"));

        let (_, unbracketed) = run_script(Vendor::Gemini, input).await;
        assert!(unbracketed.contains("🤖 before"));
    }

    #[tokio::test]
    async fn turn_durations_are_summed() {
        let input = concat!(
            "{\"type\":\"start\"}\n",
            "{\"type\":\"finish\",\"input\":5,\"output\":1}\n",
            "{\"type\":\"start\"}\n",
            "{\"type\":\"finish\",\"input\":0,\"output\":3}\n",
        );
        let (outcome, _) = run_script(Vendor::OpenCode, input).await;
        let run = outcome.expect("clean eof").result.expect("result");
        assert_eq!(run.num_turns, 2);
        assert_eq!(run.duration_ms, 200);
        assert_eq!(run.usage, Usage::new(5, 3, 0));
    }

    #[tokio::test]
    async fn over_long_line_fails_but_keeps_partial_result() {
        let mut printer = TracePrinter::new(Vec::new(), TraceConfig::default());
        let input = format!("{{\"type\":\"start\"}}\n{}\n", "z".repeat(64));
        let parser = StreamParser::new(ScriptDecoder {
            vendor: Vendor::Codex,
        })
        .with_config(ParserConfig::default().max_line_bytes(32));
        let failure = parser
            .parse(input.as_bytes(), &mut printer)
            .await
            .expect_err("line too long");
        assert!(matches!(failure.source, StreamReadError::LineTooLong { limit: 32 }));
        assert_eq!(failure.partial.result.num_turns(), 1);
    }

    /// Reader whose pipe breaks on the first read.
    struct BrokenPipe;

    impl tokio::io::AsyncRead for BrokenPipe {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "agent went away",
            )))
        }
    }

    #[tokio::test]
    async fn io_error_mid_stream_keeps_partial_result() {
        let mut printer = TracePrinter::new(Vec::new(), TraceConfig::default());
        let head = concat!(
            "{\"type\":\"start\"}\n",
            "{\"type\":\"text\",\"text\":\"partial\"}\n",
        );
        let reader = tokio::io::BufReader::new(head.as_bytes().chain(BrokenPipe));
        let failure = StreamParser::new(ScriptDecoder {
            vendor: Vendor::Claude,
        })
        .parse(reader, &mut printer)
        .await
        .expect_err("pipe breaks");
        match &failure.source {
            StreamReadError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected read error: {other:?}"),
        }
        assert_eq!(failure.partial.text, "partial");
        assert_eq!(failure.partial.result.num_turns(), 1);
    }

    #[tokio::test]
    async fn ten_mib_line_is_accepted() {
        let big = "q".repeat(10 * 1024 * 1024 - 64);
        let input = format!("{{\"type\":\"text\",\"text\":\"{big}\"}}\n");
        let (outcome, trace) = run_script(Vendor::Claude, &input).await;
        let outcome = outcome.expect("within limit");
        assert_eq!(outcome.text.len(), big.len());
        assert!(trace.len() < 8 * 1024);
    }

    #[tokio::test]
    async fn parsing_is_idempotent() {
        let input = concat!(
            "noise\n",
            "{\"type\":\"start\"}\n",
            "{\"type\":\"text\",\"text\":\"a\"}\n",
            "{\"type\":\"finish\",\"input\":1,\"output\":2}\n",
        );
        let (first, first_trace) = run_script(Vendor::Codex, input).await;
        let (second, second_trace) = run_script(Vendor::Codex, input).await;
        assert_eq!(first.expect("first"), second.expect("second"));
        assert_eq!(first_trace, second_trace);
    }
}
