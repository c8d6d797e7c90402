//! Vendor wire formats and their decoders.
//!
//! Each vendor lives in its own module: `events` holds the serde wire types
//! and the module root holds the decoder plus the vendor's result type. The
//! root harness API stays vendor-agnostic through [`VendorResult`] and
//! [`parse_stream`].
pub mod claude;
pub mod codex;
pub mod gemini;
pub mod opencode;

use std::io::Write;

use serde_json::Value;
use tokio::io::AsyncBufRead;

use crate::config::ParserConfig;
use crate::errors::StreamFailure;
use crate::model::Vendor;
use crate::parser::{StreamOutcome, StreamParser, VendorDecoder};
use crate::result::{RunResult, UnifiedResult};
use crate::trace::TracePrinter;

pub use claude::{ClaudeDecoder, ClaudeResult};
pub use codex::{CodexDecoder, CodexResult};
pub use gemini::{GeminiDecoder, GeminiResult};
pub use opencode::{OpenCodeDecoder, OpenCodeResult};

/// Argument keys that best describe a tool call, in priority order.
const SUMMARY_KEYS: [&str; 7] = [
    "command",
    "file_path",
    "path",
    "pattern",
    "url",
    "query",
    "description",
];

/// Renders tool arguments as a one-line detail for the trace.
pub(crate) fn summarize_tool_input(input: &Value) -> String {
    match input {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            for key in SUMMARY_KEYS {
                match map.get(key) {
                    Some(Value::String(text)) if !text.is_empty() => return text.clone(),
                    Some(Value::Array(parts)) if !parts.is_empty() => {
                        return parts
                            .iter()
                            .map(|part| match part {
                                Value::String(text) => text.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(" ");
                    }
                    _ => {}
                }
            }
            if map.is_empty() {
                String::new()
            } else {
                input.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Result of any supported vendor.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum VendorResult {
    Claude(ClaudeResult),
    Codex(CodexResult),
    OpenCode(OpenCodeResult),
    Gemini(GeminiResult),
}

impl VendorResult {
    pub fn vendor(&self) -> Vendor {
        match self {
            VendorResult::Claude(_) => Vendor::Claude,
            VendorResult::Codex(_) => Vendor::Codex,
            VendorResult::OpenCode(_) => Vendor::OpenCode,
            VendorResult::Gemini(_) => Vendor::Gemini,
        }
    }

    pub fn run(&self) -> &RunResult {
        match self {
            VendorResult::Claude(result) => &result.run,
            VendorResult::Codex(result) => &result.run,
            VendorResult::OpenCode(result) => &result.run,
            VendorResult::Gemini(result) => &result.run,
        }
    }
}

impl UnifiedResult for VendorResult {
    fn run_result(&self) -> Option<&RunResult> {
        Some(self.run())
    }
}

impl From<ClaudeResult> for VendorResult {
    fn from(result: ClaudeResult) -> Self {
        VendorResult::Claude(result)
    }
}

impl From<CodexResult> for VendorResult {
    fn from(result: CodexResult) -> Self {
        VendorResult::Codex(result)
    }
}

impl From<OpenCodeResult> for VendorResult {
    fn from(result: OpenCodeResult) -> Self {
        VendorResult::OpenCode(result)
    }
}

impl From<GeminiResult> for VendorResult {
    fn from(result: GeminiResult) -> Self {
        VendorResult::Gemini(result)
    }
}

/// Parses `reader` with the decoder for `vendor`.
pub async fn parse_stream<R, W>(
    vendor: Vendor,
    reader: R,
    printer: &mut TracePrinter<W>,
    config: ParserConfig,
) -> Result<StreamOutcome<VendorResult>, StreamFailure<VendorResult>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match vendor {
        Vendor::Claude => parse_with(ClaudeDecoder::default(), reader, printer, config).await,
        Vendor::Codex => parse_with(CodexDecoder::default(), reader, printer, config).await,
        Vendor::OpenCode => parse_with(OpenCodeDecoder::default(), reader, printer, config).await,
        Vendor::Gemini => parse_with(GeminiDecoder::default(), reader, printer, config).await,
    }
}

async fn parse_with<D, R, W>(
    decoder: D,
    reader: R,
    printer: &mut TracePrinter<W>,
    config: ParserConfig,
) -> Result<StreamOutcome<VendorResult>, StreamFailure<VendorResult>>
where
    D: VendorDecoder,
    D::Output: Into<VendorResult>,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    StreamParser::new(decoder)
        .with_config(config)
        .parse(reader, printer)
        .await
        .map(|outcome| outcome.map(Into::into))
        .map_err(|failure| failure.map(Into::into))
}
