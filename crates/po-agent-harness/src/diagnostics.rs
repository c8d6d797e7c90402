//! Post-run diagnostics block.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::result::UnifiedResult;

const HEADER: &str = "📊 Agent diagnostics";
const INDENT: &str = "   ";

/// Renders the non-zero fields of `result`.
///
/// Returns `None` when the result is absent or every field is zero, so callers
/// never print an empty block.
pub fn format_diagnostics(result: Option<&dyn UnifiedResult>) -> Option<String> {
    let run = result?.run_result()?;
    let mut fields = Vec::new();
    if run.num_turns > 0 {
        fields.push(format!("Turns: {}", run.num_turns));
    }
    if run.usage.input_tokens > 0 {
        fields.push(format!("Input tokens: {}", run.usage.input_tokens));
    }
    if run.usage.output_tokens > 0 {
        fields.push(format!("Output tokens: {}", run.usage.output_tokens));
    }
    if run.usage.cached_tokens > 0 {
        fields.push(format!("Cached tokens: {}", run.usage.cached_tokens));
    }
    if run.duration_ms > 0 {
        fields.push(format!(
            "API duration: {:.2}s",
            run.duration_ms as f64 / 1000.0
        ));
    }
    if fields.is_empty() {
        return None;
    }

    let mut out = String::from(HEADER);
    for field in fields {
        let _ = write!(out, "\n{INDENT}{field}");
    }
    Some(out)
}

/// Writes the diagnostics block followed by a newline, or nothing.
pub fn print_diagnostics<W: Write>(
    out: &mut W,
    result: Option<&dyn UnifiedResult>,
) -> io::Result<()> {
    match format_diagnostics(result) {
        Some(block) => writeln!(out, "{block}"),
        None => Ok(()),
    }
}
