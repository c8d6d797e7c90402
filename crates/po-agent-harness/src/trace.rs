//! Human-readable console trace of an agent stream.
//!
//! Every displayed event becomes one icon-prefixed entry. Long text is
//! truncated, long single-line commands keep their head and tail, and
//! multi-line bodies wrap with a continuation indent.

use std::borrow::Cow;
use std::io::Write;

use tracing::debug;

use crate::config::TraceConfig;
use crate::model::Usage;

const ELLIPSIS: &str = "...";

pub(crate) const ICON_SESSION: &str = "🚀";
pub(crate) const ICON_TURN_START: &str = "🔄";
pub(crate) const ICON_DONE: &str = "✅";
pub(crate) const ICON_ANSWER: &str = "🤖";
pub(crate) const ICON_REASONING: &str = "💭";
pub(crate) const ICON_TOOL: &str = "🔧";
pub(crate) const ICON_TOOL_RESULT: &str = "📋";
pub(crate) const ICON_FAILURE: &str = "❌";

/// Writes the console trace for one stream.
pub struct TracePrinter<W> {
    out: W,
    config: TraceConfig,
}

impl TracePrinter<std::io::Stdout> {
    /// Printer writing to the process's standard output.
    pub fn stdout(config: TraceConfig) -> Self {
        Self::new(std::io::stdout(), config)
    }
}

impl<W: Write> TracePrinter<W> {
    pub fn new(out: W, config: TraceConfig) -> Self {
        Self { out, config }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Echoes a line that is not a recognized event, verbatim.
    pub fn plain(&mut self, line: &str) {
        self.emit(line);
    }

    pub fn session(&mut self, session_id: &str, model: Option<&str>) {
        let line = match model.filter(|m| !m.is_empty()) {
            Some(model) => format!("{ICON_SESSION} Session {session_id} ({model})"),
            None => format!("{ICON_SESSION} Session {session_id}"),
        };
        self.emit(&line);
    }

    pub fn turn_start(&mut self, turn: u32) {
        self.emit(&format!("{ICON_TURN_START} Turn {turn}"));
    }

    pub fn turn_finish(&mut self, usage: Option<&Usage>) {
        let line = match usage.filter(|u| !u.is_empty()) {
            Some(usage) => format!(
                "{ICON_DONE} Turn finished (in: {}, out: {})",
                usage.input_tokens, usage.output_tokens
            ),
            None => format!("{ICON_DONE} Turn finished"),
        };
        self.emit(&line);
    }

    /// Answer or reasoning text, truncated and wrapped.
    pub fn text(&mut self, text: &str, terminal: bool) {
        let icon = if terminal { ICON_ANSWER } else { ICON_REASONING };
        let body = truncate_text(text, self.config.max_text_bytes, self.config.max_text_lines);
        self.block(icon, &body);
    }

    /// Tool invocation; single-line details are shortened like commands.
    pub fn tool(&mut self, name: &str, detail: &str) {
        let detail = detail.trim();
        if detail.is_empty() {
            self.emit(&format!("{ICON_TOOL} {name}"));
            return;
        }
        if detail.contains('\n') {
            let body =
                truncate_text(detail, self.config.max_text_bytes, self.config.max_text_lines);
            self.block(ICON_TOOL, &format!("{name}: {body}"));
        } else {
            // Head and tail truncation replaces wrapping.
            let command =
                truncate_command(detail, self.config.command_head, self.config.command_tail);
            self.emit(&format!("{ICON_TOOL} {name}: {command}"));
        }
    }

    pub fn tool_result(&mut self, output: &str, is_error: bool) {
        let icon = if is_error { ICON_FAILURE } else { ICON_TOOL_RESULT };
        let body = truncate_text(output, self.config.max_text_bytes, self.config.max_text_lines);
        if body.is_empty() {
            self.emit(&format!("{icon} (no output)"));
        } else {
            self.block(icon, &body);
        }
    }

    pub fn final_result(&mut self, text: Option<&str>) {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => {
                let body =
                    truncate_text(text, self.config.max_text_bytes, self.config.max_text_lines);
                self.block(ICON_DONE, &body);
            }
            None => self.emit(&format!("{ICON_DONE} Done")),
        }
    }

    pub fn failure(&mut self, message: &str) {
        let body = truncate_text(message, self.config.max_text_bytes, self.config.max_text_lines);
        self.block(ICON_FAILURE, &body);
    }

    fn block(&mut self, icon: &str, body: &str) {
        let rendered = wrap_block(icon, body, &self.config);
        self.emit(&rendered);
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            debug!(error = %err, "trace write failed");
        }
    }
}

/// Shortens `text` to at most `max_bytes` bytes and `max_lines` lines.
///
/// Truncated output ends in `...` directly after the last kept character, so
/// there is never a dangling newline or blank line before the ellipsis.
pub fn truncate_text(text: &str, max_bytes: usize, max_lines: usize) -> Cow<'_, str> {
    let trimmed = text.trim_end();
    if trimmed.len() <= max_bytes && trimmed.lines().count() <= max_lines {
        return Cow::Borrowed(trimmed);
    }

    let mut out = String::with_capacity(max_bytes.min(trimmed.len()));
    for (idx, line) in trimmed.lines().take(max_lines).enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }
    let budget = max_bytes.saturating_sub(ELLIPSIS.len());
    if out.len() > budget {
        let cut = floor_char_boundary(&out, budget);
        out.truncate(cut);
    }
    let kept = out.trim_end().len();
    out.truncate(kept);
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Shortens a single-line command to `head` bytes, `...`, and `tail` bytes.
pub fn truncate_command(command: &str, head: usize, tail: usize) -> Cow<'_, str> {
    if command.len() <= head + tail + ELLIPSIS.len() {
        return Cow::Borrowed(command);
    }
    let head_end = floor_char_boundary(command, head);
    let tail_start = ceil_char_boundary(command, command.len() - tail);
    Cow::Owned(format!(
        "{}{ELLIPSIS}{}",
        &command[..head_end],
        &command[tail_start..]
    ))
}

/// Prefixes `body` with `icon`, wrapping every line at the configured width.
/// Wrapped and continuation lines get the configured indent.
pub fn wrap_block(icon: &str, body: &str, config: &TraceConfig) -> String {
    let indent = config.indent();
    let first_prefix = format!("{icon} ");
    let mut lines: Vec<String> = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let initial = if idx == 0 { first_prefix.as_str() } else { indent.as_str() };
        let options = textwrap::Options::new(config.wrap_width)
            .initial_indent(initial)
            .subsequent_indent(&indent);
        let wrapped = textwrap::wrap(line, options);
        if wrapped.is_empty() {
            lines.push(initial.trim_end().to_string());
        } else {
            lines.extend(wrapped.into_iter().map(Cow::into_owned));
        }
    }
    if lines.is_empty() {
        lines.push(icon.to_string());
    }
    lines.join("\n")
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut idx = idx;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx;
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
