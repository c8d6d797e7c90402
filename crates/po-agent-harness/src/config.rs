//! Injected limits for trace formatting and line buffering.
//!
//! Defaults match the console trace operators are used to; every value can be
//! overridden through the environment or set explicitly with the builder
//! methods.

const DEFAULT_MAX_TEXT_BYTES: usize = 4096;
const DEFAULT_MAX_TEXT_LINES: usize = 10;
const DEFAULT_COMMAND_HEAD: usize = 128;
const DEFAULT_COMMAND_TAIL: usize = 32;
const DEFAULT_WRAP_WIDTH: usize = 99;
const DEFAULT_CONTINUATION_INDENT: usize = 3;
const DEFAULT_MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}

/// Limits applied when rendering stream events to the console.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraceConfig {
    /// Maximum bytes of a text block, ellipsis included.
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: usize,
    /// Maximum lines of a text block.
    #[serde(default = "default_max_text_lines")]
    pub max_text_lines: usize,
    /// Bytes kept from the start of a long single-line command.
    #[serde(default = "default_command_head")]
    pub command_head: usize,
    /// Bytes kept from the end of a long single-line command.
    #[serde(default = "default_command_tail")]
    pub command_tail: usize,
    /// Column at which multi-line output wraps.
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
    /// Spaces prefixed to wrapped and continuation lines.
    #[serde(default = "default_continuation_indent")]
    pub continuation_indent: usize,
}

fn default_max_text_bytes() -> usize {
    DEFAULT_MAX_TEXT_BYTES
}

fn default_max_text_lines() -> usize {
    DEFAULT_MAX_TEXT_LINES
}

fn default_command_head() -> usize {
    DEFAULT_COMMAND_HEAD
}

fn default_command_tail() -> usize {
    DEFAULT_COMMAND_TAIL
}

fn default_wrap_width() -> usize {
    DEFAULT_WRAP_WIDTH
}

fn default_continuation_indent() -> usize {
    DEFAULT_CONTINUATION_INDENT
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            max_text_lines: DEFAULT_MAX_TEXT_LINES,
            command_head: DEFAULT_COMMAND_HEAD,
            command_tail: DEFAULT_COMMAND_TAIL,
            wrap_width: DEFAULT_WRAP_WIDTH,
            continuation_indent: DEFAULT_CONTINUATION_INDENT,
        }
    }
}

impl TraceConfig {
    /// Builds a config from defaults plus environment overrides.
    ///
    /// Environment variables:
    /// - `PO_AGENT_TRACE_MAX_BYTES`
    /// - `PO_AGENT_TRACE_MAX_LINES`
    /// - `PO_AGENT_TRACE_WRAP_WIDTH`
    ///
    /// Missing, zero or unparseable values keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = env_usize("PO_AGENT_TRACE_MAX_BYTES") {
            config.max_text_bytes = value;
        }
        if let Some(value) = env_usize("PO_AGENT_TRACE_MAX_LINES") {
            config.max_text_lines = value;
        }
        if let Some(value) = env_usize("PO_AGENT_TRACE_WRAP_WIDTH") {
            config.wrap_width = value;
        }
        config
    }

    /// Overrides the text byte and line limits.
    pub fn text_limits(mut self, max_bytes: usize, max_lines: usize) -> Self {
        self.max_text_bytes = max_bytes;
        self.max_text_lines = max_lines;
        self
    }

    /// Overrides the head/tail kept when shortening a command.
    pub fn command_limits(mut self, head: usize, tail: usize) -> Self {
        self.command_head = head;
        self.command_tail = tail;
        self
    }

    /// Overrides the wrap column.
    pub fn wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = width;
        self
    }

    pub(crate) fn indent(&self) -> String {
        " ".repeat(self.continuation_indent)
    }
}

/// Limits applied while reading the raw line stream.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParserConfig {
    /// Longest accepted line in bytes, newline excluded. Some vendors inline
    /// whole tool outputs, so this is sized generously.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl ParserConfig {
    /// Builds a config from `PO_AGENT_MAX_LINE_BYTES`, falling back to 10 MiB.
    pub fn from_env() -> Self {
        env_usize("PO_AGENT_MAX_LINE_BYTES")
            .map(|max_line_bytes| Self { max_line_bytes })
            .unwrap_or_default()
    }

    /// Overrides the maximum line length.
    pub fn max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }
}
