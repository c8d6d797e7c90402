use std::fmt;
use std::str::FromStr;

/// Agent CLI that produced an event stream.
///
/// Exactly one vendor schema applies per stream; the caller picks it based on
/// which agent it started.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// Claude Code (`claude -p --output-format stream-json`).
    Claude,
    /// Codex (`codex exec --json`).
    Codex,
    /// OpenCode (`opencode run --format json`).
    OpenCode,
    /// Gemini CLI (`gemini --output-format stream-json`).
    Gemini,
}

impl Vendor {
    /// All supported vendors, in display order.
    pub const ALL: [Vendor; 4] = [Vendor::Claude, Vendor::Codex, Vendor::OpenCode, Vendor::Gemini];

    /// Returns the stable lowercase name used in logs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Claude => "claude",
            Vendor::Codex => "codex",
            Vendor::OpenCode => "opencode",
            Vendor::Gemini => "gemini",
        }
    }

    /// Per-vendor parser behaviour.
    pub fn behavior(&self) -> VendorBehavior {
        match self {
            Vendor::Claude | Vendor::Gemini => VendorBehavior {
                bracketed_turns: false,
                usage_mode: UsageMode::LastNonZero,
            },
            Vendor::Codex => VendorBehavior {
                bracketed_turns: true,
                usage_mode: UsageMode::Cumulative,
            },
            Vendor::OpenCode => VendorBehavior {
                bracketed_turns: true,
                usage_mode: UsageMode::LastNonZero,
            },
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "claude" | "claude-code" => Ok(Vendor::Claude),
            "codex" => Ok(Vendor::Codex),
            "opencode" | "open-code" => Ok(Vendor::OpenCode),
            "gemini" | "gemini-cli" => Ok(Vendor::Gemini),
            other => Err(format!(
                "unknown agent vendor `{other}` (expected one of: claude, codex, opencode, gemini)"
            )),
        }
    }
}

/// How a vendor reports token usage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsageMode {
    /// Each report is a delta or snapshot; a later zero never erases an earlier
    /// non-zero field.
    LastNonZero,
    /// Each report is already the running total; the latest one always wins.
    Cumulative,
}

/// Behaviour flags applied by the generic stream state machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VendorBehavior {
    /// Text and tool invocations are only displayed between a turn start and a
    /// turn finish.
    pub bracketed_turns: bool,
    pub usage_mode: UsageMode,
}

/// Token usage reported by an agent.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64, cached_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cached_tokens,
        }
    }

    /// Returns `true` when every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0 && self.cached_tokens == 0
    }

    /// Folds a newer report into `self` according to `mode`.
    pub fn merge(&mut self, newer: Usage, mode: UsageMode) {
        match mode {
            UsageMode::Cumulative => *self = newer,
            UsageMode::LastNonZero => {
                if newer.input_tokens != 0 {
                    self.input_tokens = newer.input_tokens;
                }
                if newer.output_tokens != 0 {
                    self.output_tokens = newer.output_tokens;
                }
                if newer.cached_tokens != 0 {
                    self.cached_tokens = newer.cached_tokens;
                }
            }
        }
    }
}
