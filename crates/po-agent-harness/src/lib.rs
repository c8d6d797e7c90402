//! Normalizes the JSON Lines event streams of agent CLIs into one run result.
//!
//! Each supported vendor (`vendors::*`) decodes its own wire format into
//! [`StreamEvent`]s; a shared [`StreamParser`] turns those into a console
//! trace and a [`RunResult`].
//!
//! # Parsing a captured stream
//!
//! ```no_run
//! use po_agent_harness::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = tokio::fs::File::open("codex.jsonl").await?;
//! let mut printer = TracePrinter::stdout(TraceConfig::from_env());
//! let outcome = parse_stream(
//!     Vendor::Codex,
//!     tokio::io::BufReader::new(file),
//!     &mut printer,
//!     ParserConfig::from_env(),
//! )
//! .await?;
//!
//! let result = outcome.result.as_ref().map(|r| r as &dyn UnifiedResult);
//! print_diagnostics(&mut std::io::stdout(), result)?;
//! println!("{}", outcome.text);
//! # Ok(())
//! # }
//! ```

/// Injected trace and line-buffer limits.
pub mod config;
/// Post-run diagnostics block.
pub mod diagnostics;
/// Public error types.
pub mod errors;
/// Vendors, usage counters and per-vendor parser behaviour.
pub mod model;
/// Generic stream state machine and the vendor decoder contract.
pub mod parser;
/// Common imports for typical usage.
pub mod prelude;
/// Vendor-neutral run result.
pub mod result;
/// Agent subprocess runner.
pub mod runner;
/// Normalized stream events.
pub mod stream;
/// Console trace formatting.
pub mod trace;
/// Vendor wire formats and decoders.
pub mod vendors;

pub use config::{ParserConfig, TraceConfig};
pub use diagnostics::{format_diagnostics, print_diagnostics};
pub use errors::{HarnessError, StreamFailure, StreamReadError};
pub use model::{Usage, UsageMode, Vendor, VendorBehavior};
pub use parser::{StreamOutcome, StreamParser, TurnState, VendorDecoder};
pub use result::{RunResult, UnifiedResult, turn_count};
pub use runner::{AgentCommand, AgentOutput, run_agent, run_vendor_agent};
pub use stream::StreamEvent;
pub use trace::TracePrinter;
pub use vendors::{VendorResult, parse_stream};
