//! Common imports for typical harness usage.
//!
//! Re-exports the types needed to parse or run an agent and report on the
//! result, so application code needs fewer import lines.
pub use crate::{
    AgentCommand, AgentOutput, HarnessError, ParserConfig, RunResult, StreamEvent, StreamFailure,
    StreamOutcome, TraceConfig, TracePrinter, UnifiedResult, Vendor, VendorResult,
    parse_stream, print_diagnostics, run_vendor_agent,
};
