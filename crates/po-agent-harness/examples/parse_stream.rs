//! Parses a captured agent stream and prints the trace, diagnostics and
//! final text.
//!
//! `cargo run -p po-agent-harness --example parse_stream -- codex run.jsonl`
use po_agent_harness::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let vendor: Vendor = args.next().ok_or("missing vendor argument")?.parse()?;
    let path = args.next().ok_or("missing stream file argument")?;

    let file = tokio::fs::File::open(&path).await?;
    let mut printer = TracePrinter::stdout(TraceConfig::from_env());
    let outcome = parse_stream(
        vendor,
        tokio::io::BufReader::new(file),
        &mut printer,
        ParserConfig::from_env(),
    )
    .await?;

    let result = outcome.result.as_ref().map(|r| r as &dyn UnifiedResult);
    print_diagnostics(&mut std::io::stdout(), result)?;
    println!("{}", outcome.text);
    Ok(())
}
