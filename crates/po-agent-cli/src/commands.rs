use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use po_agent_harness::prelude::*;
use po_agent_review::{
    ReviewJsonResult, ReviewReport, aggregate_reviews, load_review_file, save_review_file,
};
use tokio::io::{AsyncRead, BufReader};
use tracing::{info, warn};

use crate::cli::{Command, ParseArgs, RunArgs, ScoreArgs};

pub async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Parse(args) => parse(args).await,
        Command::Run(args) => run(args).await,
        Command::Score(args) => score(args),
    }
}

async fn open_input(file: Option<&Path>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match file.filter(|path| *path != Path::new("-")) {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open stream file {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

/// Prints diagnostics and the final text on stdout.
fn report_outcome(text: &str, result: Option<&VendorResult>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    print_diagnostics(&mut stdout, result.map(|r| r as &dyn UnifiedResult))?;
    if !text.is_empty() {
        writeln!(stdout, "{text}")?;
    }
    stdout.flush()?;
    Ok(())
}

fn write_result_file(path: &Path, result: Option<&VendorResult>) -> Result<()> {
    let Some(result) = result else {
        warn!(path = %path.display(), "no recognized events; result file not written");
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(result)?;
    json.push('\n');
    std::fs::write(path, json)
        .with_context(|| format!("failed to write result file {}", path.display()))?;
    Ok(())
}

async fn parse(args: ParseArgs) -> Result<()> {
    let reader = BufReader::new(open_input(args.file.as_deref()).await?);
    let mut printer = TracePrinter::stdout(TraceConfig::from_env());
    let parsed = parse_stream(args.vendor, reader, &mut printer, ParserConfig::from_env()).await;
    let (outcome, failure) = match parsed {
        Ok(outcome) => (outcome, None),
        Err(failure) => {
            let source = failure.source;
            (failure.partial, Some(source))
        }
    };

    report_outcome(&outcome.text, outcome.result.as_ref())?;
    if let Some(path) = &args.result_file {
        write_result_file(path, outcome.result.as_ref())?;
    }
    if let Some(source) = failure {
        return Err(anyhow!(source).context("agent stream ended early"));
    }
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let Some((program, program_args)) = args.command.split_first() else {
        bail!("missing agent program");
    };
    let mut command = AgentCommand::new(program).args(program_args);
    if let Some(dir) = &args.cwd {
        command = command.current_dir(dir);
    }

    let printer = TracePrinter::stdout(TraceConfig::from_env());
    let invocation = run_vendor_agent(args.vendor, &command, ParserConfig::from_env(), printer);
    let output = match args.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), invocation)
            .await
            .map_err(|_| anyhow!("agent `{program}` timed out after {secs}s"))??,
        None => invocation.await?,
    };
    info!(status = %output.status, stderr_bytes = output.stderr.len(), "agent finished");

    report_outcome(&output.text, output.result.as_ref())?;
    if let Some(path) = &args.result_file {
        write_result_file(path, output.result.as_ref())?;
    }
    if let Some(source) = output.stream_error {
        return Err(anyhow!(source).context("agent stream ended early"));
    }
    if !output.status.success() {
        let stderr = output.stderr.trim();
        if stderr.is_empty() {
            bail!("agent `{program}` exited with {}", output.status);
        }
        bail!("agent `{program}` exited with {}:\n{stderr}", output.status);
    }
    Ok(())
}

fn load_reviews(files: &[PathBuf]) -> Vec<Option<ReviewJsonResult>> {
    files
        .iter()
        .map(|path| match load_review_file(path) {
            Ok(review) => Some(review),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unusable review");
                None
            }
        })
        .collect()
}

fn score(args: ScoreArgs) -> Result<()> {
    let reviews = load_reviews(&args.files);
    let merged = aggregate_reviews(&reviews, args.total_entries)
        .ok_or_else(|| anyhow!("none of the {} review file(s) held a usable review", args.files.len()))?;
    let report = ReviewReport::new(&merged).context("review data is inconsistent")?;
    println!("{report}");

    if let Some(path) = &args.output {
        save_review_file(path, &merged)?;
    }
    Ok(())
}
