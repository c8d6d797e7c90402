use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use po_agent_harness::Vendor;

#[derive(Debug, Parser)]
#[command(
    name = "po-agent",
    version,
    about = "Parse agent CLI event streams and score translation reviews"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a captured agent stream and print its trace and diagnostics.
    Parse(ParseArgs),
    /// Run an agent and parse its output while it runs.
    Run(RunArgs),
    /// Merge review files and compute the translation quality score.
    Score(ScoreArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Agent that produced the stream: claude, codex, opencode or gemini.
    #[arg(long)]
    pub vendor: Vendor,
    /// Stream file. Reads standard input when omitted or `-`.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
    /// Write the parsed result as JSON to this file.
    #[arg(long, value_name = "PATH")]
    pub result_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Agent whose output format to parse.
    #[arg(long)]
    pub vendor: Vendor,
    /// Kill the agent after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Working directory of the agent.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
    /// Write the parsed result as JSON to this file.
    #[arg(long, value_name = "PATH")]
    pub result_file: Option<PathBuf>,
    /// Agent program followed by its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PROGRAM"
    )]
    pub command: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Entry count of the reviewed translation file; overrides what the
    /// reviews report.
    #[arg(long, env = "PO_AGENT_TOTAL_ENTRIES")]
    pub total_entries: Option<i64>,
    /// Save the merged review to this file.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// Review files written by agents.
    #[arg(required = true, value_name = "REVIEW")]
    pub files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_accepts_vendor_aliases() {
        let cli = Cli::try_parse_from(["po-agent", "parse", "--vendor", "claude-code", "run.jsonl"])
            .expect("parse args");
        let Command::Parse(args) = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(args.vendor, Vendor::Claude);
        assert_eq!(args.file, Some(PathBuf::from("run.jsonl")));
    }

    #[test]
    fn run_keeps_agent_flags_verbatim() {
        let cli = Cli::try_parse_from([
            "po-agent", "run", "--vendor", "codex", "--timeout", "60", "--", "codex", "exec", "--json",
            "translate po/fr.po",
        ])
        .expect("run args");
        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.timeout, Some(60));
        assert_eq!(args.command, ["codex", "exec", "--json", "translate po/fr.po"]);
    }

    #[test]
    fn unknown_vendor_is_rejected() {
        let err = Cli::try_parse_from(["po-agent", "parse", "--vendor", "copilot"])
            .expect_err("bad vendor");
        assert!(err.to_string().contains("copilot"));
    }

    #[test]
    fn score_requires_review_files() {
        assert!(Cli::try_parse_from(["po-agent", "score"]).is_err());
        let cli = Cli::try_parse_from(["po-agent", "score", "--total-entries", "40", "a.json", "b.json"])
            .expect("score args");
        let Command::Score(args) = cli.command else {
            panic!("expected score command");
        };
        assert_eq!(args.total_entries, Some(40));
        assert_eq!(args.files.len(), 2);
    }
}
