//! Spawns an agent CLI and parses its stdout while it runs.
//!
//! Stdout is owned by a single parser task; stderr is drained by a second
//! task so the child never blocks on a full pipe. Both tasks are joined before
//! the process is reaped.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::errors::{HarnessError, StreamReadError};
use crate::model::Vendor;
use crate::parser::{StreamParser, VendorDecoder};
use crate::trace::TracePrinter;
use crate::vendors::{
    ClaudeDecoder, CodexDecoder, GeminiDecoder, OpenCodeDecoder, VendorResult,
};

/// Program and arguments of one agent invocation.
#[derive(Clone, Debug)]
pub struct AgentCommand {
    program: OsString,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl AgentCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    fn validate(&self) -> Result<(), HarnessError> {
        if self.program.is_empty() {
            return Err(HarnessError::Validation(
                "agent program must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Everything collected from one agent process.
#[derive(Debug)]
pub struct AgentOutput<R> {
    pub text: String,
    pub result: Option<R>,
    pub stderr: String,
    pub status: ExitStatus,
    /// Set when stdout could not be read to the end; `text` and `result`
    /// then hold what was parsed before the failure.
    pub stream_error: Option<StreamReadError>,
}

impl<R> AgentOutput<R> {
    pub fn success(&self) -> bool {
        self.status.success() && self.stream_error.is_none()
    }
}

/// Runs `command`, parsing stdout with `parser` and printing the trace through
/// `printer`.
///
/// There is no timeout here. Callers that need one wrap the future; dropping
/// it kills the child.
pub async fn run_agent<D, W>(
    command: &AgentCommand,
    parser: StreamParser<D>,
    printer: TracePrinter<W>,
) -> Result<AgentOutput<D::Output>, HarnessError>
where
    D: VendorDecoder + Send + 'static,
    D::Output: Send + 'static,
    W: Write + Send + 'static,
{
    command.validate()?;
    let program = command.program();
    let mut child = command
        .to_command()
        .spawn()
        .map_err(|source| HarnessError::Spawn {
            program: program.clone(),
            source,
        })?;
    debug!(program = %program, pid = ?child.id(), vendor = %parser.vendor(), "agent started");

    let stdout = child
        .stdout
        .take()
        .ok_or(HarnessError::MissingPipe("stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or(HarnessError::MissingPipe("stderr"))?;

    let stdout_task = tokio::spawn(async move {
        let mut printer = printer;
        parser.parse(BufReader::new(stdout), &mut printer).await
    });
    let stderr_task = tokio::spawn(drain_stderr(stderr));

    let (parsed, stderr) = tokio::join!(stdout_task, stderr_task);
    let (outcome, stream_error) = match parsed? {
        Ok(outcome) => (outcome, None),
        Err(failure) => (failure.partial, Some(failure.source)),
    };
    let stderr = stderr?;

    let status = child.wait().await.map_err(HarnessError::Wait)?;
    if !status.success() {
        warn!(program = %program, status = %status, "agent exited unsuccessfully");
    }

    Ok(AgentOutput {
        text: outcome.text,
        result: outcome.result,
        stderr,
        status,
        stream_error,
    })
}

/// Runs `command` with the decoder for `vendor`.
pub async fn run_vendor_agent<W>(
    vendor: Vendor,
    command: &AgentCommand,
    config: ParserConfig,
    printer: TracePrinter<W>,
) -> Result<AgentOutput<VendorResult>, HarnessError>
where
    W: Write + Send + 'static,
{
    match vendor {
        Vendor::Claude => run_with(ClaudeDecoder::default(), command, config, printer).await,
        Vendor::Codex => run_with(CodexDecoder::default(), command, config, printer).await,
        Vendor::OpenCode => run_with(OpenCodeDecoder::default(), command, config, printer).await,
        Vendor::Gemini => run_with(GeminiDecoder::default(), command, config, printer).await,
    }
}

async fn run_with<D, W>(
    decoder: D,
    command: &AgentCommand,
    config: ParserConfig,
    printer: TracePrinter<W>,
) -> Result<AgentOutput<VendorResult>, HarnessError>
where
    D: VendorDecoder + Send + 'static,
    D::Output: Into<VendorResult> + Send + 'static,
    W: Write + Send + 'static,
{
    let parser = StreamParser::new(decoder).with_config(config);
    let output = run_agent(command, parser, printer).await?;
    Ok(AgentOutput {
        text: output.text,
        result: output.result.map(Into::into),
        stderr: output.stderr,
        status: output.status,
        stream_error: output.stream_error,
    })
}

async fn drain_stderr(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    if let Err(err) = stderr.read_to_end(&mut buf).await {
        debug!(error = %err, "failed to read agent stderr");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceConfig;
    use crate::result::UnifiedResult;

    fn shell(script: &str) -> AgentCommand {
        AgentCommand::new("sh").arg("-c").arg(script)
    }

    fn quiet_printer() -> TracePrinter<Vec<u8>> {
        TracePrinter::new(Vec::new(), TraceConfig::default())
    }

    #[tokio::test]
    async fn collects_stdout_stream_and_stderr() {
        let script = r#"
printf '%s\n' '{"type":"turn.started"}'
printf '%s\n' '{"type":"item.completed","item":{"type":"agent_message","text":"bonjour"}}'
printf '%s\n' '{"type":"turn.completed","usage":{"input_tokens":3,"output_tokens":1}}'
echo 'warning: slow network' >&2
"#;
        let output = run_vendor_agent(
            Vendor::Codex,
            &shell(script),
            ParserConfig::default(),
            quiet_printer(),
        )
        .await
        .expect("agent runs");
        assert!(output.success());
        assert_eq!(output.text, "bonjour");
        assert_eq!(output.result.num_turns(), 1);
        assert_eq!(output.stderr.trim(), "warning: slow network");
    }

    #[tokio::test]
    async fn stderr_larger_than_the_pipe_buffer_does_not_stall_the_stream() {
        let script = r#"
head -c 1000000 /dev/zero | tr '\0' 'e' >&2
printf '%s\n' '{"type":"turn.started"}'
printf '%s\n' '{"type":"turn.completed","usage":{"input_tokens":1,"output_tokens":1}}'
"#;
        let command = shell(script);
        let invocation = run_vendor_agent(
            Vendor::Codex,
            &command,
            ParserConfig::default(),
            quiet_printer(),
        );
        let output = tokio::time::timeout(std::time::Duration::from_secs(30), invocation)
            .await
            .expect("runner finishes while stderr is flooded")
            .expect("agent runs");
        assert!(output.success());
        assert_eq!(output.stderr.len(), 1_000_000);
        assert_eq!(output.result.num_turns(), 1);
    }

    #[tokio::test]
    async fn non_zero_exit_still_returns_parsed_output() {
        let script = r#"printf '%s\n' '{"type":"init","session_id":"s"}'; exit 3"#;
        let output = run_vendor_agent(
            Vendor::Gemini,
            &shell(script),
            ParserConfig::default(),
            quiet_printer(),
        )
        .await
        .expect("agent runs");
        assert_eq!(output.status.code(), Some(3));
        assert!(!output.success());
        assert_eq!(
            output.result.map(|r| r.run().session_id.clone()).as_deref(),
            Some("s")
        );
    }

    #[tokio::test]
    async fn over_long_line_is_reported_with_partial_output() {
        let script = r#"printf '%s\n' '{"type":"turn.started"}'; head -c 4096 /dev/zero | tr '\0' 'a'; echo"#;
        let output = run_vendor_agent(
            Vendor::Codex,
            &shell(script),
            ParserConfig::default().max_line_bytes(1024),
            quiet_printer(),
        )
        .await
        .expect("agent runs");
        assert!(matches!(
            output.stream_error,
            Some(StreamReadError::LineTooLong { limit: 1024 })
        ));
        assert_eq!(output.result.num_turns(), 1);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run_vendor_agent(
            Vendor::Claude,
            &AgentCommand::new("po-agent-definitely-missing-binary"),
            ParserConfig::default(),
            quiet_printer(),
        )
        .await
        .expect_err("spawn fails");
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn empty_program_is_rejected() {
        let err = run_vendor_agent(
            Vendor::Claude,
            &AgentCommand::new(""),
            ParserConfig::default(),
            quiet_printer(),
        )
        .await
        .expect_err("validation");
        assert!(matches!(err, HarnessError::Validation(_)));
    }
}
