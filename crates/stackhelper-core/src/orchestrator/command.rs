//! External command construction and execution

use crate::error::StackError;
use crate::parameters::escape_double_quotes;
use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// A program invocation kept as separate arguments, never a shell string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    program: String,
    args: Vec<String>,
}

impl CliCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `name value` as two arguments
    pub fn flag(self, name: &str, value: impl Into<String>) -> Self {
        self.arg(name).arg(value)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Argument following the first occurrence of `flag`
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).map(String::as_str)
    }
}

/// Renders a line that can be pasted into a shell
impl fmt::Display for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if is_shell_safe(arg) {
                write!(f, " {}", arg)?;
            } else {
                write!(f, " \"{}\"", escape_double_quotes(arg))?;
            }
        }
        Ok(())
    }
}

fn is_shell_safe(arg: &str) -> bool {
    !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,@+".contains(c))
}

/// Executes external commands for the orchestrator
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion, streaming the command's output as it arrives
    async fn run(&self, command: &CliCommand) -> Result<(), StackError>;

    /// Run to completion and return stdout without echoing it
    async fn output(&self, command: &CliCommand) -> Result<String, StackError>;
}

/// Spawns real processes with tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn command(command: &CliCommand) -> Command {
        let mut process = Command::new(command.program());
        process
            .args(command.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        process
    }

    fn spawn_error(command: &CliCommand) -> impl FnOnce(std::io::Error) -> StackError + '_ {
        move |source| StackError::Spawn {
            command: command.to_string(),
            source,
        }
    }

    fn failure(command: &CliCommand, status: ExitStatus, stderr: &str, stdout: &str) -> StackError {
        StackError::CommandFailed {
            command: command.to_string(),
            status: status.to_string(),
            output: format!("{}{}", stderr, stdout).trim().to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CliCommand) -> Result<(), StackError> {
        let mut child = Self::command(command)
            .spawn()
            .map_err(Self::spawn_error(command))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (out, err, status) = tokio::try_join!(
            tee(stdout, std::io::stdout()),
            tee(stderr, std::io::stderr()),
            child.wait(),
        )
        .map_err(|source| StackError::Output {
            command: command.to_string(),
            source,
        })?;

        if !status.success() {
            return Err(Self::failure(command, status, &err, &out));
        }
        Ok(())
    }

    async fn output(&self, command: &CliCommand) -> Result<String, StackError> {
        let output = Self::command(command)
            .output()
            .await
            .map_err(Self::spawn_error(command))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::failure(command, output.status, &stderr, &stdout));
        }
        Ok(stdout)
    }
}

/// Copy `reader` to `sink` line by line while keeping everything read
async fn tee<R, W>(reader: Option<R>, mut sink: W) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let Some(reader) = reader else {
        return Ok(String::new());
    };

    let mut captured = Vec::new();
    let mut segments = BufReader::new(reader).split(b'\n');
    while let Some(line) = segments.next_segment().await? {
        sink.write_all(&line)?;
        sink.write_all(b"\n")?;
        sink.flush()?;
        captured.extend_from_slice(&line);
        captured.push(b'\n');
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}
