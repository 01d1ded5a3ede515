//! Non-interactive command execution
//!
//! Runs build, clone and packaging commands to completion with the
//! caller's standard streams attached. A non-zero exit aborts the caller;
//! nothing is retried.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A command to run either through `sh -c` or directly from an argv vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Command line interpreted by `/bin/sh`
    Shell(String),
    /// Program and arguments executed without a shell
    Exec(Vec<String>),
}

impl ShellCommand {
    pub fn shell(line: impl Into<String>) -> Self {
        ShellCommand::Shell(line.into())
    }

    pub fn exec<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ShellCommand::Exec(argv.into_iter().map(Into::into).collect())
    }

    fn to_command(&self) -> Result<Command> {
        match self {
            ShellCommand::Shell(line) => {
                if line.trim().is_empty() {
                    return Err(Error::EmptyCommand);
                }
                let mut command = Command::new("/bin/sh");
                command.arg("-c").arg(line);
                Ok(command)
            }
            ShellCommand::Exec(argv) => {
                let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;
                let mut command = Command::new(program);
                command.args(args);
                Ok(command)
            }
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellCommand::Shell(line) => write!(f, "{}", line),
            ShellCommand::Exec(argv) => write!(f, "{}", argv.join(" ")),
        }
    }
}

impl From<&str> for ShellCommand {
    fn from(line: &str) -> Self {
        ShellCommand::shell(line)
    }
}

impl From<String> for ShellCommand {
    fn from(line: String) -> Self {
        ShellCommand::Shell(line)
    }
}

/// Runs commands to completion, failing fast on non-zero exit
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    /// Directory used when a call does not name one
    working_dir: Option<PathBuf>,
    /// Log commands without executing them
    dry_run: bool,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose commands default to `dir`
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `command` in `working_dir` with `env` replacing the inherited
    /// environment when given
    pub async fn run(
        &self,
        command: impl Into<ShellCommand>,
        working_dir: Option<&Path>,
        env: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        let command = command.into();
        let cwd = self.effective_dir(working_dir);
        info!("calling \"{}\" in {}", command, cwd.display());

        if self.dry_run {
            return Ok(());
        }

        let mut process = command.to_command()?;
        // An interrupted run must not leave builds running behind it
        process.current_dir(&cwd).kill_on_drop(true);
        if let Some(env) = env {
            process.env_clear().envs(env);
        }

        let status = process
            .status()
            .await
            .map_err(|e| Error::CommandSpawnFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            warn!("\"{}\" exited with {}", command, status);
            Err(Error::CommandFailed {
                command: command.to_string(),
                exit_code: status.code(),
            })
        }
    }

    fn effective_dir(&self, working_dir: Option<&Path>) -> PathBuf {
        working_dir
            .map(Path::to_path_buf)
            .or_else(|| self.working_dir.clone())
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
