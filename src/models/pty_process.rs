//! PTY Process Model
//!
//! Lifecycle of a program spawned on a pseudoterminal: when it started,
//! whether it is still running, and how it ended.

use chrono::{DateTime, Utc};
use std::fmt;

/// Represents the state of a PTY process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PtyState {
    /// Process has been created but not started
    #[default]
    Created,
    /// Process is currently running
    Running,
    /// Process has terminated
    Terminated,
}

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    code: u32,
}

impl ExitStatus {
    /// Build a status from a numeric exit code
    pub fn from_code(code: u32) -> Self {
        Self { code }
    }

    /// Numeric exit code
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

impl From<portable_pty::ExitStatus> for ExitStatus {
    fn from(status: portable_pty::ExitStatus) -> Self {
        Self::from_code(status.exit_code())
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}", self.code)
    }
}

/// Tracks the lifecycle of a program running on a PTY
#[derive(Debug, Clone)]
pub struct PtyProcess {
    /// OS process identifier
    pub pid: Option<u32>,

    /// Current state of the process
    pub state: PtyState,

    /// When the process was started
    pub start_time: Option<DateTime<Utc>>,

    /// When the process terminated (if applicable)
    pub end_time: Option<DateTime<Utc>>,

    /// Exit status (if process has terminated)
    pub exit_status: Option<ExitStatus>,

    /// Program that was executed
    pub command: String,

    /// Arguments passed to the program
    pub args: Vec<String>,
}

impl PtyProcess {
    /// Create a new PTY process in the Created state
    pub fn new(command: String, args: Vec<String>) -> Self {
        Self {
            pid: None,
            state: PtyState::Created,
            start_time: None,
            end_time: None,
            exit_status: None,
            command,
            args,
        }
    }

    /// Mark the process as started with the given PID
    pub fn mark_started(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.state = PtyState::Running;
        self.start_time = Some(Utc::now());
    }

    /// Mark the process as terminated; later calls keep the first status
    pub fn mark_terminated(&mut self, status: ExitStatus) {
        if self.is_terminated() {
            return;
        }
        self.state = PtyState::Terminated;
        self.end_time = Some(Utc::now());
        self.exit_status = Some(status);
    }

    /// Check if the process is currently running
    pub fn is_running(&self) -> bool {
        matches!(self.state, PtyState::Running)
    }

    /// Check if the process has terminated
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, PtyState::Terminated)
    }

    /// Get the execution duration if the process has terminated
    pub fn execution_duration(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                Some(end.signed_duration_since(start).to_std().unwrap_or_default())
            }
            _ => None,
        }
    }

    /// Command line as it would be typed
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

impl fmt::Display for PtyProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self.state {
            PtyState::Created => "Created",
            PtyState::Running => "Running",
            PtyState::Terminated => "Terminated",
        };
        let pid_str = self.pid.map_or("N/A".to_string(), |pid| pid.to_string());

        write!(f, "{} [{}] - {}", self.command_line(), pid_str, state_str)?;
        if let Some(status) = self.exit_status {
            write!(f, " ({})", status)?;
        }
        Ok(())
    }
}
