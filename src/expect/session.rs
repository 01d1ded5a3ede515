//! Interactive child sessions
//!
//! A [`Session`] owns one child behind an [`InteractiveChannel`] and replays
//! exactly one [`PromptScript`] against it. State transitions:
//!
//! ```text
//! Idle -> Spawned -> AwaitingPrompt -> Responding -> AwaitingPrompt ...
//!                                   \-> Failed      \-> Completed
//! ```
//!
//! `Completed` and `Failed` are terminal. From `Completed` the caller decides
//! what happens to the child: [`Session::wait`] for it, [`Session::hand_off`]
//! the channel, or [`Session::close`] it. Cancelling [`Session::run`] leaves
//! the session in its last `AwaitingPrompt` or `Responding` state, from which
//! [`Session::abort`] stops the child.

use std::fmt;
use std::io::Write;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use uuid::Uuid;

use super::buffer::OutputBuffer;
use super::script::{PromptScript, PromptStep};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::models::ExitStatus;
use crate::pty::InteractiveChannel;

/// Where a session is in its script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No child attached yet
    #[default]
    Idle,
    /// Child running, script not started
    Spawned,
    /// Waiting for the prompt of step `step`
    AwaitingPrompt { step: usize },
    /// Prompt of step `step` matched, answer being written
    Responding { step: usize },
    /// Every step answered
    Completed,
    /// Timed out, child exited early, or aborted
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Spawned => write!(f, "spawned"),
            SessionState::AwaitingPrompt { step } => write!(f, "awaiting prompt {}", step),
            SessionState::Responding { step } => write!(f, "responding to prompt {}", step),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// Tunables for one session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bound on each prompt when the step sets none
    pub prompt_timeout: Duration,
    /// Mirror child output to stdout
    pub echo_output: bool,
    /// Tail of unconsumed output carried by errors
    pub max_diagnostic_bytes: usize,
    /// How long to wait for an exit status after the channel closes
    pub exit_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for SessionOptions {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            prompt_timeout: config.prompt_timeout(),
            echo_output: config.echo_output,
            max_diagnostic_bytes: config.max_diagnostic_bytes,
            exit_grace: config.kill_grace(),
        }
    }
}

/// Result of a script that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Name of the replayed script
    pub script: String,
    /// Responses sent, in order
    pub responses: Vec<String>,
    /// Exit status if the child had already exited when the script finished
    pub exit_status: Option<ExitStatus>,
}

impl SessionOutcome {
    /// Whether the child was still running after its last answer
    pub fn child_running(&self) -> bool {
        self.exit_status.is_none()
    }
}

/// One child process driven by one prompt script
pub struct Session<C: InteractiveChannel> {
    id: Uuid,
    channel: Option<C>,
    buffer: OutputBuffer,
    state: SessionState,
    responses: Vec<String>,
    options: SessionOptions,
    /// Child side of the channel has closed
    closed: bool,
}

impl<C: InteractiveChannel> Session<C> {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: None,
            buffer: OutputBuffer::new(),
            state: SessionState::Idle,
            responses: Vec::new(),
            options,
            closed: false,
        }
    }

    /// Attach a freshly spawned child
    pub fn attach(&mut self, channel: C) -> Result<()> {
        self.expect_state("attach a child", |s| s == SessionState::Idle)?;
        debug!("session {} attached to {}", self.id, channel.describe());
        self.channel = Some(channel);
        self.state = SessionState::Spawned;
        Ok(())
    }

    /// Session with a child already attached
    pub fn with_channel(channel: C, options: SessionOptions) -> Self {
        let mut session = Self::new(options);
        session.channel = Some(channel);
        session.state = SessionState::Spawned;
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Responses sent so far, in order
    pub fn responses(&self) -> &[String] {
        &self.responses
    }

    /// The attached channel, if the session still owns one
    pub fn channel(&self) -> Option<&C> {
        self.channel.as_ref()
    }

    /// Replay `script` against the attached child
    ///
    /// Any failure leaves the session `Failed`; the child is left for
    /// [`Session::close`] or drop to clean up.
    pub async fn run(&mut self, script: &PromptScript) -> Result<SessionOutcome> {
        self.expect_state("run a script", |s| s == SessionState::Spawned)?;
        info!(
            "session {}: driving {} with {}",
            self.id,
            self.describe_child(),
            script
        );

        for (index, step) in script.steps().iter().enumerate() {
            self.state = SessionState::AwaitingPrompt { step: index };
            if let Err(e) = self.await_prompt(step).await {
                self.state = SessionState::Failed;
                error!("session {}: step {} failed: {}", self.id, index, e);
                return Err(e);
            }

            self.state = SessionState::Responding { step: index };
            if let Err(e) = self.respond(step).await {
                self.state = SessionState::Failed;
                return Err(e);
            }
        }

        let exit_status = match self.channel.as_mut() {
            Some(channel) => match channel.try_exit_status() {
                Ok(status) => status,
                Err(e) => {
                    self.state = SessionState::Failed;
                    error!("session {}: exit status unavailable: {}", self.id, e);
                    return Err(e);
                }
            },
            None => None,
        };
        self.state = SessionState::Completed;
        info!(
            "session {}: {} completed after {} responses",
            self.id,
            script.name(),
            self.responses.len()
        );

        Ok(SessionOutcome {
            script: script.name().to_string(),
            responses: self.responses.clone(),
            exit_status,
        })
    }

    /// Wait until `step`'s prompt shows up in the unconsumed output
    async fn await_prompt(&mut self, step: &PromptStep) -> Result<()> {
        let bound = step.timeout.unwrap_or(self.options.prompt_timeout);
        let deadline = Instant::now() + bound;
        debug!("session {}: waiting up to {:?} for {}", self.id, bound, step.matcher);

        loop {
            // Output delivered together with the close is scanned first
            if let Some(matched) = self.buffer.consume_match(&step.matcher) {
                debug!("session {}: matched {:?}", self.id, matched);
                return Ok(());
            }

            if self.closed {
                let exit_status = self.collect_exit_status().await;
                return Err(Error::UnexpectedExit {
                    matcher: step.matcher.to_string(),
                    exit_status,
                    partial_output: self.diagnostic_output(),
                });
            }

            let channel = self.channel_mut("wait for a prompt")?;
            let read = timeout_at(deadline, channel.read_chunk()).await;
            match read {
                Ok(Ok(Some(chunk))) => {
                    self.echo(&chunk);
                    self.buffer.push(&chunk);
                }
                Ok(Ok(None)) => {
                    debug!("session {}: child closed its terminal", self.id);
                    self.closed = true;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(Error::PromptTimeout {
                        matcher: step.matcher.to_string(),
                        timeout: bound,
                        partial_output: self.diagnostic_output(),
                    })
                }
            }
        }
    }

    async fn respond(&mut self, step: &PromptStep) -> Result<()> {
        let line = format!("{}\n", step.response);
        let id = self.id;
        let channel = self.channel_mut("send a response")?;
        channel.send(line.as_bytes()).await?;
        info!(
            "session {}: {} -> {:?}",
            id,
            step.matcher,
            step.loggable_response()
        );
        self.responses.push(step.response.clone());
        Ok(())
    }

    /// Wait for a completed session's child to exit
    ///
    /// Remaining output is drained (and echoed) until the child closes its
    /// terminal, and kept for [`Session::output_tail`].
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.expect_state("wait for the child", |s| s == SessionState::Completed)?;

        while !self.closed {
            let channel = self.channel_mut("wait for the child")?;
            match channel.read_chunk().await? {
                Some(chunk) => {
                    self.echo(&chunk);
                    self.buffer.push(&chunk);
                }
                None => self.closed = true,
            }
        }

        let id = self.id;
        let channel = self.channel_mut("wait for the child")?;
        let status = channel.wait().await?;
        info!("session {}: {} exited with {}", id, channel.describe(), status);
        Ok(status)
    }

    /// [`Session::wait`], failing with the child's last output unless it
    /// exits successfully
    pub async fn wait_success(&mut self) -> Result<ExitStatus> {
        let status = self.wait().await?;
        if status.success() {
            return Ok(status);
        }
        Err(Error::ProgramFailed {
            command: self.describe_child(),
            exit_status: status,
            partial_output: self.output_tail(),
        })
    }

    /// Output not consumed by any prompt, capped like error diagnostics
    pub fn output_tail(&self) -> String {
        self.diagnostic_output()
    }

    /// Give up supervision of a completed session's child
    pub fn hand_off(mut self) -> Result<C> {
        self.expect_state("hand off the child", |s| s == SessionState::Completed)?;
        let channel = self.channel.take().ok_or_else(|| Error::InvalidSessionState {
            operation: "hand off the child".to_string(),
            state: "detached".to_string(),
        })?;
        info!("session {}: handing off {}", self.id, channel.describe());
        Ok(channel)
    }

    /// Stop the child and release the channel
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            debug!("session {}: closing {}", self.id, channel.describe());
            channel.terminate().await?;
        }
        self.closed = true;
        Ok(())
    }

    /// Abandon the script, stopping the child
    pub async fn abort(&mut self) -> Result<()> {
        if self.state.is_terminal() && self.channel.is_none() {
            return Ok(());
        }
        warn!("session {}: aborting in state {}", self.id, self.state);
        self.buffer.clear();
        self.state = SessionState::Failed;
        self.close().await
    }

    async fn collect_exit_status(&mut self) -> Option<ExitStatus> {
        let grace = self.options.exit_grace;
        let channel = self.channel.as_mut()?;
        match timeout(grace, channel.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                debug!("session {}: exit status unavailable: {}", self.id, e);
                None
            }
            Err(_) => None,
        }
    }

    fn diagnostic_output(&self) -> String {
        self.buffer.snapshot(self.options.max_diagnostic_bytes)
    }

    fn echo(&self, chunk: &[u8]) {
        if !self.options.echo_output {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(chunk).and_then(|_| stdout.flush()) {
            debug!("session {}: echo failed: {}", self.id, e);
        }
    }

    fn describe_child(&self) -> String {
        self.channel
            .as_ref()
            .map(|c| c.describe())
            .unwrap_or_else(|| "<no child>".to_string())
    }

    fn channel_mut(&mut self, operation: &str) -> Result<&mut C> {
        let state = self.state;
        self.channel.as_mut().ok_or_else(|| Error::InvalidSessionState {
            operation: operation.to_string(),
            state: format!("{} without a child", state),
        })
    }

    fn expect_state(&self, operation: &str, allowed: impl Fn(SessionState) -> bool) -> Result<()> {
        if allowed(self.state) {
            Ok(())
        } else {
            Err(Error::InvalidSessionState {
                operation: operation.to_string(),
                state: self.state.to_string(),
            })
        }
    }
}
