//! Scripted Interaction
//!
//! Drives prompt-based programs without a human at the keyboard: a program is
//! started on a PTY and a [`PromptScript`] of expected prompts and answers is
//! replayed against it, one step at a time.

pub mod buffer;
pub mod matcher;
pub mod script;
pub mod session;

// Re-exports for convenience
pub use buffer::OutputBuffer;
pub use matcher::{MatcherKind, PatternMatcher};
pub use script::{PromptScript, PromptStep};
pub use session::{Session, SessionOptions, SessionOutcome, SessionState};

use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::pty::{spawn_pty_process, PtyChannel, SpawnConfig};

/// Spawns programs on PTYs and drives them with prompt scripts
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::from(&self.config)
    }

    /// Start `spawn` on a PTY sized and supervised per this orchestrator
    pub fn spawn(&self, spawn: &SpawnConfig) -> Result<Session<PtyChannel>> {
        let (cols, rows) = self.config.dimensions;
        let spawn = spawn
            .clone()
            .dimensions(cols, rows)
            .kill_grace(self.config.kill_grace());
        let channel = spawn_pty_process(&spawn)?;

        let mut session = Session::new(self.session_options());
        session.attach(channel)?;
        Ok(session)
    }

    /// Spawn a program and replay `script` against it
    ///
    /// The session is returned in `Completed` state so the caller can wait,
    /// hand off, or close the child. On failure the child is killed when the
    /// session drops.
    pub async fn drive(
        &self,
        spawn: &SpawnConfig,
        script: &PromptScript,
    ) -> Result<(Session<PtyChannel>, SessionOutcome)> {
        let mut session = self.spawn(spawn)?;
        let outcome = session.run(script).await?;
        Ok((session, outcome))
    }
}
