//! Interactive Channel Abstraction
//!
//! The operations the prompt orchestrator needs from a running child: read
//! its terminal output, type into it, learn how it ended, and stop it.
//! The PTY-backed implementation lives in [`super::process`]; tests drive
//! the orchestrator with simulated children through the same trait.

use crate::error::Result;
use crate::models::ExitStatus;
use async_trait::async_trait;

/// A child process reachable through an interactive terminal channel
#[async_trait]
pub trait InteractiveChannel: Send {
    /// Wait for the next chunk of terminal output
    ///
    /// # Returns
    /// `Ok(None)` once the child side of the channel has closed. Output
    /// produced before the close is always delivered first.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Write raw bytes to the child's terminal input
    ///
    /// # Errors
    /// Returns an error if the channel can no longer accept input
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Exit status if the child has already exited, without blocking
    fn try_exit_status(&mut self) -> Result<Option<ExitStatus>>;

    /// Wait for the child to exit
    async fn wait(&mut self) -> Result<ExitStatus>;

    /// Stop the child, politely first and forcefully after the grace period
    async fn terminate(&mut self) -> Result<()>;

    /// OS process identifier, when known
    fn pid(&self) -> Option<u32>;

    /// Short description of the program for logs and diagnostics
    fn describe(&self) -> String;
}
