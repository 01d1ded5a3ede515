//! PTY Process Spawning
//!
//! Spawns programs on a pseudoterminal using the portable-pty crate so that
//! tools which check for an interactive terminal emit their prompts instead
//! of refusing to run.

use async_trait::async_trait;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

use super::operations::InteractiveChannel;
use super::signals::{send_signal, Signal};
use super::streams::PtyStreams;
use crate::error::{Error, Result};
use crate::models::{ExitStatus, PtyProcess};

/// Poll interval while waiting for a child to exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// EIO: Linux reports a closed slave side this way instead of EOF
const EIO: i32 = 5;

/// Process spawning configuration
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Program to execute
    pub command: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Environment replacing the inherited one, when set
    pub env: Option<HashMap<String, String>>,
    /// Working directory
    pub working_directory: Option<PathBuf>,
    /// Terminal size
    pub size: PtySize,
    /// Grace period between SIGTERM and SIGKILL on terminate
    pub kill_grace: Duration,
}

impl SpawnConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: None,
            working_directory: None,
            size: PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            },
            kill_grace: Duration::from_secs(2),
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

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Terminal dimensions (cols, rows)
    pub fn dimensions(mut self, cols: u16, rows: u16) -> Self {
        self.size.cols = cols;
        self.size.rows = rows;
        self
    }

    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    fn command_builder(&self) -> CommandBuilder {
        let mut builder = CommandBuilder::new(&self.command);
        builder.args(&self.args);

        if let Some(env) = &self.env {
            builder.env_clear();
            for (key, value) in env {
                builder.env(key, value);
            }
        }

        if let Some(dir) = &self.working_directory {
            builder.cwd(dir);
        }
        builder
    }
}

/// A program running on a pseudoterminal
///
/// Dropping a channel whose child is still running kills the child, so an
/// abandoned or aborted session never leaves a half-configured installer
/// behind.
pub struct PtyChannel {
    process: PtyProcess,
    streams: PtyStreams,
    child: Box<dyn Child + Send + Sync>,
    /// Kept open so the child does not receive SIGHUP while we drive it
    _master: Box<dyn MasterPty + Send>,
    kill_grace: Duration,
}

impl PtyChannel {
    /// Lifecycle record of the child
    pub fn process(&self) -> &PtyProcess {
        &self.process
    }

    fn record_exit(&mut self, status: ExitStatus) -> ExitStatus {
        self.process.mark_terminated(status);
        debug!("{} exited with {}", self.process.command_line(), status);
        status
    }

    fn kill_now(&mut self) -> Result<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already reaped or exited between the check and the kill
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(Error::SignalSendFailed {
                signal: format!("{:?}", Signal::Kill),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl InteractiveChannel for PtyChannel {
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.streams.read().await)
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.streams.write(data)
    }

    fn try_exit_status(&mut self) -> Result<Option<ExitStatus>> {
        if let Some(status) = self.process.exit_status {
            return Ok(Some(status));
        }
        match self.child.try_wait()? {
            Some(status) => Ok(Some(self.record_exit(status.into()))),
            None => Ok(None),
        }
    }

    async fn wait(&mut self) -> Result<ExitStatus> {
        loop {
            if let Some(status) = self.try_exit_status()? {
                return Ok(status);
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    async fn terminate(&mut self) -> Result<()> {
        if self.try_exit_status()?.is_some() {
            return Ok(());
        }

        if let Some(pid) = self.process.pid {
            info!("terminating {} (pid {})", self.process.command_line(), pid);
            if let Err(e) = send_signal(pid, Signal::Terminate) {
                debug!("SIGTERM to {} failed: {}", pid, e);
            }

            let deadline = tokio::time::Instant::now() + self.kill_grace;
            while tokio::time::Instant::now() < deadline {
                if self.try_exit_status()?.is_some() {
                    return Ok(());
                }
                tokio::time::sleep(EXIT_POLL_INTERVAL).await;
            }
            warn!("{} ignored SIGTERM, killing", self.process.command_line());
        }

        self.kill_now()?;
        let status = self.wait().await?;
        debug!("{} stopped with {}", self.process.command_line(), status);
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        self.process.pid
    }

    fn describe(&self) -> String {
        self.process.command_line()
    }
}

impl Drop for PtyChannel {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            debug!("killing {} on drop", self.process.command_line());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        let dropped = self.streams.drain_output();
        if dropped > 0 {
            debug!("discarded {} unread bytes from {}", dropped, self.process.command_line());
        }
    }
}

/// Spawn a program on a new PTY
pub fn spawn_pty_process(config: &SpawnConfig) -> Result<PtyChannel> {
    let pty_system = native_pty_system();

    let pair = pty_system
        .openpty(config.size)
        .map_err(|e| Error::PtyCreationFailed {
            command: config.command.clone(),
            reason: e.to_string(),
        })?;

    let child = pair
        .slave
        .spawn_command(config.command_builder())
        .map_err(|e| Error::PtySpawnFailed {
            command: config.command.clone(),
            reason: e.to_string(),
        })?;
    // Our copy of the slave must close so the reader sees the child's exit
    drop(pair.slave);

    let mut process = PtyProcess::new(config.command.clone(), config.args.clone());
    process.mark_started(child.process_id());
    info!("spawned {} on a pty (pid {:?})", process.command_line(), process.pid);

    let streams = create_pty_streams(pair.master.as_ref())?;

    Ok(PtyChannel {
        process,
        streams,
        child,
        _master: pair.master,
        kill_grace: config.kill_grace,
    })
}

/// Bridge the blocking PTY master to async channels via two threads
fn create_pty_streams(master: &(dyn MasterPty + Send)) -> Result<PtyStreams> {
    let mut master_reader = master
        .try_clone_reader()
        .map_err(|e| Error::PtyReaderCloneFailed {
            reason: e.to_string(),
        })?;
    let mut master_writer = master
        .take_writer()
        .map_err(|e| Error::PtyWriterTakeFailed {
            reason: e.to_string(),
        })?;

    // Channel: PTY output -> async consumer
    let (tx_async_out, rx_async_out) = unbounded_channel::<Vec<u8>>();
    // Channel: async producer (stdin) -> PTY writer thread
    let (tx_stdin, rx_stdin) = channel::<Vec<u8>>();

    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            match master_reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY read EOF - process terminated");
                    break;
                }
                Ok(n) => {
                    consecutive_errors = 0;
                    if tx_async_out.send(buf[..n].to_vec()).is_err() {
                        debug!("PTY read: receiver dropped, stopping reader thread");
                        break;
                    }
                }
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::Interrupted {
                        continue;
                    }
                    if e.raw_os_error() == Some(EIO) {
                        debug!("PTY read EIO - slave side closed");
                        break;
                    }
                    if e.kind() == std::io::ErrorKind::WouldBlock {
                        thread::sleep(Duration::from_millis(10));
                        continue;
                    }

                    consecutive_errors += 1;
                    warn!(
                        "PTY read error ({}): {} (attempt {}/{})",
                        e.kind(),
                        e,
                        consecutive_errors,
                        MAX_CONSECUTIVE_ERRORS
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("PTY read: too many consecutive errors, stopping reader thread");
                        break;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            }
        }
        debug!("PTY reader thread exiting");
    });

    thread::spawn(move || {
        while let Ok(data) = rx_stdin.recv() {
            loop {
                match master_writer.write_all(&data) {
                    Ok(()) => {
                        if let Err(e) = master_writer.flush() {
                            debug!("PTY flush error: {}", e);
                        }
                        break;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        // The child is gone; the session notices through the reader
                        warn!("PTY write error ({}): {}", e.kind(), e);
                        return;
                    }
                }
            }
        }
        debug!("PTY writer thread exiting");
    });

    Ok(PtyStreams::from_channels(rx_async_out, tx_stdin))
}
