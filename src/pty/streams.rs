//! PTY Streams
//!
//! Async-friendly interface over PTY I/O. Blocking reads and writes on the
//! PTY master happen on dedicated threads; these channels connect them to
//! the async session.

use crate::error::{Error, Result};
use std::sync::mpsc::Sender as StdSender;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// PTY I/O streams wrapper
pub struct PtyStreams {
    /// Receiver for output bytes from the PTY (stdout/stderr)
    output_rx: UnboundedReceiver<Vec<u8>>,
    /// Sender for input bytes to the PTY (stdin)
    input_tx: StdSender<Vec<u8>>,
}

impl PtyStreams {
    /// Create new PTY streams from channels
    pub fn from_channels(
        output_rx: UnboundedReceiver<Vec<u8>>,
        input_tx: StdSender<Vec<u8>>,
    ) -> Self {
        Self {
            output_rx,
            input_tx,
        }
    }

    /// Write data to the PTY stdin
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.input_tx
            .send(data.to_vec())
            .map_err(|e| Error::PtyInputSendFailed {
                reason: e.to_string(),
            })
    }

    /// Next chunk of output; `None` once the reader thread has stopped
    pub async fn read(&mut self) -> Option<Vec<u8>> {
        self.output_rx.recv().await
    }

    /// Try to read without waiting; `None` when nothing is pending
    pub fn try_read_now(&mut self) -> Option<Vec<u8>> {
        match self.output_rx.try_recv() {
            Ok(chunk) => Some(chunk),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain all pending output from the channel, returning how many bytes were dropped
    pub fn drain_output(&mut self) -> usize {
        let mut dropped = 0;
        while let Some(chunk) = self.try_read_now() {
            dropped += chunk.len();
        }
        dropped
    }
}
