//! Pseudoterminal (PTY) Management
//!
//! Spawns programs on a pseudoterminal, bridges their blocking I/O to async
//! channels, and stops them with signals when a run is aborted.

pub mod operations;
pub mod process;
pub mod signals;
pub mod streams;

// Re-exports for convenience
pub use operations::InteractiveChannel;
pub use process::{spawn_pty_process, PtyChannel, SpawnConfig};
pub use signals::{send_signal, Signal};
pub use streams::PtyStreams;
