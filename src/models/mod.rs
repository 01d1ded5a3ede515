//! Core data models for release-verify
//!
//! Domain entities shared across the pipeline and the interactive
//! orchestrator: PTY child lifecycle and build artifacts.

pub mod artifact;
pub mod pty_process;

// Re-exports for convenience
pub use artifact::ArtifactDescriptor;
pub use pty_process::{ExitStatus, PtyProcess, PtyState};
