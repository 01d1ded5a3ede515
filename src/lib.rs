//! release-verify - build a Seafile server release and install it unattended
//!
//! This library builds every server component from source, packages the
//! server release, and takes the release through its interactive setup and
//! first start without a human at the keyboard.
//!
//! ## Features
//!
//! - **Prompt Scripts:** Ordered prompt/answer pairs replayed against any
//!   prompt-driven program, loadable from TOML
//! - **PTY Support:** Programs run on a pseudoterminal via `portable-pty`, so
//!   installers that insist on a terminal behave as they would for a person
//! - **Strict Failure:** A missing prompt times out, an early exit is
//!   reported with the output seen so far, a failed command stops the run
//! - **Build Pipeline:** Clone, configure, package and stage each component
//! - **Configuration:** TOML-based configuration files
//!
//! ## Module Organization
//!
//! ### Interactive Automation
//!
//! - [`expect`] - Prompt matchers, scripts, sessions and the orchestrator
//! - [`pty`] - PTY process spawning, I/O streams, signals
//!
//! ### Build and Install
//!
//! - [`pipeline`] - Component projects, archive staging, server build
//! - [`install`] - Release extraction, setup and first start
//! - [`execution`] - Non-interactive command execution
//! - [`env`] - Build environment derivation
//!
//! ### Support
//!
//! - [`config`] - Configuration loading and validation
//! - [`models`] - Data structures (ArtifactDescriptor, PtyProcess)
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use release_verify::expect::{Orchestrator, PromptScript};
//! use release_verify::pty::SpawnConfig;
//!
//! # async fn demo() -> release_verify::Result<()> {
//! let script = PromptScript::new("setup")
//!     .expect("server name", "my-seafile")
//!     .expect("ip or domain", "127.0.0.1");
//!
//! let orchestrator = Orchestrator::default();
//! let (mut session, _) = orchestrator
//!     .drive(&SpawnConfig::new("./setup.sh"), &script)
//!     .await?;
//! session.wait().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Everything runs on one tokio task. Each PTY child gets two helper
//! threads that move bytes between the blocking PTY and async channels.
//! Waiting for the next prompt is the only suspension point.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod env;
pub mod error;

// Core modules
pub mod execution;
pub mod expect;
pub mod pty;

// Build and install
pub mod install;
pub mod pipeline;

// Model modules
pub mod models;

// Re-exports for core functionality
pub use config::Config;
pub use error::{Error, Result};

// Convenience re-exports for common types
pub use config::loader::ConfigLoader;
pub use execution::{ShellCommand, ShellRunner};
pub use expect::{Orchestrator, PromptScript, Session, SessionState};
pub use install::Installer;
pub use models::ArtifactDescriptor;
pub use pipeline::{ArtifactPipeline, BuildReport};

// Version information
/// The current version of release-verify from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load configuration from the default locations
///
/// Falls back to defaults when no configuration file exists.
///
/// # Errors
///
/// Returns an error if a configuration file exists but cannot be parsed, or
/// if the resulting configuration fails validation.
pub fn init() -> Result<Config> {
    info!("Initializing {} v{}", NAME, VERSION);
    ConfigLoader::load()
}

/// Load configuration from an explicit file
pub fn init_with_config(config_path: &std::path::Path) -> Result<Config> {
    info!(
        "Initializing {} v{} with config: {}",
        NAME,
        VERSION,
        config_path.display()
    );

    if !config_path.exists() {
        return Err(Error::ConfigLoadFailed {
            path: config_path.to_path_buf(),
            reason: "Configuration file does not exist".to_string(),
        });
    }

    let config = ConfigLoader::load_from_path(config_path)?.expand_paths();
    config::loader::validate_config(&config)?;
    Ok(config)
}
