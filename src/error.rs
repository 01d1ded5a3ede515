//! Error types and Result aliases for release-verify

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::ExitStatus;

/// Result type alias for release-verify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for release-verify
///
/// Every variant is fatal to the current run. Interactive failures carry the
/// output captured since the last successful match so a broken prompt
/// sequence can be diagnosed from the error alone.
#[derive(Debug)]
pub enum Error {
    // === Shell errors ===
    /// A non-interactive command exited non-zero (`None` when killed by a signal)
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
    },

    /// Failed to start a non-interactive command
    CommandSpawnFailed {
        command: String,
        reason: String,
    },

    /// Command line was empty
    EmptyCommand,

    // === Artifact errors ===
    /// Packaging produced other than exactly one archive
    AmbiguousArtifact {
        project: String,
        count: usize,
    },

    /// Archive name does not follow `{name}-{version}.tar.gz`
    VersionExtractionFailed {
        filename: String,
    },

    /// Release tarball could not be unpacked
    ReleaseExtractionFailed {
        archive: PathBuf,
        reason: String,
    },

    // === Interactive session errors ===
    /// Expected prompt never appeared within the step bound
    PromptTimeout {
        matcher: String,
        timeout: Duration,
        partial_output: String,
    },

    /// Child closed its terminal before the script completed
    UnexpectedExit {
        matcher: String,
        exit_status: Option<ExitStatus>,
        partial_output: String,
    },

    /// Program answered every prompt, then exited non-zero
    ProgramFailed {
        command: String,
        exit_status: ExitStatus,
        partial_output: String,
    },

    /// Operation not valid in the session's current state
    InvalidSessionState {
        operation: String,
        state: String,
    },

    /// Run was aborted by the operator
    Aborted {
        reason: String,
    },

    // === PTY errors ===
    /// Failed to create PTY
    PtyCreationFailed {
        command: String,
        reason: String,
    },

    /// Failed to spawn program in PTY
    PtySpawnFailed {
        command: String,
        reason: String,
    },

    /// Failed to clone PTY reader
    PtyReaderCloneFailed {
        reason: String,
    },

    /// Failed to take PTY writer
    PtyWriterTakeFailed {
        reason: String,
    },

    /// Failed to send input to PTY
    PtyInputSendFailed {
        reason: String,
    },

    /// Failed to send signal to process
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    /// Signal handling not supported on platform
    SignalNotSupported {
        signal: String,
        platform: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Prompt script file could not be parsed
    ScriptParseFailed {
        source: String,
        reason: String,
    },

    // === I/O and parsing errors ===
    /// I/O errors
    Io(std::io::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    /// Generic errors (use sparingly)
    Other(String),
}

impl Error {
    /// Output captured at the point of an interactive failure, if any
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Error::PromptTimeout { partial_output, .. }
            | Error::UnexpectedExit { partial_output, .. }
            | Error::ProgramFailed { partial_output, .. } => Some(partial_output),
            _ => None,
        }
    }

    /// Whether this error came out of an interactive session
    pub fn is_interactive_failure(&self) -> bool {
        matches!(
            self,
            Error::PromptTimeout { .. }
                | Error::UnexpectedExit { .. }
                | Error::ProgramFailed { .. }
                | Error::Aborted { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Shell errors
            Error::CommandFailed { command, exit_code } => match exit_code {
                Some(code) => write!(f, "Command '{}' failed with exit code {}", command, code),
                None => write!(f, "Command '{}' was terminated by a signal", command),
            },
            Error::CommandSpawnFailed { command, reason } => {
                write!(f, "Failed to start command '{}': {}", command, reason)
            }
            Error::EmptyCommand => write!(f, "Command cannot be empty"),

            // Artifact errors
            Error::AmbiguousArtifact { project, count } => write!(
                f,
                "Expected exactly one archive for '{}', found {}",
                project, count
            ),
            Error::VersionExtractionFailed { filename } => {
                write!(f, "Cannot extract version from archive name '{}'", filename)
            }
            Error::ReleaseExtractionFailed { archive, reason } => {
                write!(f, "Failed to unpack '{}': {}", archive.display(), reason)
            }

            // Interactive session errors
            Error::PromptTimeout {
                matcher,
                timeout,
                partial_output,
            } => write!(
                f,
                "Timed out after {:?} waiting for prompt {}; output so far: {:?}",
                timeout, matcher, partial_output
            ),
            Error::UnexpectedExit {
                matcher,
                exit_status,
                partial_output,
            } => {
                let status = exit_status
                    .as_ref()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown status".to_string());
                write!(
                    f,
                    "Program exited ({}) while waiting for prompt {}; output so far: {:?}",
                    status, matcher, partial_output
                )
            }
            Error::ProgramFailed {
                command,
                exit_status,
                partial_output,
            } => write!(
                f,
                "'{}' exited with {} after its last prompt; output since: {:?}",
                command, exit_status, partial_output
            ),
            Error::InvalidSessionState { operation, state } => {
                write!(f, "Cannot {} while session is {}", operation, state)
            }
            Error::Aborted { reason } => write!(f, "Run aborted: {}", reason),

            // PTY errors
            Error::PtyCreationFailed { command, reason } => {
                write!(f, "Failed to create PTY for command '{}': {}", command, reason)
            }
            Error::PtySpawnFailed { command, reason } => {
                write!(f, "Failed to spawn '{}' in PTY: {}", command, reason)
            }
            Error::PtyReaderCloneFailed { reason } => {
                write!(f, "Failed to clone PTY reader: {}", reason)
            }
            Error::PtyWriterTakeFailed { reason } => {
                write!(f, "Failed to take PTY writer: {}", reason)
            }
            Error::PtyInputSendFailed { reason } => {
                write!(f, "Failed to send input to PTY: {}", reason)
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }
            Error::SignalNotSupported { signal, platform } => {
                write!(f, "Signal '{}' not supported on {}", signal, platform)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => write!(f, "Configuration file not found"),
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ScriptParseFailed { source, reason } => {
                write!(f, "Failed to parse prompt script '{}': {}", source, reason)
            }

            // I/O and parsing errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
