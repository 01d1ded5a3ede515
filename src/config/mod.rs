//! Configuration management for release-verify
//!
//! Directory layout of the verification run, the source-control remote,
//! the fixed admin credentials used to answer the service's setup prompts,
//! and the timing knobs of the interactive orchestrator.

pub mod loader;

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source, staging and install directories
    pub paths: PathsConfig,

    /// Source-control remote the projects are cloned from
    pub remote: RemoteConfig,

    /// Credentials used to answer the admin account prompts
    pub admin: AdminConfig,

    /// Interactive session tuning
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Resolve `~` in every configured path
    pub fn expand_paths(mut self) -> Self {
        self.paths.topdir = expand_tilde(&self.paths.topdir);
        self.paths.prefix = expand_tilde(&self.paths.prefix);
        self.paths.srcdir = expand_tilde(&self.paths.srcdir);
        self.paths.installdir = expand_tilde(&self.paths.installdir);
        self.paths.thirdpartdir = expand_tilde(&self.paths.thirdpartdir);
        self
    }
}

/// Directory layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding every project checkout
    pub topdir: PathBuf,

    /// Install prefix of locally built dependencies
    pub prefix: PathBuf,

    /// Staging directory receiving the source archives
    pub srcdir: PathBuf,

    /// Directory the server release is unpacked into
    pub installdir: PathBuf,

    /// Third-party python packages bundled into the release
    pub thirdpartdir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        // Checkouts live next to the directory the tool is started from
        let topdir = std::env::current_dir()
            .ok()
            .and_then(|cwd| cwd.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from(".."));

        Self {
            topdir,
            prefix: PathBuf::from("~/opt/local"),
            srcdir: PathBuf::from("/tmp/src"),
            installdir: PathBuf::from("/tmp/haiwen"),
            thirdpartdir: PathBuf::from("~/thirdpart"),
        }
    }
}

/// Source-control remote
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub host: String,
    pub org: String,
}

impl RemoteConfig {
    /// Clone URL of a project, `https://<host>/<org>/<name>.git`
    pub fn clone_url(&self, project: &str) -> String {
        format!("https://{}/{}/{}.git", self.host, self.org, project)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "www.github.com".to_string(),
            org: "haiwen".to_string(),
        }
    }
}

/// Admin account answered to the service's first-start prompts
///
/// The password is wiped from memory when the configuration is dropped and
/// never appears in `Debug` output.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

fn default_admin_username() -> String {
    "admin@seafiletest.com".to_string()
}

fn default_admin_password() -> String {
    "adminadmin".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
        }
    }
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Interactive orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Default bound on waiting for each prompt
    pub prompt_timeout_secs: u64,

    /// Mirror the child's terminal output to stdout
    pub echo_output: bool,

    /// Tail of buffered output kept in error diagnostics
    pub max_diagnostic_bytes: usize,

    /// Grace period between SIGTERM and SIGKILL when a child is stopped
    pub kill_grace_ms: u64,

    /// Terminal dimensions (cols, rows)
    pub dimensions: (u16, u16),
}

impl OrchestratorConfig {
    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_secs: 30,
            echo_output: true,
            max_diagnostic_bytes: 4096,
            kill_grace_ms: 2000,
            dimensions: (80, 24),
        }
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
