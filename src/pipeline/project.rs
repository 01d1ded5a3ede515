//! Source projects and their build recipes

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::execution::{ShellCommand, ShellRunner};
use crate::models::ArtifactDescriptor;

/// Build recipe of a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKind {
    /// autotools project packaged with `make dist`
    Generic,
    /// The server core; its checkout is the one under test
    Seafile,
    /// Web frontend, versioned after the server core it ships with
    Seahub { seafile: ArtifactDescriptor },
    /// WebDAV extension, packaged with plain `make`
    SeafDav,
    /// Object storage backends, packaged with `make dist`
    SeafObj,
}

/// A checkout under the top directory that yields one source archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    kind: ProjectKind,
    dir: PathBuf,
}

impl Project {
    pub fn new(name: impl Into<String>, kind: ProjectKind, topdir: &Path) -> Self {
        let name = name.into();
        let dir = topdir.join(&name);
        Self { name, kind, dir }
    }

    pub fn generic(name: impl Into<String>, topdir: &Path) -> Self {
        Self::new(name, ProjectKind::Generic, topdir)
    }

    pub fn seafile(topdir: &Path) -> Self {
        Self::new("seafile", ProjectKind::Seafile, topdir)
    }

    pub fn seahub(topdir: &Path, seafile: ArtifactDescriptor) -> Self {
        Self::new("seahub", ProjectKind::Seahub { seafile }, topdir)
    }

    pub fn seafdav(topdir: &Path) -> Self {
        Self::new("seafdav", ProjectKind::SeafDav, topdir)
    }

    pub fn seafobj(topdir: &Path) -> Self {
        Self::new("seafobj", ProjectKind::SeafObj, topdir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ProjectKind {
        &self.kind
    }

    /// Checkout directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a fresh clone is required before building
    ///
    /// The server core is the checkout being verified and is never cloned;
    /// other projects are cloned once.
    pub fn needs_clone(&self) -> bool {
        self.kind != ProjectKind::Seafile && !self.dir.exists()
    }

    /// `./configure` invocation, for projects that run one
    pub fn configure_command(&self) -> Option<&'static str> {
        match self.kind {
            ProjectKind::Generic => Some("./configure"),
            ProjectKind::Seafile => Some("./configure --disable-fuse --enable-client --enable-server"),
            _ => None,
        }
    }

    fn package_command(&self) -> ShellCommand {
        match &self.kind {
            ProjectKind::Generic | ProjectKind::Seafile | ProjectKind::SeafObj => {
                ShellCommand::shell("make dist")
            }
            ProjectKind::Seahub { seafile } => ShellCommand::shell(format!(
                "./tools/gen-tarball.py --version={} --branch=HEAD >/dev/null",
                seafile.version()
            )),
            ProjectKind::SeafDav => ShellCommand::shell("make"),
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Steps that turn a checkout into a source archive
#[async_trait]
pub trait BuildSteps: Send + Sync {
    /// Generate and configure the build tree
    async fn prepare(&self, runner: &ShellRunner, env: &HashMap<String, String>) -> Result<()>;

    /// Produce the source archive in the checkout
    async fn package(&self, runner: &ShellRunner, env: &HashMap<String, String>) -> Result<()>;
}

#[async_trait]
impl BuildSteps for Project {
    async fn prepare(&self, runner: &ShellRunner, env: &HashMap<String, String>) -> Result<()> {
        let Some(configure) = self.configure_command() else {
            return Ok(());
        };
        if !self.dir.join("autogen.sh").exists() {
            debug!("{} has no autogen.sh, skipping configure", self.name);
            return Ok(());
        }

        runner.run("./autogen.sh", Some(&self.dir), None).await?;
        runner.run(configure, Some(&self.dir), Some(env)).await
    }

    async fn package(&self, runner: &ShellRunner, env: &HashMap<String, String>) -> Result<()> {
        info!("making tarball for {}", self.name);
        let env = match self.kind {
            ProjectKind::Seahub { .. } => Some(env),
            _ => None,
        };
        runner.run(self.package_command(), Some(&self.dir), env).await
    }
}
