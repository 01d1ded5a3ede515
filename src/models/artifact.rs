//! Build artifact model

use std::fmt;
use std::path::{Path, PathBuf};

/// A packaged source archive staged for the release build
///
/// Created once a project's package step completes and never mutated
/// afterwards. Dependent build steps receive it by reference to learn the
/// companion version they must be built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    project: String,
    version: String,
    path: PathBuf,
}

impl ArtifactDescriptor {
    pub fn new(project: impl Into<String>, version: impl Into<String>, path: PathBuf) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            path,
        }
    }

    /// Project the archive was built from
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Version recovered from the archive name
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Location of the staged archive
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ArtifactDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.project, self.version, self.path.display())
    }
}
