//! Source archive discovery and staging
//!
//! Packaging leaves a `{name}-{version}.tar.gz` in the project checkout. It
//! is copied into the staging directory the server build reads from, and
//! its version becomes part of the artifact descriptor.

use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::ArtifactDescriptor;

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// The one `*.tar.gz` in `dir`
///
/// # Errors
/// `AmbiguousArtifact` when packaging left zero or several archives.
pub fn find_single_archive(dir: &Path, project: &str) -> Result<PathBuf> {
    let mut archives: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(ARCHIVE_SUFFIX))
        })
        .collect();

    if archives.len() != 1 {
        return Err(Error::AmbiguousArtifact {
            project: project.to_string(),
            count: archives.len(),
        });
    }
    Ok(archives.remove(0))
}

/// Version embedded in `{project}-{version}.tar.gz`
pub fn parse_version(project: &str, filename: &str) -> Result<String> {
    let pattern = format!(r"^{}-(.+)\.tar\.gz$", regex::escape(project));
    let re = Regex::new(&pattern)?;
    re.captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|version| version.as_str().to_string())
        .ok_or_else(|| Error::VersionExtractionFailed {
            filename: filename.to_string(),
        })
}

/// Copy `project`'s archive from `project_dir` into `staging_dir`
pub async fn stage_archive(
    project: &str,
    project_dir: &Path,
    staging_dir: &Path,
) -> Result<ArtifactDescriptor> {
    let archive = find_single_archive(project_dir, project)?;
    let filename = archive
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::VersionExtractionFailed {
            filename: archive.display().to_string(),
        })?;

    let staged = staging_dir.join(&filename);
    info!("copying {} to {}", filename, staging_dir.display());
    tokio::fs::copy(&archive, &staged).await?;

    let version = parse_version(project, &filename)?;
    debug!("{} packaged as version {}", project, version);
    Ok(ArtifactDescriptor::new(project, version, staged))
}
