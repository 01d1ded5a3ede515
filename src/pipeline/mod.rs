//! Artifact Pipeline
//!
//! Clones, configures and packages each server component, stages the
//! resulting source archives, and builds the server release tarball from
//! them. Every step is a non-interactive command; the first failure ends
//! the run.

pub mod archive;
pub mod project;

pub use archive::{find_single_archive, parse_version, stage_archive};
pub use project::{BuildSteps, Project, ProjectKind};

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::{Config, PathsConfig, RemoteConfig};
use crate::env::make_build_env;
use crate::error::Result;
use crate::execution::{ShellCommand, ShellRunner};
use crate::models::ArtifactDescriptor;

/// Version reported for archives that a dry run never produced
const DRY_RUN_VERSION: &str = "dry-run";

/// Archives produced by a full pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub libsearpc: ArtifactDescriptor,
    pub ccnet: ArtifactDescriptor,
    pub seafile: ArtifactDescriptor,
    pub seahub: ArtifactDescriptor,
    pub seafdav: ArtifactDescriptor,
    pub seafobj: ArtifactDescriptor,
}

impl BuildReport {
    /// Version of the server release that was built
    pub fn seafile_version(&self) -> &str {
        self.seafile.version()
    }

    pub fn artifacts(&self) -> [&ArtifactDescriptor; 6] {
        [
            &self.libsearpc,
            &self.ccnet,
            &self.seafile,
            &self.seahub,
            &self.seafdav,
            &self.seafobj,
        ]
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "server release {}", self.seafile_version())?;
        for artifact in self.artifacts() {
            writeln!(f, "  {}", artifact)?;
        }
        Ok(())
    }
}

/// Builds the release from source checkouts under the top directory
pub struct ArtifactPipeline {
    paths: PathsConfig,
    remote: RemoteConfig,
    runner: ShellRunner,
    build_env: HashMap<String, String>,
}

impl ArtifactPipeline {
    pub fn new(config: &Config, runner: ShellRunner) -> Self {
        Self::with_build_env(config, runner, make_build_env(&config.paths))
    }

    /// Pipeline using `build_env` for configure and packaging steps
    pub fn with_build_env(
        config: &Config,
        runner: ShellRunner,
        build_env: HashMap<String, String>,
    ) -> Self {
        Self {
            paths: config.paths.clone(),
            remote: config.remote.clone(),
            runner,
            build_env,
        }
    }

    pub fn build_env(&self) -> &HashMap<String, String> {
        &self.build_env
    }

    /// Create the staging and install directories
    pub fn prepare_dirs(&self) -> Result<()> {
        for dir in [&self.paths.srcdir, &self.paths.installdir] {
            if !dir.exists() {
                debug!("creating {}", dir.display());
                std::fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Shallow-clone `project` into the top directory unless already present
    pub async fn clone_project(&self, project: &Project) -> Result<()> {
        if !project.needs_clone() {
            debug!("using existing checkout {}", project.dir().display());
            return Ok(());
        }
        let command = format!("git clone --depth=1 {}", self.remote.clone_url(project.name()));
        self.runner.run(command, Some(&self.paths.topdir), None).await
    }

    /// Check out `branch` in `project`'s checkout
    pub async fn use_branch(&self, project: &Project, branch: &str) -> Result<()> {
        let command = format!("git checkout {}", branch);
        self.runner.run(command, Some(project.dir()), None).await
    }

    /// Clone, prepare, package and stage one project
    pub async fn build_project(&self, project: &Project) -> Result<ArtifactDescriptor> {
        self.clone_project(project).await?;
        project.prepare(&self.runner, &self.build_env).await?;
        project.package(&self.runner, &self.build_env).await?;

        if self.runner.is_dry_run() {
            let path = self
                .paths
                .srcdir
                .join(format!("{}-{}.tar.gz", project.name(), DRY_RUN_VERSION));
            return Ok(ArtifactDescriptor::new(project.name(), DRY_RUN_VERSION, path));
        }
        stage_archive(project.name(), project.dir(), &self.paths.srcdir).await
    }

    /// Build the server release tarball from the staged archives
    pub async fn build_server(
        &self,
        libsearpc: &ArtifactDescriptor,
        ccnet: &ArtifactDescriptor,
        seafile: &ArtifactDescriptor,
    ) -> Result<()> {
        let script: PathBuf = self
            .paths
            .topdir
            .join("seafile")
            .join("scripts")
            .join("build")
            .join("build-server.py");

        let command = ShellCommand::exec([
            "python".to_string(),
            script.display().to_string(),
            "--yes".to_string(),
            format!("--version={}", seafile.version()),
            format!("--libsearpc_version={}", libsearpc.version()),
            format!("--ccnet_version={}", ccnet.version()),
            format!("--seafile_version={}", seafile.version()),
            format!("--thirdpartdir={}", self.paths.thirdpartdir.display()),
            format!("--srcdir={}", self.paths.srcdir.display()),
        ]);
        self.runner
            .run(command, Some(&self.paths.topdir), Some(&self.build_env))
            .await
    }

    /// Build every component and then the server release
    pub async fn fetch_and_build(&self) -> Result<BuildReport> {
        self.prepare_dirs()?;
        let topdir = self.paths.topdir.as_path();

        let libsearpc = self.build_project(&Project::generic("libsearpc", topdir)).await?;
        let ccnet = self.build_project(&Project::generic("ccnet", topdir)).await?;
        let seafile = self.build_project(&Project::seafile(topdir)).await?;
        let seahub = self
            .build_project(&Project::seahub(topdir, seafile.clone()))
            .await?;
        let seafdav = self.build_project(&Project::seafdav(topdir)).await?;
        let seafobj = self.build_project(&Project::seafobj(topdir)).await?;

        self.build_server(&libsearpc, &ccnet, &seafile).await?;

        let report = BuildReport {
            libsearpc,
            ccnet,
            seafile,
            seahub,
            seafdav,
            seafobj,
        };
        info!("built {}", report.seafile_version());
        Ok(report)
    }
}
