//! Release installation
//!
//! Unpacks the server release built by the pipeline and takes it through
//! first-time setup and first start, answering the product's interactive
//! scripts with fixed responses.

use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::{AdminConfig, Config, PathsConfig};
use crate::error::{Error, Result};
use crate::execution::ShellRunner;
use crate::expect::{Orchestrator, PromptScript, Session};
use crate::pty::{PtyChannel, SpawnConfig};

/// File name of the server release for `version`
pub fn release_archive_name(version: &str) -> String {
    format!("seafile-server_{}_x86-64.tar.gz", version)
}

/// Answers for `setup-seafile.sh`
pub fn installer_script() -> PromptScript {
    PromptScript::new("setup-seafile.sh")
        .expect("[ENTER]", "")
        .expect("server name", "my-seafile")
        .expect("ip or domain", "127.0.0.1")
        .expect("seafile-data", "")
        .expect("seafile fileserver", "")
        .expect("[ENTER]", "")
        .expect("[ENTER]", "")
}

/// Answers for the first `seahub.sh start`, which creates the admin account
pub fn service_start_script(admin: &AdminConfig) -> PromptScript {
    PromptScript::new("seahub.sh start")
        .expect("admin email", admin.username.as_str())
        .expect_secret("admin password", admin.password.as_str())
        .expect_secret("admin password again", admin.password.as_str())
}

/// Installs and starts a built server release
pub struct Installer {
    paths: PathsConfig,
    admin: AdminConfig,
    runner: ShellRunner,
    orchestrator: Orchestrator,
}

impl Installer {
    pub fn new(config: &Config, runner: ShellRunner) -> Self {
        Self {
            paths: config.paths.clone(),
            admin: config.admin.clone(),
            runner,
            orchestrator: Orchestrator::new(config.orchestrator.clone()),
        }
    }

    /// Release tarball produced by the server build
    pub fn release_archive(&self, version: &str) -> PathBuf {
        self.paths.topdir.join(release_archive_name(version))
    }

    /// Path of a script shipped in the unpacked release
    pub fn script_path(&self, version: &str, name: &str) -> PathBuf {
        self.paths
            .installdir
            .join(format!("seafile-server-{}", version))
            .join(name)
    }

    /// Unpack the release tarball into the install directory
    pub async fn extract_release(&self, version: &str) -> Result<()> {
        let archive = self.release_archive(version);
        let dest = self.paths.installdir.clone();
        info!("uncompressing {} into {}", archive.display(), dest.display());
        if self.runner.is_dry_run() {
            return Ok(());
        }

        let source = archive.clone();
        tokio::task::spawn_blocking(move || unpack(&source, &dest))
            .await
            .map_err(|e| Error::ReleaseExtractionFailed {
                archive: archive.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| Error::ReleaseExtractionFailed {
                archive,
                reason: e.to_string(),
            })
    }

    /// Unpack the release and run its setup script to completion
    pub async fn setup_server(&self, version: &str) -> Result<()> {
        self.extract_release(version).await?;

        let setup = self.script_path(version, "setup-seafile.sh");
        info!("setting up seafile server with {}", setup.display());
        if self.runner.is_dry_run() {
            return Ok(());
        }

        let spawn = SpawnConfig::new(setup.display().to_string())
            .working_directory(self.paths.topdir.clone());
        let (mut session, _) = self.orchestrator.drive(&spawn, &installer_script()).await?;
        session.wait_success().await?;

        self.runner.run("ls -lht", Some(&self.paths.installdir), None).await
    }

    /// Start the file server and seahub, creating the admin account
    ///
    /// Returns the completed session still owning the `seahub.sh` child, or
    /// `None` on a dry run. [`Session::wait_success`] follows it to the end
    /// and reports what it printed after the last prompt.
    pub async fn start_server(&self, version: &str) -> Result<Option<Session<PtyChannel>>> {
        let seafile_sh = self.script_path(version, "seafile.sh");
        self.runner
            .run(format!("{} start", seafile_sh.display()), None, None)
            .await?;

        info!("starting seahub");
        let seahub_sh = self.script_path(version, "seahub.sh");
        if self.runner.is_dry_run() {
            info!("would drive {} start", seahub_sh.display());
            return Ok(None);
        }

        let spawn = SpawnConfig::new(seahub_sh.display().to_string())
            .arg("start")
            .working_directory(self.paths.topdir.clone());
        let script = service_start_script(&self.admin);
        let (session, outcome) = self.orchestrator.drive(&spawn, &script).await?;
        if !outcome.child_running() {
            debug!("seahub.sh already exited after its last prompt");
        }
        Ok(Some(session))
    }
}

fn unpack(archive: &Path, dest: &Path) -> std::io::Result<()> {
    let file = File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.unpack(dest)
}
