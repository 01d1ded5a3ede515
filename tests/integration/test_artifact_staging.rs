//! Integration Tests for Packaging and Staging Source Archives

#![cfg(unix)]

use release_verify::config::Config;
use release_verify::error::Error;
use release_verify::execution::ShellRunner;
use release_verify::models::ArtifactDescriptor;
use release_verify::pipeline::{stage_archive, ArtifactPipeline, BuildSteps, Project};
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    _root: TempDir,
    topdir: PathBuf,
    srcdir: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let topdir = root.path().join("top");
        let srcdir = root.path().join("src");
        std::fs::create_dir_all(&topdir).unwrap();
        std::fs::create_dir_all(&srcdir).unwrap();
        Self {
            _root: root,
            topdir,
            srcdir,
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.paths.topdir = self.topdir.clone();
        config.paths.srcdir = self.srcdir.clone();
        config.paths.installdir = self.topdir.join("install");
        config
    }

    fn checkout(&self, name: &str) -> PathBuf {
        let dir = self.topdir.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}

fn write_executable(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[tokio::test]
async fn test_stage_archive_copies_and_versions() {
    let ws = Workspace::new();
    let dir = ws.checkout("ccnet");
    std::fs::write(dir.join("ccnet-7.1.5.tar.gz"), b"archive").unwrap();

    let artifact = stage_archive("ccnet", &dir, &ws.srcdir).await.unwrap();
    assert_eq!(artifact.project(), "ccnet");
    assert_eq!(artifact.version(), "7.1.5");
    assert_eq!(artifact.path(), ws.srcdir.join("ccnet-7.1.5.tar.gz"));
    assert_eq!(std::fs::read(artifact.path()).unwrap(), b"archive");
}

#[tokio::test]
async fn test_stage_archive_rejects_ambiguous_output() {
    let ws = Workspace::new();
    let dir = ws.checkout("libsearpc");

    let err = stage_archive("libsearpc", &dir, &ws.srcdir).await.unwrap_err();
    assert!(matches!(err, Error::AmbiguousArtifact { count: 0, .. }));

    std::fs::write(dir.join("libsearpc-3.2.tar.gz"), b"a").unwrap();
    std::fs::write(dir.join("libsearpc-3.3.tar.gz"), b"b").unwrap();
    let err = stage_archive("libsearpc", &dir, &ws.srcdir).await.unwrap_err();
    match err {
        Error::AmbiguousArtifact { project, count } => {
            assert_eq!(project, "libsearpc");
            assert_eq!(count, 2);
        }
        other => panic!("expected AmbiguousArtifact, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stage_archive_without_version() {
    let ws = Workspace::new();
    let dir = ws.checkout("seafobj");
    std::fs::write(dir.join("seafobj.tar.gz"), b"a").unwrap();

    let err = stage_archive("seafobj", &dir, &ws.srcdir).await.unwrap_err();
    match err {
        Error::VersionExtractionFailed { filename } => assert_eq!(filename, "seafobj.tar.gz"),
        other => panic!("expected VersionExtractionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_prepare_runs_autogen_then_configure_with_build_env() {
    let ws = Workspace::new();
    let dir = ws.checkout("seafile");
    write_executable(&dir.join("autogen.sh"), "#!/bin/sh\ntouch autogen.done\n");
    write_executable(
        &dir.join("configure"),
        "#!/bin/sh\necho \"$CPPFLAGS|$*\" > configure.log\n",
    );

    let mut env = process_env();
    env.insert("CPPFLAGS".to_string(), "-I/opt/local/include".to_string());

    let project = Project::seafile(&ws.topdir);
    project.prepare(&ShellRunner::new(), &env).await.unwrap();

    assert!(dir.join("autogen.done").exists());
    let log = std::fs::read_to_string(dir.join("configure.log")).unwrap();
    assert_eq!(
        log.trim(),
        "-I/opt/local/include|--disable-fuse --enable-client --enable-server"
    );
}

#[tokio::test]
async fn test_seahub_build_uses_seafile_version() {
    let ws = Workspace::new();
    let dir = ws.checkout("seahub");
    write_executable(
        &dir.join("tools").join("gen-tarball.py"),
        "#!/bin/sh\nversion=${1#--version=}\ntouch \"seahub-$version.tar.gz\"\n",
    );

    let seafile = ArtifactDescriptor::new(
        "seafile",
        "7.1.5",
        ws.srcdir.join("seafile-7.1.5.tar.gz"),
    );
    let pipeline = ArtifactPipeline::with_build_env(&ws.config(), ShellRunner::new(), process_env());

    let seahub = pipeline
        .build_project(&Project::seahub(&ws.topdir, seafile))
        .await
        .unwrap();
    assert_eq!(seahub.version(), "7.1.5");
    assert!(ws.srcdir.join("seahub-7.1.5.tar.gz").is_file());
}

#[tokio::test]
async fn test_failed_package_step_stops_build() {
    let ws = Workspace::new();
    let dir = ws.checkout("seahub");
    write_executable(&dir.join("tools").join("gen-tarball.py"), "#!/bin/sh\nexit 2\n");

    let seafile = ArtifactDescriptor::new("seafile", "7.1.5", ws.srcdir.join("x"));
    let pipeline = ArtifactPipeline::with_build_env(&ws.config(), ShellRunner::new(), process_env());

    let err = pipeline
        .build_project(&Project::seahub(&ws.topdir, seafile))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandFailed { exit_code: Some(2), .. }));
}
