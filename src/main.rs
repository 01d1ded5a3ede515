//! release-verify - build, install and start a Seafile server unattended
//!
//! Runs the whole verification cycle by default, or any single stage of it.
//! Ctrl-C stops the active stage and kills whatever child it was driving.

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use release_verify::expect::{Orchestrator, PromptScript};
use release_verify::pty::SpawnConfig;
use release_verify::{ArtifactPipeline, Config, Error, Installer, ShellRunner};

/// Build a Seafile server release and drive its installer end to end
#[derive(Parser)]
#[command(name = "release-verify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RELEASE_VERIFY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "RELEASE_VERIFY_DEBUG", global = true)]
    debug: bool,

    /// Log commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, set up and start the server (default)
    Run,

    /// Build every component and the server release
    Build,

    /// Unpack a built release and run its setup script
    Setup {
        /// Server version to install
        #[arg(long)]
        version: String,
    },

    /// Start an installed server and create the admin account
    Start {
        /// Server version to start
        #[arg(long)]
        version: String,
    },

    /// Drive any program with a prompt script
    Drive {
        /// TOML prompt script
        #[arg(short, long)]
        script: PathBuf,

        /// Program to run
        program: String,

        /// Arguments for the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    let log_level = if cli.debug { "debug" } else { "info" };
    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    debug!("Debug mode enabled");

    let config = load_configuration(cli.config.as_deref())?;
    let runner = ShellRunner::new()
        .with_working_dir(config.paths.topdir.clone())
        .with_dry_run(cli.dry_run);
    let command = cli.command.unwrap_or(Commands::Run);

    tokio::select! {
        result = execute(command, &config, runner) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping");
            Err(Error::Aborted {
                reason: "interrupted by operator".to_string(),
            }
            .into())
        }
    }
}

fn load_configuration(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => release_verify::init_with_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => release_verify::init().context("loading configuration")?,
    };
    debug!("configuration: {:?}", config);
    Ok(config)
}

async fn execute(command: Commands, config: &Config, runner: ShellRunner) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            let pipeline = ArtifactPipeline::new(config, runner.clone());
            let report = pipeline.fetch_and_build().await.context("building release")?;
            info!("{}", report);

            let installer = Installer::new(config, runner);
            let version = report.seafile_version();
            installer
                .setup_server(version)
                .await
                .context("setting up server")?;
            start(&installer, version).await
        }
        Commands::Build => {
            let pipeline = ArtifactPipeline::new(config, runner);
            let report = pipeline.fetch_and_build().await.context("building release")?;
            info!("{}", report);
            Ok(())
        }
        Commands::Setup { version } => Installer::new(config, runner)
            .setup_server(&version)
            .await
            .context("setting up server"),
        Commands::Start { version } => start(&Installer::new(config, runner), &version).await,
        Commands::Drive {
            script,
            program,
            args,
        } => drive(config, &script, program, args).await,
    }
}

async fn start(installer: &Installer, version: &str) -> anyhow::Result<()> {
    let Some(mut seahub) = installer
        .start_server(version)
        .await
        .context("starting server")?
    else {
        return Ok(());
    };

    // seahub.sh returns once the daemon is up
    seahub
        .wait_success()
        .await
        .context("waiting for seahub.sh start")?;
    info!("server {} is running", version);
    Ok(())
}

async fn drive(
    config: &Config,
    script_path: &std::path::Path,
    program: String,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let script = PromptScript::from_file(script_path)
        .with_context(|| format!("reading prompt script {}", script_path.display()))?;

    let orchestrator = Orchestrator::new(config.orchestrator.clone());
    let spawn = SpawnConfig::new(program.clone()).args(args);
    let (mut session, outcome) = orchestrator
        .drive(&spawn, &script)
        .await
        .with_context(|| format!("driving {}", program))?;
    info!("{} answered {} prompts", program, outcome.responses.len());

    session
        .wait_success()
        .await
        .with_context(|| format!("waiting for {}", program))?;
    Ok(())
}
