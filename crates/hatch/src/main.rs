//! Command-line entry point: resolves settings, sets up logging and the
//! single-instance guard, then drives one update-and-launch pass.

mod cli;
mod logging;
mod settings;
mod single_instance;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use hatch_core::bundle::DirectoryBundle;
use hatch_core::{FlowOutcome, ProcessSupervisor, Settled, UpdateOrchestrator};
use hatch_platform::{AppPaths, host_os_name};

use crate::cli::Cli;
use crate::settings::LauncherSettings;
use crate::single_instance::{AcquireError, SingleInstance};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("hatch: {error}");
            return ExitCode::FAILURE;
        }
    };

    let settings_path = cli.settings.clone().unwrap_or_else(|| paths.settings_file());
    let mut settings = LauncherSettings::load_from(&settings_path);
    cli.apply(&mut settings);

    logging::init_logging(
        &paths.log_file(),
        settings.debug_logging,
        settings.max_log_size_bytes,
    );
    info!("hatch {} starting", env!("CARGO_PKG_VERSION"));

    let _instance = match SingleInstance::acquire(&paths.lock_file()) {
        Ok(instance) => instance,
        Err(AcquireError::AlreadyRunning) => {
            warn!("Another launcher instance is already running");
            return ExitCode::FAILURE;
        }
        Err(error) => {
            error!("Failed to acquire single-instance lock: {error}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            error!("Failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    let os_name = cli.os.clone().unwrap_or_else(|| host_os_name().to_string());
    let run_dir = settings
        .run_dir
        .clone()
        .unwrap_or_else(|| paths.data_dir.clone());
    let config = settings.flow_config(&os_name, run_dir);

    let assets_dir = settings.assets_dir.clone().unwrap_or_else(default_assets_dir);
    info!("Using bundled assets from {}", assets_dir.display());

    let orchestrator = match UpdateOrchestrator::new(
        config,
        Box::new(DirectoryBundle::new(assets_dir)),
        ProcessSupervisor::new(settings.settle_delay()),
    ) {
        Ok(orchestrator) => orchestrator,
        Err(error) => {
            error!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(orchestrator.run());
    // The game keeps running on its own; don't wait on its output pipes.
    runtime.shutdown_background();

    report(&outcome);
    ExitCode::from(outcome.exit_code())
}

fn default_assets_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
        .unwrap_or_else(|| PathBuf::from("assets"))
}

fn report(outcome: &FlowOutcome) {
    match outcome {
        FlowOutcome::Success(report) => {
            let state = match report.launch.settled {
                Settled::Running => "running".to_string(),
                Settled::Exited { code: Some(code) } => format!("exited with code {code}"),
                Settled::Exited { code: None } => "terminated by signal".to_string(),
            };
            info!(
                "Launched {} build (pid {:?}, {state}); local {}, remote {}, online: {}, updated: {}",
                report.platform,
                report.launch.pid,
                report.client_version,
                report.remote_version,
                report.online,
                report.updated,
            );
        }
        FlowOutcome::Fatal(failure) => {
            error!("Launch aborted: {}", failure.error);
            eprintln!("hatch: {}", failure.error);
        }
    }
}
