//! Command-line entry point

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use clap::Parser;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::Settings;
use crate::errors::Result;
use crate::logging;
use crate::status::ExitStatus;

/// Parse `args`, load settings, set up logging and run the subcommand
pub fn run(args: Vec<String>, stop: Arc<AtomicBool>) -> ExitStatus {
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("qaharness: {}", e);
            return ExitStatus::Error;
        }
    };

    let _guard = match logging::init(&settings.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("qaharness: {}", e);
            return ExitStatus::Error;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("qaharness: failed to start runtime: {}", e);
            return ExitStatus::Error;
        }
    };

    match runtime.block_on(program(cli, settings, stop)) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("qaharness: {}", e);
            ExitStatus::Error
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = match cli.env.as_deref() {
        Some(env) => Settings::load_for(&path, Some(env))?,
        None => Settings::load(&path)?,
    };

    if let Some(level) = &cli.log_level {
        settings.log.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        settings.log.format = format;
    }
    Ok(settings)
}

pub async fn program(cli: Cli, settings: Settings, stop: Arc<AtomicBool>) -> Result<ExitStatus> {
    tracing::debug!(env = %settings.env, base_url = %settings.client.base_url, "Settings loaded");

    match &cli.command {
        Command::Mock(args) => commands::run_mock(args, stop).await,
        Command::Load(args) => commands::run_load_command(&settings, args, stop).await,
        Command::Probe(args) => commands::run_probe(&settings, args).await,
        Command::Login(args) => commands::run_login(&settings, args).await,
        Command::Env => commands::run_env(&settings),
    }
}
