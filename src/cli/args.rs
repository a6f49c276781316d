//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// QA harness: mock backend, load driver and API checks
#[derive(Parser, Debug, Clone)]
#[command(name = "qaharness", version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: $QAHARNESS_CONFIG or config/config.toml)
    #[arg(long = "config", short = 'c', value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Environment section to use (default: $TEST_ENV, then current_env)
    #[arg(long = "env", short = 'e', value_name = "NAME", global = true)]
    pub env: Option<String>,

    /// Log filter, overrides the settings file
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// text or json
    #[arg(long = "log-format", value_name = "FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the mock backend until interrupted
    Mock(MockArgs),
    /// Run simulated users against the backend
    Load(LoadArgs),
    /// Find which login endpoint the backend serves
    Probe(ProbeArgs),
    /// Log in with the configured credentials
    Login(LoginArgs),
    /// Show the resolved settings
    Env,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MockArgs {
    /// Mock config file (YAML, JSON, or TOML)
    #[arg(long = "mock-config", value_name = "FILE")]
    pub mock_config: Option<PathBuf>,

    #[arg(long = "port", short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Extra route: METHOD:PATH[:BODY] (repeatable)
    #[arg(long = "route", value_name = "ROUTE")]
    pub routes: Vec<String>,

    #[arg(long = "cors")]
    pub cors: bool,

    /// Added delay in ms: `50` or `10-100`
    #[arg(long = "latency", value_name = "MS")]
    pub latency: Option<String>,

    /// Test data file with the users to serve
    #[arg(long = "users", value_name = "FILE")]
    pub users_file: Option<PathBuf>,

    /// Disable the built-in /user endpoints
    #[arg(long = "no-user-service")]
    pub no_user_service: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Overrides base_url from the settings
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Concurrent simulated users
    #[arg(long = "users", short = 'u', default_value_t = 10)]
    pub users: u32,

    /// Task picks per user
    #[arg(long = "iterations", short = 'n', default_value_t = 20)]
    pub iterations: u32,

    /// Minimum think time between calls
    #[arg(long = "wait-min", value_name = "DURATION", default_value = "1s", value_parser = humantime::parse_duration)]
    pub wait_min: std::time::Duration,

    /// Maximum think time between calls
    #[arg(long = "wait-max", value_name = "DURATION", default_value = "3s", value_parser = humantime::parse_duration)]
    pub wait_max: std::time::Duration,

    /// Delay between starting users
    #[arg(long = "spawn-interval", value_name = "DURATION", default_value = "0s", value_parser = humantime::parse_duration)]
    pub spawn_interval: std::time::Duration,

    /// Task: [NAME=]METHOD:PATH[*WEIGHT] (repeatable; replaces the defaults)
    #[arg(long = "task", value_name = "TASK")]
    pub tasks: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProbeArgs {
    /// Candidate login path (repeatable; defaults to the common ones)
    #[arg(long = "candidate", value_name = "PATH")]
    pub candidates: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LoginArgs {
    /// Fetch this endpoint with the token after logging in
    #[arg(long = "fetch", value_name = "PATH")]
    pub fetch: Option<String>,

    /// Log out afterwards
    #[arg(long = "logout")]
    pub logout: bool,
}
