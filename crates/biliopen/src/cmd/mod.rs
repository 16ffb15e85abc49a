use std::time::Duration;

use biliopen_api::API_HOST_RELEASE;
use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a live room and print received events.
    Listen(ListenArgs),
    /// Decode one hex-encoded streaming frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Streamer identity code.
    #[arg(long, env = "LIVE_CODE", hide_env_values = true)]
    pub code: String,
    /// App access key.
    #[arg(long, env = "LIVE_APP_KEY")]
    pub app_key: String,
    /// App access key secret.
    #[arg(long, env = "LIVE_APP_SECRET", hide_env_values = true)]
    pub app_secret: String,
    /// Project (app) ID.
    #[arg(long, env = "LIVE_PROJECT_ID")]
    pub project_id: i64,
    /// Control API host.
    #[arg(long, env = "BILIOPEN_API_HOST", default_value = API_HOST_RELEASE)]
    pub api_host: String,
    /// Exit after receiving N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Streaming heartbeat period (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub heartbeat_interval: String,
    /// Control API heartbeat period (e.g. 20s).
    #[arg(long, default_value = "20s", conflicts_with = "no_app_heartbeat")]
    pub app_heartbeat_interval: String,
    /// Do not send control API heartbeats.
    #[arg(long)]
    pub no_app_heartbeat: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; whitespace and a leading 0x are ignored.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(name: &str, input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, format!("{name} must not be empty")));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid {name}: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, format!("{name} must be greater than zero")));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
