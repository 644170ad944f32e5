pub mod commands;
pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "build2influx")]
#[command(about = "Turn CI build events into InfluxDB points")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter config file
    Init(InitArgs),
    /// Accept build events over HTTP and write them to InfluxDB
    Serve(ServeArgs),
    /// Generate points for one build record
    Emit(EmitArgs),
}

/// InfluxDB connection overrides shared by serve and emit
#[derive(clap::Args, Debug, Clone)]
pub struct InfluxArgs {
    /// Path to config file (defaults to .build2influx.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// InfluxDB base URL
    #[arg(long, env = "BUILD2INFLUX_URL")]
    pub url: Option<String>,

    /// Target database
    #[arg(long, env = "BUILD2INFLUX_DATABASE")]
    pub database: Option<String>,

    /// API token, sent as `Authorization: Token ...`
    #[arg(long, env = "BUILD2INFLUX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// InfluxDB base URL
    #[arg(long, default_value = "http://localhost:8086")]
    pub url: String,

    /// Target database
    #[arg(long, default_value = "jenkins")]
    pub database: String,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub influx: InfluxArgs,

    /// Listen address (overrides config)
    #[arg(long)]
    pub listen: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EmitArgs {
    #[command(flatten)]
    pub influx: InfluxArgs,

    /// Build record JSON file, or - for stdin
    #[arg(long, default_value = "-")]
    pub file: String,

    /// Print line protocol instead of writing to InfluxDB
    #[arg(long)]
    pub dry_run: bool,
}
