//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for conduit
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(author, version, about = "Tool-call dispatch server with nested timeouts")]
#[command(long_about = r#"
Conduit accepts tool calls from clients over a framed JSON channel, runs each
one under a nested timeout budget, and answers with exactly one outcome per
call. Multi-step workflow tools report progress while they run.

Configuration files are loaded from (in priority order):
1. CONDUIT_* environment variables (e.g. CONDUIT_TIMEOUTS__BASE_SECS=120)
2. --config <path>     Explicit config file
3. ./conduit.toml      Project-level config
4. ~/.config/conduit/config.toml   Global config

Example:
  conduit serve --listen 127.0.0.1:7340
  conduit serve --stdio -v --log-file /tmp/conduit.log
  conduit tools
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config_sources: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept tool calls (the default)
    Serve(ServeArgs),

    /// List the registered tools
    Tools,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.listen)
    #[arg(long, value_name = "ADDR", conflicts_with = "stdio")]
    pub listen: Option<String>,

    /// Serve a single channel on stdin/stdout
    #[arg(long)]
    pub stdio: bool,
}
