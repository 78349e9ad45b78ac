//! holdthedoor CLI
//!
//! Log in against a holdthedoor server, list the machines it publishes and
//! attach the local terminal to one of them.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use holdthedoor::commands;
use holdthedoor::context::Context;
use htd_core::config;

#[derive(Parser)]
#[command(name = "holdthedoor")]
#[command(author, version, about = "Terminal client for holdthedoor remote machines")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL (overrides config)
    #[arg(short, long, global = true, env = "HTD_SERVER")]
    server: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session credential
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long, env = "HTD_USERNAME")]
        username: Option<String>,
        /// Password (prompted without echo when omitted)
        #[arg(long, env = "HTD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session credential
    Logout,

    /// Show the server and session countdown
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List machines available for attachment
    /// Alias: ls
    #[command(alias = "ls")]
    List {
        /// Show address and hostname columns
        #[arg(short, long)]
        long: bool,
    },

    /// Attach the terminal to a machine
    Connect {
        /// Machine identifier or name
        machine: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get specific config value
    Get { key: String },
    /// Set config value
    Set { key: String, value: String },
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    if let Commands::Config { action } = &cli.command {
        init_logging(log_level, None)?;
        return run_config(action, &config_path);
    }

    let ctx = Context::load(Some(config_path.as_path()), cli.server.as_deref())?;

    // A raw-mode terminal session cannot share stderr with the logger.
    let log_file = matches!(cli.command, Commands::Connect { .. }).then(|| ctx.config.log_path.as_path());
    init_logging(log_level, log_file)?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::login_command(&ctx, username, password).await?;
        }
        Commands::Logout => commands::logout_command(&ctx)?,
        Commands::Status { json } => commands::status_command(&ctx, json)?,
        Commands::List { long } => commands::list_command(&ctx, long).await?,
        Commands::Connect { machine } => commands::connect_command(&ctx, &machine).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_config(action: &ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => commands::config_show(path),
        ConfigAction::Get { key } => commands::config_get(path, key),
        ConfigAction::Set { key, value } => commands::config_set(path, key, value),
        ConfigAction::Init { force } => commands::config_init(path, *force),
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn init_logging(level: &str, file: Option<&Path>) -> Result<()> {
    let filter =
        tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()));

    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
    Ok(())
}
