//! Plugin Browser CLI - browse, install, enable, disable and remove
//! host-application plugins from a remote catalog.
//!
//! A thin presentation layer: every command builds a `PluginBrowser`, runs
//! one operation, and prints the status events it publishes.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plugin_browser_core::Operation;

mod commands;
mod config_bridge;
mod session;
mod theme;

use commands::{catalog, config, manage};
use session::{Overrides, Session};
use theme::Theme;

/// Plugin Browser - manage host-application plugins from a remote catalog
#[derive(Parser)]
#[command(name = "plugin-browser")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Plugin directory to manage (overrides the configured one)
    #[arg(long, global = true)]
    plugin_dir: Option<PathBuf>,

    /// Manifest URL for this run only (the stored URL is left unchanged)
    #[arg(long, global = true)]
    manifest_url: Option<String>,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List plugins offered by the catalog
    Available,

    /// List catalog and installed plugins side by side
    List,

    /// Download and install a plugin from the catalog
    Install {
        /// Catalog id of the plugin
        id: String,
    },

    /// Enable a disabled plugin folder
    Enable {
        /// Folder name, with or without the `.disabled` suffix
        folder: String,
    },

    /// Disable a plugin folder without deleting it
    Disable {
        /// Folder name, with or without the `.disabled` suffix
        folder: String,
    },

    /// Delete a plugin folder
    Remove {
        /// Folder name, with or without the `.disabled` suffix
        folder: String,
    },

    /// Open a plugin's repository page
    Repo {
        /// Catalog id of the plugin
        id: String,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Show only a specific section (manifest, plugins, logging)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Store a new manifest URL
    SetUrl {
        /// Absolute http(s) URL of the plugin manifest
        url: String,
    },
    /// Forget the stored manifest URL and use the default again
    ResetUrl,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = plugin_browser_config::load(cli.config.as_deref());

    let log_config = config_bridge::to_log_config(loaded.as_ref().ok().map(|r| &r.config), cli.verbose);
    if let Err(e) = plugin_browser_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli, loaded).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", Theme::error(&format!("{e:#}")));
            ExitCode::FAILURE
        },
    }
}

async fn run(
    cli: Cli,
    loaded: plugin_browser_config::ConfigResult<plugin_browser_config::ResolvedConfig>,
) -> Result<ExitCode> {
    let resolved = loaded.context("failed to load configuration")?;
    let overrides = Overrides {
        plugin_dir: cli.plugin_dir,
        manifest_url: cli.manifest_url,
    };

    if let Commands::Config { command } = &cli.command {
        return handle_config(command, &resolved, &overrides).await;
    }

    let session = Session::open(&resolved, &overrides)?;
    let result = match cli.command {
        Commands::Available => catalog::available(&session, cli.json).await,
        Commands::List => catalog::list(&session, cli.json).await,
        Commands::Repo { id } => catalog::repo(&session, &id).await,
        Commands::Install { id } => manage::install(&session, &id).await,
        Commands::Enable { folder } => manage::run(&session, Operation::Enable(folder)).await,
        Commands::Disable { folder } => manage::run(&session, Operation::Disable(folder)).await,
        Commands::Remove { folder } => manage::run(&session, Operation::Remove(folder)).await,
        // Handled before the session is opened.
        Commands::Config { .. } => Ok(ExitCode::SUCCESS),
    };
    session.close().await;
    result
}

async fn handle_config(
    command: &ConfigCommands,
    resolved: &plugin_browser_config::ResolvedConfig,
    overrides: &Overrides,
) -> Result<ExitCode> {
    match command {
        ConfigCommands::Show { format, section } => {
            config::show_config(resolved, format, section.as_deref())?;
            Ok(ExitCode::SUCCESS)
        },
        ConfigCommands::SetUrl { url } => config::set_url(resolved, overrides, url).await,
        ConfigCommands::ResetUrl => {
            config::reset_url(resolved)?;
            Ok(ExitCode::SUCCESS)
        },
    }
}
