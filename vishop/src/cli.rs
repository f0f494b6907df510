//! Command-line surface of vishop: argument parsing and command dispatch.
//!
//! Domain work lives in `vishop-core`; this module only resolves flags,
//! environment and terminal state into calls on it.
//!
//! [`run`] is the async entrypoint shared by `main` and the integration tests.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vishop_core::bundle::ArchiveType;
use vishop_core::config::{ScriptType, CONFIG_FILENAME};

use crate::commands;
use crate::init::VIM_VERSIONS;

/// Build and publish Vim plugin bundles on vim.org.
#[derive(Parser, Debug)]
#[command(name = "vishop", version, about = "Build Vim plugin bundles and publish them to vim.org")]
pub struct Cli {
    /// Logging verbosity (-v info, -vv debug). RUST_LOG overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Package config file
    #[arg(short, long, global = true, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a package config file
    Init(InitArgs),
    /// Log in and show the account and its scripts
    Info(LoginArgs),
    /// Collect files into a bundle archive
    Build(BuildArgs),
    /// Upload bundles, creating scripts or adding versions
    Publish(PublishArgs),
    /// Remove the build output directory
    Clean(CleanArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the config (defaults to --config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(short, long)]
    pub name: Option<String>,
    #[arg(short = 't', long = "type", value_parser = parse_script_type)]
    pub script_type: Option<ScriptType>,
    /// Minimum Vim version
    #[arg(short, long, default_value = "7.0", value_parser = VIM_VERSIONS)]
    pub required: String,
    #[arg(short = 'V', long = "init-version", default_value = "1.0")]
    pub version: String,
    #[arg(short, long)]
    pub summary: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(short = 'D', long)]
    pub install_details: Option<String>,
    #[arg(short, long)]
    pub private: bool,
}

#[derive(Args, Debug, Default)]
pub struct LoginArgs {
    /// Username or email (env: VISHOP_USERNAME)
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password (env: VISHOP_PASSWORD)
    #[arg(short, long)]
    pub password: Option<String>,
    /// Prompt for missing values even when stdin is not a terminal
    #[arg(short, long, overrides_with = "no_interactive")]
    pub interactive: bool,
    /// Never prompt
    #[arg(long)]
    pub no_interactive: bool,
    /// Site root (env: VISHOP_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,
}

impl LoginArgs {
    /// Explicit flags win, otherwise prompts are allowed when stdin is a terminal.
    pub fn interactive(&self) -> bool {
        if self.interactive {
            true
        } else if self.no_interactive {
            false
        } else {
            crate::prompt::stdin_is_interactive()
        }
    }
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Preview the file list and ask before writing
    #[arg(short, long)]
    pub interactive: bool,
    /// Number of paths shown in the preview
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
    /// Comma-separated ignore files whose lines become excludes
    #[arg(short = 'n', long, default_value = ".gitignore", value_delimiter = ',')]
    pub ignore_file: Vec<PathBuf>,
    /// Exclude pattern, repeatable
    #[arg(
        short = 'x',
        long,
        default_values = ["dist", ".git", "venv", "__pycache__", "node_modules"]
    )]
    pub exclude: Vec<String>,
    /// Single file to bundle, repeatable
    #[arg(short, long)]
    pub file: Vec<PathBuf>,
    /// Directory to bundle, repeatable
    #[arg(short, long)]
    pub path: Vec<PathBuf>,
    /// More directories to bundle
    pub paths: Vec<PathBuf>,
    /// Archive type
    #[arg(short = 't', long = "type", default_value_t = ArchiveType::TarGz, value_parser = parse_archive_type)]
    pub archive_type: ArchiveType,
    /// Output directory
    #[arg(short, long, default_value = "dist")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub login: LoginArgs,
    /// Description used instead of the config's or a README
    #[arg(short, long)]
    pub description: Option<String>,
    /// Bundles to publish
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Ask before deleting
    #[arg(short, long)]
    pub interactive: bool,
    /// Directory to remove
    #[arg(short, long, default_value = "dist")]
    pub path: PathBuf,
}

fn parse_script_type(s: &str) -> std::result::Result<ScriptType, String> {
    s.parse().map_err(|e: vishop_core::VishopError| e.to_string())
}

fn parse_archive_type(s: &str) -> std::result::Result<ArchiveType, String> {
    s.parse().map_err(|e: vishop_core::VishopError| e.to_string())
}

/// Async CLI entrypoint for `main` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let Cli {
        config, command, ..
    } = cli;
    match command {
        Commands::Init(args) => {
            tracing::info!(command = "init", "Running init");
            commands::init(&config, args)
        }
        Commands::Info(args) => {
            tracing::info!(command = "info", "Running info");
            commands::info(args).await
        }
        Commands::Build(args) => {
            tracing::info!(command = "build", "Running build");
            commands::build(&config, args)
        }
        Commands::Publish(args) => {
            tracing::info!(command = "publish", "Running publish");
            commands::publish(&config, args).await
        }
        Commands::Clean(args) => {
            tracing::info!(command = "clean", "Running clean");
            commands::clean(args)
        }
    }
}
