//! OpenWrap sample host application.
//!
//! This tool provides commands for:
//! - Loading a video ad from OpenWrap and printing the IMA ad tag URL
//! - Printing the OpenWrap request URL without sending it
//! - Validating configuration files

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod config;
mod error;
mod load;
mod logging;

use error::CliError;
use load::RequestArgs;

#[derive(Parser)]
#[command(name = "owcli")]
#[command(about = "Load OpenWrap video ads and build IMA ad tags")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an ad and print its targeting and the IMA ad tag URL
    Load {
        #[command(flatten)]
        request: RequestArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the OpenWrap request URL without sending it
    Url {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config against settings validation
    Validate {
        /// Path to the TOML configuration file
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[derive(Clone, ValueEnum, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logger(cli.verbose) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Load { request, format } => load::load(request, format, cli.verbose),
        Commands::Url { request } => load::print_url(request, cli.verbose),
        Commands::Config { action } => match action {
            ConfigAction::Validate { file } => config::validate(file, cli.verbose),
        },
    }
}
