// cowork CLI - dedup scraped coworking listings and merge them into a master CSV

mod exit_codes;
mod merge;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cowork_recon::MergeError;
use exit_codes::{merge_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use merge::MergeArgs;

#[derive(Parser)]
#[command(name = "cowork")]
#[command(about = "Deduplicate scraped coworking listings and merge them into a master CSV")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dedup the incoming batch and append its new rows to the master CSV
    #[command(after_help = "\
Examples:
  cowork merge
  cowork merge --incoming maps_data_playwright.csv --master data.csv
  cowork merge --key name-address --malformed strict
  cowork merge --dry-run --json")]
    Merge(MergeArgs),

    /// Validate a merge config without running
    #[command(after_help = "\
Examples:
  cowork validate cowork.toml")]
    Validate {
        /// Path to the TOML config file
        config: std::path::PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: cowork <command> [options]");
            eprintln!("       cowork --help for more information");
            Ok(())
        }
        Some(Commands::Merge(args)) => merge::cmd_merge(args, cli.quiet),
        Some(Commands::Validate { config }) => merge::cmd_validate(config, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("COWORK_GIT_HASH"), ")",
        "\nengine:  cowork-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("COWORK_TARGET"),
    )
}

fn init_logger(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a merge error with the registered exit code.
    pub fn merge(err: MergeError) -> Self {
        let code = merge_exit_code(&err);
        let hint = match &err {
            MergeError::MissingIncoming(_) => {
                Some("run the scraper first, or point --incoming at its output".to_string())
            }
            MergeError::Malformed { .. } => {
                Some("fix the listed lines, or rerun with --malformed warn to skip them".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<MergeError> for CliError {
    fn from(err: MergeError) -> Self {
        Self::merge(err)
    }
}
