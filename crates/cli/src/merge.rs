//! `cowork merge` / `cowork validate` — dedup the scraped batch and append
//! new listings to the master CSV.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use cowork_recon::{KeyStrategy, MalformedPolicy, MergeConfig, MergeReport};

use crate::CliError;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "cowork.toml";

#[derive(Args)]
pub struct MergeArgs {
    /// Scraped batch to dedup and rewrite (default: maps_data_playwright.csv)
    #[arg(long, short = 'i')]
    incoming: Option<PathBuf>,

    /// Cumulative master CSV, created if missing (default: data.csv)
    #[arg(long, short = 'm')]
    master: Option<PathBuf>,

    /// TOML config file (default: ./cowork.toml if present)
    #[arg(long, short = 'c', env = "COWORK_CONFIG")]
    config: Option<PathBuf>,

    /// Identity key used to spot duplicates
    #[arg(long)]
    key: Option<KeyArg>,

    /// What to do with lines that fail to parse
    #[arg(long)]
    malformed: Option<MalformedArg>,

    /// Compute and report, but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Print the JSON report to stdout
    #[arg(long)]
    json: bool,

    /// Write the JSON report to a file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KeyArg {
    /// Normalized name
    Name,
    /// Normalized name plus address
    NameAddress,
}

impl From<KeyArg> for KeyStrategy {
    fn from(arg: KeyArg) -> Self {
        match arg {
            KeyArg::Name => KeyStrategy::Name,
            KeyArg::NameAddress => KeyStrategy::NameAddress,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MalformedArg {
    /// Drop silently
    Skip,
    /// Drop and log a warning per line
    Warn,
    /// Fail before writing anything
    Strict,
}

impl From<MalformedArg> for MalformedPolicy {
    fn from(arg: MalformedArg) -> Self {
        match arg {
            MalformedArg::Skip => MalformedPolicy::Skip,
            MalformedArg::Warn => MalformedPolicy::Warn,
            MalformedArg::Strict => MalformedPolicy::Strict,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MergeConfig, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::args(format!("config not found: {}", path.display())));
            }
            Ok(MergeConfig::load(path)?)
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                log::info!("using {}", default.display());
                Ok(MergeConfig::load(default)?)
            } else {
                Ok(MergeConfig::default())
            }
        }
    }
}

pub fn cmd_merge(args: MergeArgs, quiet: bool) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;

    // Flags win over the config file.
    if let Some(incoming) = args.incoming {
        config.files.incoming = incoming;
    }
    if let Some(master) = args.master {
        config.files.master = master;
    }
    if let Some(key) = args.key {
        config.key.strategy = key.into();
    }
    if let Some(policy) = args.malformed {
        config.malformed = policy.into();
    }
    config.validate()?;

    let report = cowork_recon::reconcile_with(
        &config.files.incoming,
        &config.files.master,
        &config.options(args.dry_run),
    )?;

    if args.json || args.output.is_some() {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json_str).map_err(|e| {
                CliError::general(format!("cannot write {}: {e}", path.display()))
                    .with_hint("the merge itself already completed")
            })?;
            if !quiet {
                eprintln!("wrote {}", path.display());
            }
        }

        if args.json {
            println!("{json_str}");
        }
    }

    if !quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &MergeReport) {
    let s = &report.summary;
    let m = &report.meta;
    let prefix = if m.dry_run { "dry run: " } else { "" };

    if s.bootstrapped {
        let verb = if m.dry_run { "would be created" } else { "created" };
        eprintln!(
            "{prefix}{} missing or empty, {verb} from {} ({} row(s))",
            m.master, m.incoming, s.incoming_rows
        );
        return;
    }

    eprintln!(
        "{prefix}removed {} duplicate row(s) from {} ({} kept)",
        s.duplicates, m.incoming, s.kept_rows
    );
    if s.empty_keys > 0 || s.malformed_lines > 0 {
        eprintln!(
            "{prefix}dropped {} row(s) without a name, {} malformed line(s)",
            s.empty_keys, s.malformed_lines
        );
    }
    eprintln!("{prefix}added {} new row(s) to {}", s.appended, m.master);
}

pub fn cmd_validate(config_path: PathBuf, quiet: bool) -> Result<(), CliError> {
    if !config_path.exists() {
        return Err(CliError::args(format!("config not found: {}", config_path.display())));
    }
    let config = MergeConfig::load(&config_path)?;

    if !quiet {
        eprintln!(
            "{}: ok (incoming {}, master {}, key {}, malformed {})",
            config_path.display(),
            config.files.incoming.display(),
            config.files.master.display(),
            config.key.strategy,
            config.malformed,
        );
    }
    Ok(())
}
