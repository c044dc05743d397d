//! nullfix CLI - lists, previews, applies and reverts explicit-nullable fixes

// Global invariants enforced:
// - Exactly one mode runs per invocation
// - Only configuration errors end the run early
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{ArgGroup, Parser};
use nullfix_core::patch::{self, Prepared};
use nullfix_core::{
    config, discover, render_json, render_text, ApplyOutcome, Mode, Overrides, ResolvedConfig,
    RewriteStyle,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nullfix")]
#[command(about = "Find and fix implicitly nullable typed parameters in PHP sources")]
#[command(version = env!("NULLFIX_VERSION"))]
#[command(group(ArgGroup::new("mode").args(["list", "dry_run", "apply", "restore"])))]
struct Cli {
    /// Root directory to scan
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// List candidates (default)
    #[arg(long)]
    list: bool,

    /// Preview the rewrite as a line diff
    #[arg(long)]
    dry_run: bool,

    /// Rewrite files, backing up each original first
    #[arg(long)]
    apply: bool,

    /// Move every backup back over its original
    #[arg(long, visible_alias = "undo")]
    restore: bool,

    /// Comma-separated file extensions to scan (default: php)
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Path segments or globs to exclude; comma-separated, repeatable
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Rewrite as `Foo|null` instead of `?Foo`
    #[arg(long)]
    union: bool,

    /// Backup file suffix
    #[arg(long)]
    suffix: Option<String>,

    /// Output format for the candidate list
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Path to config file (default: auto-discover in --path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log per-file progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.restore {
            Mode::Restore
        } else if self.apply {
            Mode::Apply
        } else if self.dry_run {
            Mode::DryRun
        } else {
            Mode::List
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            extensions: self.extensions.clone(),
            exclude: self.exclude.clone(),
            suffix: self.suffix.clone(),
            style: self.union.then_some(RewriteStyle::Union),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mode = cli.mode();
    if cli.format == OutputFormat::Json && mode != Mode::List {
        anyhow::bail!("--format json is only valid in list mode");
    }

    discover::validate_root(&cli.path)?;

    let resolved = config::load_and_resolve(&cli.path, cli.config.as_deref(), cli.overrides())
        .context("failed to load configuration")?;
    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    tracing::debug!(
        mode = mode.as_str(),
        style = resolved.style.as_str(),
        root = %cli.path.display(),
        "starting"
    );

    match mode {
        Mode::Restore => run_restore(&cli.path, &resolved.suffix),
        _ => run_scan(&cli.path, &resolved, mode, cli.format),
    }
}

fn run_restore(root: &Path, suffix: &str) -> anyhow::Result<()> {
    for outcome in nullfix_core::restore(root, suffix)? {
        println!("Restoring {}", outcome.original.display());
        if let Some(error) = &outcome.error {
            println!("Failed to restore {}", outcome.original.display());
            eprintln!("warning: {}: {}", outcome.backup.display(), error);
        }
    }
    println!("Restore done.");
    Ok(())
}

fn run_scan(
    root: &Path,
    resolved: &ResolvedConfig,
    mode: Mode,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let report = nullfix_core::scan(root, resolved)?;

    for skipped in &report.skipped {
        eprintln!(
            "warning: skipping file {}: {}",
            skipped.path.display(),
            skipped.reason
        );
    }
    if !report.skipped.is_empty() {
        eprintln!("Skipped {} file(s) that could not be read", report.skipped.len());
    }

    if format == OutputFormat::Json {
        println!("{}", render_json(&report.issues)?);
        return Ok(());
    }

    print!("{}", render_text(&report.issues));
    if report.issues.is_empty() {
        return Ok(());
    }
    if mode == Mode::List {
        println!("\nList mode. To preview changes use --dry-run, to apply use --apply.");
        return Ok(());
    }

    let Prepared { changes, failures } = patch::prepare(&report.plan(), resolved.style);
    for failure in &failures {
        eprintln!(
            "warning: skipping file {}: {}",
            failure.path.display(),
            failure.reason
        );
    }

    for change in &changes {
        println!("File: {} -- changes detected", change.path.display());
        if mode == Mode::DryRun {
            print!("{}", patch::preview(change));
            continue;
        }
        match patch::apply_change(change, &resolved.suffix) {
            ApplyOutcome::Applied { backup } => {
                println!("Applied fix and backed up original to {}", backup.display());
            }
            ApplyOutcome::BackupFailed { reason } => {
                println!("Failed to backup {}", change.path.display());
                eprintln!("warning: {}", reason);
            }
            ApplyOutcome::WriteFailed { reason, restored } => {
                println!("Failed to write modified file {}", change.path.display());
                if !restored {
                    eprintln!(
                        "warning: {} could not be restored from its backup",
                        change.path.display()
                    );
                }
                eprintln!("warning: {}", reason);
            }
        }
    }

    println!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_mode_is_list() {
        let cli = Cli::try_parse_from(["nullfix"]).unwrap();
        assert_eq!(cli.mode(), Mode::List);
        assert_eq!(cli.path, PathBuf::from("."));
    }

    #[test]
    fn test_modes_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["nullfix", "--apply", "--dry-run"]).is_err());
        assert!(Cli::try_parse_from(["nullfix", "--list", "--restore"]).is_err());
    }

    #[test]
    fn test_undo_alias() {
        let cli = Cli::try_parse_from(["nullfix", "--undo"]).unwrap();
        assert_eq!(cli.mode(), Mode::Restore);
    }

    #[test]
    fn test_list_flags_split_on_commas() {
        let cli = Cli::try_parse_from([
            "nullfix",
            "--extensions=php,inc",
            "--exclude",
            "vendor,cache",
            "--exclude=build",
            "--union",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(
            overrides.extensions,
            Some(vec!["php".to_string(), "inc".to_string()])
        );
        assert_eq!(overrides.exclude, vec!["vendor", "cache", "build"]);
        assert_eq!(overrides.style, Some(RewriteStyle::Union));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["nullfix", "--fix-everything"]).is_err());
    }
}
