//! Event Importer - files imported media into existing event directories
//!
//! Reads the configured storages, reconciles unnamed day groupings with
//! named events and moves new camera or phone media into the event of the
//! day it was taken.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use event_importer::{Cli, Config, ImportJob, JobReport, ProcessingStatus, run_jobs};
use std::path::{Path, PathBuf};
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored terminal output for the run summary

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let _ = stdout().execute(Print(" ".repeat(padding)));
        let _ = stdout().execute(Print(title.bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_result(status_icon: &str, status_color: Color, source: &str, dest_or_msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(dest_or_msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.sample_config {
        print!("{}", Config::sample_config());
        return Ok(());
    }

    // Get the executable directory for Config and Log directories
    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Event Importer starting");
    info!(log_file = %log_path.display(), "Log file location");

    let config = load_config(&cli, &exe_dir)?;
    if cli.verbose {
        info!(?config, "Configuration loaded");
    }

    let jobs = ImportJob::from_config(&config)?;
    info!(jobs = jobs.len(), "Import jobs configured");
    let reports = run_jobs(&jobs);

    for report in &reports {
        print_summary(report, cli.verbose);
    }

    if let Some(ref report_path) = cli.report {
        JobReport::save_all(&reports, report_path)?;
        info!(report = %report_path.display(), "Run report written");
    }

    cli_output::print_separator();
    cli_output::print_log_path(&log_path.display().to_string());
    info!(log_file = %log_path.display(), "Import complete. Log saved to");

    let failed = reports.iter().filter(|r| r.is_failed()).count();
    if failed > 0 {
        error!(failed, "Some import jobs were aborted");
        drop(_guard);
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(job: &JobReport, verbose: bool) {
    use cli_output::*;

    print_separator();
    print_title(&format!("Import job: {}", job.name));
    print_separator();

    let Some(ref report) = job.report else {
        let msg = job.error.as_deref().unwrap_or("unknown error");
        print_result("✗", CliTheme::ERROR, &job.source_dir.display().to_string(), msg);
        return;
    };

    let stats = &report.stats;
    print_stat("Imported", &stats.imported.to_string(), CliTheme::SUCCESS);
    print_stat("Merged events", &stats.merged.to_string(), CliTheme::ACCENT);
    print_stat("Skipped", &stats.skipped.to_string(), CliTheme::WARNING);
    print_stat("Failed", &stats.failed.to_string(), CliTheme::ERROR);
    print_stat("Failed merges", &stats.merge_failed.to_string(), CliTheme::ERROR);
    print_stat("Unreadable storages", &stats.storages_failed.to_string(), CliTheme::ERROR);

    for result in &report.results {
        let source = result.source.display().to_string();
        match result.status {
            ProcessingStatus::Imported if verbose => {
                let dest = result
                    .destination
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                print_result("✓", CliTheme::SUCCESS, &source, &format!("→ {}", dest));
            }
            ProcessingStatus::Skipped if verbose => {
                print_result("⊘", CliTheme::WARNING, &source, "unsupported file type");
            }
            ProcessingStatus::Failed => {
                let msg = result.error.as_deref().unwrap_or("unknown error");
                print_result("✗", CliTheme::ERROR, &source, msg);
            }
            _ => {}
        }
    }
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        log_dir
            .join(&config_name)
            .join(format!("{}_{}.log", config_name, timestamp))
    } else {
        log_dir.join(format!("ImportRun_{}.log", timestamp))
    }
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file and apply CLI overrides
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let Some(ref config_path) = cli.config else {
        anyhow::bail!("No configuration file given (use --config)");
    };

    let resolved_path = resolve_config_path(exe_dir, config_path);
    info!(config_file = %resolved_path.display(), "Loading configuration from file");
    let file_config = Config::load_from_file(&resolved_path)?;
    Ok(cli.merge_with_config(file_config))
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}
