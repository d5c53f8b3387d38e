//! CLI argument parsing with clap

use crate::category::MediaCategory;
use crate::config::{Config, FileOperation};
use crate::time::Device;
use clap::Parser;
use std::path::PathBuf;

/// Event Importer - files imported media into existing event directories
///
/// Reads the event directories of the configured storages, merges unnamed
/// day groupings into overlapping named events and moves newly imported
/// photos and videos into the event of the day they were taken.
#[derive(Parser, Debug)]
#[command(name = "event-importer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// CLI arguments override config file settings.
    #[arg(short = 'C', long, required_unless_present = "sample_config")]
    pub config: Option<PathBuf>,

    /// Import source directory to organize, replacing configured jobs
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Naming scheme of the import source
    #[arg(short, long, value_enum)]
    pub device: Option<Device>,

    /// File operation mode
    #[arg(short = 'O', long, value_enum)]
    pub operation: Option<FileOperation>,

    /// Copyright owner id used in destination paths
    #[arg(long)]
    pub owner: Option<String>,

    /// Category new files are filed under
    #[arg(long, value_enum)]
    pub category: Option<MediaCategory>,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub sample_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
            config.jobs.clear();
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(operation) = self.operation {
            config.operation = operation;
        }
        if let Some(ref owner) = self.owner {
            config.default_copyright_owner = owner.clone();
        }
        if let Some(category) = self.category {
            config.default_category = category;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobConfig;

    #[test]
    fn test_parse_and_merge() {
        let cli = Cli::parse_from([
            "event-importer",
            "-C",
            "puce.toml",
            "--device",
            "panasonic",
            "-O",
            "copy",
            "--category",
            "business-events",
            "--owner",
            "flo",
        ]);
        assert_eq!(cli.config_name().as_deref(), Some("puce"));

        let config = cli.merge_with_config(Config::default());
        assert_eq!(config.device, Device::Panasonic);
        assert_eq!(config.operation, FileOperation::Copy);
        assert_eq!(config.default_category, MediaCategory::BusinessEvents);
        assert_eq!(config.default_copyright_owner, "flo");
        assert_eq!(config.source_dir, PathBuf::from("."));
    }

    #[test]
    fn test_source_replaces_jobs() {
        let cli = Cli::parse_from(["event-importer", "-C", "puce.toml", "-s", "/media/card"]);
        let config = Config {
            jobs: vec![JobConfig {
                name: None,
                source_dir: PathBuf::from("/media/phone"),
                device: None,
                owner: None,
            }],
            ..Config::default()
        };

        let config = cli.merge_with_config(config);
        assert!(config.jobs.is_empty());
        assert_eq!(config.source_dir, PathBuf::from("/media/card"));
    }

    #[test]
    fn test_config_required_unless_sample() {
        assert!(Cli::try_parse_from(["event-importer"]).is_err());
        let cli = Cli::try_parse_from(["event-importer", "--sample-config"]).unwrap();
        assert!(cli.sample_config);
        assert!(cli.config.is_none());
    }
}
