//! Configuration types for the event importer

use crate::category::{CategoryKey, MediaCategory, MediaKind};
use crate::identity::OwnerId;
use crate::time::Device;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File operation used to migrate imported files into event directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    /// Move files to destination
    #[default]
    Move,
    /// Copy files to destination
    Copy,
    /// Create hard links
    Hardlink,
}

/// Role of a storage in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageRole {
    /// Curated event directories; only read to seed the indexes
    #[default]
    Archive,
    /// Landing area that receives imported files and unnamed day groupings
    Import,
}

/// One storage root holding event directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Name used in logs
    pub name: String,

    /// Root directory. Relative paths are resolved against `source_dir`.
    pub root: PathBuf,

    /// Media kind stored here
    pub kind: MediaKind,

    /// Archive or import storage
    #[serde(default)]
    pub role: StorageRole,

    /// Categories whose indexes see the events of this storage
    pub categories: Vec<MediaCategory>,

    /// Supported file extensions, defaults depend on `kind`
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

impl StorageConfig {
    /// Category keys this storage contributes to
    pub fn category_keys(&self) -> Vec<CategoryKey> {
        self.categories
            .iter()
            .map(|category| CategoryKey::new(*category, self.kind))
            .collect()
    }

    /// Extensions handled by this storage, lowercase
    pub fn extensions(&self) -> Vec<String> {
        match &self.extensions {
            Some(extensions) => extensions.iter().map(|e| e.to_lowercase()).collect(),
            None => default_extensions(self.kind),
        }
    }

    /// Root directory with relative paths resolved against `base`
    pub fn resolved_root(&self, base: &Path) -> PathBuf {
        if self.root.is_absolute() {
            self.root.clone()
        } else {
            base.join(&self.root)
        }
    }
}

/// One import source processed by its own run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Name used in logs and reports, defaults to the source directory
    #[serde(default)]
    pub name: Option<String>,

    /// Import source to organize
    pub source_dir: PathBuf,

    /// Naming scheme of this source, defaults to the top-level `device`
    #[serde(default)]
    pub device: Option<Device>,

    /// Owner id for this source, defaults to `default_copyright_owner`
    #[serde(default)]
    pub owner: Option<String>,
}

/// Default extensions for a media kind
pub fn default_extensions(kind: MediaKind) -> Vec<String> {
    let extensions: &[&str] = match kind {
        MediaKind::Photo => &[
            "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif", "avif", "tiff", "tif",
            "raw", "arw", "cr2", "cr3", "nef", "orf", "rw2", "dng", "raf", "srw", "pef",
        ],
        MediaKind::Video => &[
            "mp4", "mov", "avi", "mkv", "wmv", "flv", "m4v", "3gp", "mts", "m2ts",
        ],
    };
    extensions.iter().map(|e| e.to_string()).collect()
}

/// Configuration for the event importer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Import source (device dump) to organize when no `jobs` are listed
    #[serde(default)]
    pub source_dir: PathBuf,

    /// Naming scheme of the import source
    #[serde(default)]
    pub device: Device,

    /// Owner id used below each event directory
    pub default_copyright_owner: String,

    /// Category new files are filed under
    pub default_category: MediaCategory,

    /// File operation mode
    #[serde(default)]
    pub operation: FileOperation,

    /// Files smaller than this (bytes) in day-directory sources go to the
    /// event's `uncategorized` directory
    #[serde(default = "default_uncategorized_threshold")]
    pub uncategorized_threshold: u64,

    /// Archive and import storages
    #[serde(default)]
    pub storages: Vec<StorageConfig>,

    /// Import sources run one after another, replacing `source_dir`
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

fn default_uncategorized_threshold() -> u64 {
    1_000_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            device: Device::default(),
            default_copyright_owner: String::new(),
            default_category: MediaCategory::PrivateEvents,
            operation: FileOperation::default(),
            uncategorized_threshold: default_uncategorized_threshold(),
            storages: vec![],
            jobs: vec![],
        }
    }
}

impl Config {
    /// Storages with the given role
    pub fn storages_with_role(&self, role: StorageRole) -> impl Iterator<Item = &StorageConfig> {
        self.storages.iter().filter(move |s| s.role == role)
    }

    /// Owner id parsed from `default_copyright_owner`
    pub fn owner_id(&self) -> Result<OwnerId, ConfigError> {
        OwnerId::new(self.default_copyright_owner.clone()).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }

    /// Check that the configuration describes a runnable import
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.owner_id()?;

        if self.storages.is_empty() {
            return Err(ConfigError::invalid("No storages configured"));
        }

        let mut names = HashSet::new();
        for storage in &self.storages {
            if !names.insert(storage.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "Storage name '{}' is used more than once",
                    storage.name
                )));
            }
            if storage.name.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "Storage with root '{}' has no name",
                    storage.root.display()
                )));
            }
            if storage.categories.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "Storage '{}' has no categories",
                    storage.name
                )));
            }
            if storage.root.is_absolute() && !storage.root.is_dir() {
                return Err(ConfigError::invalid(format!(
                    "Root '{}' of storage '{}' does not exist",
                    storage.root.display(),
                    storage.name
                )));
            }
        }

        let has_default_import = self
            .storages_with_role(StorageRole::Import)
            .any(|s| s.categories.contains(&self.default_category));
        if !has_default_import {
            return Err(ConfigError::invalid(format!(
                "No import storage for default category '{}'",
                self.default_category
            )));
        }

        Ok(())
    }

    /// One effective configuration per import job, each validated.
    ///
    /// Without `jobs` the top-level `source_dir` is the only job. Jobs
    /// inherit `device` and `default_copyright_owner` unless they set their own.
    pub fn job_configs(&self) -> Result<Vec<(String, Config)>, ConfigError> {
        if self.jobs.is_empty() {
            if self.source_dir.as_os_str().is_empty() {
                return Err(ConfigError::invalid("Neither source_dir nor jobs configured"));
            }
            self.validate()?;
            return Ok(vec![(self.source_dir.display().to_string(), self.clone())]);
        }

        let mut configs = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            if job.source_dir.as_os_str().is_empty() {
                return Err(ConfigError::invalid("Job without source_dir"));
            }
            let name = job
                .name
                .clone()
                .unwrap_or_else(|| job.source_dir.display().to_string());

            let mut config = self.clone();
            config.jobs.clear();
            config.source_dir = job.source_dir.clone();
            if let Some(device) = job.device {
                config.device = device;
            }
            if let Some(ref owner) = job.owner {
                config.default_copyright_owner = owner.clone();
            }
            config.validate().map_err(|e| ConfigError::invalid(format!("Job '{}': {}", name, e)))?;
            configs.push((name, config));
        }
        Ok(configs)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Event Importer Configuration File
# This file uses TOML format (https://toml.io)

# Import source to organize (for example a phone dump).
# Ignored when [[jobs]] are listed below.
source_dir = "/photo/Puce-Mobile"

# Naming scheme of the source: "iphone", "samsung", "threema" or "panasonic"
device = "iphone"

# Owner id used below every event directory
default_copyright_owner = "puce"

# Category new files are filed under:
# "owner-events", "private-events", "business-events", "other-events" or "things"
default_category = "private-events"

# File operation: "move", "copy" or "hardlink"
operation = "move"

# Day-directory sources only: smaller files (bytes) go to <event>/<owner>/uncategorized
uncategorized_threshold = 1000000

# Import storages receive new files. Relative roots are resolved against source_dir.
[[storages]]
name = "importing photo"
root = "photo"
kind = "photo"
role = "import"
categories = ["private-events"]

[[storages]]
name = "importing video"
root = "video"
kind = "video"
role = "import"
categories = ["private-events"]

# Archive storages hold curated event directories and are only read.
[[storages]]
name = "photo archive"
root = "/photo/Events"
kind = "photo"
role = "archive"
categories = ["private-events", "owner-events"]

[[storages]]
name = "video archive"
root = "/video/Events"
kind = "video"
role = "archive"
categories = ["private-events", "owner-events"]

# Optional: several import sources, run one after another. A job that fails
# is logged and the next job still runs. device and owner default to the
# top-level values.
# [[jobs]]
# name = "iphone"
# source_dir = "/photo/Puce-Mobile"
#
# [[jobs]]
# name = "threema"
# source_dir = "/photo/Puce-Threema"
# device = "threema"
# owner = "flo"
"#
        .to_string()
    }
}

/// Errors that can occur when loading, saving or validating configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
    /// Configuration content is not usable
    Invalid {
        message: String,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::Invalid { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}
