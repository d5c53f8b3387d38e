//! Event storages
//!
//! A storage is a root directory whose immediate sub-directories are event
//! directories:
//!
//! ```text
//! <root>/2024-06-01--2024-06-02 Wedding/<owner>/IMG_20240601_143000.jpg
//! <root>/2024-06-03/<owner>/uncategorized/clip.mp4
//! ```
//!
//! The directory name encodes the event: a start day, an optional end day
//! after `--`, and an optional name after a space. Directories without a name
//! are unnamed day groupings.

use crate::category::CategoryKey;
use crate::config::{FileOperation, StorageConfig};
use crate::error::{Error, Result};
use crate::event::{Event, EventDuration};
use crate::fileops;
use crate::identity::OwnerId;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

lazy_static! {
    /// Pattern: YYYY-MM-DD[--YYYY-MM-DD][ name]
    static ref PATTERN_EVENT_DIR: Regex = Regex::new(
        r"^(\d{4}-\d{2}-\d{2})(?:--(\d{4}-\d{2}-\d{2}))?(?: (.*))?$"
    ).unwrap();
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Sub-directory for files that are not sorted into the event proper
pub const UNCATEGORIZED_DIR: &str = "uncategorized";

/// Directory name of an event
pub fn event_dir_name(event: &Event) -> Result<String> {
    let range = event.duration().day_range().ok_or_else(|| Error::Format {
        name: event.name().to_string(),
        message: "event has no whole-day range".into(),
    })?;

    let mut name = range.start_inclusive().format(DATE_FORMAT).to_string();
    if range.end_inclusive() != range.start_inclusive() {
        name.push_str("--");
        name.push_str(&range.end_inclusive().format(DATE_FORMAT).to_string());
    }
    if !event.is_unnamed() {
        name.push(' ');
        name.push_str(event.name());
    }
    Ok(name)
}

/// Parse an event directory name
pub fn parse_event_dir_name(dir_name: &str) -> Result<Event> {
    let format_error = |message: String| Error::Format {
        name: dir_name.to_string(),
        message,
    };

    let caps = PATTERN_EVENT_DIR
        .captures(dir_name)
        .ok_or_else(|| format_error("expected YYYY-MM-DD[--YYYY-MM-DD][ name]".into()))?;

    let parse_date = |raw: &str| {
        NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|e| format_error(format!("invalid date '{}': {}", raw, e)))
    };

    let start = parse_date(&caps[1])?;
    let end = match caps.get(2) {
        Some(end) => parse_date(end.as_str())?,
        None => start,
    };
    let duration =
        EventDuration::whole_days(start, end).map_err(|e| format_error(e.to_string()))?;
    let name = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
    let event = Event::new(name, duration);

    if event_dir_name(&event)? != dir_name {
        return Err(format_error("name is not in canonical form".into()));
    }
    Ok(event)
}

/// Storage of event directories
pub trait MediaStorage {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Category keys whose indexes see this storage's events
    fn category_keys(&self) -> &[CategoryKey];

    /// Events currently present in the storage
    fn parse_events(&self) -> Result<Vec<Event>>;

    /// Whether files named like `file_name` belong in this storage
    fn supports_extension(&self, file_name: &str) -> bool;

    /// Directory that receives files of `event` owned by `owner`
    fn resolve_event_dir_path(
        &self,
        event: &Event,
        owner: &OwnerId,
        uncategorized: bool,
    ) -> Result<PathBuf>;

    /// Migrate `file` into the directory of `event`, returning its new path
    fn import_file(
        &self,
        file: &Path,
        event: &Event,
        owner: &OwnerId,
        uncategorized: bool,
        operation: FileOperation,
    ) -> Result<PathBuf>;

    /// Move the content of `unnamed`'s directory into `named`'s directory
    fn merge_event_dirs(&self, unnamed: &Event, named: &Event) -> Result<PathBuf>;
}

/// Storage backed by a root directory on the local file system
#[derive(Debug, Clone)]
pub struct DirStorage {
    name: String,
    root: PathBuf,
    keys: Vec<CategoryKey>,
    extensions: Vec<String>,
}

impl DirStorage {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        keys: Vec<CategoryKey>,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            keys,
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Build from configuration, resolving relative roots against `base`
    pub fn from_config(config: &StorageConfig, base: &Path) -> Self {
        Self::new(
            config.name.clone(),
            config.resolved_root(base),
            config.category_keys(),
            config.extensions(),
        )
    }

    fn event_dir(&self, event: &Event) -> Result<PathBuf> {
        Ok(self.root.join(event_dir_name(event)?))
    }
}

impl MediaStorage for DirStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn category_keys(&self) -> &[CategoryKey] {
        &self.keys
    }

    fn parse_events(&self) -> Result<Vec<Event>> {
        if !self.root.exists() {
            debug!(storage = %self.name, root = ?self.root, "Storage root does not exist yet");
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                match e.into_io_error() {
                    Some(io) => Error::storage(path, io),
                    None => Error::storage(path, std::io::Error::other("directory loop")),
                }
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let Some(dir_name) = entry.file_name().to_str() else {
                warn!(storage = %self.name, path = ?entry.path(), "Skipping non UTF-8 directory");
                continue;
            };

            match parse_event_dir_name(dir_name) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(storage = %self.name, path = ?entry.path(), error = %e, "Skipping directory");
                }
            }
        }

        debug!(storage = %self.name, count = events.len(), "Parsed events");
        Ok(events)
    }

    fn supports_extension(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    fn resolve_event_dir_path(
        &self,
        event: &Event,
        owner: &OwnerId,
        uncategorized: bool,
    ) -> Result<PathBuf> {
        let mut dir = self.event_dir(event)?;
        dir.push(owner.as_str());
        if uncategorized {
            dir.push(UNCATEGORIZED_DIR);
        }
        Ok(dir)
    }

    fn import_file(
        &self,
        file: &Path,
        event: &Event,
        owner: &OwnerId,
        uncategorized: bool,
        operation: FileOperation,
    ) -> Result<PathBuf> {
        let file_name = file.file_name().ok_or_else(|| Error::Format {
            name: file.display().to_string(),
            message: "path has no file name".into(),
        })?;

        let dir = self.resolve_event_dir_path(event, owner, uncategorized)?;
        let dest = fileops::resolve_filename_conflict(dir.join(file_name))?;
        fileops::perform_file_operation(file, &dest, operation)?;
        Ok(dest)
    }

    fn merge_event_dirs(&self, unnamed: &Event, named: &Event) -> Result<PathBuf> {
        if !unnamed.is_unnamed() || named.is_unnamed() {
            return Err(Error::Format {
                name: format!("{} -> {}", unnamed, named),
                message: "can only merge an unnamed event into a named one".into(),
            });
        }

        let source = self.event_dir(unnamed)?;
        let dest = self.event_dir(named)?;
        if !source.is_dir() {
            return Err(Error::storage(
                &source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "event directory not found"),
            ));
        }

        let moved = fileops::move_dir_contents(&source, &dest)?;
        fileops::delete_empty_dir(&source)?;

        info!(
            storage = %self.name,
            from = ?source,
            to = ?dest,
            moved,
            "Merged unnamed event directory"
        );
        Ok(dest)
    }
}
