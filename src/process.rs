//! Import organizer
//!
//! Handles the core logic of:
//! - Seeding one event index per category key from the archive storages
//! - Registering named events of the import storages before anything else
//! - Merging unnamed day groupings into overlapping named events
//! - Routing newly imported files into the canonical event of their day

use crate::category::{CategoryKey, IndexSet, MediaCategory, MediaKind};
use crate::config::{Config, FileOperation, StorageRole};
use crate::error::{Error, Result};
use crate::event::{Event, EventIndex};
use crate::fileops;
use crate::identity::OwnerId;
use crate::storage::{DirStorage, MediaStorage};
use crate::time::DateStrategy;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, debug, error, info, span, trace, warn};
use walkdir::WalkDir;

/// Status of file processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    /// File was migrated into an event directory
    Imported,
    /// No import storage accepts the file
    Skipped,
    /// Processing failed
    Failed,
}

/// Result of processing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    /// Source file path
    pub source: PathBuf,
    /// Destination file path (if successful)
    pub destination: Option<PathBuf>,
    /// Event the file was filed under
    pub event: Option<String>,
    /// Category key of the destination index
    pub key: Option<CategoryKey>,
    /// Processing status
    pub status: ProcessingStatus,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl FileResult {
    fn skipped(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            event: None,
            key: None,
            status: ProcessingStatus::Skipped,
            error: None,
        }
    }

    fn failed(source: &Path, error: &Error) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            event: None,
            key: None,
            status: ProcessingStatus::Failed,
            error: Some(error.to_string()),
        }
    }
}

/// Counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeStats {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub merged: usize,
    pub merge_failed: usize,
    pub storages_failed: usize,
    pub removed_dirs: usize,
}

impl OrganizeStats {
    pub fn summary(&self) -> String {
        format!(
            "Imported: {}, Skipped: {}, Failed: {}, Merged: {}, Merge failures: {}, Unreadable storages: {}",
            self.imported,
            self.skipped,
            self.failed,
            self.merged,
            self.merge_failed,
            self.storages_failed
        )
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub stats: OrganizeStats,
    pub results: Vec<FileResult>,
}

/// Where the first occupied day of an unnamed event leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTarget {
    /// The first occupied day has a named event to merge into
    Named(Event),
    /// The first occupied day only holds unnamed events
    Occupied(NaiveDate),
    /// No day of the range has any event
    Free,
}

/// Find the merge target of `unnamed` in `index`.
///
/// Only the first day of the range that has any event is inspected. Later
/// days are not searched, even if the first hit holds only unnamed events.
pub fn find_merge_target(index: &EventIndex, unnamed: &Event) -> MergeTarget {
    let Some(range) = unnamed.duration().day_range() else {
        return MergeTarget::Free;
    };

    for day in range.days() {
        if index.has_event(day) {
            return match index.events_on(day).find(|event| !event.is_unnamed()) {
                Some(named) => MergeTarget::Named(named.clone()),
                None => MergeTarget::Occupied(day),
            };
        }
    }
    MergeTarget::Free
}

/// Run settings that are not storages or strategies
#[derive(Debug, Clone)]
pub struct ImportSettings {
    /// Import source to organize
    pub source_dir: PathBuf,
    /// Owner id used in destination paths
    pub owner: OwnerId,
    /// Category new files are filed under
    pub default_category: MediaCategory,
    /// How files are migrated
    pub operation: FileOperation,
    /// Files below this size in day directories are uncategorized
    pub uncategorized_threshold: u64,
}

/// Reconciles import storages against existing events and files new media
pub struct Organizer {
    settings: ImportSettings,
    strategy: Box<dyn DateStrategy>,
    archives: Vec<Box<dyn MediaStorage>>,
    imports: Vec<Box<dyn MediaStorage>>,
    indexes: IndexSet,
    failed_storages: BTreeSet<String>,
    stats: OrganizeStats,
}

impl Organizer {
    pub fn new(
        settings: ImportSettings,
        strategy: Box<dyn DateStrategy>,
        archives: Vec<Box<dyn MediaStorage>>,
        imports: Vec<Box<dyn MediaStorage>>,
    ) -> Self {
        let keys: Vec<CategoryKey> = archives
            .iter()
            .chain(imports.iter())
            .flat_map(|storage| storage.category_keys().iter().copied())
            .collect();

        Self {
            settings,
            strategy,
            archives,
            imports,
            indexes: IndexSet::new(keys),
            failed_storages: BTreeSet::new(),
            stats: OrganizeStats::default(),
        }
    }

    /// Build an organizer with directory storages from a validated
    /// configuration (see [`Config::validate`])
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = ImportSettings {
            source_dir: config.source_dir.clone(),
            owner: config.owner_id().map_err(|e| Error::Config(e.to_string()))?,
            default_category: config.default_category,
            operation: config.operation,
            uncategorized_threshold: config.uncategorized_threshold,
        };

        let build = |role: StorageRole| -> Vec<Box<dyn MediaStorage>> {
            config
                .storages_with_role(role)
                .map(|s| Box::new(DirStorage::from_config(s, &config.source_dir)) as Box<dyn MediaStorage>)
                .collect()
        };

        Ok(Self::new(
            settings,
            config.device.strategy(),
            build(StorageRole::Archive),
            build(StorageRole::Import),
        ))
    }

    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    pub fn stats(&self) -> &OrganizeStats {
        &self.stats
    }

    /// Reconcile the indexes, then file every matching source entry
    pub fn run(&mut self) -> Result<RunReport> {
        let _span = span!(Level::INFO, "organizer_run", strategy = self.strategy.name()).entered();

        self.reconcile();
        let results = self.organize()?;

        info!(summary = %self.stats.summary(), "Run complete");
        Ok(RunReport {
            stats: self.stats.clone(),
            results,
        })
    }

    /// Build the per-category indexes from the storages.
    ///
    /// Archive events are seeded first, then named import events, and only
    /// then are unnamed import events merged or registered.
    pub fn reconcile(&mut self) {
        let _span = span!(Level::INFO, "reconcile").entered();

        info!(storages = self.archives.len(), "Seeding indexes from archive storages");
        for storage in &self.archives {
            register_from(storage.as_ref(), &mut self.indexes, &mut self.failed_storages, |_| true);
        }

        info!(storages = self.imports.len(), "Registering named import events");
        for storage in &self.imports {
            register_from(storage.as_ref(), &mut self.indexes, &mut self.failed_storages, |e| {
                !e.is_unnamed()
            });
        }

        info!("Merging unnamed import events");
        for storage in &self.imports {
            let events = match storage.parse_events() {
                Ok(events) => events,
                Err(e) => {
                    error!(storage = storage.name(), error = %e, "Failed to read import storage");
                    self.failed_storages.insert(storage.name().to_string());
                    continue;
                }
            };
            for unnamed in events.iter().filter(|e| e.is_unnamed()) {
                merge_unnamed(storage.as_ref(), &self.indexes, unnamed, &mut self.stats);
            }
        }

        info!("Registering remaining unnamed import events");
        for storage in &self.imports {
            register_from(storage.as_ref(), &mut self.indexes, &mut self.failed_storages, |e| {
                e.is_unnamed()
            });
        }

        self.stats.storages_failed = self.failed_storages.len();
        for (key, index) in self.indexes.iter() {
            debug!(%key, days = index.day_count(), "Index ready");
        }
    }

    /// File every matching entry of the source directory.
    ///
    /// Only [`Error::UnrecognizedName`] and failures to list the source abort
    /// the batch; every other failure is recorded per file.
    pub fn organize(&mut self) -> Result<Vec<FileResult>> {
        let _span = span!(Level::INFO, "organize").entered();
        let directories = self.strategy.directories();

        info!(source = ?self.settings.source_dir, "Scanning import source...");
        let mut candidates = Vec::new();
        for entry in WalkDir::new(&self.settings.source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_dir() != directories {
                continue;
            }
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.strategy.matches(name));
            if matches {
                candidates.push(entry.into_path());
            } else {
                trace!(path = ?entry.path(), "Ignoring entry that does not match");
            }
        }
        info!(count = candidates.len(), "Found import candidates");

        let mut results = Vec::new();
        for path in candidates {
            if directories {
                self.organize_day_dir(&path, &mut results)?;
            } else {
                let name = file_name_of(&path)?.to_string();
                results.push(self.organize_file(&path, &name, false)?);
            }
        }
        Ok(results)
    }

    fn organize_day_dir(&mut self, dir: &Path, results: &mut Vec<FileResult>) -> Result<()> {
        let dir_name = file_name_of(dir)?.to_string();

        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(entry) => warn!(path = ?entry.path(), "Skipping nested entry in day directory"),
                Err(e) => {
                    error!(dir = ?dir, error = %e, "Failed to list day directory");
                    self.stats.failed += 1;
                    return Ok(());
                }
            }
        }

        for file in files {
            let uncategorized = match fs::metadata(&file) {
                Ok(metadata) => metadata.len() < self.settings.uncategorized_threshold,
                Err(e) => {
                    let e = Error::storage(&file, e);
                    error!(path = ?file, error = %e, "Failed to read file metadata");
                    self.stats.failed += 1;
                    results.push(FileResult::failed(&file, &e));
                    continue;
                }
            };
            results.push(self.organize_file(&file, &dir_name, uncategorized)?);
        }

        match fileops::delete_empty_dir(dir) {
            Ok(true) => {
                debug!(dir = ?dir, "Removed empty source directory");
                self.stats.removed_dirs += 1;
            }
            Ok(false) => debug!(dir = ?dir, "Source directory not empty, keeping it"),
            Err(e) => error!(dir = ?dir, error = %e, "Failed to remove source directory"),
        }
        Ok(())
    }

    fn organize_file(&mut self, file: &Path, date_name: &str, uncategorized: bool) -> Result<FileResult> {
        match self.route_file(file, date_name, uncategorized) {
            Ok(result) => Ok(result),
            Err(e @ Error::UnrecognizedName(_)) => Err(e),
            Err(e) => {
                error!(path = ?file, error = %e, "Failed to import file");
                self.stats.failed += 1;
                Ok(FileResult::failed(file, &e))
            }
        }
    }

    /// File one source file under the canonical event of the day encoded in
    /// `date_name` (the file name itself, or its day directory's name).
    pub fn route_file(
        &mut self,
        file: &Path,
        date_name: &str,
        uncategorized: bool,
    ) -> Result<FileResult> {
        let date = self.strategy.extract_date(date_name)?;
        let file_name = file_name_of(file)?;

        let Some((storage_idx, key)) = self.destination_for(file_name) else {
            warn!(path = ?file, category = %self.settings.default_category, "No import storage supports this file");
            self.stats.skipped += 1;
            return Ok(FileResult::skipped(file));
        };

        let event = self.indexes.index_mut(key).get_or_create_first_event(date);
        let storage = &self.imports[storage_idx];
        let destination = storage.import_file(
            file,
            &event,
            &self.settings.owner,
            uncategorized,
            self.settings.operation,
        )?;

        info!(
            source = ?file,
            destination = ?destination,
            %event,
            %key,
            "Imported file"
        );
        self.stats.imported += 1;

        Ok(FileResult {
            source: file.to_path_buf(),
            destination: Some(destination),
            event: Some(event.to_string()),
            key: Some(key),
            status: ProcessingStatus::Imported,
            error: None,
        })
    }

    /// Import storage and key for a file of the default category.
    /// Photo storages are asked before video storages.
    fn destination_for(&self, file_name: &str) -> Option<(usize, CategoryKey)> {
        [MediaKind::Photo, MediaKind::Video].into_iter().find_map(|kind| {
            let key = CategoryKey::new(self.settings.default_category, kind);
            self.imports
                .iter()
                .position(|s| s.category_keys().contains(&key) && s.supports_extension(file_name))
                .map(|idx| (idx, key))
        })
    }
}

fn file_name_of(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::Format {
            name: path.display().to_string(),
            message: "file name is not valid UTF-8".into(),
        })
}

/// Register the events of `storage` accepted by `filter` into all its keys
fn register_from(
    storage: &dyn MediaStorage,
    indexes: &mut IndexSet,
    failed_storages: &mut BTreeSet<String>,
    filter: impl Fn(&Event) -> bool,
) {
    match storage.parse_events() {
        Ok(events) => {
            let selected: Vec<Event> = events.into_iter().filter(|e| filter(e)).collect();
            let added = indexes.register_into(storage.category_keys(), &selected);
            debug!(storage = storage.name(), events = selected.len(), added, "Registered storage events");
        }
        Err(e) => {
            error!(storage = storage.name(), error = %e, "Failed to read storage, skipping it");
            failed_storages.insert(storage.name().to_string());
        }
    }
}

/// Merge one unnamed event into the named event of its first occupied day
fn merge_unnamed(
    storage: &dyn MediaStorage,
    indexes: &IndexSet,
    unnamed: &Event,
    stats: &mut OrganizeStats,
) {
    for key in storage.category_keys() {
        let Some(index) = indexes.get(key) else {
            continue;
        };

        match find_merge_target(index, unnamed) {
            MergeTarget::Named(named) => {
                match storage.merge_event_dirs(unnamed, &named) {
                    Ok(dest) => {
                        info!(storage = storage.name(), %key, %unnamed, %named, dest = ?dest, "Merged unnamed event");
                        stats.merged += 1;
                    }
                    Err(e) => {
                        error!(storage = storage.name(), %key, %unnamed, %named, error = %e, "Failed to merge unnamed event");
                        stats.merge_failed += 1;
                    }
                }
                return;
            }
            MergeTarget::Occupied(day) => {
                debug!(storage = storage.name(), %key, %unnamed, %day, "First occupied day has no named event, not merging");
                return;
            }
            MergeTarget::Free => {}
        }
    }
    trace!(storage = storage.name(), %unnamed, "No overlapping event");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::event::EventDuration;
    use crate::time::Device;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::{TempDir, tempdir};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(name: &str, start: NaiveDate, end: NaiveDate) -> Event {
        Event::new(name, EventDuration::whole_days(start, end).unwrap())
    }

    fn photo_key() -> CategoryKey {
        CategoryKey::new(MediaCategory::PrivateEvents, MediaKind::Photo)
    }

    fn storage_config(name: &str, root: PathBuf, kind: MediaKind, role: StorageRole) -> StorageConfig {
        StorageConfig {
            name: name.into(),
            root,
            kind,
            role,
            categories: vec![MediaCategory::PrivateEvents],
            extensions: None,
        }
    }

    fn write_file(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Source dir with relative `photo`/`video` import storages and an
    /// absolute photo archive next to it
    fn setup(device: Device) -> (TempDir, Config) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let archive = dir.path().join("archive");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&archive).unwrap();

        let config = Config {
            source_dir: source,
            device,
            default_copyright_owner: "puce".into(),
            default_category: MediaCategory::PrivateEvents,
            operation: FileOperation::Move,
            uncategorized_threshold: 4,
            storages: vec![
                storage_config("importing photo", "photo".into(), MediaKind::Photo, StorageRole::Import),
                storage_config("importing video", "video".into(), MediaKind::Video, StorageRole::Import),
                storage_config("photo archive", archive, MediaKind::Photo, StorageRole::Archive),
            ],
            jobs: vec![],
        };
        (dir, config)
    }

    #[test]
    fn test_organize_stats_summary() {
        let stats = OrganizeStats {
            imported: 5,
            merged: 2,
            failed: 1,
            ..OrganizeStats::default()
        };
        let summary = stats.summary();
        assert!(summary.contains("Imported: 5"));
        assert!(summary.contains("Merged: 2"));
        assert!(summary.contains("Failed: 1"));
    }

    #[test]
    fn test_find_merge_target_stops_at_first_occupied_day() {
        let mut index = EventIndex::new();
        index.register(&Event::unnamed_day(date(2024, 6, 1)));
        let party = event("Party", date(2024, 6, 2), date(2024, 6, 2));
        index.register(&party);

        let unnamed = event("", date(2024, 6, 1), date(2024, 6, 2));
        assert_eq!(
            find_merge_target(&index, &unnamed),
            MergeTarget::Occupied(date(2024, 6, 1))
        );

        let later = event("", date(2024, 6, 2), date(2024, 6, 3));
        assert_eq!(find_merge_target(&index, &later), MergeTarget::Named(party));

        let free = event("", date(2024, 7, 1), date(2024, 7, 3));
        assert_eq!(find_merge_target(&index, &free), MergeTarget::Free);
    }

    #[test]
    fn test_find_merge_target_skips_unnamed_on_same_day() {
        let mut index = EventIndex::new();
        index.register(&Event::unnamed_day(date(2024, 6, 1)));
        let trip = event("Trip", date(2024, 5, 30), date(2024, 6, 1));
        index.register(&trip);

        let unnamed = Event::unnamed_day(date(2024, 6, 1));
        assert_eq!(find_merge_target(&index, &unnamed), MergeTarget::Named(trip));
    }

    #[test]
    fn test_unnamed_import_event_merges_into_named() {
        let (dir, config) = setup(Device::Iphone);
        let photo = config.source_dir.join("photo");
        write_file(&photo.join("2024-06-01--2024-06-02 Wedding/puce/a.jpg"), b"a");
        write_file(&photo.join("2024-06-02--2024-06-03/puce/b.jpg"), b"b");

        let mut organizer = Organizer::from_config(&config).unwrap();
        organizer.reconcile();

        assert_eq!(organizer.stats().merged, 1);
        assert!(photo.join("2024-06-01--2024-06-02 Wedding/puce/b.jpg").exists());
        assert!(!photo.join("2024-06-02--2024-06-03").exists());

        let all = organizer.indexes().get(&photo_key()).unwrap().all_events();
        let names: Vec<_> = all.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["Wedding"]);
        drop(dir);
    }

    #[test]
    fn test_merge_short_circuits_on_unnamed_first_day() {
        let (dir, config) = setup(Device::Iphone);
        let archive = dir.path().join("archive");
        fs::create_dir_all(archive.join("2024-06-01")).unwrap();
        fs::create_dir_all(archive.join("2024-06-02 Party")).unwrap();

        let photo = config.source_dir.join("photo");
        write_file(&photo.join("2024-06-01--2024-06-02/puce/c.jpg"), b"c");

        let mut organizer = Organizer::from_config(&config).unwrap();
        organizer.reconcile();

        assert_eq!(organizer.stats().merged, 0);
        assert!(photo.join("2024-06-01--2024-06-02/puce/c.jpg").exists());
        assert!(!photo.join("2024-06-02 Party").exists());

        let index = organizer.indexes().get(&photo_key()).unwrap();
        assert!(
            index
                .all_events()
                .contains(&event("", date(2024, 6, 1), date(2024, 6, 2)))
        );
        assert_eq!(index.all_events().len(), 3);
    }

    #[test]
    fn test_unnamed_without_overlap_is_registered_later() {
        let (_dir, config) = setup(Device::Iphone);
        let photo = config.source_dir.join("photo");
        fs::create_dir_all(photo.join("2024-08-10--2024-08-11")).unwrap();

        let mut organizer = Organizer::from_config(&config).unwrap();
        organizer.reconcile();

        let index = organizer.indexes().get(&photo_key()).unwrap();
        let unnamed = event("", date(2024, 8, 10), date(2024, 8, 11));
        assert_eq!(index.first_event(date(2024, 8, 11)).unwrap(), &unnamed);
        assert!(photo.join("2024-08-10--2024-08-11").exists());
    }

    #[test]
    fn test_named_import_event_wins_over_unnamed_import_event() {
        let (_dir, config) = setup(Device::Iphone);
        let photo = config.source_dir.join("photo");
        fs::create_dir_all(photo.join("2024-09-01")).unwrap();
        fs::create_dir_all(photo.join("2024-09-01 Birthday")).unwrap();

        let mut organizer = Organizer::from_config(&config).unwrap();
        organizer.reconcile();

        assert_eq!(organizer.stats().merged, 1);
        let index = organizer.indexes().get(&photo_key()).unwrap();
        assert_eq!(index.first_event(date(2024, 9, 1)).unwrap().name(), "Birthday");
        assert!(!photo.join("2024-09-01").exists());
    }

    #[test]
    fn test_routes_files_into_events() {
        let (dir, config) = setup(Device::Iphone);
        let source = config.source_dir.clone();
        fs::create_dir_all(dir.path().join("archive/2024-06-01--2024-06-02 Wedding")).unwrap();
        write_file(&source.join("IMG_20240601_101010.jpg"), b"jpg");
        write_file(&source.join("IMG_20240602_111111.JPG"), b"jpg2");
        write_file(&source.join("IMG_20240605_101010.mov"), b"mov");
        write_file(&source.join("IMG_20240605_121212.txt"), b"txt");
        write_file(&source.join("notes.txt"), b"notes");

        let mut organizer = Organizer::from_config(&config).unwrap();
        let report = organizer.run().unwrap();

        assert_eq!(report.stats.imported, 3);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.failed, 0);
        assert_eq!(report.results.len(), 4);

        let wedding = source.join("photo/2024-06-01--2024-06-02 Wedding/puce");
        assert!(wedding.join("IMG_20240601_101010.jpg").exists());
        assert!(wedding.join("IMG_20240602_111111.JPG").exists());
        assert!(source.join("video/2024-06-05/puce/IMG_20240605_101010.mov").exists());
        assert!(source.join("IMG_20240605_121212.txt").exists());
        assert!(source.join("notes.txt").exists());
        assert!(!source.join("IMG_20240601_101010.jpg").exists());

        let video_key = CategoryKey::new(MediaCategory::PrivateEvents, MediaKind::Video);
        let video_index = organizer.indexes().get(&video_key).unwrap();
        assert!(video_index.first_event(date(2024, 6, 5)).unwrap().is_unnamed());
    }

    #[test]
    fn test_same_day_files_share_unnamed_event() {
        let (_dir, config) = setup(Device::Samsung);
        let source = config.source_dir.clone();
        write_file(&source.join("20240710_080000.jpg"), b"1");
        write_file(&source.join("20240710_200000.jpg"), b"2");

        let mut organizer = Organizer::from_config(&config).unwrap();
        let report = organizer.run().unwrap();

        assert_eq!(report.stats.imported, 2);
        let day_dir = source.join("photo/2024-07-10/puce");
        assert!(day_dir.join("20240710_080000.jpg").exists());
        assert!(day_dir.join("20240710_200000.jpg").exists());
        let index = organizer.indexes().get(&photo_key()).unwrap();
        assert_eq!(index.all_events().len(), 1);
    }

    #[test]
    fn test_day_directories_with_uncategorized_files() {
        let (_dir, config) = setup(Device::Panasonic);
        let source = config.source_dir.clone();
        write_file(&source.join("06-01-2024/big.mts"), b"0123456789");
        write_file(&source.join("06-01-2024/tiny.mts"), b"0");
        write_file(&source.join("06-02-2024/readme.doc"), b"doc");

        let mut organizer = Organizer::from_config(&config).unwrap();
        let report = organizer.run().unwrap();

        assert_eq!(report.stats.imported, 2);
        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.removed_dirs, 1);

        let event_dir = source.join("video/2024-06-01/puce");
        assert!(event_dir.join("big.mts").exists());
        assert!(event_dir.join("uncategorized/tiny.mts").exists());
        assert!(!source.join("06-01-2024").exists());
        assert!(source.join("06-02-2024/readme.doc").exists());
    }

    #[test]
    fn test_unrecognized_name_fails_before_index_mutation() {
        let (_dir, config) = setup(Device::Iphone);
        let file = config.source_dir.join("holiday.jpg");
        write_file(&file, b"x");

        let mut organizer = Organizer::from_config(&config).unwrap();
        let err = organizer.route_file(&file, "holiday.jpg", false).unwrap_err();

        assert!(matches!(err, Error::UnrecognizedName(_)));
        assert!(organizer.indexes().iter().all(|(_, index)| index.is_empty()));
        assert!(file.exists());
    }

    #[test]
    fn test_invalid_timestamp_is_a_per_file_failure() {
        let (_dir, config) = setup(Device::Iphone);
        let source = config.source_dir.clone();
        write_file(&source.join("IMG_20241399_000000.jpg"), b"bad");
        write_file(&source.join("IMG_20241201_000000.jpg"), b"good");

        let mut organizer = Organizer::from_config(&config).unwrap();
        let report = organizer.run().unwrap();

        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.imported, 1);
        let failed = report
            .results
            .iter()
            .find(|r| r.status == ProcessingStatus::Failed)
            .unwrap();
        assert!(failed.error.as_deref().unwrap().contains("IMG_20241399_000000.jpg"));
    }

    #[test]
    fn test_from_config_rejects_invalid_owner() {
        let (_dir, mut config) = setup(Device::Iphone);
        config.default_copyright_owner = "../escape".into();
        assert!(matches!(Organizer::from_config(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_report_serialization() {
        let report = RunReport {
            stats: OrganizeStats::default(),
            results: vec![FileResult::skipped(Path::new("a.txt"))],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["status"], "skipped");
        assert_eq!(json["stats"]["imported"], 0);
    }

    /// Storage with fixed events whose merges fail for selected start days
    struct ScriptedStorage {
        keys: Vec<CategoryKey>,
        events: Vec<Event>,
        failing: Vec<NaiveDate>,
        merges: Rc<RefCell<Vec<(Event, Event)>>>,
    }

    impl MediaStorage for ScriptedStorage {
        fn name(&self) -> &str {
            "scripted"
        }

        fn category_keys(&self) -> &[CategoryKey] {
            &self.keys
        }

        fn parse_events(&self) -> Result<Vec<Event>> {
            Ok(self.events.clone())
        }

        fn supports_extension(&self, _file_name: &str) -> bool {
            false
        }

        fn resolve_event_dir_path(&self, _: &Event, _: &OwnerId, _: bool) -> Result<PathBuf> {
            Ok(PathBuf::new())
        }

        fn import_file(
            &self,
            _: &Path,
            _: &Event,
            _: &OwnerId,
            _: bool,
            _: FileOperation,
        ) -> Result<PathBuf> {
            Ok(PathBuf::new())
        }

        fn merge_event_dirs(&self, unnamed: &Event, named: &Event) -> Result<PathBuf> {
            let start = unnamed.duration().day_range().unwrap().start_inclusive();
            if self.failing.contains(&start) {
                return Err(Error::Format {
                    name: unnamed.to_string(),
                    message: "scripted failure".into(),
                });
            }
            self.merges.borrow_mut().push((unnamed.clone(), named.clone()));
            Ok(PathBuf::new())
        }
    }

    /// Storage whose directory cannot be read
    struct UnreadableStorage {
        keys: Vec<CategoryKey>,
    }

    impl MediaStorage for UnreadableStorage {
        fn name(&self) -> &str {
            "unreadable"
        }

        fn category_keys(&self) -> &[CategoryKey] {
            &self.keys
        }

        fn parse_events(&self) -> Result<Vec<Event>> {
            Err(Error::storage(
                "/unreadable",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        }

        fn supports_extension(&self, _file_name: &str) -> bool {
            false
        }

        fn resolve_event_dir_path(&self, _: &Event, _: &OwnerId, _: bool) -> Result<PathBuf> {
            Ok(PathBuf::new())
        }

        fn import_file(
            &self,
            _: &Path,
            _: &Event,
            _: &OwnerId,
            _: bool,
            _: FileOperation,
        ) -> Result<PathBuf> {
            Ok(PathBuf::new())
        }

        fn merge_event_dirs(&self, _: &Event, _: &Event) -> Result<PathBuf> {
            Ok(PathBuf::new())
        }
    }

    fn settings() -> ImportSettings {
        ImportSettings {
            source_dir: PathBuf::from("/nonexistent"),
            owner: OwnerId::new("puce").unwrap(),
            default_category: MediaCategory::PrivateEvents,
            operation: FileOperation::Move,
            uncategorized_threshold: 1_000_000,
        }
    }

    #[test]
    fn test_failed_merge_does_not_abort_reconciliation() {
        let summer = event("Summer", date(2024, 7, 1), date(2024, 7, 31));
        let merges = Rc::new(RefCell::new(Vec::new()));
        let imports: Vec<Box<dyn MediaStorage>> = vec![Box::new(ScriptedStorage {
            keys: vec![photo_key()],
            events: vec![
                summer.clone(),
                event("", date(2024, 7, 2), date(2024, 7, 3)),
                event("", date(2024, 7, 10), date(2024, 7, 10)),
            ],
            failing: vec![date(2024, 7, 2)],
            merges: Rc::clone(&merges),
        })];
        let archives: Vec<Box<dyn MediaStorage>> = vec![Box::new(UnreadableStorage {
            keys: vec![photo_key()],
        })];

        let mut organizer =
            Organizer::new(settings(), Device::Iphone.strategy(), archives, imports);
        organizer.reconcile();

        let stats = organizer.stats();
        assert_eq!(stats.merge_failed, 1);
        assert_eq!(stats.merged, 1);
        assert_eq!(stats.storages_failed, 1);
        assert_eq!(
            *merges.borrow(),
            vec![(event("", date(2024, 7, 10), date(2024, 7, 10)), summer.clone())]
        );

        let index = organizer.indexes().get(&photo_key()).unwrap();
        assert_eq!(index.first_event(date(2024, 7, 10)).unwrap(), &summer);
    }

    #[test]
    fn test_unreadable_import_storage_counts_once() {
        let imports: Vec<Box<dyn MediaStorage>> = vec![Box::new(UnreadableStorage {
            keys: vec![photo_key()],
        })];

        let mut organizer =
            Organizer::new(settings(), Device::Iphone.strategy(), Vec::new(), imports);
        organizer.reconcile();

        assert_eq!(organizer.stats().storages_failed, 1);
        assert!(organizer.indexes().get(&photo_key()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_file_name_in_day_dir_is_a_per_file_failure() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_dir, config) = setup(Device::Panasonic);
        let source = config.source_dir.clone();
        let broken = source
            .join("06-01-2024")
            .join(OsStr::from_bytes(b"clip\xff.mts"));
        write_file(&broken, b"0123456789");
        write_file(&source.join("06-02-2024/good.mts"), b"0123456789");

        let mut organizer = Organizer::from_config(&config).unwrap();
        let report = organizer.run().unwrap();

        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.imported, 1);
        assert!(source.join("video/2024-06-02/puce/good.mts").exists());
        assert!(broken.exists());
        assert!(source.join("06-01-2024").exists());
    }
}
