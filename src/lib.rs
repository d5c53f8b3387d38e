//! Event Importer - files imported camera and phone media into event directories
//!
//! This library reconciles freshly imported media against the event
//! directories that already exist in photo and video storages:
//! - Date-indexed event registry per content category and media kind
//! - Deterministic canonical event for every day
//! - Merging of unnamed day groupings into overlapping named events
//! - Device-specific filename date extraction (iPhone, Samsung, Threema, Panasonic)
//! - Move, copy or hardlink migration into `<event>/<owner>` directories
//! - Several import sources run as independent jobs

pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod fileops;
pub mod identity;
pub mod job;
pub mod process;
pub mod storage;
pub mod time;

pub use category::{CategoryKey, IndexSet, MediaCategory, MediaKind};
pub use cli::Cli;
pub use config::{Config, ConfigError, FileOperation, JobConfig, StorageConfig, StorageRole};
pub use error::{Error, Result};
pub use event::{DayRange, Event, EventDuration, EventIndex};
pub use identity::OwnerId;
pub use job::{ImportJob, JobReport, run_jobs};
pub use process::{FileResult, Organizer, OrganizeStats, ProcessingStatus, RunReport};
pub use storage::{DirStorage, MediaStorage};
pub use time::{DateStrategy, Device};
