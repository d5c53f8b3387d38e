//! Import jobs
//!
//! A job is one import source with its own organizer run. Jobs run one
//! after another; a job that fails is logged and the next one still runs.

use crate::config::{Config, ConfigError};
use crate::error::Result;
use crate::process::{Organizer, RunReport};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, error, info, span};

/// One configured import source
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub name: String,
    pub config: Config,
}

impl ImportJob {
    /// All jobs of a configuration, validated
    pub fn from_config(config: &Config) -> std::result::Result<Vec<Self>, ConfigError> {
        Ok(config
            .job_configs()?
            .into_iter()
            .map(|(name, config)| Self { name, config })
            .collect())
    }

    /// Reconcile and organize this job's source
    pub fn run(&self) -> Result<RunReport> {
        let _span = span!(Level::INFO, "job", name = %self.name).entered();
        let mut organizer = Organizer::from_config(&self.config)?;
        organizer.run()
    }
}

/// Outcome of one job
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub name: String,
    pub source_dir: PathBuf,
    /// Present when the job finished
    pub report: Option<RunReport>,
    /// Present when the job was aborted
    pub error: Option<String>,
}

impl JobReport {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Write all job reports as one pretty JSON array
    pub fn save_all(reports: &[JobReport], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(reports)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Run every job in order, isolating failures
pub fn run_jobs(jobs: &[ImportJob]) -> Vec<JobReport> {
    let mut reports = Vec::with_capacity(jobs.len());
    for (i, job) in jobs.iter().enumerate() {
        info!(job = %job.name, index = i + 1, total = jobs.len(), "Starting import job");
        let (report, error) = match job.run() {
            Ok(report) => {
                info!(job = %job.name, summary = %report.stats.summary(), "Import job finished");
                (Some(report), None)
            }
            Err(e) => {
                error!(job = %job.name, error = %e, "Import job aborted");
                (None, Some(e.to_string()))
            }
        };
        reports.push(JobReport {
            name: job.name.clone(),
            source_dir: job.config.source_dir.clone(),
            report,
            error,
        });
    }
    reports
}
