//! Date extraction module
//!
//! Every import source names its files (or day directories) after the moment
//! they were taken. A [`DateStrategy`] recognizes one device's naming scheme
//! and extracts the calendar day from it:
//! - iPhone: `IMG_20240601_143000.jpg`
//! - Samsung Galaxy: `20240601_143000.jpg`
//! - Threema: `<digits><13-digit epoch millis>...`
//! - Panasonic HD Writer AE: day directories named `06-01-2024`

pub mod filename;

use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use filename::{IPhoneStrategy, PanasonicStrategy, SamsungStrategy, ThreemaStrategy};

/// Device-specific naming scheme of an import source
pub trait DateStrategy {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether the source groups files into day directories instead of
    /// naming each file after its timestamp
    fn directories(&self) -> bool;

    /// Whether `name` follows this naming scheme
    fn matches(&self, name: &str) -> bool;

    /// Calendar day encoded in `name`.
    ///
    /// Fails with [`crate::Error::UnrecognizedName`] if `name` does not match
    /// and with [`crate::Error::TimestampParse`] if the embedded timestamp is
    /// invalid.
    fn extract_date(&self, name: &str) -> Result<NaiveDate>;
}

/// Known import devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// iPhone camera roll export
    #[default]
    Iphone,
    /// Samsung Galaxy camera folder
    Samsung,
    /// Threema media export
    Threema,
    /// Panasonic HD Writer AE day directories
    Panasonic,
}

impl Device {
    /// Build the date strategy for this device
    pub fn strategy(&self) -> Box<dyn DateStrategy> {
        match self {
            Device::Iphone => Box::new(IPhoneStrategy),
            Device::Samsung => Box::new(SamsungStrategy),
            Device::Threema => Box::new(ThreemaStrategy),
            Device::Panasonic => Box::new(PanasonicStrategy),
        }
    }
}
