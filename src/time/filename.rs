//! Filename timestamp parsing per device

use super::DateStrategy;
use crate::error::{Error, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::trace;

lazy_static! {
    /// Pattern: IMG_YYYYMMDD_HHmmss.ext (iPhone)
    static ref PATTERN_IPHONE: Regex = Regex::new(
        r"^IMG_(\d{8}_\d{6})\..*$"
    ).unwrap();

    /// Pattern: YYYYMMDD_HHmmss.ext (Samsung Galaxy camera)
    static ref PATTERN_SAMSUNG: Regex = Regex::new(
        r"^(\d{8}_\d{6})\..*$"
    ).unwrap();

    /// Pattern: digits ending in a 13 digit epoch millisecond timestamp (Threema)
    static ref PATTERN_THREEMA: Regex = Regex::new(
        r"^\d+(\d{13}).*$"
    ).unwrap();

    /// Pattern: MM-DD-YYYY day directory (Panasonic HD Writer AE)
    static ref PATTERN_PANASONIC: Regex = Regex::new(
        r"^(\d{2}-\d{2}-\d{4})$"
    ).unwrap();
}

const COMPACT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const PANASONIC_DATE_FORMAT: &str = "%m-%d-%Y";

fn captures<'a>(pattern: &Regex, name: &'a str) -> Result<Captures<'a>> {
    pattern
        .captures(name)
        .ok_or_else(|| Error::UnrecognizedName(name.to_string()))
}

fn parse_compact_timestamp(name: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDateTime::parse_from_str(raw, COMPACT_TIMESTAMP_FORMAT)
        .map(|dt| dt.date())
        .map_err(|e| Error::TimestampParse {
            source_info: name.to_string(),
            message: e.to_string(),
        })
}

/// iPhone camera roll: `IMG_20240601_143000.HEIC`
#[derive(Debug, Clone, Copy, Default)]
pub struct IPhoneStrategy;

impl DateStrategy for IPhoneStrategy {
    fn name(&self) -> &'static str {
        "iphone"
    }

    fn directories(&self) -> bool {
        false
    }

    fn matches(&self, name: &str) -> bool {
        PATTERN_IPHONE.is_match(name)
    }

    fn extract_date(&self, name: &str) -> Result<NaiveDate> {
        let caps = captures(&PATTERN_IPHONE, name)?;
        trace!(name, "Matched iPhone pattern");
        parse_compact_timestamp(name, &caps[1])
    }
}

/// Samsung Galaxy camera: `20240601_143000.jpg`
#[derive(Debug, Clone, Copy, Default)]
pub struct SamsungStrategy;

impl DateStrategy for SamsungStrategy {
    fn name(&self) -> &'static str {
        "samsung"
    }

    fn directories(&self) -> bool {
        false
    }

    fn matches(&self, name: &str) -> bool {
        PATTERN_SAMSUNG.is_match(name)
    }

    fn extract_date(&self, name: &str) -> Result<NaiveDate> {
        let caps = captures(&PATTERN_SAMSUNG, name)?;
        trace!(name, "Matched Samsung pattern");
        parse_compact_timestamp(name, &caps[1])
    }
}

/// Threema media export: the last 13 digits of the leading digit run are
/// epoch milliseconds, interpreted in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreemaStrategy;

impl DateStrategy for ThreemaStrategy {
    fn name(&self) -> &'static str {
        "threema"
    }

    fn directories(&self) -> bool {
        false
    }

    fn matches(&self, name: &str) -> bool {
        PATTERN_THREEMA.is_match(name)
    }

    fn extract_date(&self, name: &str) -> Result<NaiveDate> {
        let caps = captures(&PATTERN_THREEMA, name)?;
        trace!(name, "Matched Threema pattern");
        let millis: i64 = caps[1].parse().map_err(|e: std::num::ParseIntError| {
            Error::TimestampParse {
                source_info: name.to_string(),
                message: e.to_string(),
            }
        })?;
        let utc = DateTime::from_timestamp_millis(millis).ok_or_else(|| Error::TimestampParse {
            source_info: name.to_string(),
            message: format!("epoch millis {} out of range", millis),
        })?;
        Ok(utc.with_timezone(&Local).date_naive())
    }
}

/// Panasonic HD Writer AE: files grouped into `06-01-2024` directories
#[derive(Debug, Clone, Copy, Default)]
pub struct PanasonicStrategy;

impl DateStrategy for PanasonicStrategy {
    fn name(&self) -> &'static str {
        "panasonic"
    }

    fn directories(&self) -> bool {
        true
    }

    fn matches(&self, name: &str) -> bool {
        PATTERN_PANASONIC.is_match(name)
    }

    fn extract_date(&self, name: &str) -> Result<NaiveDate> {
        let caps = captures(&PATTERN_PANASONIC, name)?;
        trace!(name, "Matched Panasonic pattern");
        NaiveDate::parse_from_str(&caps[1], PANASONIC_DATE_FORMAT).map_err(|e| {
            Error::TimestampParse {
                source_info: name.to_string(),
                message: e.to_string(),
            }
        })
    }
}
