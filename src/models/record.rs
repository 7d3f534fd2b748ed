use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::coordinate;

/// Lifecycle state of a record within one ingestion batch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    LoadedWithGps,
    LoadedNoGps,
    GpsManuallyChanged,
    MetaManuallyChanged,
    Geotagged,
    Error,
}

impl RecordStatus {
    /// Clean states carry no pending edits and are skipped by write-back.
    pub fn is_clean(self) -> bool {
        matches!(
            self,
            Self::LoadedWithGps | Self::LoadedNoGps | Self::Geotagged
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoadedWithGps => "loaded-with-gps",
            Self::LoadedNoGps => "loaded-no-gps",
            Self::GpsManuallyChanged => "gps-manually-changed",
            Self::MetaManuallyChanged => "meta-manually-changed",
            Self::Geotagged => "geotagged",
            Self::Error => "error",
        }
    }
}

/// Structured capture timestamp; absent entirely when the source value is
/// unparsable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CaptureTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Timezone offset in minutes east of UTC, when the source carried one.
    pub offset_minutes: Option<i32>,
}

impl CaptureTime {
    /// Parses the EXIF `"YYYY:MM:DD HH:MM:SS"` form plus an optional
    /// `±HH:MM` offset string.
    pub fn parse(date_time: &str, offset: Option<&str>) -> Option<Self> {
        use chrono::{Datelike, NaiveDateTime, Timelike};

        let trimmed = date_time.trim().trim_end_matches('\0');
        let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y:%m:%d %H:%M:%S").ok()?;

        Some(Self {
            year: parsed.year(),
            month: parsed.month(),
            day: parsed.day(),
            hour: parsed.hour(),
            minute: parsed.minute(),
            second: parsed.second(),
            offset_minutes: offset.and_then(parse_offset_minutes),
        })
    }

    /// Total-order key used for batch sorting.
    pub fn sort_key(&self) -> (i32, u32, u32, u32, u32, u32) {
        (
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        )
    }
}

fn parse_offset_minutes(text: &str) -> Option<i32> {
    let trimmed = text.trim().trim_end_matches('\0');
    let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };

    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || !(0..60).contains(&minutes) {
        return None;
    }

    Some(sign * (hours * 60 + minutes))
}

/// GPS fields of one record. Magnitudes are unsigned and paired with
/// hemisphere letters; `canonical_pos_string` is the authoritative signed
/// round-trip form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub lat_deg: f64,
    pub lat_ref: String,
    pub lon_deg: f64,
    pub lon_ref: String,
    pub altitude_meters: Option<f64>,
    pub direction_deg: Option<f64>,
    pub canonical_pos_string: String,
}

impl GpsData {
    pub fn from_signed(
        lat: f64,
        lon: f64,
        altitude_meters: Option<f64>,
        direction_deg: Option<f64>,
    ) -> Self {
        let canonical = coordinate::to_canonical(coordinate::Coordinate { lat, lon });

        Self {
            lat_deg: canonical.lat_abs,
            lat_ref: canonical.lat_ref.to_string(),
            lon_deg: canonical.lon_abs,
            lon_ref: canonical.lon_ref.to_string(),
            altitude_meters,
            direction_deg,
            canonical_pos_string: canonical.pos_string,
        }
    }

    pub fn signed_lat(&self) -> f64 {
        if self.lat_ref == "S" {
            -self.lat_deg
        } else {
            self.lat_deg
        }
    }

    pub fn signed_lon(&self) -> f64 {
        if self.lon_ref == "W" {
            -self.lon_deg
        } else {
            self.lon_deg
        }
    }
}

/// One processed image. Created by ingestion, mutated in place by write-back,
/// replaced wholesale by the next ingestion pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageRecord {
    pub index: usize,
    pub file_path: PathBuf,
    pub base_name: String,
    pub extension: String,
    pub capture_time: Option<CaptureTime>,
    pub camera: String,
    pub lens: String,
    pub orientation: u16,
    pub width: u32,
    pub height: u32,
    pub gps: Option<GpsData>,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    /// `"City, Province, Country"` when all three parts are known, else
    /// `"unknown"`.
    pub geolocation: String,
    pub thumbnail_path: PathBuf,
    pub status: RecordStatus,
}
