use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::exif_io::{ExifAdapter, ExifFields};
use crate::core::formats;
use crate::core::thumbnail::ThumbnailCache;
use crate::models::{CaptureTime, GpsData, ImageRecord, RecordStatus};

#[derive(Debug)]
pub enum IngestError {
    FolderNotFound(PathBuf),
    Io(std::io::Error),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FolderNotFound(path) => write!(f, "folder not found: {}", path.display()),
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Turns an image folder into a time-sorted, indexed batch of records.
/// Per-file extraction runs in parallel; a failing file is logged and
/// omitted without disturbing its siblings.
pub struct MetadataIngestor {
    adapter: Arc<dyn ExifAdapter>,
    thumbnails: ThumbnailCache,
}

impl MetadataIngestor {
    pub fn new(adapter: Arc<dyn ExifAdapter>, thumbnails: ThumbnailCache) -> Self {
        Self {
            adapter,
            thumbnails,
        }
    }

    pub fn ingest(&self, folder: &Path, allowed_extensions: &[&str]) -> Result<Vec<ImageRecord>> {
        if !folder.is_dir() {
            return Err(IngestError::FolderNotFound(folder.to_path_buf()));
        }

        let allow_list: Vec<String> = allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(folder)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && formats::extension_allowed(&path, &allow_list) {
                files.push(path);
            }
        }
        // Name order makes encounter order deterministic across platforms.
        files.sort();

        // One slot per file, order-preserving, so parallel workers never
        // contend on a shared append.
        let slots: Vec<Option<ImageRecord>> = files
            .par_iter()
            .map(|path| match self.load_record(path) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::warn!("skipping {}: {err:#}", path.display());
                    None
                }
            })
            .collect();

        let mut records: Vec<ImageRecord> = slots.into_iter().flatten().collect();

        // Stable sort: timed records ascending, timeless records after them
        // in encounter order.
        records.sort_by(|a, b| match (&a.capture_time, &b.capture_time) {
            (Some(x), Some(y)) => x.sort_key().cmp(&y.sort_key()),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        for (index, record) in records.iter_mut().enumerate() {
            record.index = index;
        }

        Ok(records)
    }

    fn load_record(&self, path: &Path) -> anyhow::Result<ImageRecord> {
        let fields = self.adapter.read(path)?;

        let capture_time = fields
            .date_time_original
            .as_deref()
            .and_then(|raw| CaptureTime::parse(raw, fields.offset_time.as_deref()));

        let gps = match (fields.gps_latitude, fields.gps_longitude) {
            (Some(lat), Some(lon)) => Some(GpsData::from_signed(
                lat,
                lon,
                fields.gps_altitude,
                fields.gps_direction,
            )),
            _ => None,
        };

        let status = if gps.is_some() {
            RecordStatus::LoadedWithGps
        } else {
            RecordStatus::LoadedNoGps
        };

        let orientation = fields.orientation.unwrap_or(1);

        // A fresh cache file short-circuits extraction entirely.
        let thumbnail_path = match self.thumbnails.fresh_path(path, orientation) {
            Some(cached) => cached,
            None => {
                let preview = match self.adapter.extract_thumbnail(path) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        log::warn!(
                            "thumbnail extraction for {} failed: {err:#}",
                            path.display()
                        );
                        None
                    }
                };
                self.thumbnails.resolve(path, orientation, preview.as_deref())
            }
        };

        Ok(ImageRecord {
            index: 0,
            file_path: path.to_path_buf(),
            base_name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default(),
            extension: path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
            capture_time,
            camera: fields.camera_model.clone().unwrap_or_default(),
            lens: fields.lens_model.clone().unwrap_or_default(),
            orientation,
            width: fields.width.unwrap_or(0),
            height: fields.height.unwrap_or(0),
            gps,
            title: fields.title.clone().unwrap_or_default(),
            description: fields.description.clone().unwrap_or_default(),
            keywords: fields.keywords.clone(),
            geolocation: derive_geolocation(&fields),
            thumbnail_path,
            status,
        })
    }
}

/// `"City, Province, Country"` only when all three parts are present;
/// partial data must never be concatenated into a misleading string.
fn derive_geolocation(fields: &ExifFields) -> String {
    match (&fields.city, &fields.province_state, &fields.country) {
        (Some(city), Some(province), Some(country))
            if !city.is_empty() && !province.is_empty() && !country.is_empty() =>
        {
            format!("{city}, {province}, {country}")
        }
        _ => String::from("unknown"),
    }
}
