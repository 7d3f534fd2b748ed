use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata as ExifMetadata;
use serde::{Deserialize, Serialize};

use crate::core::coordinate;
use crate::models::MetadataUpdate;

const THUMBNAIL_MAX_EDGE_PX: u32 = 320;

/// Raw per-file metadata as delivered by the extraction collaborator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExifFields {
    pub date_time_original: Option<String>,
    pub offset_time: Option<String>,
    pub camera_model: Option<String>,
    pub lens_model: Option<String>,
    pub orientation: Option<u16>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Signed decimal degrees.
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub gps_direction: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub city: Option<String>,
    pub province_state: Option<String>,
    pub country: Option<String>,
}

/// Injected metadata read/write capability. Production code uses
/// [`LittleExifAdapter`]; tests substitute their own.
pub trait ExifAdapter: Send + Sync {
    fn read(&self, path: &Path) -> Result<ExifFields>;
    fn write(&self, path: &Path, update: &MetadataUpdate) -> Result<()>;
    /// JPEG bytes for a preview of the file, or `None` when the source
    /// cannot provide one.
    fn extract_thumbnail(&self, path: &Path) -> Result<Option<Vec<u8>>>;
}

/// EXIF-backed adapter. Tag-level fields go through `little_exif`; fields
/// EXIF cannot carry (title, keywords, place names) live in a JSON sidecar
/// next to the image, which takes precedence on read.
pub struct LittleExifAdapter;

impl LittleExifAdapter {
    pub fn sidecar_path(path: &Path) -> PathBuf {
        let base_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("photo"));

        path.with_file_name(format!("{base_name}.geotag.json"))
    }

    fn read_exif(path: &Path) -> ExifFields {
        let mut fields = ExifFields::default();

        let Ok(exif) = ExifMetadata::new_from_path(path) else {
            return fields;
        };

        let mut gps_lat_ref: Option<String> = None;
        let mut gps_lat_dms: Option<(f64, f64, f64)> = None;
        let mut gps_lon_ref: Option<String> = None;
        let mut gps_lon_dms: Option<(f64, f64, f64)> = None;
        let mut gps_alt_ref: Option<u8> = None;
        let mut gps_alt: Option<f64> = None;

        for tag in (&exif).into_iter() {
            match tag {
                ExifTag::Model(s) => fields.camera_model = non_empty(s),
                ExifTag::LensModel(s) => fields.lens_model = non_empty(s),
                ExifTag::DateTimeOriginal(s) => fields.date_time_original = non_empty(s),
                ExifTag::OffsetTimeOriginal(s) => fields.offset_time = non_empty(s),
                ExifTag::ImageDescription(s) => fields.description = non_empty(s),
                ExifTag::Orientation(v) => fields.orientation = v.first().copied(),
                ExifTag::ImageWidth(v) => fields.width = v.first().copied(),
                ExifTag::ImageHeight(v) => fields.height = v.first().copied(),
                ExifTag::GPSLatitudeRef(s) => {
                    gps_lat_ref = Some(s.trim_end_matches('\0').to_string());
                }
                ExifTag::GPSLatitude(rats) if rats.len() >= 3 => {
                    let d: f64 = rats[0].clone().into();
                    let m: f64 = rats[1].clone().into();
                    let s: f64 = rats[2].clone().into();
                    gps_lat_dms = Some((d, m, s));
                }
                ExifTag::GPSLongitudeRef(s) => {
                    gps_lon_ref = Some(s.trim_end_matches('\0').to_string());
                }
                ExifTag::GPSLongitude(rats) if rats.len() >= 3 => {
                    let d: f64 = rats[0].clone().into();
                    let m: f64 = rats[1].clone().into();
                    let s: f64 = rats[2].clone().into();
                    gps_lon_dms = Some((d, m, s));
                }
                ExifTag::GPSAltitudeRef(bytes) if !bytes.is_empty() => {
                    gps_alt_ref = Some(bytes[0]);
                }
                ExifTag::GPSAltitude(rats) if !rats.is_empty() => {
                    gps_alt = Some(rats[0].clone().into());
                }
                // GPSImgDirection lands in the unknown-rational bucket.
                ExifTag::UnknownRATIONAL64U(rats, 0x0011, _) if !rats.is_empty() => {
                    fields.gps_direction = Some(rats[0].clone().into());
                }
                _ => {}
            }
        }

        if let (Some(lat_dms), Some(lon_dms)) = (gps_lat_dms, gps_lon_dms) {
            let mut lat = coordinate::from_dms(lat_dms.0, lat_dms.1, lat_dms.2);
            let mut lon = coordinate::from_dms(lon_dms.0, lon_dms.1, lon_dms.2);

            if gps_lat_ref.as_deref() == Some("S") {
                lat = -lat;
            }
            if gps_lon_ref.as_deref() == Some("W") {
                lon = -lon;
            }

            fields.gps_latitude = Some(lat);
            fields.gps_longitude = Some(lon);
            fields.gps_altitude = gps_alt.map(|a| if gps_alt_ref == Some(1) { -a } else { a });
        }

        fields
    }

    fn write_exif(path: &Path, fields: &ExifFields) {
        if !is_exif_writable(path) {
            return;
        }

        let mut exif = match ExifMetadata::new_from_path(path) {
            Ok(existing) => existing,
            Err(_) => ExifMetadata::new(),
        };

        if let Some(description) = &fields.description {
            exif.set_tag(ExifTag::ImageDescription(description.clone()));
        }

        if let (Some(lat), Some(lon)) = (fields.gps_latitude, fields.gps_longitude) {
            write_gps_tags(&mut exif, lat, lon, fields.gps_altitude);
        }

        // Best-effort: the sidecar is authoritative for round-tripping.
        let _ = exif.write_to_file(path);
    }

    fn apply_update(fields: &mut ExifFields, update: &MetadataUpdate) {
        if let Some(gps) = &update.gps {
            fields.gps_latitude = Some(gps.signed_lat());
            fields.gps_longitude = Some(gps.signed_lon());
            fields.gps_altitude = gps.altitude_meters;
            fields.gps_direction = gps.direction_deg;
        }
        if let Some(title) = &update.title {
            fields.title = Some(title.clone());
        }
        if let Some(description) = &update.description {
            fields.description = Some(description.clone());
        }
        if let Some(keywords) = &update.keywords {
            fields.keywords = keywords.clone();
        }
    }
}

impl ExifAdapter for LittleExifAdapter {
    fn read(&self, path: &Path) -> Result<ExifFields> {
        if !path.exists() {
            anyhow::bail!("file not found: {}", path.display());
        }

        let sidecar = Self::sidecar_path(path);
        if sidecar.exists() {
            let contents = fs::read_to_string(&sidecar)
                .with_context(|| format!("reading sidecar {}", sidecar.display()))?;
            let fields: ExifFields = serde_json::from_str(&contents)
                .with_context(|| format!("decoding sidecar {}", sidecar.display()))?;
            return Ok(fields);
        }

        Ok(Self::read_exif(path))
    }

    fn write(&self, path: &Path, update: &MetadataUpdate) -> Result<()> {
        if !path.exists() {
            anyhow::bail!("file not found: {}", path.display());
        }

        let mut fields = self.read(path)?;
        Self::apply_update(&mut fields, update);
        Self::write_exif(path, &fields);

        let sidecar = Self::sidecar_path(path);
        let encoded = serde_json::to_string_pretty(&fields)
            .context("encoding metadata sidecar")?;
        fs::write(&sidecar, encoded)
            .with_context(|| format!("writing sidecar {}", sidecar.display()))?;
        Ok(())
    }

    fn extract_thumbnail(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        let Ok(full) = image::open(path) else {
            return Ok(None);
        };

        let preview = full.thumbnail(THUMBNAIL_MAX_EDGE_PX, THUMBNAIL_MAX_EDGE_PX);
        let mut bytes = Vec::new();
        preview
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .with_context(|| format!("encoding thumbnail for {}", path.display()))?;
        Ok(Some(bytes))
    }
}

fn is_exif_writable(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp" | "heic" | "heif")
}

fn write_gps_tags(exif: &mut ExifMetadata, lat: f64, lon: f64, alt: Option<f64>) {
    let lat_ref = if lat >= 0.0 { "N" } else { "S" };
    let lon_ref = if lon >= 0.0 { "E" } else { "W" };

    let (lat_d, lat_m, lat_sn, lat_sd) = dms_rational(lat.abs());
    let (lon_d, lon_m, lon_sn, lon_sd) = dms_rational(lon.abs());

    exif.set_tag(ExifTag::GPSLatitudeRef(lat_ref.to_string()));
    exif.set_tag(ExifTag::GPSLatitude(vec![
        ur64(lat_d, 1),
        ur64(lat_m, 1),
        ur64(lat_sn, lat_sd),
    ]));
    exif.set_tag(ExifTag::GPSLongitudeRef(lon_ref.to_string()));
    exif.set_tag(ExifTag::GPSLongitude(vec![
        ur64(lon_d, 1),
        ur64(lon_m, 1),
        ur64(lon_sn, lon_sd),
    ]));

    if let Some(altitude) = alt {
        let alt_ref: u8 = if altitude < 0.0 { 1 } else { 0 };
        let alt_num = (altitude.abs() * 100.0).round() as u32;
        exif.set_tag(ExifTag::GPSAltitudeRef(vec![alt_ref]));
        exif.set_tag(ExifTag::GPSAltitude(vec![ur64(alt_num, 100)]));
    }
}

/// Degrees and minutes as whole rationals, seconds over 10000 for
/// sub-second precision.
fn dms_rational(decimal: f64) -> (u32, u32, u32, u32) {
    let (degrees, minutes, seconds) = coordinate::to_dms(decimal);
    let seconds_num = (seconds * 10000.0).round() as u32;
    (degrees, minutes, seconds_num, 10000)
}

fn ur64(nominator: u32, denominator: u32) -> little_exif::rational::uR64 {
    little_exif::rational::uR64 {
        nominator,
        denominator,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let cleaned = s.trim_end_matches('\0').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
