use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Debug)]
pub enum ThumbnailError {
    Io(std::io::Error),
    Image(image::ImageError),
}

impl fmt::Display for ThumbnailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "thumbnail io error: {err}"),
            Self::Image(err) => write!(f, "thumbnail image error: {err}"),
        }
    }
}

impl std::error::Error for ThumbnailError {}

impl From<std::io::Error> for ThumbnailError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<image::ImageError> for ThumbnailError {
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// Disk cache of orientation-corrected preview JPEGs, keyed by source file
/// basename, with age-based expiry. A fresh cache file is reused verbatim;
/// a stale one is deleted before regeneration.
pub struct ThumbnailCache {
    cache_dir: PathBuf,
    max_age: Duration,
}

impl ThumbnailCache {
    pub fn new(cache_dir: PathBuf, max_age: Duration) -> Self {
        Self { cache_dir, max_age }
    }

    pub fn in_temp_dir() -> Self {
        Self::new(
            std::env::temp_dir().join("photo-geotagger-thumbs"),
            DEFAULT_MAX_AGE,
        )
    }

    pub fn plain_path(&self, source: &Path) -> PathBuf {
        self.cache_dir.join(format!("{}_thumb.jpg", base_name(source)))
    }

    pub fn rotated_path(&self, source: &Path) -> PathBuf {
        self.cache_dir
            .join(format!("{}_thumb_rotated.jpg", base_name(source)))
    }

    /// A still-fresh cached thumbnail for `source`, when one exists. Lets
    /// callers skip extraction entirely on a cache hit.
    pub fn fresh_path(&self, source: &Path, orientation: u16) -> Option<PathBuf> {
        let path = if needs_transform(orientation) {
            self.rotated_path(source)
        } else {
            self.plain_path(source)
        };

        if self.is_fresh(&path) {
            Some(path)
        } else {
            None
        }
    }

    /// Returns the path the record should use as its thumbnail: a fresh
    /// cached file when one exists, a newly materialized (and, when the
    /// orientation calls for it, transformed) file when preview bytes are
    /// available, or the source path itself as the degraded fallback.
    pub fn resolve(&self, source: &Path, orientation: u16, preview: Option<&[u8]>) -> PathBuf {
        let wants_transform = needs_transform(orientation);
        let final_path = if wants_transform {
            self.rotated_path(source)
        } else {
            self.plain_path(source)
        };

        if self.is_fresh(&final_path) {
            return final_path;
        }
        if final_path.exists() {
            // Expired: remove before regenerating under the same name.
            if let Err(err) = fs::remove_file(&final_path) {
                log::warn!("removing stale thumbnail {}: {err}", final_path.display());
            }
        }

        let Some(bytes) = preview else {
            return source.to_path_buf();
        };

        let plain = self.plain_path(source);
        if let Err(err) = fs::create_dir_all(&self.cache_dir).and_then(|_| fs::write(&plain, bytes))
        {
            log::warn!("caching thumbnail for {}: {err}", source.display());
            return source.to_path_buf();
        }

        if !wants_transform {
            return plain;
        }

        match apply_orientation(&plain, &final_path, orientation) {
            Ok(()) => {
                // Only one cached form per source.
                let _ = fs::remove_file(&plain);
                final_path
            }
            Err(err) => {
                log::warn!(
                    "orientation transform for {} failed: {err}",
                    source.display()
                );
                plain
            }
        }
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match modified.elapsed() {
            Ok(age) => age < self.max_age,
            Err(_) => true,
        }
    }
}

pub fn needs_transform(orientation: u16) -> bool {
    (2..=8).contains(&orientation)
}

/// Applies the EXIF orientation correction to `source`, writing a JPEG at
/// `dest`. Codes 2-8 map to flip-horizontal, 180, flip-vertical,
/// rotate90+flip, rotate90, rotate270+flip, rotate270; anything else is a
/// straight copy.
pub fn apply_orientation(source: &Path, dest: &Path, orientation: u16) -> Result<()> {
    let img = image::open(source)?;

    let transformed = match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    };

    transformed
        .to_rgb8()
        .save_with_format(dest, image::ImageFormat::Jpeg)?;
    Ok(())
}

fn base_name(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| String::from("photo"))
}
