//! Geo-resolution and metadata ingestion engine for a photo geotagging app.
//!
//! The crate turns an image folder into validated, time-sorted metadata
//! records with cached thumbnails, resolves coordinates to place names
//! through a rate-limited reverse-geocoding service, normalizes GPS
//! coordinate notations, screens AI-suggested metadata before it may touch
//! persistent state, and writes approved edits back per file.

pub mod core;
pub mod models;

pub use crate::core::exif_io::{ExifAdapter, ExifFields, LittleExifAdapter};
pub use crate::core::geocode::{GeoResolver, GeoResolverConfig, RateLimiter};
pub use crate::core::ingest::MetadataIngestor;
pub use crate::core::sanitize::{sanitize_ai_response, AiMetadata};
pub use crate::core::thumbnail::ThumbnailCache;
pub use crate::core::writeback::MetadataWriteBack;
pub use crate::models::{ImageRecord, PlaceName, RecordStatus};
