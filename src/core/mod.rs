pub mod coordinate;
pub mod exif_io;
pub mod formats;
pub mod geocode;
pub mod ingest;
pub mod sanitize;
pub mod thumbnail;
pub mod writeback;
