use std::path::Path;

/// Extensions the ingestion pipeline accepts by default.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "heif", "avif",
];

/// Case-insensitive allow-list check against lowercased extensions.
pub fn extension_allowed(path: &Path, allow_list: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|value| value.to_str()) else {
        return false;
    };

    let lowered = ext.to_ascii_lowercase();
    allow_list.iter().any(|allowed| *allowed == lowered)
}

pub fn supported_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}
