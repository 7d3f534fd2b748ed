use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateError {
    Empty,
    Unrecognized(String),
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    MinutesOutOfRange(f64),
    SecondsOutOfRange(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty coordinate string"),
            Self::Unrecognized(text) => write!(f, "unrecognized coordinate notation: {text}"),
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude {value} outside [-90, 90]")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude {value} outside [-180, 180]")
            }
            Self::MinutesOutOfRange(value) => write!(f, "minutes {value} outside [0, 60)"),
            Self::SecondsOutOfRange(value) => write!(f, "seconds {value} outside [0, 60)"),
        }
    }
}

impl std::error::Error for CoordinateError {}

pub type Result<T> = std::result::Result<T, CoordinateError>;

/// A validated signed decimal-degree pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// EXIF-style canonical form: unsigned magnitudes with hemisphere letters,
/// plus the signed fixed-6 string used for persistence and round-tripping.
#[derive(Clone, Debug, PartialEq)]
pub struct Canonical {
    pub lat_abs: f64,
    pub lat_ref: char,
    pub lon_abs: f64,
    pub lon_ref: char,
    pub pos_string: String,
}

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([+-]?\d+(?:\.\d+)?)(?:\s*,\s*|\s+)([+-]?\d+(?:\.\d+)?)$")
            .expect("hard-coded pattern compiles")
    })
}

fn dms_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"^(\d+(?:\.\d+)?)\s*°\s*(\d+)\s*['′]\s*(\d+(?:\.\d+)?)\s*["″]\s*([NSns])(?:\s*,\s*|\s+)(\d+(?:\.\d+)?)\s*°\s*(\d+)\s*['′]\s*(\d+(?:\.\d+)?)\s*["″]\s*([EWew])$"#,
        )
        .expect("hard-coded pattern compiles")
    })
}

fn dmm_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(\d+(?:\.\d+)?)\s*°\s*(\d+(?:\.\d+)?)\s*['′]\s*([NSns])(?:\s*,\s*|\s+)(\d+(?:\.\d+)?)\s*°\s*(\d+(?:\.\d+)?)\s*['′]\s*([EWew])$",
        )
        .expect("hard-coded pattern compiles")
    })
}

/// Parses one of the three supported notations: signed decimal pair,
/// degrees-minutes-seconds, or degrees-decimal-minutes.
pub fn parse(text: &str) -> Result<Coordinate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoordinateError::Empty);
    }

    if let Some(captures) = decimal_pattern().captures(trimmed) {
        let lat = parse_f64(&captures[1]);
        let lon = parse_f64(&captures[2]);
        return validate(Coordinate { lat, lon });
    }

    if let Some(captures) = dms_pattern().captures(trimmed) {
        let lat = compose(
            parse_f64(&captures[1]),
            parse_f64(&captures[2]),
            parse_f64(&captures[3]),
            &captures[4],
        )?;
        let lon = compose(
            parse_f64(&captures[5]),
            parse_f64(&captures[6]),
            parse_f64(&captures[7]),
            &captures[8],
        )?;
        return validate(Coordinate { lat, lon });
    }

    if let Some(captures) = dmm_pattern().captures(trimmed) {
        let lat = compose(
            parse_f64(&captures[1]),
            parse_f64(&captures[2]),
            0.0,
            &captures[3],
        )?;
        let lon = compose(
            parse_f64(&captures[4]),
            parse_f64(&captures[5]),
            0.0,
            &captures[6],
        )?;
        return validate(Coordinate { lat, lon });
    }

    Err(CoordinateError::Unrecognized(trimmed.to_string()))
}

fn parse_f64(text: &str) -> f64 {
    // The grammars only capture digit/dot spans, so this cannot fail.
    text.parse().unwrap_or(0.0)
}

fn compose(degrees: f64, minutes: f64, seconds: f64, hemisphere: &str) -> Result<f64> {
    if !(0.0..60.0).contains(&minutes) {
        return Err(CoordinateError::MinutesOutOfRange(minutes));
    }
    if !(0.0..60.0).contains(&seconds) {
        return Err(CoordinateError::SecondsOutOfRange(seconds));
    }

    let magnitude = from_dms(degrees, minutes, seconds);
    let negative = matches!(hemisphere, "S" | "s" | "W" | "w");
    Ok(if negative { -magnitude } else { magnitude })
}

fn validate(coord: Coordinate) -> Result<Coordinate> {
    if !(-90.0..=90.0).contains(&coord.lat) {
        return Err(CoordinateError::LatitudeOutOfRange(coord.lat));
    }
    if !(-180.0..=180.0).contains(&coord.lon) {
        return Err(CoordinateError::LongitudeOutOfRange(coord.lon));
    }
    Ok(coord)
}

pub fn to_canonical(coord: Coordinate) -> Canonical {
    Canonical {
        lat_abs: coord.lat.abs(),
        lat_ref: if coord.lat < 0.0 { 'S' } else { 'N' },
        lon_abs: coord.lon.abs(),
        lon_ref: if coord.lon < 0.0 { 'W' } else { 'E' },
        pos_string: format!("{:.6}, {:.6}", coord.lat, coord.lon),
    }
}

/// Splits a decimal-degree magnitude into whole degrees, whole minutes, and
/// fractional seconds.
pub fn to_dms(value: f64) -> (u32, u32, f64) {
    let abs = value.abs();
    let degrees = abs.floor();
    let minutes = ((abs - degrees) * 60.0).floor();
    let seconds = (abs - degrees - minutes / 60.0) * 3600.0;
    (degrees as u32, minutes as u32, seconds)
}

pub fn from_dms(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

/// Accepts altitude strings in [-1000, 8888] meters.
pub fn is_valid_altitude(text: &str) -> bool {
    match text.trim().parse::<f64>() {
        Ok(value) => (-1000.0..=8888.0).contains(&value),
        Err(_) => false,
    }
}

/// Accepts direction strings in [-360, 360] degrees.
pub fn is_valid_direction(text: &str) -> bool {
    match text.trim().parse::<f64>() {
        Ok(value) => (-360.0..=360.0).contains(&value),
        Err(_) => false,
    }
}
