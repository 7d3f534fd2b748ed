use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::models::PlaceName;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(8000);
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;
/// Four decimal digits bucket coordinates into roughly 11 m cells.
pub const DEFAULT_GRID_PRECISION: u32 = 4;

#[derive(Debug)]
pub enum GeoError {
    /// The upstream service rejects anonymous traffic; an identifying
    /// user-agent is mandatory.
    MissingUserAgent,
    InvalidCoordinate(f64, f64),
    Http(reqwest::Error),
    Status(u16),
    Timeout,
    Decode(String),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUserAgent => {
                write!(f, "reverse geocoding requires an identifying user-agent")
            }
            Self::InvalidCoordinate(lat, lon) => {
                write!(f, "coordinate ({lat}, {lon}) outside valid range")
            }
            Self::Http(err) => write!(f, "reverse geocoding request failed: {err}"),
            Self::Status(code) => write!(f, "reverse geocoding returned HTTP {code}"),
            Self::Timeout => write!(f, "reverse geocoding request timed out"),
            Self::Decode(message) => {
                write!(f, "reverse geocoding response decode failed: {message}")
            }
        }
    }
}

impl std::error::Error for GeoError {}

impl From<reqwest::Error> for GeoError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

pub type Result<T> = std::result::Result<T, GeoError>;

#[derive(Clone, Debug)]
pub struct GeoResolverConfig {
    pub endpoint: String,
    /// Identifies the calling application to the upstream service. Required.
    pub user_agent: String,
    pub referer: Option<String>,
    pub min_interval: Duration,
    pub request_timeout: Duration,
    pub cache_capacity: usize,
    pub grid_precision: u32,
    pub rate_limit: bool,
}

impl Default for GeoResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from(DEFAULT_ENDPOINT),
            user_agent: String::new(),
            referer: None,
            min_interval: DEFAULT_MIN_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            grid_precision: DEFAULT_GRID_PRECISION,
            rate_limit: true,
        }
    }
}

impl GeoResolverConfig {
    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..Self::default()
        }
    }
}

/// Serializes dispatch slots so that no two upstream requests are issued
/// less than `min_interval` apart, no matter how many callers are waiting.
///
/// `acquire` queues callers on one async mutex, sleeps out the remainder of
/// the interval, and stamps the clock at wait completion (not at response
/// arrival, so an aborted request cannot skew throttling). The returned
/// guard keeps the slot held; a caller that holds it through its fetch runs
/// its whole wait-then-fetch unit after the previous caller's.
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

pub struct RateLimitSlot<'a> {
    _slot: MutexGuard<'a, Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> RateLimitSlot<'_> {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
        RateLimitSlot { _slot: last }
    }
}

/// Resolves coordinates to place names through the upstream reverse-geocoding
/// service, backed by a quantized-grid LRU cache and a process-wide rate
/// limit. One instance per process.
pub struct GeoResolver {
    client: reqwest::Client,
    config: GeoResolverConfig,
    limiter: RateLimiter,
    cache: Mutex<LruCache<String, PlaceName>>,
}

impl GeoResolver {
    pub fn new(config: GeoResolverConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            return Err(GeoError::MissingUserAgent);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        let capacity = NonZeroUsize::new(config.cache_capacity.max(1))
            .unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_interval),
            cache: Mutex::new(LruCache::new(capacity)),
            config,
        })
    }

    /// Resolves `(lat, lon)` to a place name. Nearby lookups that quantize
    /// to the same grid cell are served from cache without touching the
    /// rate limit; errors are never cached.
    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<PlaceName> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidCoordinate(lat, lon));
        }

        let key = grid_key(lat, lon, self.config.grid_precision);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(hit.clone());
        }

        let slot = if self.config.rate_limit {
            Some(self.limiter.acquire().await)
        } else {
            None
        };

        // A caller queued behind an in-flight resolve of the same cell
        // finds the entry written while it waited.
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(hit.clone());
        }

        let place = match tokio::time::timeout(self.config.request_timeout, self.fetch(lat, lon))
            .await
        {
            Ok(Ok(place)) => place,
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(GeoError::Timeout),
        };
        drop(slot);

        self.cache.lock().await.put(key, place.clone());
        Ok(place)
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<PlaceName> {
        let mut request = self.client.get(&self.config.endpoint).query(&[
            ("format", String::from("jsonv2")),
            ("lat", format!("{lat}")),
            ("lon", format!("{lon}")),
            ("addressdetails", String::from("1")),
        ]);
        if let Some(referer) = &self.config.referer {
            request = request.header(reqwest::header::REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let body: ReverseGeocodeResponse = response
            .json()
            .await
            .map_err(|err| GeoError::Decode(err.to_string()))?;
        Ok(body.address.into_place_name())
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Buckets a coordinate pair into a cache key by rounding both axes to
/// `precision` decimal digits. Rounding is half-away-from-zero; negative
/// zero collapses into positive zero so the boundary cell has one key.
pub fn grid_key(lat: f64, lon: f64, precision: u32) -> String {
    format!(
        "{},{}",
        round_fixed(lat, precision),
        round_fixed(lon, precision)
    )
}

fn round_fixed(value: f64, precision: u32) -> String {
    let scale = 10f64.powi(precision as i32);
    let mut rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{rounded:.prec$}", prec = precision as usize)
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    #[serde(default)]
    address: AddressDetails,
}

/// The upstream address object. Which keys appear varies by location; the
/// mapping below prefers the richest available component per output field.
#[derive(Debug, Default, Deserialize)]
struct AddressDetails {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    municipality: Option<String>,
    #[serde(default)]
    hamlet: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl AddressDetails {
    fn into_place_name(self) -> PlaceName {
        let city = first_non_empty([
            self.city,
            self.town,
            self.village,
            self.municipality,
            self.hamlet,
        ]);
        let province_or_state = first_non_empty([self.state, self.region]);
        let country = first_non_empty([self.country]);
        let country_code = self
            .country_code
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty());

        PlaceName {
            city,
            province_or_state,
            country,
            country_code,
        }
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
