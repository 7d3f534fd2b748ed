use serde::{Deserialize, Serialize};

/// Resolved place-name fields for one coordinate.
///
/// Every field defaults to the empty string except `country_code`: its
/// absence means "unknown" and it is never serialized as `""`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlaceName {
    #[serde(rename = "City", default)]
    pub city: String,
    #[serde(rename = "Province-State", default)]
    pub province_or_state: String,
    #[serde(rename = "Country", default)]
    pub country: String,
    #[serde(
        rename = "CountryCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub country_code: Option<String>,
}

impl PlaceName {
    /// True when city, province, and country are all known.
    pub fn is_complete(&self) -> bool {
        !self.city.is_empty() && !self.province_or_state.is_empty() && !self.country.is_empty()
    }
}
