//! Wire payloads of the two upstream REST APIs.
//!
//! Upstream data is loose: counts may be null or absent, region strings may
//! be empty. Everything here deserializes leniently and leaves the
//! interpretation to the gateway.

use serde::{Deserialize, Serialize};

use crate::domain::{Country, CovidSnapshot};

/// One record of `GET /all?fields=region`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryName {
    pub common: String,
}

/// One record of `GET /region/{name}?fields=name,cca2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryRecord {
    pub name: CountryName,
    pub cca2: String,
}

impl From<CountryRecord> for Country {
    fn from(value: CountryRecord) -> Self {
        Country::new(value.name.common, value.cca2)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestData {
    #[serde(default)]
    pub confirmed: Option<u64>,
    #[serde(default)]
    pub deaths: Option<u64>,
    #[serde(default)]
    pub recovered: Option<u64>,
    #[serde(default)]
    pub critical: Option<u64>,
}

impl From<&LatestData> for CovidSnapshot {
    fn from(value: &LatestData) -> Self {
        CovidSnapshot {
            confirmed: value.confirmed.unwrap_or(0),
            deaths: value.deaths.unwrap_or(0),
            recovered: value.recovered.unwrap_or(0),
            critical: value.critical.unwrap_or(0),
        }
    }
}

/// One day of a country's timeline; element 0 is the most recent day.
///
/// Deltas go negative on days the source corrected earlier counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineEntry {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub new_confirmed: Option<i64>,
    #[serde(default)]
    pub new_deaths: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovidCountryRecord {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latest_data: LatestData,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

/// `GET /countries` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovidCountriesResponse {
    pub data: Vec<CovidCountryRecord>,
}

/// `GET /countries/{code}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovidCountryResponse {
    pub data: CovidCountryRecord,
}
