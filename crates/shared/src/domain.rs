use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

name_newtype!(Continent);
name_newtype!(CountryCode);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: CountryCode,
}

impl Country {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: CountryCode(code.into()),
        }
    }
}

/// Ordered continent list plus the roster of countries for each continent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinentCatalog {
    pub continents: Vec<Continent>,
    pub countries: HashMap<Continent, Vec<Country>>,
}

impl ContinentCatalog {
    pub fn new(continents: Vec<Continent>, countries: HashMap<Continent, Vec<Country>>) -> Self {
        Self {
            continents,
            countries,
        }
    }

    pub fn countries_of(&self, continent: &Continent) -> Option<&[Country]> {
        self.countries.get(continent).map(Vec::as_slice)
    }

    pub fn find_country(&self, code: &CountryCode) -> Option<&Country> {
        self.continents
            .iter()
            .filter_map(|continent| self.countries.get(continent))
            .flatten()
            .find(|country| &country.code == code)
    }

    /// Every country in continent order, then roster order.
    pub fn all_countries(&self) -> impl Iterator<Item = &Country> {
        self.continents
            .iter()
            .filter_map(|continent| self.countries.get(continent))
            .flatten()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovidSnapshot {
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub critical: u64,
}

impl CovidSnapshot {
    pub fn stat(&self, field: StatField) -> u64 {
        match field {
            StatField::Confirmed => self.confirmed,
            StatField::Deaths => self.deaths,
            StatField::Recovered => self.recovered,
            StatField::Critical => self.critical,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCovidExtended {
    pub total_cases: u64,
    pub new_cases: u64,
    pub total_deaths: u64,
    pub new_deaths: u64,
    pub total_recovered: u64,
    pub in_critical_condition: u64,
}

/// Floor-averaged snapshot over the countries of one continent.
///
/// `sample_size` counts the snapshots that went into the mean. A value of
/// zero marks a continent without any data; every stat is then zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinentAggregate {
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub critical: u64,
    pub sample_size: usize,
}

impl ContinentAggregate {
    pub fn no_data() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.sample_size > 0
    }

    pub fn stat(&self, field: StatField) -> u64 {
        self.as_snapshot().stat(field)
    }

    pub fn as_snapshot(&self) -> CovidSnapshot {
        CovidSnapshot {
            confirmed: self.confirmed,
            deaths: self.deaths,
            recovered: self.recovered,
            critical: self.critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Confirmed,
    Deaths,
    Recovered,
    Critical,
}

impl StatField {
    pub const ALL: [StatField; 4] = [
        StatField::Confirmed,
        StatField::Deaths,
        StatField::Recovered,
        StatField::Critical,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatField::Confirmed => "Confirmed",
            StatField::Deaths => "Deaths",
            StatField::Recovered => "Recovered",
            StatField::Critical => "Critical",
        }
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatField {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        StatField::ALL
            .into_iter()
            .find(|field| field.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DashboardError::UnknownStat(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Chart-ready bundle of parallel label/value/color sequences.
///
/// `has_data[i]` is false when `values[i]` is a zero stand-in for a missing
/// reading rather than a real zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartProjection {
    pub labels: Vec<String>,
    pub tooltip: String,
    pub values: Vec<u64>,
    pub has_data: Vec<bool>,
    pub background_colors: Vec<Rgba>,
    pub border_colors: Vec<Rgba>,
}

impl ChartProjection {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Everything one refresh cycle produces, replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub catalog: ContinentCatalog,
    pub snapshots: HashMap<CountryCode, CovidSnapshot>,
    pub aggregates: HashMap<Continent, ContinentAggregate>,
    pub fetched_at: DateTime<Utc>,
}
