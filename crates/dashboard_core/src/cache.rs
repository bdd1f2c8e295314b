//! Typed, freshness-aware view over a [`CacheStore`].

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        Continent, ContinentAggregate, ContinentCatalog, Country, CountryCode,
        CountryCovidExtended, CovidSnapshot, DashboardData,
    },
    error::DashboardError,
};
use storage::CacheStore;
use tracing::{debug, warn};

pub const KEY_CONTINENTS: &str = "continents";
pub const KEY_CONTINENT_COUNTRIES: &str = "continent_countries";
pub const KEY_COVID_PER_COUNTRY: &str = "covid_per_country";
pub const KEY_COVID_PER_CONTINENT: &str = "covid_per_continent";
pub const KEY_COVID_EXTENDED: &str = "covid_extended_per_country";
pub const KEY_SAVED_AT: &str = "saved_at";

pub fn default_freshness_window() -> Duration {
    Duration::hours(24)
}

#[derive(Debug)]
pub enum CacheLookup {
    Fresh(DashboardData),
    Stale { saved_at: DateTime<Utc> },
    Missing,
    Corrupt(DashboardError),
}

pub struct DashboardCache<S: ?Sized> {
    store: Arc<S>,
    freshness: Duration,
}

impl<S: ?Sized> Clone for DashboardCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            freshness: self.freshness,
        }
    }
}

impl<S: CacheStore + ?Sized> DashboardCache<S> {
    pub fn new(store: Arc<S>, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Reads the last full refresh, if it is still inside the freshness window.
    ///
    /// Store failures are returned as errors; undecodable contents come back
    /// as [`CacheLookup::Corrupt`] so the caller can discard them.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<CacheLookup, DashboardError> {
        let saved_at = match self.read_saved_at().await {
            Ok(Some(saved_at)) => saved_at,
            Ok(None) => return Ok(CacheLookup::Missing),
            Err(err @ DashboardError::CacheCorrupt { .. }) => return Ok(CacheLookup::Corrupt(err)),
            Err(err) => return Err(err),
        };

        if saved_at <= now - self.freshness {
            debug!(%saved_at, "cache expired");
            return Ok(CacheLookup::Stale { saved_at });
        }

        match self.read_data(saved_at).await {
            Ok(data) => Ok(CacheLookup::Fresh(data)),
            Err(err @ DashboardError::CacheCorrupt { .. }) => Ok(CacheLookup::Corrupt(err)),
            Err(err) => Err(err),
        }
    }

    /// Persists one refresh cycle. The timestamp goes in last so an
    /// interrupted save never reads back as fresh. Extended figures belong
    /// to the previous cycle and are dropped.
    pub async fn save(&self, data: &DashboardData) -> Result<(), DashboardError> {
        self.store_raw(KEY_SAVED_AT, None).await?;
        self.store_raw(KEY_COVID_EXTENDED, None).await?;
        self.write(KEY_CONTINENTS, &data.catalog.continents).await?;
        self.write(KEY_CONTINENT_COUNTRIES, &data.catalog.countries)
            .await?;
        self.write(KEY_COVID_PER_COUNTRY, &data.snapshots).await?;
        self.write(KEY_COVID_PER_CONTINENT, &data.aggregates).await?;
        self.store_raw(KEY_SAVED_AT, Some(data.fetched_at.to_rfc3339()))
            .await?;
        debug!(fetched_at = %data.fetched_at, "cache saved");
        Ok(())
    }

    pub async fn load_extended(
        &self,
    ) -> Result<HashMap<CountryCode, CountryCovidExtended>, DashboardError> {
        Ok(self.read(KEY_COVID_EXTENDED).await?.unwrap_or_default())
    }

    pub async fn save_extended(
        &self,
        extended: &HashMap<CountryCode, CountryCovidExtended>,
    ) -> Result<(), DashboardError> {
        self.write(KEY_COVID_EXTENDED, extended).await
    }

    pub async fn clear(&self) -> Result<(), DashboardError> {
        self.store.clear().await.map_err(storage_error)
    }

    async fn read_saved_at(&self) -> Result<Option<DateTime<Utc>>, DashboardError> {
        let Some(raw) = self.store.get(KEY_SAVED_AT).await.map_err(storage_error)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(|err| DashboardError::cache_corrupt(KEY_SAVED_AT, err))
    }

    async fn read_data(&self, saved_at: DateTime<Utc>) -> Result<DashboardData, DashboardError> {
        let continents: Vec<Continent> = self.require(KEY_CONTINENTS).await?;
        let countries: HashMap<Continent, Vec<Country>> =
            self.require(KEY_CONTINENT_COUNTRIES).await?;
        let snapshots: HashMap<CountryCode, CovidSnapshot> =
            self.require(KEY_COVID_PER_COUNTRY).await?;
        let aggregates: HashMap<Continent, ContinentAggregate> =
            self.require(KEY_COVID_PER_CONTINENT).await?;

        if let Some(orphan) = continents.iter().find(|c| !countries.contains_key(*c)) {
            return Err(DashboardError::cache_corrupt(
                KEY_CONTINENT_COUNTRIES,
                format!("no roster for continent '{orphan}'"),
            ));
        }

        Ok(DashboardData {
            catalog: ContinentCatalog::new(continents, countries),
            snapshots,
            aggregates,
            fetched_at: saved_at,
        })
    }

    async fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, DashboardError> {
        self.read(key)
            .await?
            .ok_or_else(|| DashboardError::cache_corrupt(key, "entry missing"))
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DashboardError> {
        let Some(raw) = self.store.get(key).await.map_err(storage_error)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| DashboardError::cache_corrupt(key, err))
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DashboardError> {
        let raw = serde_json::to_string(value)
            .map_err(|err| DashboardError::Storage(format!("failed to encode '{key}': {err}")))?;
        self.store_raw(key, Some(raw)).await
    }

    async fn store_raw(&self, key: &str, value: Option<String>) -> Result<(), DashboardError> {
        let result = match value {
            Some(value) => self.store.set(key, &value).await,
            None => self.store.remove(key).await,
        };
        result.map_err(|err| {
            warn!(key, error = %err, "cache write failed");
            storage_error(err)
        })
    }
}

fn storage_error(err: anyhow::Error) -> DashboardError {
    DashboardError::Storage(format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
