//! HTTP access to the country-metadata and COVID-statistics APIs.

use std::{collections::HashMap, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{Continent, Country, CountryCode, CountryCovidExtended, CovidSnapshot},
    error::DashboardError,
    protocol::{CountryRecord, CovidCountriesResponse, CovidCountryResponse, RegionRecord},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::aggregation::extended_from_record;

pub const DEFAULT_COUNTRIES_API_URL: &str = "https://restcountries.com/v3.1";
pub const DEFAULT_COVID_API_URL: &str = "https://corona-api.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote sources of continent rosters and COVID figures.
///
/// Implementations perform I/O only; they never touch aggregate state.
#[async_trait]
pub trait CovidGateway: Send + Sync {
    /// Distinct regions in first-seen order.
    async fn fetch_continents(&self) -> Result<Vec<Continent>, DashboardError>;

    /// One concurrent request per continent; the first failure fails the batch.
    async fn fetch_countries_by_continent(
        &self,
        continents: &[Continent],
    ) -> Result<HashMap<Continent, Vec<Country>>, DashboardError>;

    async fn fetch_covid_snapshots(
        &self,
    ) -> Result<HashMap<CountryCode, CovidSnapshot>, DashboardError>;

    async fn fetch_extended_snapshot(
        &self,
        code: &CountryCode,
    ) -> Result<CountryCovidExtended, DashboardError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    countries_api: Url,
    covid_api: Url,
}

impl ApiEndpoints {
    pub fn new(countries_api_url: &str, covid_api_url: &str) -> anyhow::Result<Self> {
        let countries_api = Url::parse(countries_api_url)
            .with_context(|| format!("invalid countries api url '{countries_api_url}'"))?;
        let covid_api = Url::parse(covid_api_url)
            .with_context(|| format!("invalid covid api url '{covid_api_url}'"))?;
        Ok(Self {
            countries_api,
            covid_api,
        })
    }

    pub fn all_regions(&self) -> String {
        join(&self.countries_api, "all?fields=region")
    }

    pub fn region_countries(&self, continent: &Continent) -> String {
        join(
            &self.countries_api,
            &format!(
                "region/{}?fields=name,cca2",
                continent.as_str().to_lowercase()
            ),
        )
    }

    pub fn covid_countries(&self) -> String {
        join(&self.covid_api, "countries")
    }

    pub fn covid_country(&self, code: &CountryCode) -> String {
        join(&self.covid_api, &format!("countries/{code}"))
    }
}

fn join(base: &Url, path: &str) -> String {
    format!("{}/{path}", base.as_str().trim_end_matches('/'))
}

pub struct HttpGateway {
    http: Client,
    endpoints: ApiEndpoints,
}

impl HttpGateway {
    pub fn new(endpoints: ApiEndpoints, request_timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, endpoints })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, DashboardError> {
        debug!(%url, "fetching");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| {
                warn!(%url, error = %err, "request failed");
                DashboardError::network(&url, describe_request_error(&err))
            })?;

        response.json::<T>().await.map_err(|err| {
            warn!(%url, error = %err, "response body could not be decoded");
            DashboardError::network(&url, format!("invalid response body: {err}"))
        })
    }
}

fn describe_request_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if let Some(status) = err.status() {
        format!("server responded with {status}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl CovidGateway for HttpGateway {
    async fn fetch_continents(&self) -> Result<Vec<Continent>, DashboardError> {
        let records: Vec<RegionRecord> = self.get_json(self.endpoints.all_regions()).await?;
        let continents = distinct_regions(records);
        info!(count = continents.len(), "fetched continents");
        Ok(continents)
    }

    async fn fetch_countries_by_continent(
        &self,
        continents: &[Continent],
    ) -> Result<HashMap<Continent, Vec<Country>>, DashboardError> {
        let requests = continents.iter().map(|continent| async move {
            let records: Vec<CountryRecord> = self
                .get_json(self.endpoints.region_countries(continent))
                .await?;
            let countries: Vec<Country> = records.into_iter().map(Country::from).collect();
            debug!(continent = %continent, count = countries.len(), "fetched roster");
            Ok::<_, DashboardError>((continent.clone(), countries))
        });

        let rosters = try_join_all(requests).await?;
        Ok(rosters.into_iter().collect())
    }

    async fn fetch_covid_snapshots(
        &self,
    ) -> Result<HashMap<CountryCode, CovidSnapshot>, DashboardError> {
        let response: CovidCountriesResponse =
            self.get_json(self.endpoints.covid_countries()).await?;
        let snapshots: HashMap<CountryCode, CovidSnapshot> = response
            .data
            .iter()
            .map(|record| {
                (
                    CountryCode::new(record.code.clone()),
                    CovidSnapshot::from(&record.latest_data),
                )
            })
            .collect();
        info!(count = snapshots.len(), "fetched covid snapshots");
        Ok(snapshots)
    }

    async fn fetch_extended_snapshot(
        &self,
        code: &CountryCode,
    ) -> Result<CountryCovidExtended, DashboardError> {
        let url = self.endpoints.covid_country(code);
        let response: CovidCountryResponse = self.get_json(url.clone()).await?;
        if !response.data.code.eq_ignore_ascii_case(code.as_str()) {
            return Err(DashboardError::network(
                url,
                format!(
                    "server returned data for '{}' instead of '{code}'",
                    response.data.code
                ),
            ));
        }
        Ok(extended_from_record(&response.data))
    }
}

/// Distinct, non-empty region names in first-seen order.
pub fn distinct_regions(records: impl IntoIterator<Item = RegionRecord>) -> Vec<Continent> {
    let mut continents: Vec<Continent> = Vec::new();
    for region in records.into_iter().filter_map(|record| record.region) {
        let region = region.trim();
        if region.is_empty() || continents.iter().any(|c| c.as_str() == region) {
            continue;
        }
        continents.push(Continent::from(region));
    }
    continents
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
