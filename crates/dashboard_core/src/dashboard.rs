use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use futures::{stream, StreamExt};
use shared::{
    domain::{
        ChartProjection, Continent, ContinentAggregate, ContinentCatalog, Country, CountryCode,
        CountryCovidExtended, CovidSnapshot, DashboardData, StatField,
    },
    error::DashboardError,
};
use storage::CacheStore;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    aggregation::compute_continent_aggregates,
    cache::{default_freshness_window, CacheLookup, DashboardCache},
    gateway::CovidGateway,
    projection::ProjectionBuilder,
    view::{ChartRequest, RenderedChart},
};

const DEFAULT_PREFETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub freshness: Duration,
    pub prefetch_concurrency: usize,
    /// Countries the COVID source has no per-country record for.
    pub prefetch_exclusions: Vec<CountryCode>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            freshness: default_freshness_window(),
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            prefetch_exclusions: vec![CountryCode::from("XK")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsTarget {
    Continent(Continent),
    Country(CountryCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Remote,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    pub fetched: usize,
    pub failed: usize,
    pub already_cached: usize,
}

type ExtendedMemo = Arc<RwLock<HashMap<CountryCode, CountryCovidExtended>>>;

/// Runs the fetch phase to completion, then derives the aggregates.
///
/// Nothing is returned unless every request succeeded.
pub async fn fetch_dashboard_data<G: CovidGateway + ?Sized>(
    gateway: &G,
) -> Result<DashboardData, DashboardError> {
    let continents = gateway.fetch_continents().await?;
    let (mut countries, snapshots) = tokio::try_join!(
        gateway.fetch_countries_by_continent(&continents),
        gateway.fetch_covid_snapshots(),
    )?;

    for continent in &continents {
        if !countries.contains_key(continent) {
            warn!(continent = %continent, "no roster returned; continent will have no data");
            countries.insert(continent.clone(), Vec::new());
        }
    }

    let catalog = ContinentCatalog::new(continents, countries);
    let aggregates = compute_continent_aggregates(&catalog, &snapshots);
    Ok(DashboardData {
        catalog,
        snapshots,
        aggregates,
        fetched_at: Utc::now(),
    })
}

/// Owned application state plus the entry points the presentation layer uses.
pub struct Dashboard<G: ?Sized, S: ?Sized> {
    gateway: Arc<G>,
    cache: DashboardCache<S>,
    settings: DashboardSettings,
    projections: ProjectionBuilder,
    data: DashboardData,
    source: DataSource,
    extended: ExtendedMemo,
    prefetch: Option<JoinHandle<PrefetchReport>>,
}

impl<G, S> Dashboard<G, S>
where
    G: CovidGateway + ?Sized + 'static,
    S: CacheStore + ?Sized + 'static,
{
    /// Serves a fresh cache when there is one, otherwise fetches everything.
    ///
    /// Only gateway failures are fatal; cache problems fall back to a fetch.
    pub async fn load(
        gateway: Arc<G>,
        store: Arc<S>,
        settings: DashboardSettings,
    ) -> Result<Self, DashboardError> {
        let cache = DashboardCache::new(store, settings.freshness);

        let cached = match cache.load(Utc::now()).await {
            Ok(CacheLookup::Fresh(data)) => {
                info!(fetched_at = %data.fetched_at, "serving dashboard from cache");
                Some(data)
            }
            Ok(CacheLookup::Stale { saved_at }) => {
                info!(%saved_at, "cache expired; refetching");
                None
            }
            Ok(CacheLookup::Missing) => {
                debug!("cache empty; fetching");
                None
            }
            Ok(CacheLookup::Corrupt(err)) => {
                warn!(error = %err, "discarding corrupt cache");
                if let Err(err) = cache.clear().await {
                    warn!(error = %err, "failed to discard corrupt cache");
                }
                None
            }
            Err(err) => {
                warn!(error = %err, "cache unreadable; fetching");
                None
            }
        };

        let (data, source, extended) = match cached {
            Some(data) => {
                let extended = cache.load_extended().await.unwrap_or_else(|err| {
                    warn!(error = %err, "ignoring unreadable extended cache");
                    HashMap::new()
                });
                (data, DataSource::Cache, extended)
            }
            None => {
                let data = fetch_dashboard_data(gateway.as_ref()).await?;
                persist(&cache, &data).await;
                (data, DataSource::Remote, HashMap::new())
            }
        };

        Ok(Self {
            gateway,
            cache,
            settings,
            projections: ProjectionBuilder::default(),
            data,
            source,
            extended: Arc::new(RwLock::new(extended)),
            prefetch: None,
        })
    }

    /// Refetches everything and swaps the state in one step. On failure the
    /// previous state stays in place.
    pub async fn refresh(&mut self) -> Result<(), DashboardError> {
        self.cancel_prefetch();
        let data = fetch_dashboard_data(self.gateway.as_ref()).await?;
        persist(&self.cache, &data).await;

        self.data = data;
        self.source = DataSource::Remote;
        self.extended.write().await.clear();
        info!(continents = self.data.catalog.continents.len(), "dashboard refreshed");
        Ok(())
    }

    pub fn data(&self) -> &DashboardData {
        &self.data
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn continents(&self) -> &[Continent] {
        &self.data.catalog.continents
    }

    pub fn continent_aggregate(&self, continent: &Continent) -> Option<&ContinentAggregate> {
        self.data.aggregates.get(continent)
    }

    pub fn countries_of(&self, continent: &Continent) -> Option<&[Country]> {
        self.data.catalog.countries_of(continent)
    }

    pub fn country_snapshot(&self, code: &CountryCode) -> Option<&CovidSnapshot> {
        self.data.snapshots.get(code)
    }

    pub fn build_stats_projection(
        &self,
        target: &StatsTarget,
    ) -> Result<ChartProjection, DashboardError> {
        match target {
            StatsTarget::Continent(continent) => {
                self.require_continent(continent)?;
                let aggregate = self
                    .continent_aggregate(continent)
                    .copied()
                    .unwrap_or_else(ContinentAggregate::no_data);
                Ok(self.projections.from_record(&aggregate, continent.as_str()))
            }
            StatsTarget::Country(code) => {
                let country = self.require_country(code)?;
                match self.country_snapshot(code) {
                    Some(snapshot) => Ok(self.projections.from_record(snapshot, &country.name)),
                    None => {
                        let missing = DashboardError::MissingData {
                            code: code.to_string(),
                        };
                        debug!(%missing, "charting country without data");
                        Ok(self
                            .projections
                            .from_record(&ContinentAggregate::no_data(), &country.name))
                    }
                }
            }
        }
    }

    pub fn build_per_country_projection(
        &self,
        continent: &Continent,
        stat: StatField,
    ) -> Result<ChartProjection, DashboardError> {
        let countries = self.require_continent(continent)?;
        Ok(self
            .projections
            .across_countries(continent, countries, &self.data.snapshots, stat))
    }

    /// Fetches the country's extended figures on first use and memoizes them.
    pub async fn build_extended_projection(
        &self,
        code: &CountryCode,
    ) -> Result<ChartProjection, DashboardError> {
        let country = self.require_country(code)?;
        let extended = self.extended_snapshot(code).await?;
        Ok(self.projections.from_record(&extended, &country.name))
    }

    pub async fn extended_snapshot(
        &self,
        code: &CountryCode,
    ) -> Result<CountryCovidExtended, DashboardError> {
        if let Some(extended) = self.extended.read().await.get(code) {
            return Ok(*extended);
        }

        let extended = self.gateway.fetch_extended_snapshot(code).await?;
        self.extended.write().await.insert(code.clone(), extended);
        Ok(extended)
    }

    pub async fn render(
        &self,
        request: &ChartRequest,
    ) -> Result<Option<RenderedChart>, DashboardError> {
        let Some(kind) = request.kind() else {
            return Ok(None);
        };

        let projection = match request {
            ChartRequest::ContinentStats { continent } => {
                self.build_stats_projection(&StatsTarget::Continent(continent.clone()))?
            }
            ChartRequest::PerCountry { continent, stat } => {
                self.build_per_country_projection(continent, *stat)?
            }
            ChartRequest::CountryExtended { code } => self.build_extended_projection(code).await?,
            ChartRequest::Nothing => return Ok(None),
        };

        Ok(Some(RenderedChart { kind, projection }))
    }

    /// Warms the extended memo for every catalog country in the background.
    ///
    /// Returns false when a prefetch is already running.
    pub fn spawn_prefetch(&mut self) -> bool {
        if self.is_prefetching() {
            return false;
        }

        let codes: Vec<CountryCode> = self
            .data
            .catalog
            .all_countries()
            .map(|country| country.code.clone())
            .filter(|code| !self.settings.prefetch_exclusions.contains(code))
            .collect();

        let task = prefetch_extended(
            Arc::clone(&self.gateway),
            Arc::clone(&self.extended),
            self.cache.clone(),
            codes,
            self.settings.prefetch_concurrency.max(1),
        );
        self.prefetch = Some(tokio::spawn(task));
        true
    }

    pub fn is_prefetching(&self) -> bool {
        self.prefetch
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Waits for a running prefetch. `None` when none was started or it was
    /// cancelled.
    pub async fn wait_for_prefetch(&mut self) -> Option<PrefetchReport> {
        let handle = self.prefetch.take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(err) => {
                if !err.is_cancelled() {
                    warn!(error = %err, "extended prefetch task failed");
                }
                None
            }
        }
    }

    pub fn cancel_prefetch(&mut self) -> bool {
        match self.prefetch.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!("extended prefetch cancelled");
                true
            }
            _ => false,
        }
    }

    pub async fn clear_cache(&self) -> Result<(), DashboardError> {
        self.cache.clear().await
    }

    fn require_continent(&self, continent: &Continent) -> Result<&[Country], DashboardError> {
        self.countries_of(continent)
            .ok_or_else(|| DashboardError::UnknownContinent(continent.to_string()))
    }

    fn require_country(&self, code: &CountryCode) -> Result<&Country, DashboardError> {
        self.data
            .catalog
            .find_country(code)
            .ok_or_else(|| DashboardError::UnknownCountry(code.to_string()))
    }
}

impl<G: ?Sized, S: ?Sized> Drop for Dashboard<G, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.prefetch.take() {
            handle.abort();
        }
    }
}

async fn persist<S: CacheStore + ?Sized>(cache: &DashboardCache<S>, data: &DashboardData) {
    if let Err(err) = cache.save(data).await {
        warn!(error = %err, "failed to persist dashboard cache");
    }
}

async fn prefetch_extended<G, S>(
    gateway: Arc<G>,
    memo: ExtendedMemo,
    cache: DashboardCache<S>,
    codes: Vec<CountryCode>,
    concurrency: usize,
) -> PrefetchReport
where
    G: CovidGateway + ?Sized + 'static,
    S: CacheStore + ?Sized + 'static,
{
    let total = codes.len();
    let pending: Vec<CountryCode> = {
        let memo = memo.read().await;
        codes
            .into_iter()
            .filter(|code| !memo.contains_key(code))
            .collect()
    };
    let mut report = PrefetchReport {
        already_cached: total - pending.len(),
        ..PrefetchReport::default()
    };
    info!(pending = pending.len(), concurrency, "extended prefetch started");

    let mut results = stream::iter(pending)
        .map(|code| {
            let gateway = Arc::clone(&gateway);
            async move {
                let result = gateway.fetch_extended_snapshot(&code).await;
                (code, result)
            }
        })
        .buffer_unordered(concurrency);

    while let Some((code, result)) = results.next().await {
        match result {
            Ok(extended) => {
                memo.write().await.insert(code, extended);
                report.fetched += 1;
            }
            Err(err) => {
                warn!(country = %code, error = %err, "extended prefetch skipped country");
                report.failed += 1;
            }
        }
    }

    let snapshot = memo.read().await.clone();
    if let Err(err) = cache.save_extended(&snapshot).await {
        warn!(error = %err, "failed to persist extended cache");
    }

    info!(
        fetched = report.fetched,
        failed = report.failed,
        already_cached = report.already_cached,
        "extended prefetch finished"
    );
    report
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
