//! Per-continent summary statistics and per-country deltas.
//!
//! Everything here is a pure function of its inputs, so recomputing with the
//! same data always yields the same output.

use std::collections::HashMap;

use shared::{
    domain::{
        Continent, ContinentAggregate, ContinentCatalog, CountryCode, CountryCovidExtended,
        CovidSnapshot,
    },
    error::DashboardError,
    protocol::CovidCountryRecord,
};
use tracing::warn;

/// Averages the snapshots of each continent's countries, flooring every mean.
///
/// Countries without a snapshot are left out of both numerator and
/// denominator. A continent with no snapshot at all gets
/// [`ContinentAggregate::no_data`].
pub fn compute_continent_aggregates(
    catalog: &ContinentCatalog,
    snapshots: &HashMap<CountryCode, CovidSnapshot>,
) -> HashMap<Continent, ContinentAggregate> {
    catalog
        .continents
        .iter()
        .map(|continent| {
            let countries = catalog.countries_of(continent).unwrap_or_default();
            let found: Vec<&CovidSnapshot> = countries
                .iter()
                .filter_map(|country| {
                    let snapshot = snapshots.get(&country.code);
                    if snapshot.is_none() {
                        let missing = DashboardError::MissingData {
                            code: country.code.to_string(),
                        };
                        warn!(continent = %continent, country = %country.name, "{missing}; excluded from average");
                    }
                    snapshot
                })
                .collect();

            let aggregate = average_snapshots(&found);
            if !aggregate.has_data() {
                warn!(continent = %continent, "no country snapshots available; using empty aggregate");
            }
            (continent.clone(), aggregate)
        })
        .collect()
}

/// Floor of the per-field arithmetic mean.
pub fn average_snapshots(snapshots: &[&CovidSnapshot]) -> ContinentAggregate {
    if snapshots.is_empty() {
        return ContinentAggregate::no_data();
    }

    let count = snapshots.len() as u128;
    let mean = |field: fn(&CovidSnapshot) -> u64| -> u64 {
        let total: u128 = snapshots.iter().map(|s| u128::from(field(s))).sum();
        // mean of u64 values always fits back into u64
        (total / count) as u64
    };

    ContinentAggregate {
        confirmed: mean(|s| s.confirmed),
        deaths: mean(|s| s.deaths),
        recovered: mean(|s| s.recovered),
        critical: mean(|s| s.critical),
        sample_size: snapshots.len(),
    }
}

/// Latest totals plus the most recent day's deltas (timeline element 0).
pub fn extended_from_record(record: &CovidCountryRecord) -> CountryCovidExtended {
    let totals = CovidSnapshot::from(&record.latest_data);
    let latest_day = record.timeline.first();

    // corrections show up as negative deltas; chart them as no new cases
    let delta = |value: Option<i64>| value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0);

    CountryCovidExtended {
        total_cases: totals.confirmed,
        new_cases: delta(latest_day.and_then(|day| day.new_confirmed)),
        total_deaths: totals.deaths,
        new_deaths: delta(latest_day.and_then(|day| day.new_deaths)),
        total_recovered: totals.recovered,
        in_critical_condition: totals.critical,
    }
}

#[cfg(test)]
#[path = "tests/aggregation_tests.rs"]
mod tests;
