use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashboard_core::{
    ChartRequest, Dashboard, DashboardCache, DataSource, HttpGateway, ViewEvent, ViewState,
};
use serde_json::json;
use shared::{
    domain::{Continent, CountryCode, StatField},
    error::{DashboardError, ErrorReport},
};
use storage::SqliteCacheStore;
use tracing_subscriber::EnvFilter;

mod config;

use config::{default_config_path, load_settings, prepare_database_url, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "COVID-19 statistics per continent", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value_os_t = default_config_path())]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List continents with their roster size
    Continents,
    /// Replay a selection and print the resulting chart as JSON
    Show {
        #[arg(long)]
        continent: Option<String>,
        #[arg(long)]
        stat: Option<StatField>,
        #[arg(long)]
        country: Option<String>,
    },
    /// Print the averaged statistics of one continent
    Aggregate { continent: String },
    /// Refetch everything and rewrite the cache
    Refresh,
    /// Fetch extended figures for every country into the cache
    Prefetch,
    /// Drop all cached data
    ClearCache,
}

type CliDashboard = Dashboard<HttpGateway, SqliteCacheStore>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        match err.downcast_ref::<DashboardError>() {
            Some(dashboard_err) => {
                let report = ErrorReport::from(dashboard_err);
                eprintln!("error: {}", report.message);
                if report.retryable {
                    eprintln!("the data sources could not be reached; check your connection and retry");
                }
            }
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli.config)?;
    let store = open_store(&settings).await?;

    match cli.command {
        Command::ClearCache => {
            let cache = DashboardCache::new(store, settings.dashboard_settings()?.freshness);
            cache.clear().await?;
            println!("cache cleared");
        }
        Command::Continents => {
            let dashboard = open_dashboard(&settings, store).await?;
            let rows: Vec<_> = dashboard
                .continents()
                .iter()
                .map(|continent| {
                    let countries = dashboard.countries_of(continent).map_or(0, <[_]>::len);
                    let has_data = dashboard
                        .continent_aggregate(continent)
                        .is_some_and(|aggregate| aggregate.has_data());
                    json!({ "continent": continent, "countries": countries, "has_data": has_data })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Show {
            continent,
            stat,
            country,
        } => {
            let dashboard = open_dashboard(&settings, store).await?;
            let mut events = vec![ViewEvent::SelectContinent(continent.map(Continent::new))];
            if let Some(stat) = stat {
                events.push(ViewEvent::SelectStat(stat));
            }
            if let Some(code) = country {
                events.push(ViewEvent::SelectCountry(Some(CountryCode::new(
                    code.to_ascii_uppercase(),
                ))));
            }

            let mut view = ViewState::default();
            let mut last = ChartRequest::Nothing;
            for event in events {
                let request = view.apply(event, dashboard.continents());
                if request != ChartRequest::Nothing {
                    last = request;
                }
            }

            match dashboard.render(&last).await? {
                Some(chart) => println!("{}", serde_json::to_string_pretty(&chart)?),
                None => println!("nothing to show"),
            }
        }
        Command::Aggregate { continent } => {
            let dashboard = open_dashboard(&settings, store).await?;
            let continent = Continent::new(continent);
            let aggregate = dashboard
                .continent_aggregate(&continent)
                .ok_or_else(|| DashboardError::UnknownContinent(continent.to_string()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "continent": continent,
                    "aggregate": aggregate,
                    "has_data": aggregate.has_data(),
                }))?
            );
        }
        Command::Refresh => {
            let mut dashboard = open_dashboard(&settings, store).await?;
            if dashboard.source() == DataSource::Cache {
                dashboard.refresh().await?;
            }
            println!(
                "refreshed {} continents at {}",
                dashboard.continents().len(),
                dashboard.data().fetched_at.to_rfc3339()
            );
        }
        Command::Prefetch => {
            let mut dashboard = open_dashboard(&settings, store).await?;
            dashboard.spawn_prefetch();
            let report = dashboard
                .wait_for_prefetch()
                .await
                .context("prefetch did not complete")?;
            println!(
                "prefetched fetched={} failed={} already_cached={}",
                report.fetched, report.failed, report.already_cached
            );
        }
    }

    Ok(())
}

async fn open_store(settings: &Settings) -> Result<Arc<SqliteCacheStore>> {
    let database_url = prepare_database_url(&settings.database_url);
    let store = SqliteCacheStore::new(&database_url).await?;
    Ok(Arc::new(store))
}

async fn open_dashboard(settings: &Settings, store: Arc<SqliteCacheStore>) -> Result<CliDashboard> {
    let gateway = HttpGateway::new(settings.endpoints()?, settings.request_timeout())?;
    let dashboard = Dashboard::load(Arc::new(gateway), store, settings.dashboard_settings()?).await?;
    tracing::debug!(source = ?dashboard.source(), "dashboard ready");
    Ok(dashboard)
}
