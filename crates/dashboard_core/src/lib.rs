//! Data layer of the COVID continent dashboard: remote fetches, per-continent
//! aggregation, chart projections, and the local cache that ties them
//! together.

pub mod aggregation;
pub mod cache;
mod dashboard;
pub mod gateway;
pub mod projection;
pub mod view;

pub use aggregation::{compute_continent_aggregates, extended_from_record};
pub use cache::{CacheLookup, DashboardCache};
pub use dashboard::{
    fetch_dashboard_data, Dashboard, DashboardSettings, DataSource, PrefetchReport, StatsTarget,
};
pub use gateway::{ApiEndpoints, CovidGateway, HttpGateway};
pub use projection::{project_across_countries, project_from_record, Palette, ProjectionBuilder};
pub use view::{ChartKind, ChartRequest, RenderedChart, ViewEvent, ViewState};
