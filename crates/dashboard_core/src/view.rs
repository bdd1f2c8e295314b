//! Selection state of the presentation layer and the chart each change asks for.

use serde::{Deserialize, Serialize};
use shared::domain::{ChartProjection, Continent, CountryCode, StatField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// `None` is the initial render and picks the first continent.
    SelectContinent(Option<Continent>),
    SelectStat(StatField),
    /// `None` clears the country selection.
    SelectCountry(Option<CountryCode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartRequest {
    ContinentStats { continent: Continent },
    PerCountry { continent: Continent, stat: StatField },
    CountryExtended { code: CountryCode },
    Nothing,
}

impl ChartRequest {
    pub fn kind(&self) -> Option<ChartKind> {
        match self {
            ChartRequest::ContinentStats { .. } | ChartRequest::CountryExtended { .. } => {
                Some(ChartKind::Bar)
            }
            ChartRequest::PerCountry { .. } => Some(ChartKind::Line),
            ChartRequest::Nothing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub projection: ChartProjection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    continent: Option<Continent>,
    stat: Option<StatField>,
    country: Option<CountryCode>,
}

impl ViewState {
    pub fn continent(&self) -> Option<&Continent> {
        self.continent.as_ref()
    }

    pub fn stat(&self) -> Option<StatField> {
        self.stat
    }

    pub fn country(&self) -> Option<&CountryCode> {
        self.country.as_ref()
    }

    pub fn apply(&mut self, event: ViewEvent, continents: &[Continent]) -> ChartRequest {
        match event {
            ViewEvent::SelectContinent(choice) => {
                let Some(continent) = choice.or_else(|| continents.first().cloned()) else {
                    *self = ViewState::default();
                    return ChartRequest::Nothing;
                };
                self.continent = Some(continent.clone());
                self.stat = None;
                self.country = None;
                ChartRequest::ContinentStats { continent }
            }
            ViewEvent::SelectStat(stat) => {
                self.stat = Some(stat);
                match &self.continent {
                    Some(continent) => ChartRequest::PerCountry {
                        continent: continent.clone(),
                        stat,
                    },
                    None => ChartRequest::Nothing,
                }
            }
            ViewEvent::SelectCountry(Some(code)) => {
                self.country = Some(code.clone());
                ChartRequest::CountryExtended { code }
            }
            ViewEvent::SelectCountry(None) => {
                self.country = None;
                ChartRequest::Nothing
            }
        }
    }
}
