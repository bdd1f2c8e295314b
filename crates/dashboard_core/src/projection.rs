//! Chart-ready projections of statistics records and per-country series.

use std::collections::HashMap;

use shared::domain::{
    ChartProjection, Continent, ContinentAggregate, Country, CountryCode, CountryCovidExtended,
    CovidSnapshot, Rgba, StatField,
};

pub const BACKGROUND_ALPHA: f32 = 0.2;
pub const BORDER_ALPHA: f32 = 1.0;

const GOLDEN_ANGLE_DEGREES: f64 = 137.508;
const GENERATED_LIGHTNESS: [f64; 3] = [0.45, 0.55, 0.35];

const BASE_PALETTE: [(u8, u8, u8); 12] = [
    (255, 99, 132),
    (54, 162, 235),
    (255, 206, 86),
    (75, 192, 192),
    (153, 102, 255),
    (255, 159, 64),
    (201, 203, 207),
    (46, 204, 113),
    (231, 76, 60),
    (52, 73, 94),
    (241, 196, 15),
    (26, 188, 156),
];

/// Deterministic color source indexed by label position.
///
/// The first colors come from the base list; positions beyond it rotate the
/// hue by the golden angle so neighbouring labels stay visually apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    base: Vec<Rgba>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            BASE_PALETTE
                .iter()
                .map(|&(r, g, b)| Rgba { r, g, b, a: 1.0 })
                .collect(),
        )
    }
}

impl Palette {
    pub fn new(base: Vec<Rgba>) -> Self {
        Self { base }
    }

    pub fn color_at(&self, index: usize) -> Rgba {
        if let Some(color) = self.base.get(index) {
            return *color;
        }

        let generated = index - self.base.len();
        let hue = (generated as f64 * GOLDEN_ANGLE_DEGREES) % 360.0;
        let lightness = GENERATED_LIGHTNESS[(generated / 24) % GENERATED_LIGHTNESS.len()];
        hsl_to_rgba(hue, 0.65, lightness)
    }

    pub fn colors(&self, count: usize, alpha: f32) -> Vec<Rgba> {
        (0..count)
            .map(|index| self.color_at(index).with_alpha(alpha))
            .collect()
    }
}

fn hsl_to_rgba(hue: f64, saturation: f64, lightness: f64) -> Rgba {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

    Rgba {
        r: channel(r),
        g: channel(g),
        b: channel(b),
        a: 1.0,
    }
}

/// A record whose fields chart as one bar per field.
pub trait StatRecord {
    /// Field labels and values in display order.
    fn fields(&self) -> Vec<(&'static str, u64)>;

    fn tooltip(&self, subject: &str) -> String {
        format!("# of total cases in {subject}")
    }

    /// False when every value is a zero stand-in for missing data.
    fn has_data(&self) -> bool {
        true
    }
}

impl StatRecord for CovidSnapshot {
    fn fields(&self) -> Vec<(&'static str, u64)> {
        StatField::ALL
            .into_iter()
            .map(|field| (field.label(), self.stat(field)))
            .collect()
    }
}

impl StatRecord for ContinentAggregate {
    fn fields(&self) -> Vec<(&'static str, u64)> {
        self.as_snapshot().fields()
    }

    fn has_data(&self) -> bool {
        self.sample_size > 0
    }
}

impl StatRecord for CountryCovidExtended {
    fn fields(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("Total Cases", self.total_cases),
            ("New Cases", self.new_cases),
            ("Total Deaths", self.total_deaths),
            ("New Deaths", self.new_deaths),
            ("Total Recovered", self.total_recovered),
            ("In Critical condition", self.in_critical_condition),
        ]
    }

    fn tooltip(&self, subject: &str) -> String {
        format!("# of cases in {subject}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectionBuilder {
    palette: Palette,
}

impl ProjectionBuilder {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn from_record<R: StatRecord + ?Sized>(&self, record: &R, subject: &str) -> ChartProjection {
        let (labels, values): (Vec<String>, Vec<u64>) = record
            .fields()
            .into_iter()
            .map(|(label, value)| (label.to_string(), value))
            .unzip();
        let has_data = vec![record.has_data(); labels.len()];
        self.assemble(labels, record.tooltip(subject), values, has_data)
    }

    /// One entry per country in roster order. Countries without a snapshot
    /// chart as zero with `has_data` false.
    pub fn across_countries(
        &self,
        continent: &Continent,
        countries: &[Country],
        snapshots: &HashMap<CountryCode, CovidSnapshot>,
        stat: StatField,
    ) -> ChartProjection {
        let mut labels = Vec::with_capacity(countries.len());
        let mut values = Vec::with_capacity(countries.len());
        let mut has_data = Vec::with_capacity(countries.len());

        for country in countries {
            let snapshot = snapshots.get(&country.code);
            labels.push(country.name.clone());
            values.push(snapshot.map_or(0, |s| s.stat(stat)));
            has_data.push(snapshot.is_some());
        }

        let tooltip = format!("# of {stat} cases in {continent}");
        self.assemble(labels, tooltip, values, has_data)
    }

    fn assemble(
        &self,
        labels: Vec<String>,
        tooltip: String,
        values: Vec<u64>,
        has_data: Vec<bool>,
    ) -> ChartProjection {
        let background_colors = self.palette.colors(labels.len(), BACKGROUND_ALPHA);
        let border_colors = self.palette.colors(labels.len(), BORDER_ALPHA);
        ChartProjection {
            labels,
            tooltip,
            values,
            has_data,
            background_colors,
            border_colors,
        }
    }
}

pub fn project_from_record<R: StatRecord + ?Sized>(record: &R, subject: &str) -> ChartProjection {
    ProjectionBuilder::default().from_record(record, subject)
}

pub fn project_across_countries(
    continent: &Continent,
    countries: &[Country],
    snapshots: &HashMap<CountryCode, CovidSnapshot>,
    stat: StatField,
) -> ChartProjection {
    ProjectionBuilder::default().across_countries(continent, countries, snapshots, stat)
}

#[cfg(test)]
#[path = "tests/projection_tests.rs"]
mod tests;
