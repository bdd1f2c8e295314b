use std::collections::HashSet;

use super::*;

fn assert_parallel(projection: &ChartProjection, expected_len: usize) {
    assert_eq!(projection.labels.len(), expected_len);
    assert_eq!(projection.values.len(), expected_len);
    assert_eq!(projection.has_data.len(), expected_len);
    assert_eq!(projection.background_colors.len(), expected_len);
    assert_eq!(projection.border_colors.len(), expected_len);
}

#[test]
fn snapshot_projects_four_fields_in_fixed_order() {
    let snapshot = CovidSnapshot {
        confirmed: 100,
        deaths: 10,
        recovered: 80,
        critical: 2,
    };

    let projection = project_from_record(&snapshot, "Canada");
    assert_parallel(&projection, 4);
    assert_eq!(
        projection.labels,
        vec!["Confirmed", "Deaths", "Recovered", "Critical"]
    );
    assert_eq!(projection.values, vec![100, 10, 80, 2]);
    assert_eq!(projection.tooltip, "# of total cases in Canada");
    assert!(projection.has_data.iter().all(|present| *present));
}

#[test]
fn aggregate_projects_like_a_snapshot() {
    let aggregate = ContinentAggregate {
        confirmed: 75,
        deaths: 7,
        recovered: 60,
        critical: 1,
        sample_size: 2,
    };

    let projection = project_from_record(&aggregate, "North America");
    assert_parallel(&projection, 4);
    assert_eq!(projection.values, vec![75, 7, 60, 1]);
    assert_eq!(projection.tooltip, "# of total cases in North America");
    assert_eq!(projection.has_data, vec![true; 4]);
}

#[test]
fn no_data_aggregate_flags_every_value_as_missing() {
    let projection = project_from_record(&ContinentAggregate::no_data(), "Antarctic");
    assert_parallel(&projection, 4);
    assert_eq!(projection.values, vec![0, 0, 0, 0]);
    assert_eq!(projection.has_data, vec![false; 4]);
}

#[test]
fn aggregate_of_real_zeros_keeps_data_flags() {
    let aggregate = ContinentAggregate {
        sample_size: 3,
        ..ContinentAggregate::no_data()
    };

    let projection = project_from_record(&aggregate, "Oceania");
    assert_eq!(projection.values, vec![0, 0, 0, 0]);
    assert_eq!(projection.has_data, vec![true; 4]);
}

#[test]
fn extended_record_projects_six_fields() {
    let extended = CountryCovidExtended {
        total_cases: 500,
        new_cases: 21,
        total_deaths: 40,
        new_deaths: 3,
        total_recovered: 300,
        in_critical_condition: 12,
    };

    let projection = project_from_record(&extended, "Italy");
    assert_parallel(&projection, 6);
    assert_eq!(
        projection.labels,
        vec![
            "Total Cases",
            "New Cases",
            "Total Deaths",
            "New Deaths",
            "Total Recovered",
            "In Critical condition"
        ]
    );
    assert_eq!(projection.values, vec![500, 21, 40, 3, 300, 12]);
    assert_eq!(projection.tooltip, "# of cases in Italy");
}

#[test]
fn across_countries_flags_missing_snapshots() {
    let continent = Continent::from("Europe");
    let countries = vec![
        Country::new("France", "FR"),
        Country::new("Kosovo", "XK"),
        Country::new("Spain", "ES"),
    ];
    let snapshots = HashMap::from([
        (
            CountryCode::from("FR"),
            CovidSnapshot {
                confirmed: 9,
                deaths: 1,
                recovered: 0,
                critical: 0,
            },
        ),
        (
            CountryCode::from("ES"),
            CovidSnapshot {
                confirmed: 4,
                deaths: 0,
                recovered: 0,
                critical: 0,
            },
        ),
    ]);

    let projection = project_across_countries(&continent, &countries, &snapshots, StatField::Deaths);
    assert_parallel(&projection, 3);
    assert_eq!(projection.labels, vec!["France", "Kosovo", "Spain"]);
    assert_eq!(projection.values, vec![1, 0, 0]);
    assert_eq!(projection.has_data, vec![true, false, true]);
    assert_eq!(projection.tooltip, "# of Deaths cases in Europe");
}

#[test]
fn across_countries_with_empty_roster_is_empty() {
    let projection = project_across_countries(
        &Continent::from("Antarctic"),
        &[],
        &HashMap::new(),
        StatField::Confirmed,
    );
    assert!(projection.is_empty());
    assert_parallel(&projection, 0);
}

#[test]
fn colors_are_stable_across_calls() {
    let snapshot = CovidSnapshot::default();
    let first = project_from_record(&snapshot, "A");
    let second = project_from_record(&snapshot, "B");
    assert_eq!(first.background_colors, second.background_colors);
    assert_eq!(first.border_colors, second.border_colors);
}

#[test]
fn background_and_border_differ_only_in_alpha() {
    let projection = project_from_record(&CovidSnapshot::default(), "A");
    for (background, border) in projection
        .background_colors
        .iter()
        .zip(&projection.border_colors)
    {
        assert_eq!((background.r, background.g, background.b), (border.r, border.g, border.b));
        assert_eq!(background.a, BACKGROUND_ALPHA);
        assert_eq!(border.a, BORDER_ALPHA);
    }
}

#[test]
fn palette_yields_distinct_colors_past_the_base_list() {
    let palette = Palette::default();
    let colors: HashSet<(u8, u8, u8)> = palette
        .colors(64, 1.0)
        .into_iter()
        .map(|c| (c.r, c.g, c.b))
        .collect();
    assert_eq!(colors.len(), 64);
}

#[test]
fn custom_palette_is_used_by_builder() {
    let red = Rgba {
        r: 255,
        g: 0,
        b: 0,
        a: 1.0,
    };
    let builder = ProjectionBuilder::new(Palette::new(vec![red]));
    let projection = builder.from_record(&CovidSnapshot::default(), "X");
    assert_eq!(projection.border_colors[0], red);
    assert_eq!(projection.background_colors[0], red.with_alpha(BACKGROUND_ALPHA));
    assert_ne!(projection.border_colors[1], red);
}

#[test]
fn rgba_displays_as_css() {
    let color = Rgba {
        r: 54,
        g: 162,
        b: 235,
        a: 0.2,
    };
    assert_eq!(color.to_string(), "rgba(54, 162, 235, 0.2)");
}
