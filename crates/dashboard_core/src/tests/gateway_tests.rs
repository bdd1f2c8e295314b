use super::*;
use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn spawn_api(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn gateway_for(base: &str) -> HttpGateway {
    let endpoints = ApiEndpoints::new(&format!("{base}/rest"), &format!("{base}/covid"))
        .expect("endpoints");
    HttpGateway::new(endpoints, Duration::from_secs(5)).expect("gateway")
}

async fn roster(Path(region): Path<String>) -> Result<Json<Value>, StatusCode> {
    match region.as_str() {
        "europe" => Ok(Json(json!([
            {"name": {"common": "France", "official": "French Republic"}, "cca2": "FR"},
            {"name": {"common": "Spain"}, "cca2": "ES"}
        ]))),
        "americas" => Ok(Json(json!([
            {"name": {"common": "Canada"}, "cca2": "CA"}
        ]))),
        _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn api_router() -> Router {
    Router::new()
        .route(
            "/rest/all",
            get(|| async {
                Json(json!([
                    {"region": "Europe"},
                    {"region": "Americas"},
                    {"region": "Europe"},
                    {"region": ""},
                    {}
                ]))
            }),
        )
        .route("/rest/region/:region", get(roster))
        .route(
            "/covid/countries",
            get(|| async {
                Json(json!({"data": [
                    {"code": "FR", "name": "France", "latest_data": {"confirmed": 10, "deaths": 2, "recovered": 5, "critical": 1}},
                    {"code": "ES", "latest_data": {"confirmed": 4, "deaths": null, "recovered": 1, "critical": 0}}
                ]}))
            }),
        )
        .route(
            "/covid/countries/:code",
            get(|Path(code): Path<String>| async move {
                Json(json!({"data": {
                    "code": code,
                    "latest_data": {"confirmed": 10, "deaths": 2, "recovered": 5, "critical": 1},
                    "timeline": [{"date": "2020-08-02", "new_confirmed": 3, "new_deaths": 1}]
                }}))
            }),
        )
}

#[test]
fn distinct_regions_keeps_first_seen_order() {
    let records = ["Asia", "Europe", "Asia", "", "Africa", "Europe"]
        .into_iter()
        .map(|region| RegionRecord {
            region: Some(region.to_string()),
        })
        .chain(std::iter::once(RegionRecord { region: None }));

    assert_eq!(
        distinct_regions(records),
        vec![
            Continent::from("Asia"),
            Continent::from("Europe"),
            Continent::from("Africa")
        ]
    );
}

#[test]
fn endpoints_lowercase_continent_and_tolerate_trailing_slash() {
    let endpoints =
        ApiEndpoints::new("https://countries.example/v3.1/", "https://covid.example").expect("endpoints");
    assert_eq!(
        endpoints.region_countries(&Continent::from("Europe")),
        "https://countries.example/v3.1/region/europe?fields=name,cca2"
    );
    assert_eq!(
        endpoints.covid_country(&CountryCode::from("FR")),
        "https://covid.example/countries/FR"
    );
}

#[test]
fn endpoints_reject_invalid_urls() {
    let err = ApiEndpoints::new("not a url", DEFAULT_COVID_API_URL).expect_err("must fail");
    assert!(err.to_string().contains("invalid countries api url"));
}

#[tokio::test]
async fn fetches_distinct_continents() {
    let base = spawn_api(api_router()).await;
    let continents = gateway_for(&base).fetch_continents().await.expect("continents");
    assert_eq!(
        continents,
        vec![Continent::from("Europe"), Continent::from("Americas")]
    );
}

#[tokio::test]
async fn fetches_rosters_for_every_continent() {
    let base = spawn_api(api_router()).await;
    let continents = vec![Continent::from("Europe"), Continent::from("Americas")];
    let rosters = gateway_for(&base)
        .fetch_countries_by_continent(&continents)
        .await
        .expect("rosters");

    assert_eq!(rosters.len(), 2);
    assert_eq!(
        rosters[&Continent::from("Europe")],
        vec![Country::new("France", "FR"), Country::new("Spain", "ES")]
    );
    assert_eq!(
        rosters[&Continent::from("Americas")],
        vec![Country::new("Canada", "CA")]
    );
}

#[tokio::test]
async fn one_failing_roster_fails_the_whole_batch() {
    let base = spawn_api(api_router()).await;
    let continents = vec![Continent::from("Europe"), Continent::from("Oceania")];
    let err = gateway_for(&base)
        .fetch_countries_by_continent(&continents)
        .await
        .expect_err("must fail");

    match err {
        DashboardError::Network { url, message } => {
            assert!(url.ends_with("/rest/region/oceania?fields=name,cca2"), "url: {url}");
            assert!(message.contains("500"), "message: {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn fetches_snapshots_keyed_by_code() {
    let base = spawn_api(api_router()).await;
    let snapshots = gateway_for(&base)
        .fetch_covid_snapshots()
        .await
        .expect("snapshots");

    assert_eq!(snapshots.len(), 2);
    assert_eq!(
        snapshots[&CountryCode::from("ES")],
        CovidSnapshot {
            confirmed: 4,
            deaths: 0,
            recovered: 1,
            critical: 0
        }
    );
}

#[tokio::test]
async fn fetches_extended_snapshot_with_latest_deltas() {
    let base = spawn_api(api_router()).await;
    let extended = gateway_for(&base)
        .fetch_extended_snapshot(&CountryCode::from("FR"))
        .await
        .expect("extended");

    assert_eq!(
        extended,
        CountryCovidExtended {
            total_cases: 10,
            new_cases: 3,
            total_deaths: 2,
            new_deaths: 1,
            total_recovered: 5,
            in_critical_condition: 1,
        }
    );
}

#[tokio::test]
async fn negative_timeline_corrections_decode_as_zero_new_cases() {
    let app = Router::new().route(
        "/covid/countries/:code",
        get(|| async {
            Json(json!({"data": {
                "code": "ES",
                "latest_data": {"confirmed": 40, "deaths": 4, "recovered": 30, "critical": 2},
                "timeline": [
                    {"date": "2020-08-03", "new_confirmed": -3, "new_deaths": 1},
                    {"date": "2020-08-02", "new_confirmed": 5, "new_deaths": -2}
                ]
            }}))
        }),
    );
    let base = spawn_api(app).await;
    let extended = gateway_for(&base)
        .fetch_extended_snapshot(&CountryCode::from("ES"))
        .await
        .expect("corrections must not fail decoding");

    assert_eq!(extended.total_cases, 40);
    assert_eq!(extended.new_cases, 0);
    assert_eq!(extended.new_deaths, 1);
}

#[tokio::test]
async fn mismatched_extended_payload_is_rejected() {
    let app = Router::new().route(
        "/covid/countries/:code",
        get(|| async { Json(json!({"data": {"code": "DE", "latest_data": {}}})) }),
    );
    let base = spawn_api(app).await;
    let err = gateway_for(&base)
        .fetch_extended_snapshot(&CountryCode::from("FR"))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("instead of 'FR'"), "{err}");
}

#[tokio::test]
async fn undecodable_body_is_a_network_error() {
    let app = Router::new().route("/rest/all", get(|| async { "<html>oops</html>" }));
    let base = spawn_api(app).await;
    let err = gateway_for(&base)
        .fetch_continents()
        .await
        .expect_err("must fail");
    assert!(err.is_retryable());
    assert!(err.to_string().contains("invalid response body"), "{err}");
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let app = Router::new().route(
        "/covid/countries",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"data": []}))
        }),
    );
    let base = spawn_api(app).await;
    let endpoints =
        ApiEndpoints::new(&format!("{base}/rest"), &format!("{base}/covid")).expect("endpoints");
    let gateway = HttpGateway::new(endpoints, Duration::from_millis(100)).expect("gateway");

    let err = gateway
        .fetch_covid_snapshots()
        .await
        .expect_err("must time out");
    assert!(err.to_string().contains("timed out"), "{err}");
}
