use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use actix_web::{test, web, App};
use bigdecimal::BigDecimal;
use httpmock::prelude::*;
use serde_json::{json, Value};
use url::Url;

use country_cache::api::middleware::normalize_path;
use country_cache::api::routes::configure_routes;
use country_cache::api::AppState;
use country_cache::config::UpstreamConfig;
use country_cache::database_ops::{CountryStore, MemoryCountryStore};
use country_cache::providers::{
    build_http_client, ExchangeRateProvider, RestCountriesProvider, Upstreams,
};
use country_cache::refresh::{ArtifactSlot, FixedMultiplier, PngSummaryRenderer};

const COUNTRIES_PATH: &str = "/v2/all";
const RATES_PATH: &str = "/v6/latest/USD";

fn countries_payload() -> Value {
    json!([
        {
            "name": "Testland",
            "capital": "Test City",
            "region": "Mythica",
            "population": 1000,
            "flag": "https://flags.example/testland.svg",
            "currencies": [{"code": "XYZ"}]
        },
        {
            "name": "Nigeria",
            "capital": "Abuja",
            "region": "Africa",
            "population": 200,
            "currencies": [{"code": "NGN"}, {"code": "USD"}]
        },
        {
            "name": "Oddland",
            "region": "Mythica",
            "population": 10,
            "currencies": [{"code": "QQQ"}]
        },
        {
            "name": "Antarctica",
            "region": "Polar",
            "population": 1000,
            "currencies": []
        },
        {"name": "Nopopland", "region": "Mythica"}
    ])
}

fn rates_payload() -> Value {
    json!({"result": "success", "rates": {"USD": 1, "XYZ": 2, "NGN": 1600}})
}

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn dec_field(v: &Value) -> Option<BigDecimal> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(dec(s)),
        other => Some(dec(&other.to_string())),
    }
}

fn upstreams(server: &MockServer) -> Upstreams {
    let http = build_http_client(&UpstreamConfig::default()).unwrap();
    Upstreams {
        countries: RestCountriesProvider::new(
            http.clone(),
            Url::parse(&server.url(COUNTRIES_PATH)).unwrap(),
        ),
        rates: ExchangeRateProvider::new(http, Url::parse(&server.url(RATES_PATH)).unwrap()),
    }
}

fn state_for(server: &MockServer, store: Arc<dyn CountryStore>, dir: &Path) -> AppState {
    AppState::assemble(
        store,
        upstreams(server),
        Arc::new(FixedMultiplier(dec("1500"))),
        Arc::new(PngSummaryRenderer::bundled().unwrap()),
        ArtifactSlot::new(dir.to_path_buf()),
    )
}

async fn healthy_upstreams() -> MockServer {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(COUNTRIES_PATH);
            then.status(200).json_body(countries_payload());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(RATES_PATH);
            then.status(200).json_body(rates_payload());
        })
        .await;
    server
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .wrap(normalize_path())
                .configure(configure_routes),
        )
        .await
    };
}

async fn refreshed_state(dir: &Path) -> (MockServer, AppState) {
    let server = healthy_upstreams().await;
    let state = state_for(&server, Arc::new(MemoryCountryStore::new()), dir);
    state.engine.refresh().await.unwrap();
    (server, state)
}

#[actix_web::test]
async fn refresh_populates_cache_and_reports_total() {
    let dir = tempfile::tempdir().unwrap();
    let server = healthy_upstreams().await;
    let app = app!(state_for(
        &server,
        Arc::new(MemoryCountryStore::new()),
        dir.path()
    ));

    let req = test::TestRequest::post().uri("/refresh/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Countries refreshed successfully");
    // Nopopland has no population and is skipped
    assert_eq!(body["total_countries"], 4);

    let req = test::TestRequest::get().uri("/Testland/").to_request();
    let testland: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(testland["currency_code"], "XYZ");
    assert_eq!(dec_field(&testland["exchange_rate"]), Some(dec("2")));
    assert_eq!(dec_field(&testland["estimated_gdp"]), Some(dec("750000")));
    assert!(testland["last_refreshed_at"].is_string());

    // first listed currency wins
    let req = test::TestRequest::get().uri("/nigeria/").to_request();
    let nigeria: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(nigeria["name"], "Nigeria");
    assert_eq!(nigeria["currency_code"], "NGN");
    assert_eq!(dec_field(&nigeria["estimated_gdp"]), Some(dec("187.5")));

    let req = test::TestRequest::get().uri("/Antarctica/").to_request();
    let antarctica: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(antarctica["currency_code"], Value::Null);
    assert_eq!(antarctica["exchange_rate"], Value::Null);
    assert_eq!(dec_field(&antarctica["estimated_gdp"]), Some(dec("0")));

    let req = test::TestRequest::get().uri("/Oddland/").to_request();
    let oddland: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(oddland["currency_code"], "QQQ");
    assert_eq!(oddland["exchange_rate"], Value::Null);
    assert_eq!(oddland["estimated_gdp"], Value::Null);
}

#[actix_web::test]
async fn repeated_refresh_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, state) = refreshed_state(dir.path()).await;
    let before = state.store.get("testland").await.unwrap().unwrap();

    let outcome = state.engine.refresh().await.unwrap();
    assert_eq!(outcome.total_countries, 4);

    let after = state.store.get("TESTLAND").await.unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert!(after.last_refreshed_at >= before.last_refreshed_at);
}

#[actix_web::test]
async fn countries_outage_returns_503_and_keeps_cache() {
    let dir = tempfile::tempdir().unwrap();
    let (_healthy, seeded) = refreshed_state(dir.path()).await;
    let store = Arc::clone(&seeded.store);
    let snapshot = store.list(&Default::default()).await.unwrap();

    let broken = MockServer::start_async().await;
    broken
        .mock_async(|when, then| {
            when.method(GET).path(COUNTRIES_PATH);
            then.status(502).body("bad gateway");
        })
        .await;
    broken
        .mock_async(|when, then| {
            when.method(GET).path(RATES_PATH);
            then.status(200).json_body(rates_payload());
        })
        .await;
    let app = app!(state_for(&broken, Arc::clone(&store), dir.path()));

    let req = test::TestRequest::post().uri("/refresh/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "External data source unavailable");
    assert_eq!(body["details"], "Could not fetch data from restcountries.com");

    let after = store.list(&Default::default()).await.unwrap();
    assert_eq!(after.len(), snapshot.len());
    for (a, b) in after.iter().zip(snapshot.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.estimated_gdp, b.estimated_gdp);
        assert_eq!(a.last_refreshed_at, b.last_refreshed_at);
    }
}

#[actix_web::test]
async fn rates_outage_names_rates_source() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(COUNTRIES_PATH);
            then.status(200).json_body(countries_payload());
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(RATES_PATH);
            then.status(500);
        })
        .await;
    let store: Arc<dyn CountryStore> = Arc::new(MemoryCountryStore::new());
    let app = app!(state_for(&server, Arc::clone(&store), dir.path()));

    let req = test::TestRequest::post().uri("/refresh/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["details"], "Could not fetch data from open.er-api.com");
    assert_eq!(store.count().await.unwrap(), 0);
}

#[actix_web::test]
async fn unknown_country_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, state) = refreshed_state(dir.path()).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/Atlantis/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Country not found");
}

#[actix_web::test]
async fn list_sorts_by_gdp_with_nulls_last() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, state) = refreshed_state(dir.path()).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/?sort=gdp_desc").to_request();
    let rows: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Testland", "Nigeria", "Antarctica", "Oddland"]);

    let req = test::TestRequest::get().uri("/?sort=gdp_asc").to_request();
    let rows: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Antarctica", "Nigeria", "Testland", "Oddland"]);

    // unknown sort keeps default name order
    let req = test::TestRequest::get().uri("/?sort=population").to_request();
    let rows: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Antarctica", "Nigeria", "Oddland", "Testland"]);
}

#[actix_web::test]
async fn list_filters_are_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, state) = refreshed_state(dir.path()).await;
    let app = app!(state);

    let req = test::TestRequest::get().uri("/?region=mythica").to_request();
    let rows: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Oddland", "Testland"]);

    let req = test::TestRequest::get()
        .uri("/?region=Mythica&currency=xyz")
        .to_request();
    let rows: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Testland");

    let req = test::TestRequest::get().uri("/?region=Europe").to_request();
    let rows: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(rows.is_empty());
}

#[actix_web::test]
async fn delete_then_lookup_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let (_server, state) = refreshed_state(dir.path()).await;
    let store = Arc::clone(&state.store);
    let app = app!(state);

    let req = test::TestRequest::delete().uri("/testland/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get().uri("/Testland/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::delete().uri("/Testland/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Country not found");

    assert_eq!(store.count().await.unwrap(), 3);
}

#[actix_web::test]
async fn image_is_404_until_first_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let server = healthy_upstreams().await;
    let app = app!(state_for(
        &server,
        Arc::new(MemoryCountryStore::new()),
        dir.path()
    ));

    let req = test::TestRequest::get().uri("/image/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Summary image not found");

    let req = test::TestRequest::post().uri("/refresh").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/image").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = test::read_body(resp).await;
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert!(dir.path().join("summary.png").exists());
}

#[actix_web::test]
async fn status_reports_count_and_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let server = healthy_upstreams().await;
    let app = app!(state_for(
        &server,
        Arc::new(MemoryCountryStore::new()),
        dir.path()
    ));

    let req = test::TestRequest::get().uri("/status/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total_countries"], 0);
    assert_eq!(body["last_refreshed_at"], Value::Null);

    let req = test::TestRequest::post().uri("/refresh/").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);

    let req = test::TestRequest::get().uri("/status/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total_countries"], 4);
    assert!(body["last_refreshed_at"].is_string());
}

#[actix_web::test]
async fn health_reports_store() {
    let dir = tempfile::tempdir().unwrap();
    let server = healthy_upstreams().await;
    let app = app!(state_for(
        &server,
        Arc::new(MemoryCountryStore::new()),
        dir.path()
    ));

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "connected");
}
