//! Harvest runs against a mock weather API

use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use weather_harvest::config::{ApiConfig, Config, FetchConfig};
use weather_harvest::fetch::{BoundedMapper, NoProgress, Observation, ResultSet, RetryPolicy, WeatherClient};
use weather_harvest::output::{load_statistics, rows_from_results, CsvSink, ResultSink, SqliteSink, HEADER};
use weather_harvest::storage::SqliteStorage;
use weather_harvest::{normalize_keys, ConfigError, Key};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1/current.json";

/// Creates a client for the mock server with fast retries
fn create_test_client(server: &MockServer, workers: usize, timeout_ms: u64) -> WeatherClient {
    let api = ApiConfig {
        base_url: format!("{}{}", server.uri(), ENDPOINT),
        api_key: Some("test-key".to_string()),
        region_qualifier: "Jawa Timur".to_string(),
    };
    let fetch = FetchConfig {
        workers,
        timeout_ms,
        ..FetchConfig::default()
    };

    WeatherClient::new(&api, "test-key", &fetch)
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_millis(10),
            jitter: false,
        })
}

fn weather_body(name: &str, temp_c: f64) -> serde_json::Value {
    serde_json::json!({
        "location": {
            "name": name,
            "region": "East Java",
            "country": "Indonesia"
        },
        "current": {
            "last_updated": "2024-05-01 12:00",
            "temp_c": temp_c,
            "humidity": 70,
            "condition": { "text": "Partly cloudy" },
            "wind_kph": 11.2,
            "wind_dir": "SE",
            "uv": 8.0
        }
    })
}

fn keys(names: &[&str]) -> Vec<Key> {
    normalize_keys(names)
}

async fn harvest(
    client: WeatherClient,
    width: usize,
    names: &[&str],
) -> ResultSet<Observation> {
    BoundedMapper::new(width)
        .run(Arc::new(client), keys(names), &mut NoProgress)
        .await
}

async fn mount_success(server: &MockServer, name: &str, temp_c: f64) {
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", format!("{}, Jawa Timur", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_body(name, temp_c)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mixed_success_and_exhausted_retries() {
    let server = MockServer::start().await;

    mount_success(&server, "Alpha", 30.5).await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", "Beta, Jawa Timur"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 2, 2_000);
    let rows = rows_from_results(harvest(client, 2, &["Alpha", "Beta"]).await);

    assert_eq!(rows.len(), 2);

    let alpha = &rows[0];
    assert_eq!(alpha.key, "Alpha");
    assert_eq!(alpha.query, "Alpha, Jawa Timur");
    assert_eq!(alpha.location, "Alpha, East Java");
    assert_eq!(alpha.country, "Indonesia");
    assert_eq!(alpha.temperature_c, Some(30.5));
    assert_eq!(alpha.condition, "Partly cloudy");
    assert!(alpha.error.is_empty());

    let beta = &rows[1];
    assert_eq!(beta.key, "Beta");
    assert!(beta.error.contains("503"), "error was: {}", beta.error);
    assert!(beta.error.contains("3 attempts"), "error was: {}", beta.error);
    assert!(beta.location.is_empty());
    assert_eq!(beta.temperature_c, None);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 1, 2_000);
    let results = harvest(client, 1, &["Nowhere"]).await;

    assert_eq!(results.failure_count(), 1);
    let outcome = results.get("Nowhere").unwrap();
    assert!(outcome.error().unwrap().contains("404"));
}

#[tokio::test]
async fn test_api_error_message_is_recorded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 1, 2_000);
    let results = harvest(client, 1, &["Atlantis"]).await;

    let error = results.get("Atlantis").unwrap().error().unwrap().to_string();
    assert!(error.contains("400"), "error was: {}", error);
    assert!(error.contains("No matching location found."), "error was: {}", error);
}

#[tokio::test]
async fn test_malformed_body_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 1, 2_000);
    let results = harvest(client, 1, &["Gubeng"]).await;

    let error = results.get("Gubeng").unwrap().error().unwrap().to_string();
    assert!(error.contains("malformed"), "error was: {}", error);
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let server = MockServer::start().await;

    // Mounted first, so it answers the first request only
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_success(&server, "Gubeng", 31.0).await;

    let client = create_test_client(&server, 1, 2_000);
    let results = harvest(client, 1, &["Gubeng"]).await;

    assert_eq!(results.failure_count(), 0);
    let record = results.get("Gubeng").unwrap().record().unwrap();
    assert_eq!(record.temperature_c, Some(31.0));
}

#[tokio::test]
async fn test_retry_after_is_respected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_success(&server, "Tegalsari", 29.0).await;

    let client = create_test_client(&server, 1, 2_000);
    let started = Instant::now();
    let results = harvest(client, 1, &["Tegalsari"]).await;

    assert_eq!(results.failure_count(), 0);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_every_request_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = create_test_client(&server, 4, 50);
    let results = harvest(client, 4, &["A", "B", "C", "D", "E"]).await;

    assert_eq!(results.len(), 5);
    assert_eq!(results.failure_count(), 5);
    for outcome in &results {
        let error = outcome.error().unwrap();
        assert!(error.contains("timed out"), "error was: {}", error);
    }
}

#[tokio::test]
async fn test_refused_connection_fails_every_key_without_leaking_key() {
    // Nothing listens on port 1
    let api = ApiConfig {
        base_url: "http://127.0.0.1:1/v1/current.json".to_string(),
        api_key: Some("hush-4f9a21".to_string()),
        region_qualifier: "Jawa Timur".to_string(),
    };
    let client = WeatherClient::new(&api, "hush-4f9a21", &FetchConfig::default())
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_millis(10),
            jitter: false,
        });

    let names = ["Alpha", "Beta", "Gamma"];
    let results = harvest(client, 2, &names).await;

    assert_eq!(results.len(), names.len());
    assert_eq!(results.failure_count(), names.len());

    for row in rows_from_results(results) {
        assert!(row.error.contains("connection failed"), "error was: {}", row.error);
        assert!(row.error.contains("after 3 attempts"), "error was: {}", row.error);
        assert!(!row.error.contains("hush-4f9a21"), "error was: {}", row.error);
        assert!(row.location.is_empty());
    }
}

#[tokio::test]
async fn test_duplicate_keys_fetched_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", "Alpha, Jawa Timur"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_body("Alpha", 28.0)))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 3, 2_000);
    let results = harvest(client, 3, &["Alpha", " Alpha", "Alpha ", "", "   "]).await;

    assert_eq!(results.len(), 1);
    assert!(results.get("Alpha").is_some());
}

#[tokio::test]
async fn test_empty_key_list_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = create_test_client(&server, 4, 2_000);
    let results = harvest(client, 4, &[]).await;

    assert!(results.is_empty());
}

#[tokio::test]
async fn test_repeated_runs_produce_identical_rows() {
    let server = MockServer::start().await;

    mount_success(&server, "Alpha", 30.0).await;
    mount_success(&server, "Gamma", 25.0).await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", "Beta, Jawa Timur"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let names = ["Gamma", "Beta", "Alpha"];
    let first = rows_from_results(harvest(create_test_client(&server, 3, 2_000), 3, &names).await);
    let second = rows_from_results(harvest(create_test_client(&server, 1, 2_000), 1, &names).await);

    assert_eq!(first, second);
    let order: Vec<&str> = first.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(order, vec!["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn test_rows_reach_csv_and_database() {
    let server = MockServer::start().await;

    mount_success(&server, "Alpha", 30.5).await;
    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("q", "Beta, Jawa Timur"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let rows = rows_from_results(
        harvest(create_test_client(&server, 2, 2_000), 2, &["Beta", "Alpha"]).await,
    );

    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("weather.csv");
    let mut csv_sink = CsvSink::new(&csv_path);
    csv_sink.write_rows(&rows).unwrap();

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, HEADER.to_vec());

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "Alpha");
    assert_eq!(&records[0][5], "30.5");
    assert_eq!(&records[0][11], "");
    assert_eq!(&records[1][0], "Beta");
    assert_eq!(&records[1][5], "");
    assert!(records[1][11].contains("404"));

    let mut db_sink = SqliteSink::new(SqliteStorage::new_in_memory().unwrap(), "hash");
    db_sink.write_rows(&rows).unwrap();

    let stats = load_statistics(db_sink.storage()).unwrap();
    assert_eq!(stats.total_results, 2);
    assert_eq!(stats.failed_results, 1);
    assert_eq!(stats.failures[0].0, "Beta");
}

#[test]
fn test_missing_api_key_is_run_level_error() {
    let config: Config = toml::from_str(
        r#"
        [api]
        base-url = "http://api.weatherapi.com/v1/current.json"

        [input]
        keys-path = "kecamatan.csv"

        [output]
        results-path = "weather.csv"
        "#,
    )
    .unwrap();

    assert!(matches!(
        config.require_api_key(),
        Err(ConfigError::MissingCredential(_))
    ));
}
