//! District collection against a mock region API

use weather_harvest::config::RegionsConfig;
use weather_harvest::regions::{collect_district_keys, RegionClient};
use weather_harvest::HarvestError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn regions_config(server: &MockServer, province: &str) -> RegionsConfig {
    RegionsConfig {
        base_url: server.uri(),
        province: province.to_string(),
        timeout_ms: 2_000,
    }
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_hierarchy(server: &MockServer) {
    mount_json(
        server,
        "/provinces.json",
        serde_json::json!({"data": [
            {"code": "33", "name": "JAWA TENGAH"},
            {"code": "35", "name": "JAWA TIMUR"}
        ]}),
    )
    .await;
    mount_json(
        server,
        "/regencies/35.json",
        serde_json::json!({"data": [
            {"code": "35.78", "name": "KOTA SURABAYA"},
            {"code": "35.73", "name": "KOTA MALANG"}
        ]}),
    )
    .await;
    mount_json(
        server,
        "/districts/35.78.json",
        serde_json::json!({"data": [
            {"code": "35.78.01", "name": "Gubeng"},
            {"code": "35.78.02", "name": "Tegalsari"}
        ]}),
    )
    .await;
    mount_json(
        server,
        "/districts/35.73.json",
        serde_json::json!({"data": [
            {"code": "35.73.01", "name": "Klojen"},
            {"code": "35.73.02", "name": " Gubeng "}
        ]}),
    )
    .await;
}

#[tokio::test]
async fn test_collect_districts_of_province() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;

    let keys = collect_district_keys(&regions_config(&server, "jawa timur"))
        .await
        .unwrap();

    let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["Gubeng", "Klojen", "Tegalsari"]);
}

#[tokio::test]
async fn test_unknown_province() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;

    let result = collect_district_keys(&regions_config(&server, "BALI")).await;

    assert!(matches!(result, Err(HarvestError::ProvinceNotFound(name)) if name == "BALI"));
}

#[tokio::test]
async fn test_failed_regency_request_aborts() {
    let server = MockServer::start().await;

    mount_json(
        &server,
        "/provinces.json",
        serde_json::json!({"data": [{"code": "35", "name": "JAWA TIMUR"}]}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/regencies/35.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let result = collect_district_keys(&regions_config(&server, "JAWA TIMUR")).await;

    assert!(matches!(result, Err(HarvestError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_region_client_lists_provinces() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;

    let client = RegionClient::new(&server.uri(), std::time::Duration::from_secs(2)).unwrap();
    let provinces = client.provinces().await.unwrap();

    assert_eq!(provinces.len(), 2);
    assert_eq!(provinces[1].code, "35");
}
