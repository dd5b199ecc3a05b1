//! Integration tests for UvClient using wiremock.
//!
//! These tests verify caching, validation, error classification and retry
//! behavior against a mock UV provider.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use sunsafe_core::{AppError, BackoffConfig, ConnectionState, NoopToggle, ResilientExecutor};
use sunsafe_uv::{ClientSettings, Coordinate, SkinType, UvClient};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UV_PATH: &str = "/api/v1/uv";

fn uv_body(uv: f64) -> serde_json::Value {
    serde_json::json!({
        "result": {
            "uv": uv,
            "uv_time": "2026-06-01T19:00:00.000Z",
            "uv_max": 8.4,
            "uv_max_time": "2026-06-01T20:00:00.000Z",
            "uv_max_risk": "Very High",
            "ozone": 312.6,
            "ozone_time": "2026-06-01T18:00:00.000Z",
            "safe_exposure_time": {
                "st1": 19.0, "st2": 24.0, "st3": 38.0,
                "st4": 48.0, "st5": 77.0, "st6": 143.0
            }
        }
    })
}

struct Harness {
    client: UvClient,
    state: Arc<ConnectionState>,
}

fn harness(server: &MockServer, max_retries: u32, timeout: Duration, ttl: Duration) -> Harness {
    let state = Arc::new(ConnectionState::new(max_retries));
    let executor = ResilientExecutor::new(
        state.clone(),
        Arc::new(NoopToggle),
        BackoffConfig::new(Duration::from_millis(1)),
    );
    let settings = ClientSettings {
        base_url: format!("{}{}", server.uri(), UV_PATH),
        api_key: "test-key".to_string(),
        altitude_m: 100,
        request_timeout: timeout,
        cache_ttl: ttl,
    };
    Harness {
        client: UvClient::new(settings, executor).unwrap(),
        state,
    }
}

fn default_harness(server: &MockServer) -> Harness {
    harness(server, 3, Duration::from_secs(10), Duration::from_secs(300))
}

#[tokio::test]
async fn test_request_shape_and_coordinate_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .and(header("x-access-token", "test-key"))
        .and(query_param("lat", "37.7749"))
        .and(query_param("lng", "-122.4194"))
        .and(query_param("alt", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(5.1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    let data = h.client.get_uv_data(37.7749, -122.4194).await.unwrap();

    assert_eq!(data.result.uv, 5.1);
    assert_eq!(data.result.uv_max_risk, "Very High");
    assert_eq!(data.lat, 37.7749);
    assert_eq!(data.lng, -122.4194);
    assert_eq!(data.safe_exposure_minutes(SkinType::VI), Some(143.0));
}

#[tokio::test]
async fn test_invalid_coordinates_make_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(1.0)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    for (lat, lng) in [(91.0, 0.0), (0.0, 181.0), (f64::NAN, 0.0)] {
        let result = h.client.get_uv_data(lat, lng).await;
        assert!(
            matches!(result, Err(AppError::InvalidArgument(_))),
            "({}, {}) should be rejected: {:?}",
            lat,
            lng,
            result
        );
    }
    assert_eq!(h.state.retry_attempts(), 0);
}

#[tokio::test]
async fn test_repeated_lookup_hits_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(6.3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    let first = h.client.get_uv_data(37.7749, -122.4194).await.unwrap();
    let second = h.client.get_uv_data(37.7749, -122.4194).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.client.cache().len(), 1);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(2.0)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server, 3, Duration::from_secs(10), Duration::from_millis(200));
    h.client.get_uv_data(37.7749, -122.4194).await.unwrap();
    h.client.get_uv_data(37.7749, -122.4194).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    h.client.get_uv_data(37.7749, -122.4194).await.unwrap();

    assert_eq!(h.client.cache().len(), 1);
}

#[tokio::test]
async fn test_nearby_coordinates_share_cache_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(3.3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    let a = h.client.get_uv_data(37.77491, -122.41941).await.unwrap();
    let b = h.client.get_uv_data(37.77492, -122.41939).await.unwrap();

    // The shared entry keeps the coordinate of the request that filled it
    assert_eq!(a, b);
    assert_eq!(b.lat, 37.77491);
    assert_eq!(h.client.cache().len(), 1);
}

#[tokio::test]
async fn test_provider_message_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "User with API Key not found"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server, 1, Duration::from_secs(10), Duration::from_secs(300));
    let result = h.client.get_uv_data(10.0, 10.0).await;

    assert_eq!(
        result,
        Err(AppError::Provider {
            status: 403,
            message: "User with API Key not found".into()
        })
    );
    assert!(h.client.cache().is_empty());
}

#[tokio::test]
async fn test_unparseable_error_uses_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server, 1, Duration::from_secs(10), Duration::from_secs(300));
    let err = h.client.get_uv_data(10.0, 10.0).await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP Error 500");
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(uv_body(1.0))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server, 1, Duration::from_millis(200), Duration::from_secs(300));
    let result = h.client.get_uv_data(10.0, 10.0).await;

    assert_eq!(result, Err(AppError::Timeout));
    assert!(!h.state.is_online());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(7.7)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    let data = h.client.get_uv_data(-33.8688, 151.2093).await.unwrap();

    assert_eq!(data.result.uv, 7.7);
    assert!(h.state.is_online());
    assert_eq!(h.state.retry_attempts(), 2);
}

#[tokio::test]
async fn test_exhausted_retries_flip_offline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    let result = h.client.get_uv_data(51.5072, -0.1276).await;

    assert!(matches!(result, Err(AppError::Provider { status: 502, .. })));
    assert!(!h.state.is_online());
}

#[tokio::test]
async fn test_survey_reports_every_point() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(UV_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(uv_body(4.0)))
        .expect(5)
        .mount(&mock_server)
        .await;

    let h = default_harness(&mock_server);
    let center = Coordinate::new(37.7749, -122.4194).unwrap();
    let points = h.client.survey_nearby(center, 5.0, 4).await;

    assert_eq!(points.len(), 5);
    assert!(points[0].is_current);
    assert_eq!(points[0].name, "Your Location");
    assert_eq!(points[4].name, "Point 4");
    assert!(points.iter().all(|p| p.result.is_ok()));
}
