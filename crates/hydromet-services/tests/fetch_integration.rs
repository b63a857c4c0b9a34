//! Integration tests for Fetcher using wiremock.
//!
//! These tests verify retry and failure classification against a mock HTTP server.

use std::time::Duration;

use hydromet_core::NetworkError;
use hydromet_services::{FetchError, Fetcher, RetryConfig, RetryError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast retry policy so failing tests finish quickly
fn fast_fetcher() -> Fetcher {
    Fetcher::new(Duration::from_secs(2), RetryConfig::new(3, 5, 20)).unwrap()
}

fn params() -> Vec<(&'static str, String)> {
    vec![
        ("latitude", "12.97".to_string()),
        ("longitude", "77.59".to_string()),
    ]
}

#[tokio::test]
async fn test_fetch_success_sends_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "12.97"))
        .and(query_param("longitude", "77.59"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": { "temperature_2m": 24.5 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = format!("{}/v1/forecast", mock_server.uri());
    let body = fast_fetcher().fetch(&endpoint, &params()).await.unwrap();

    assert_eq!(body["current"]["temperature_2m"], 24.5);
}

#[tokio::test]
async fn test_persistent_server_error_makes_exactly_max_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/flood"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let endpoint = format!("{}/v1/flood", mock_server.uri());
    let err = fast_fetcher().fetch(&endpoint, &params()).await.unwrap_err();

    match err {
        FetchError::Request {
            source: RetryError::Exhausted { attempts, last },
            ..
        } => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, NetworkError::ServerError { status: 500, .. }));
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_error_status_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/flood"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&mock_server)
        .await;

    let endpoint = format!("{}/v1/flood", mock_server.uri());
    let err = fast_fetcher().fetch(&endpoint, &params()).await.unwrap_err();

    assert!(err.to_string().contains("404"), "Error should mention 404: {}", err);
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = format!("{}/v1/forecast", mock_server.uri());
    let body = fast_fetcher().fetch(&endpoint, &params()).await.unwrap();

    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_undecodable_body_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = format!("{}/v1/forecast", mock_server.uri());
    let err = fast_fetcher().fetch(&endpoint, &params()).await.unwrap_err();

    assert!(matches!(
        err,
        FetchError::Request {
            source: RetryError::Permanent(NetworkError::InvalidResponse(_)),
            ..
        }
    ));
}

#[tokio::test]
async fn test_timeout_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(Duration::from_millis(50), RetryConfig::new(2, 5, 5)).unwrap();
    let endpoint = format!("{}/v1/forecast", mock_server.uri());
    let err = fetcher.fetch(&endpoint, &params()).await.unwrap_err();

    assert!(matches!(err.network_error(), Some(NetworkError::Timeout)));
}

#[tokio::test]
async fn test_unreachable_host_exhausts_attempts() {
    // Nothing listens on port 1
    let err = fast_fetcher()
        .fetch("http://127.0.0.1:1/v1/forecast", &params())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetchError::Request {
            source: RetryError::Exhausted { attempts: 3, .. },
            ..
        }
    ));
    assert!(matches!(
        err.network_error(),
        Some(NetworkError::ConnectionFailed(_))
    ));
}
