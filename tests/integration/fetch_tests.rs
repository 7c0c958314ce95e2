//! Integration tests for the page fetcher
//!
//! These tests use wiremock to serve scripted responses and a recording
//! sleeper to observe the retry delays without waiting for them.

use roster_scout::config::FetcherConfig;
use roster_scout::fetch::{build_http_client, RecordingSleeper, RetryPolicy, JITTER_FRACTION};
use roster_scout::{FetchError, PageFetcher};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_DELAY: Duration = Duration::from_millis(10);

fn create_fetcher(retries: u32) -> (PageFetcher, RecordingSleeper) {
    let client = build_http_client(&FetcherConfig::default()).expect("client");
    let sleeper = RecordingSleeper::new();
    let fetcher = PageFetcher::with_client(client, RetryPolicy::new(retries, BASE_DELAY))
        .with_sleeper(Arc::new(sleeper.clone()));
    (fetcher, sleeper)
}

#[tokio::test]
async fn test_success_returns_body_without_waiting() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/character/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, sleeper) = create_fetcher(3);
    let body = fetcher
        .fetch(&format!("{}/character/1", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "<html>ok</html>");
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, sleeper) = create_fetcher(5);
    let url = format!("{}/corporation/9/departures/4", mock_server.uri());
    let err = fetcher.fetch(&url).await.unwrap_err();

    assert_eq!(err, FetchError::NotFound { url });
    assert!(err.is_not_found());
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn test_retry_after_is_honoured_exactly() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .mount(&mock_server)
        .await;

    let (fetcher, sleeper) = create_fetcher(5);
    let body = fetcher.fetch(&mock_server.uri()).await.unwrap();

    assert_eq!(body, "finally");
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(2), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn test_rate_limit_without_hint_uses_jittered_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let (fetcher, sleeper) = create_fetcher(5);
    fetcher.fetch(&mock_server.uri()).await.unwrap();

    let delays = sleeper.delays();
    assert_eq!(delays.len(), 3);
    for (attempt, delay) in delays.iter().enumerate() {
        let exponential = BASE_DELAY * 2u32.pow(attempt as u32);
        assert!(*delay >= exponential, "attempt {}: {:?}", attempt, delay);
        assert!(
            *delay <= exponential.mul_f64(1.0 + JITTER_FRACTION),
            "attempt {}: {:?}",
            attempt,
            delay
        );
    }
}

#[tokio::test]
async fn test_exhausted_rate_limit_makes_r_plus_one_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let (fetcher, sleeper) = create_fetcher(3);
    let err = fetcher.fetch(&mock_server.uri()).await.unwrap_err();

    assert!(matches!(err, FetchError::RateLimited { attempts: 4, .. }));
    assert_eq!(sleeper.delays().len(), 3);
}

#[tokio::test]
async fn test_server_errors_become_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (fetcher, _sleeper) = create_fetcher(2);
    let err = fetcher.fetch(&mock_server.uri()).await.unwrap_err();

    match err {
        FetchError::Transient {
            attempts, detail, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(detail, "HTTP 503");
        }
        other => panic!("expected Transient, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .mount(&mock_server)
        .await;

    let (fetcher, sleeper) = create_fetcher(3);
    let body = fetcher.fetch(&mock_server.uri()).await.unwrap();

    assert_eq!(body, "recovered");
    assert_eq!(sleeper.delays().len(), 1);
}

#[tokio::test]
async fn test_identification_headers_are_sent() {
    let mock_server = MockServer::start().await;
    let config = FetcherConfig::default();

    Mock::given(method("GET"))
        .and(header("user-agent", config.user_agent.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, _sleeper) = create_fetcher(0);
    assert_eq!(fetcher.fetch(&mock_server.uri()).await.unwrap(), "ok");
}
