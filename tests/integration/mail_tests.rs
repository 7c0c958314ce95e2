//! Integration tests for bulk mail sending
//!
//! The game API is a wiremock server; credentials are either a static token
//! or a scripted provider that hands out a new token on refresh.

use async_trait::async_trait;
use roster_scout::config::MailConfig;
use roster_scout::fetch::{RecordingSleeper, Sleeper};
use roster_scout::mail::{
    CredentialError, CredentialProvider, MailError, MailSender, MailTemplate, StaticCredentials,
};
use roster_scout::output::CsvRow;
use roster_scout::state::RecordingProgress;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHARACTER: &str = "90000001";

/// Hands out `initial` until refreshed, then `refreshed`
struct RotatingCredentials {
    current: Mutex<String>,
    refreshed: String,
    refreshes: AtomicUsize,
}

impl RotatingCredentials {
    fn new(initial: &str, refreshed: &str) -> Self {
        Self {
            current: Mutex::new(initial.to_string()),
            refreshed: refreshed.to_string(),
            refreshes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CredentialProvider for RotatingCredentials {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn refresh(&self) -> Result<String, CredentialError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let mut current = self.current.lock().unwrap();
        *current = self.refreshed.clone();
        Ok(current.clone())
    }

    fn character_id(&self) -> Result<String, CredentialError> {
        Ok(CHARACTER.to_string())
    }
}

/// Cancels the run the first time the sender waits between messages
struct PauseDuringDelay {
    cancel: CancellationToken,
}

#[async_trait]
impl Sleeper for PauseDuringDelay {
    async fn sleep(&self, _duration: Duration) {
        self.cancel.cancel();
    }
}

fn mail_config(server: &MockServer) -> MailConfig {
    MailConfig {
        esi_origin: server.uri(),
        send_delay_ms: 1000,
        token: None,
    }
}

fn create_sender(
    server: &MockServer,
    credentials: Arc<dyn CredentialProvider>,
) -> (MailSender, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let sender = MailSender::new(reqwest::Client::new(), &mail_config(server), credentials)
        .with_sleeper(Arc::new(sleeper.clone()));
    (sender, sleeper)
}

fn static_token(token: &str) -> Arc<dyn CredentialProvider> {
    Arc::new(
        StaticCredentials::new(token)
            .unwrap()
            .with_character_id(CHARACTER),
    )
}

fn row(id: &str, name: &str) -> CsvRow {
    let mut row = CsvRow::new();
    row.insert("Id".to_string(), id.to_string());
    row.insert("Name".to_string(), name.to_string());
    row.insert("CorpName".to_string(), "Alpha Corp".to_string());
    row
}

fn template() -> MailTemplate {
    MailTemplate::new("Hello %%Name%%", "Saw you left %%CorpName%%. Join %%ALLIANCE%%!")
        .with_variables([("ALLIANCE".to_string(), "Test Alliance".to_string())])
}

fn mail_path() -> String {
    format!("/characters/{}/mail", CHARACTER)
}

#[tokio::test]
async fn test_payload_and_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(mail_path()))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({
            "approved_cost": 0,
            "body": "Saw you left Alpha Corp. Join Test Alliance!",
            "recipients": [{"recipient_id": 42, "recipient_type": "character"}],
            "subject": "Hello Ana"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_string("123"))
        .expect(1)
        .mount(&server)
        .await;

    let (sender, sleeper) = create_sender(&server, static_token("secret-token"));
    let progress = RecordingProgress::new();
    let report = sender
        .send_all(&template(), &[row("42", "Ana")], &progress, &CancellationToken::new())
        .await;

    assert!(report.is_complete(), "{:?}", report);
    assert_eq!(report.sent, 1);
    assert!(sleeper.delays().is_empty());
    assert_eq!(
        progress.messages().last().map(String::as_str),
        Some("Completed! Sent 1 messages.")
    );
}

#[tokio::test]
async fn test_sends_are_paced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(mail_path()))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;

    let (sender, sleeper) = create_sender(&server, static_token("t"));
    let rows = [row("1", "A"), row("2", "B"), row("3", "C")];
    let report = sender
        .send_all(&template(), &rows, &RecordingProgress::new(), &CancellationToken::new())
        .await;

    assert_eq!(report.sent, 3);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(1000), Duration::from_millis(1000)]
    );
}

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_resends() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let credentials = Arc::new(RotatingCredentials::new("stale", "fresh"));
    let (sender, _sleeper) = create_sender(&server, credentials.clone());
    let progress = RecordingProgress::new();
    let report = sender
        .send_all(
            &template(),
            &[row("1", "A"), row("2", "B")],
            &progress,
            &CancellationToken::new(),
        )
        .await;

    assert!(report.is_complete(), "{:?}", report);
    assert_eq!(credentials.refreshes.load(Ordering::SeqCst), 1);
    assert!(progress
        .messages()
        .iter()
        .any(|m| m == "Token expired. Refreshing..."));
}

#[tokio::test]
async fn test_second_unauthorized_stops_the_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let credentials = Arc::new(RotatingCredentials::new("stale", "also-stale"));
    let (sender, _sleeper) = create_sender(&server, credentials);
    let report = sender
        .send_all(
            &template(),
            &[row("1", "A"), row("2", "B")],
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.sent, 0);
    assert!(matches!(report.error, Some(MailError::Unauthorized)));
}

#[tokio::test]
async fn test_static_token_cannot_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (sender, _sleeper) = create_sender(&server, static_token("expired"));
    let report = sender
        .send_all(
            &template(),
            &[row("1", "A")],
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(
        report.error,
        Some(MailError::Credential(CredentialError::RefreshUnsupported))
    ));
}

#[tokio::test]
async fn test_failure_stops_with_count_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"recipients": [{"recipient_id": 2}]})))
        .respond_with(ResponseTemplate::new(520).set_body_string("mail limit"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (sender, _sleeper) = create_sender(&server, static_token("t"));
    let rows = [row("1", "A"), row("2", "B"), row("3", "C")];
    let report = sender
        .send_all(&template(), &rows, &RecordingProgress::new(), &CancellationToken::new())
        .await;

    assert_eq!(report.sent, 1);
    assert_eq!(report.total, 3);
    match report.error {
        Some(MailError::Rejected {
            recipient,
            status,
            detail,
        }) => {
            assert_eq!(recipient, 2);
            assert_eq!(status, 520);
            assert_eq!(detail, "mail limit");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_recipient_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (sender, _sleeper) = create_sender(&server, static_token("t"));
    let report = sender
        .send_all(
            &template(),
            &[row("not-a-number", "A")],
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.sent, 0);
    assert!(matches!(
        report.error,
        Some(MailError::InvalidRecipient { ref value }) if value == "not-a-number"
    ));
}

#[tokio::test]
async fn test_cancelled_run_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let (sender, _sleeper) = create_sender(&server, static_token("t"));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = sender
        .send_all(&template(), &[row("1", "A")], &RecordingProgress::new(), &cancel)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.sent, 0);
    assert!(report.error.is_none());
    assert!(!report.is_complete());
}

#[tokio::test]
async fn test_pause_during_pacing_delay_holds_next_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let sender = MailSender::new(reqwest::Client::new(), &mail_config(&server), static_token("t"))
        .with_sleeper(Arc::new(PauseDuringDelay {
            cancel: cancel.clone(),
        }));
    let progress = RecordingProgress::new();
    let rows = [row("1", "A"), row("2", "B"), row("3", "C")];

    let report = sender.send_all(&template(), &rows, &progress, &cancel).await;

    assert!(report.cancelled);
    assert_eq!(report.sent, 1);
    assert!(report.error.is_none());
    assert_eq!(
        progress.messages().last().map(String::as_str),
        Some("Paused after 1 messages")
    );
}
