//! End-to-end tests for the relay routes: a real server on an ephemeral port,
//! driven with reqwest, in front of a scripted IRC client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    secrecy::Secret,
    tokio::{net::TcpListener, sync::watch},
    tokio_util::sync::CancellationToken,
};

use {
    smsrelay_auth::{ConfigAccountStore, hash_password},
    smsrelay_config::{AccountConfig, AuthConfig, IrcConfig},
    smsrelay_gateway::{AppState, build_gateway_app},
    smsrelay_irc::{ConnectedHandler, ConnectionManager, IrcClient, Result as IrcResult},
};

/// IRC client whose `connect` blocks until `gate` is opened.
struct ScriptedIrc {
    gate: watch::Sender<bool>,
    connected: watch::Sender<bool>,
    handlers: Mutex<Vec<Arc<dyn ConnectedHandler>>>,
    sent: Mutex<Vec<(String, String)>>,
    fail_sends: AtomicBool,
}

impl ScriptedIrc {
    fn new(open: bool) -> Arc<Self> {
        Arc::new(Self {
            gate: watch::channel(open).0,
            connected: watch::channel(false).0,
            handlers: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        })
    }

    fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl IrcClient for ScriptedIrc {
    async fn connect(&self) -> IrcResult<()> {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        self.connected.send_replace(true);
        let handlers = self.handlers.lock().unwrap().clone();
        for handler in handlers {
            handler.on_connected(self).await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    async fn send_message(&self, channel: &str, text: &str) -> IrcResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(smsrelay_irc::Error::NotConnected);
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn join(&self, _channel: &str, _key: Option<&str>) -> IrcResult<()> {
        Ok(())
    }

    fn on_connected(&self, handler: Arc<dyn ConnectedHandler>) {
        self.handlers.lock().unwrap().push(handler);
    }

    async fn closed(&self) {
        let mut rx = self.connected.subscribe();
        let _ = rx.wait_for(|c| !*c).await;
    }
}

struct Harness {
    addr: SocketAddr,
    irc: Arc<ScriptedIrc>,
    _manager: ConnectionManager,
}

impl Harness {
    async fn start(connected: bool, ready_timeout: Duration) -> Self {
        let irc = ScriptedIrc::new(connected);
        let manager = ConnectionManager::start(
            &IrcConfig {
                channel: "#ops".into(),
                ..IrcConfig::default()
            },
            irc.clone(),
            CancellationToken::new(),
        );

        let accounts = ConfigAccountStore::from_config(&AuthConfig {
            accounts: vec![AccountConfig {
                username: "ops".into(),
                password_hash: Secret::new(hash_password("hunter2").unwrap()),
            }],
        });
        let state = AppState::new(manager.session(), Arc::new(accounts), ready_timeout);
        let app = build_gateway_app(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        if connected {
            manager
                .session()
                .wait_connected(Duration::from_secs(5))
                .await
                .unwrap();
        }

        Self {
            addr,
            irc,
            _manager: manager,
        }
    }

    fn post(&self, path: &str, body: &str) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .post(format!("http://{}{path}", self.addr))
            .body(body.to_string())
    }
}

const ALERT: &str = r#"{"sender":"svc-a","title":"disk full","description":"/var 95%"}"#;

#[tokio::test]
async fn alert_is_relayed_in_field_order() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let resp = h
        .post("/alert", ALERT)
        .basic_auth("ops", Some("hunter2"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
    assert_eq!(h.irc.sent(), vec![(
        "#ops".to_string(),
        "Sender: svc-a, Title: disk full, Description: /var 95%".to_string()
    )]);
}

#[tokio::test]
async fn sms_is_relayed() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let body = r#"{"from":"+15550100","text":"door open","sentStamp":1700000000000,"receivedStamp":1700000000500,"sim":"1"}"#;
    let resp = h
        .post("/sms", body)
        .basic_auth("ops", Some("hunter2"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(h.irc.sent(), vec![(
        "#ops".to_string(),
        "From: +15550100, Text: door open".to_string()
    )]);
}

#[tokio::test]
async fn sub_paths_are_accepted() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let resp = h
        .post("/alert/grafana/prod", ALERT)
        .basic_auth("ops", Some("hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(h.irc.sent().len(), 1);
}

#[tokio::test]
async fn unparseable_body_is_rejected_without_sending() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    for body in ["not json", r#"{"sender": 42}"#, ""] {
        let resp = h
            .post("/alert", body)
            .basic_auth("ops", Some("hunter2"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "body {body:?}");
        assert_eq!(resp.text().await.unwrap(), "bad request");
    }
    assert!(h.irc.sent().is_empty());
}

#[tokio::test]
async fn bad_credentials_are_rejected_without_sending() {
    let h = Harness::start(true, Duration::from_secs(5)).await;

    let missing = h.post("/alert", ALERT).send().await.unwrap();
    assert_eq!(missing.status(), 401);
    assert_eq!(
        missing.headers()["www-authenticate"],
        "Basic realm=\"smsrelay\""
    );

    let wrong_password = h
        .post("/alert", ALERT)
        .basic_auth("ops", Some("nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), 401);

    let unknown_user = h
        .post("/sms", ALERT)
        .basic_auth("mallory", Some("hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_user.status(), 401);

    let bearer = h
        .post("/alert", ALERT)
        .bearer_auth("hunter2")
        .send()
        .await
        .unwrap();
    assert_eq!(bearer.status(), 401);

    assert!(h.irc.sent().is_empty());
}

#[tokio::test]
async fn auth_is_checked_before_parsing() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let resp = h.post("/alert", "not json").send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn unknown_paths_are_not_found_without_a_challenge() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let client = reqwest::Client::new();

    for resp in [
        client
            .get(format!("http://{}/nope", h.addr))
            .send()
            .await
            .unwrap(),
        h.post("/alerts", ALERT).send().await.unwrap(),
    ] {
        assert_eq!(resp.status(), 404);
        assert!(resp.headers().get("www-authenticate").is_none());
    }
    assert!(h.irc.sent().is_empty());
}

#[tokio::test]
async fn times_out_with_503_when_session_never_connects() {
    let h = Harness::start(false, Duration::from_millis(200)).await;
    let resp = h
        .post("/alert", ALERT)
        .basic_auth("ops", Some("hunter2"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 503);
    assert_eq!(resp.text().await.unwrap(), "irc session unavailable");
    assert!(h.irc.sent().is_empty());
}

#[tokio::test]
async fn request_waits_for_the_session_then_sends_once() {
    let h = Harness::start(false, Duration::from_secs(10)).await;
    let pending = tokio::spawn(
        h.post("/sms", r#"{"from":"a","text":"b"}"#)
            .basic_auth("ops", Some("hunter2"))
            .send(),
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!pending.is_finished());
    assert!(h.irc.sent().is_empty());

    h.irc.open_gate();
    let resp = pending.await.unwrap().unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(h.irc.sent(), vec![(
        "#ops".to_string(),
        "From: a, Text: b".to_string()
    )]);
}

#[tokio::test]
async fn send_failure_still_answers_ok() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    h.irc.fail_sends.store(true, Ordering::SeqCst);
    let resp = h
        .post("/alert", ALERT)
        .basic_auth("ops", Some("hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(h.irc.sent().is_empty());
}

#[tokio::test]
async fn health_reports_session_state() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let body: serde_json::Value = reqwest::get(format!("http://{}/health", h.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["irc"], "connected");
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let h = Harness::start(true, Duration::from_secs(5)).await;
    let description = "x".repeat(smsrelay_gateway::server::MAX_BODY_BYTES);
    let body = format!(r#"{{"sender":"a","title":"b","description":"{description}"}}"#);
    let resp = h
        .post("/alert", &body)
        .basic_auth("ops", Some("hunter2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    assert!(h.irc.sent().is_empty());
}
