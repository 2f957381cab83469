// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::Method;
use reqwest::Client;

use crate::config::sources::{
    ClientCredentials, GenericSourceValue, RequestConfig, ResponseShapeConfig, SourceConfig, SourceTypes,
};
use crate::error::AuthError;
use crate::parser::token_response::IssuedToken;
use crate::sources::{FetchToken, Source};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

fn literal(value: &str) -> GenericSourceValue {
    GenericSourceValue::Literal { value: value.to_owned() }
}

/// client_credentials source pointing at `url`
pub fn machine_source_config(url: String) -> SourceConfig {
    SourceConfig {
        source_type: SourceTypes::ClientCredentials,
        request: RequestConfig { url, method: Method::POST, headers: None, body: None },
        credentials: Some(ClientCredentials {
            client_id: literal("client-id"),
            client_secret: literal("client-secret"),
            audience: Some(literal("https://api.apply-flow.test")),
            scope: None,
        }),
        response: ResponseShapeConfig::default(),
        safety_margin_seconds: None,
    }
}

/// session source pointing at `url`, sending `cookie`
pub fn session_source_config(url: String, cookie: &str) -> SourceConfig {
    SourceConfig {
        source_type: SourceTypes::Session,
        request: RequestConfig {
            url,
            method: Method::GET,
            headers: Some(HashMap::from([("cookie".to_owned(), literal(cookie))])),
            body: None,
        },
        credentials: None,
        response: ResponseShapeConfig::default(),
        safety_margin_seconds: None,
    }
}

pub fn machine_source(url: String) -> Source {
    Source::new("machine", machine_source_config(url), build_reqwest_client())
}

pub fn issued(token: &str, expires_in_secs: u64) -> IssuedToken {
    IssuedToken {
        access_token: token.to_owned(),
        expires_in: Duration::from_secs(expires_in_secs),
        token_type: "Bearer".to_owned(),
        user: None,
    }
}

/// In-process source answering from a script. Once the script is exhausted
/// it issues `token-<n>` with the default lifetime.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<Result<IssuedToken, AuthError>>>>,
    expires_in_secs: u64,
    delay: Duration,
}

impl ScriptedSource {
    pub fn new(expires_in_secs: u64) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(VecDeque::new())),
            expires_in_secs,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push(&self, outcome: Result<IssuedToken, AuthError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn fail_next(&self) {
        self.push(Err(AuthError::fetch("scripted", "HTTP 500 Internal Server Error")));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FetchToken for ScriptedSource {
    fn id(&self) -> &str {
        "scripted"
    }

    fn kind(&self) -> &str {
        "scripted"
    }

    async fn fetch_token(&self) -> Result<IssuedToken, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(issued(&format!("token-{}", n), self.expires_in_secs)))
    }
}
