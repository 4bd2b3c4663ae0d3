#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use vibecoder::ai::{ChatBackend, ImageService, PromptMessage, TutorService};
use vibecoder::auth::PasswordHasher;
use vibecoder::error::{Error, Result};
use vibecoder::server::{AppState, create_router};
use vibecoder::store::{SqliteStore, Store};
use vibecoder::types::{Role, User};

pub const INVITE_CODE: &str = "klas-2026";

/// Replays canned completions in order and records every prompt.
#[derive(Default)]
pub struct ScriptedBackend {
    answers: Mutex<VecDeque<Result<Option<String>>>>,
    pub prompts: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedBackend {
    pub fn answering(answers: impl IntoIterator<Item = &'static str>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|a| Ok(Some(a.to_string())))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(VecDeque::from([Err(Error::Upstream(
                "connection refused".to_string(),
            ))])),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The full router backed by a throwaway SQLite database, driven in-process.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_tutor(TutorService::unconfigured())
    }

    pub fn with_backend(backend: Arc<ScriptedBackend>) -> Self {
        Self::with_tutor(TutorService::new(backend))
    }

    pub fn with_tutor(tutor: TutorService) -> Self {
        Self::with_state(|state| state.with_tutor(tutor))
    }

    pub fn with_images(images: ImageService) -> Self {
        Self::with_state(|state| state.with_images(images))
    }

    /// Builds the app on a fresh database, letting `configure` adjust the state.
    pub fn with_state(configure: impl FnOnce(AppState) -> AppState) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("vibecoder.db")).expect("open db"));
        store.initialize().expect("initialize schema");

        let state = Arc::new(configure(AppState::new(store.clone(), INVITE_CODE)));

        Self {
            temp_dir,
            store,
            router: create_router(state),
        }
    }

    /// Serves the router on a free local port for out-of-process clients.
    /// The server lives as long as the test's runtime.
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Page request carrying the session as a cookie, like a browser.
    pub async fn page(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("vibe_session={token}"));
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::empty()).expect("build request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers a student through the API and returns the session token.
    pub async fn register(&self, username: &str, password: &str) -> String {
        let resp = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({
                    "inviteCode": INVITE_CODE,
                    "username": username,
                    "displayName": username,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        resp.json()["data"]["token"]
            .as_str()
            .expect("session token")
            .to_string()
    }

    /// Inserts a seeded first-login account straight into the store.
    pub fn seed_student(&self, username: &str) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: None,
            password_hash: PasswordHasher::new().hash("placeholder-secret").expect("hash"),
            role: Role::Student,
            first_login: true,
            created_at: now,
            updated_at: now,
        };
        self.store.create_user(&user).expect("create user");
    }

    pub async fn login(&self, username: &str, password: Option<&str>) -> TestResponse {
        self.post(
            "/api/auth/login",
            None,
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }
}
