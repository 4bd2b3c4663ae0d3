use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

use super::credentials::Credentials;
use crate::editor::ProjectSink;
use crate::error::{Error, Result as CrateResult};
use crate::types::CodeState;

const REQUEST_TIMEOUT_SECS: u64 = 90;

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl ApiClient {
    pub fn new(creds: &Credentials) -> anyhow::Result<Self> {
        let mut client = Self::anonymous(&creds.server_url)?;
        client.token = Some(creds.token.clone());
        Ok(client)
    }

    /// A client without a session, for the login endpoints.
    pub fn anonymous(server_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: server_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let resp = self.request(reqwest::Method::GET, path).send().await?;
        Self::handle_response(resp).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let resp = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> anyhow::Result<T> {
        let resp = self
            .request(reqwest::Method::PUT, path)
            .json(body)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    /// For endpoints that answer with an empty body on success.
    pub async fn send_empty(&self, method: reqwest::Method, path: &str) -> anyhow::Result<()> {
        let resp = self.request(method, path).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(resp).await)
        }
    }

    async fn error_from(resp: reqwest::Response) -> anyhow::Error {
        let status = resp.status();
        match resp.json::<ApiResponse<()>>().await {
            Ok(api_resp) => anyhow::anyhow!(
                api_resp
                    .error
                    .unwrap_or_else(|| "Server error (no details provided)".into())
            ),
            Err(_) => anyhow::anyhow!("Server error ({status})"),
        }
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
        if resp.status().is_success() {
            let api_resp: ApiResponse<T> = resp.json().await?;
            api_resp
                .data
                .ok_or_else(|| anyhow::anyhow!("Server returned an empty response"))
        } else {
            Err(Self::error_from(resp).await)
        }
    }
}

/// Saves buffers through `PUT /api/projects/{id}`.
pub struct HttpProjectSink {
    client: ApiClient,
}

impl HttpProjectSink {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProjectSink for HttpProjectSink {
    async fn save(&self, project_id: &str, code: &CodeState, save_version: bool) -> CrateResult<()> {
        let body = json!({
            "html": code.markup,
            "css": code.style,
            "javascript": code.script,
            "saveVersion": save_version,
        });
        self.client
            .put::<serde_json::Value, _>(&format!("/projects/{project_id}"), &body)
            .await
            .map(|_| ())
            .map_err(|e| Error::Upstream(e.to_string()))
    }
}
