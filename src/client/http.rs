use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use log::debug;
use reqwest::Method;
use serde_json::Value;

use super::{ApiResponse, EnvironmentClient, MutableEnvironment};
use crate::config::{AppConfig, EnvironmentConfig};
use crate::error::MigrationError;

/// Authenticated JSON connection to one environment's REST API.
struct Connection {
    name: String,
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

impl Connection {
    fn new(name: &str, config: &EnvironmentConfig, timeout: Duration) -> Result<Self, MigrationError> {
        let creds = format!("{}:{}", config.user, config.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MigrationError::transport(&config.url, e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            base_url: normalize_url(&config.url),
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json(&self, path: &str, page: Option<&str>) -> Result<Value, MigrationError> {
        let mut request = self
            .client
            .get(self.url(path))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json");
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }

        debug!("{} GET {path} page={page:?}", self.name);
        let resp = request
            .send()
            .await
            .map_err(|e| MigrationError::transport(path, e.to_string()))?;
        let status = resp.status();
        let body = read_body(resp, path).await?;
        if !status.is_success() {
            return Err(MigrationError::transport(path, format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiResponse, MigrationError> {
        debug!("{} {method} {path}", self.name);
        let mut request = self
            .client
            .request(method, self.url(path))
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| MigrationError::transport(path, e.to_string()))?;
        let status = resp.status().as_u16();
        let body = read_body(resp, path).await?;
        Ok(ApiResponse { status, body })
    }
}

/// Empty bodies (204 on delete) become `null`, non-JSON bodies a plain string.
async fn read_body(resp: reqwest::Response, path: &str) -> Result<Value, MigrationError> {
    let text = resp
        .text()
        .await
        .map_err(|e| MigrationError::transport(path, e.to_string()))?;
    Ok(decode_body(&text))
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Client for the production environment. Implements the read capability only.
pub struct ReadOnlyClient {
    conn: Connection,
}

/// Client for the environment being rebuilt.
pub struct MutableClient {
    conn: Connection,
}

/// Build the source and target clients, refusing a target that points at the source.
pub fn connect(config: &AppConfig) -> Result<(ReadOnlyClient, MutableClient), MigrationError> {
    if normalize_url(&config.source.url).eq_ignore_ascii_case(&normalize_url(&config.target.url)) {
        return Err(MigrationError::ProtectionViolation(format!(
            "target url {} is the source environment",
            config.target.url
        )));
    }

    let timeout = Duration::from_secs(config.timeout_secs);
    let source = ReadOnlyClient {
        conn: Connection::new("source", &config.source, timeout)?,
    };
    let target = MutableClient {
        conn: Connection::new("target", &config.target, timeout)?,
    };
    Ok((source, target))
}

#[async_trait]
impl EnvironmentClient for ReadOnlyClient {
    fn name(&self) -> &str {
        &self.conn.name
    }

    async fn list(&self, path: &str, page: Option<&str>) -> Result<Value, MigrationError> {
        self.conn.get_json(path, page).await
    }

    async fn get(&self, path: &str) -> Result<Value, MigrationError> {
        self.conn.get_json(path, None).await
    }
}

#[async_trait]
impl EnvironmentClient for MutableClient {
    fn name(&self) -> &str {
        &self.conn.name
    }

    async fn list(&self, path: &str, page: Option<&str>) -> Result<Value, MigrationError> {
        self.conn.get_json(path, page).await
    }

    async fn get(&self, path: &str) -> Result<Value, MigrationError> {
        self.conn.get_json(path, None).await
    }
}

#[async_trait]
impl MutableEnvironment for MutableClient {
    async fn create(&self, path: &str, body: Value) -> Result<ApiResponse, MigrationError> {
        self.conn.send(Method::POST, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, MigrationError> {
        self.conn.send(Method::DELETE, path, None).await
    }
}
