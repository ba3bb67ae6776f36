//! Signed HTTP transport for the SpeedyCloud API
//!
//! Every call is a form-encoded `POST` to `<endpoint>/<path>`, carrying a
//! `Date` header and an `Authorization: SC <key>:<signature>` header where the
//! signature is the hex HMAC-SHA256 of `POST\n<path>\n<date>\n<body>`.

use crate::error::{Result, SpeedyCloudError};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, DATE, HeaderValue};
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API key pair. The secret never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// `Date` header value, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Hex HMAC-SHA256 over the canonical request string
pub fn signature(secret: &str, path: &str, date: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SpeedyCloudError::InvalidRequest(format!("invalid API secret: {}", e)))?;
    mac.update(format!("POST\n{}\n{}\n{}", path, date, body).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Authenticated transport shared by every service client
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    credentials: Credentials,
}

impl ProviderClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("speedyflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, credentials })
    }

    /// Sign and send a form-encoded POST, returning the decoded JSON body
    pub async fn post(&self, url: &str, path: &str, form: &[(&str, String)]) -> Result<Value> {
        let mut request = self.http.post(url).form(form).build()?;

        let body = request
            .body()
            .and_then(|b| b.as_bytes())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        let date = http_date();
        let sig = signature(&self.credentials.api_secret, path, &date, &body)?;
        let authorization = format!("SC {}:{}", self.credentials.api_key, sig);

        let headers = request.headers_mut();
        headers.insert(DATE, header_value(&date)?);
        headers.insert(AUTHORIZATION, header_value(&authorization)?);

        tracing::debug!("POST {}", url);
        let response = self.http.execute(request).await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("POST {} -> {}", url, status);

        if !status.is_success() {
            return Err(SpeedyCloudError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        parse_body(&text)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SpeedyCloudError::InvalidRequest(format!("invalid header value: {}", e)))
}

/// Decode a successful body; a non-null `error` member is still a failure
pub fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(text)?;
    match value.get("error") {
        None | Some(Value::Null) => Ok(value),
        Some(Value::String(message)) => Err(SpeedyCloudError::Api(message.clone())),
        Some(other) => Err(SpeedyCloudError::Api(other.to_string())),
    }
}

fn error_message(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => match value.get("error").or_else(|| value.get("message")) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => text.trim().to_string(),
        },
        Err(_) => text.trim().to_string(),
    }
}

/// Provider client bound to a service endpoint
#[derive(Debug, Clone)]
pub struct ServiceClient {
    provider: ProviderClient,
    endpoint: String,
}

impl ServiceClient {
    pub fn new(provider: ProviderClient, endpoint: &str) -> Self {
        Self {
            provider,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn service_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    pub async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<Value> {
        self.provider
            .post(&self.service_url(path), path, form)
            .await
    }
}
