use std::time::Duration;

use async_trait::async_trait;
use couchlink_core::ClientConfig;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::{ClientError, Result};

/// Outcome of one HTTP exchange, as seen by the handles
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// Decoded body, when the server answered with JSON
    pub json: Option<Value>,
    /// Status line, plus the server's `reason` on failures
    pub message: String,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, json: Option<Value>) -> Self {
        let body = json
            .as_ref()
            .map(|j| j.to_string().into_bytes())
            .unwrap_or_default();
        Self {
            status,
            message: status_message(status, json.as_ref()),
            json,
            body,
        }
    }

    /// Response carrying a non-JSON payload
    pub fn raw(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            json: None,
            message: status_message(status, None),
            body,
        }
    }

    /// 2xx status
    pub fn success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 2xx status and a JSON body with `ok: true`
    pub fn is_ok(&self) -> bool {
        self.success()
            && self
                .json
                .as_ref()
                .and_then(|j| j.get("ok"))
                .and_then(Value::as_bool)
                == Some(true)
    }

    /// Decoded body of a successful response; anything else is a
    /// connection error carrying the transport message
    pub(crate) fn into_json(self) -> Result<Value> {
        if !self.success() {
            return Err(ClientError::connection(&self));
        }
        match self.json {
            Some(json) => Ok(json),
            None => Err(ClientError::Connection {
                message: self.message,
            }),
        }
    }
}

fn status_message(status: u16, json: Option<&Value>) -> String {
    let line = StatusCode::from_u16(status)
        .map(|s| s.to_string())
        .unwrap_or_else(|_| status.to_string());

    if (200..300).contains(&status) {
        return line;
    }

    match json.and_then(|j| j.get("reason")).and_then(Value::as_str) {
        Some(reason) => format!("{}: {}", line, reason),
        None => line,
    }
}

/// Transport performs one HTTP request against the server.
///
/// `path` is relative to the server root (e.g. `mydb/_all_docs?count=10`).
/// Socket-level failures surface as [`crate::ClientError::Connection`];
/// HTTP error statuses come back as a normal [`Response`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            credentials: config
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "CouchDB request failed");
            e
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?.to_vec();
        let json = serde_json::from_slice::<Value>(&bytes).ok();

        tracing::debug!(%method, path, status, "CouchDB request");

        Ok(Response {
            status,
            message: status_message(status, json.as_ref()),
            json,
            body: bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_ok_requires_ok_true() {
        assert!(Response::new(201, Some(json!({"ok": true}))).is_ok());
        assert!(!Response::new(201, Some(json!({"ok": false}))).is_ok());
        assert!(!Response::new(200, None).is_ok());
        assert!(!Response::new(409, Some(json!({"ok": true}))).is_ok());
    }

    #[test]
    fn test_message_includes_reason_on_failure() {
        let resp = Response::new(
            409,
            Some(json!({"error": "file_exists", "reason": "The database could not be created."})),
        );
        assert_eq!(
            resp.message,
            "409 Conflict: The database could not be created."
        );

        let resp = Response::new(404, None);
        assert_eq!(resp.message, "404 Not Found");
        assert!(!resp.success());
    }

    #[test]
    fn test_http_transport_builds_from_config() {
        let config = ClientConfig::new("http://localhost:5984").with_credentials("admin", "pw");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url, "http://localhost:5984/");
        assert_eq!(
            transport.credentials,
            Some(("admin".to_string(), "pw".to_string()))
        );
    }
}
