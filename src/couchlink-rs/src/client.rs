use std::fmt;
use std::sync::Arc;

use couchlink_core::ClientConfig;
use reqwest::Method;
use serde_json::Value;

use crate::transport::{HttpTransport, Response, Transport};
use crate::{ClientError, Database, Result};

/// CouchDB server connection.
///
/// Cheap to clone: every clone shares the same transport and config.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("server_url", &self.config.server_url)
            .finish()
    }
}

impl Client {
    /// Create a new client talking HTTP to `config.server_url`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue one request; `path` is relative to the server root
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        self.transport.request(method, path, body).await
    }

    /// Server welcome/version information
    pub async fn server_info(&self) -> Result<Value> {
        self.request(Method::GET, "", None).await?.into_json()
    }

    /// Names of every database on the server
    pub async fn list_database_names(&self) -> Result<Vec<String>> {
        let response = self.request(Method::GET, "_all_dbs", None).await?;
        if !response.success() {
            return Err(ClientError::connection(&response));
        }

        let names = response
            .json
            .as_ref()
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::connection(&response))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    /// Every database on the server as a handle
    pub async fn list_databases(&self) -> Result<Vec<Database>> {
        self.list_database_names()
            .await?
            .iter()
            .map(|name| self.database(name))
            .collect()
    }

    pub async fn database_exists(&self, name: &str) -> Result<bool> {
        let wanted = name.trim_end_matches('/');
        Ok(self
            .list_database_names()
            .await?
            .iter()
            .any(|n| n.trim_end_matches('/') == wanted))
    }

    /// Handle for database `name`; no request is made
    pub fn database(&self, name: &str) -> Result<Database> {
        Database::new(self.clone(), name)
    }
}
