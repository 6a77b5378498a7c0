use serde::{Deserialize, Serialize};

/// Connection settings for a CouchDB server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    // Basic auth, sent only when both are set
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_server_url() -> String {
    "http://localhost:5984/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("couchlink/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Settings for `server_url` with everything else defaulted
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        tracing::debug!(path, server_url = %config.server_url, "Loaded client config");
        Ok(config)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Server URL guaranteed to end in a slash, ready for joining paths
    pub fn base_url(&self) -> String {
        if self.server_url.ends_with('/') {
            self.server_url.clone()
        } else {
            format!("{}/", self.server_url)
        }
    }

    /// Both halves of the basic-auth pair, if configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            insecure_skip_verify: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server_url, "http://localhost:5984/");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.credentials().is_none());
        assert!(!config.insecure_skip_verify);
    }

    #[test]
    fn test_base_url_appends_slash() {
        assert_eq!(ClientConfig::new("http://couch:5984").base_url(), "http://couch:5984/");
        assert_eq!(ClientConfig::new("http://couch:5984/").base_url(), "http://couch:5984/");
    }

    #[test]
    fn test_credentials_need_both_halves() {
        let mut config = ClientConfig::default();
        config.username = Some("admin".to_string());
        assert!(config.credentials().is_none());

        let config = config.with_credentials("admin", "secret");
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }
}
