use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "https://mods.factorio.com";
pub const DEFAULT_ENGINE_VERSION: &str = "2.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Mod portal endpoint, credentials, and the engine version releases must target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub username: String,
    pub token: String,
    pub engine_version: String,
    pub timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_URL.to_owned(),
            username: String::new(),
            token: String::new(),
            engine_version: DEFAULT_ENGINE_VERSION.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Username and token appended to artifact download requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl PortalConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: &str, token: &str) -> Self {
        username.clone_into(&mut self.username);
        token.clone_into(&mut self.token);
        self
    }

    #[must_use]
    pub fn with_engine_version(mut self, engine_version: &str) -> Self {
        engine_version.clone_into(&mut self.engine_version);
        self
    }

    /// Both username and token must be set; anything less disables syncing.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.username.is_empty() || self.token.is_empty() {
            return None;
        }
        Some(Credentials {
            username: self.username.clone(),
            token: self.token.clone(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_both_fields() {
        let base = PortalConfig::new("https://mods.example.com/");
        assert!(base.credentials().is_none());
        assert!(base.clone().with_credentials("alice", "").credentials().is_none());
        assert!(base.clone().with_credentials("", "tok").credentials().is_none());

        let creds = base.with_credentials("alice", "tok").credentials().unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.token, "tok");
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let config = PortalConfig::new("https://mods.example.com/");
        assert_eq!(config.base_url, "https://mods.example.com");
    }

    #[test]
    fn debug_redacts_token() {
        let creds = PortalConfig::default()
            .with_credentials("alice", "s3cret")
            .credentials()
            .unwrap();
        let shown = format!("{creds:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: PortalConfig = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(config.base_url, DEFAULT_PORTAL_URL);
        assert_eq!(config.engine_version, "2.0");
        assert_eq!(config.timeout_secs, 600);
    }
}
