//! Client registration and endpoint configuration.

use std::env;
use std::fmt;
use std::time::Duration;

use super::crypto::{DEFAULT_STATE_LENGTH, DEFAULT_VERIFIER_LENGTH};
use super::types::AuthError;

pub const DEFAULT_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";
pub const DEFAULT_REVOKE_URL: &str = "https://api.twitter.com/2/oauth2/revoke";

pub const ENV_CLIENT_ID: &str = "TWITTER_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TWITTER_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "TWITTER_REDIRECT_URI";

/// Authorization server endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            revoke_url: DEFAULT_REVOKE_URL.to_string(),
        }
    }
}

/// How the client authenticates itself at the token and revoke endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `Authorization: Basic base64(client_id:client_secret)`.
    Basic,
    /// `client_id` and `client_secret` as form fields.
    RequestBody,
    /// Public client: only `client_id` is sent.
    None,
}

/// Immutable client configuration shared by every flow of one client.
///
/// Build with [`ClientConfig::new`] and the `with_*` methods, or read the
/// registration from the environment with [`ClientConfig::from_env`].
#[derive(Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub endpoints: Endpoints,
    pub client_auth: ClientAuthMethod,
    /// Whole-request timeout for token and revoke calls.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Extra headers sent with every token and revoke call.
    pub headers: Vec<(String, String)>,
    pub code_verifier_length: usize,
    pub state_length: usize,
}

impl ClientConfig {
    /// Public client (no secret, no client authentication) with default endpoints.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            endpoints: Endpoints::default(),
            client_auth: ClientAuthMethod::None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("twitter_oauth_v2/{}", env!("CARGO_PKG_VERSION")),
            headers: Vec::new(),
            code_verifier_length: DEFAULT_VERIFIER_LENGTH,
            state_length: DEFAULT_STATE_LENGTH,
        }
    }

    /// Reads `TWITTER_CLIENT_ID`, `TWITTER_CLIENT_SECRET` (optional) and
    /// `TWITTER_REDIRECT_URI`.
    pub fn from_env() -> Result<Self, AuthError> {
        let required = |name: &str| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AuthError::Configuration(format!("{} is not set", name)))
        };
        let client_id = required(ENV_CLIENT_ID)?;
        let redirect_uri = required(ENV_REDIRECT_URI)?;
        let config = Self::new(client_id, redirect_uri);
        Ok(match env::var(ENV_CLIENT_SECRET) {
            Ok(secret) => config.with_client_secret(secret),
            Err(_) => config,
        })
    }

    /// Makes this a confidential client. A public client switches to Basic auth;
    /// an empty secret is ignored.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if secret.is_empty() {
            return self;
        }
        self.client_secret = Some(secret);
        if self.client_auth == ClientAuthMethod::None {
            self.client_auth = ClientAuthMethod::Basic;
        }
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.endpoints.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.endpoints.token_url = url.into();
        self
    }

    pub fn with_revoke_url(mut self, url: impl Into<String>) -> Self {
        self.endpoints.revoke_url = url.into();
        self
    }

    pub fn with_client_auth(mut self, method: ClientAuthMethod) -> Self {
        self.client_auth = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Verifier length; clamped into `[43, 128]` when a verifier is generated.
    pub fn with_code_verifier_length(mut self, length: usize) -> Self {
        self.code_verifier_length = length;
        self
    }

    pub fn with_state_length(mut self, length: usize) -> Self {
        self.state_length = length;
        self
    }

    pub fn has_client_secret(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Rejects configurations that cannot produce a valid authorization request.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Configuration("client_id is empty".into()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::Configuration("redirect_uri is empty".into()));
        }
        if self.client_auth != ClientAuthMethod::None && self.client_secret.is_none() {
            return Err(AuthError::Configuration(
                "client authentication requires a client_secret".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("endpoints", &self.endpoints)
            .field("client_auth", &self.client_auth)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_selects_basic_auth() {
        let confidential = ClientConfig::new("id", "https://app/cb").with_client_secret("secret");
        assert_eq!(confidential.client_auth, ClientAuthMethod::Basic);
        let body = ClientConfig::new("id", "https://app/cb")
            .with_client_auth(ClientAuthMethod::RequestBody)
            .with_client_secret("secret");
        assert_eq!(body.client_auth, ClientAuthMethod::RequestBody);
        let public = ClientConfig::new("id", "https://app/cb").with_client_secret("");
        assert_eq!(public.client_auth, ClientAuthMethod::None);
        assert!(!public.has_client_secret());
    }

    #[test]
    fn defaults_point_at_twitter() {
        let config = ClientConfig::new("id", "https://app/cb");
        assert_eq!(config.endpoints.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.code_verifier_length, 64);
        assert_eq!(config.state_length, 32);
        assert!(config.user_agent.starts_with("twitter_oauth_v2/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_catches_missing_secret() {
        let config =
            ClientConfig::new("id", "https://app/cb").with_client_auth(ClientAuthMethod::Basic);
        assert!(matches!(config.validate(), Err(AuthError::Configuration(_))));
        let config = ClientConfig::new("", "https://app/cb");
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let config = ClientConfig::new("id", "https://app/cb").with_client_secret("hunter2");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
