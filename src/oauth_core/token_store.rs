//! Key/value persistence consumed by the authorization flow.

use async_trait::async_trait;
use uuid::Uuid;

use super::types::AuthError;

const KEY_PREFIX: &str = "twitter_oauth2";
pub const DEFAULT_SESSION: &str = "default";

/// Pluggable string store for the values that must survive the redirect:
/// the PKCE verifier, the CSRF state and the issued tokens.
///
/// Implementations only need per-call atomicity; the client serializes the
/// multi-step sequences itself.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    async fn has(&self, key: &str) -> Result<bool, AuthError>;

    async fn get(&self, key: &str) -> Result<Option<String>, AuthError>;

    async fn set(&self, key: &str, value: String) -> Result<(), AuthError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), AuthError>;
}

/// Store keys for one authentication session.
///
/// Sessions with distinct ids never see each other's verifier, state or tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub code_verifier: String,
    pub state: String,
    pub oauth_token: String,
    pub bearer_token: String,
}

impl StoreKeys {
    pub fn new(session_id: &str) -> Self {
        let key = |name: &str| format!("{}.{}.{}", KEY_PREFIX, session_id, name);
        Self {
            code_verifier: key("code_verifier"),
            state: key("state"),
            oauth_token: key("oauth_token"),
            bearer_token: key("bearer_token"),
        }
    }

    /// Keys under a fresh random session id.
    pub fn for_new_attempt() -> Self {
        Self::new(&Uuid::new_v4().to_string())
    }
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION)
    }
}
