//! Chooses the `Authorization` header for outgoing API calls.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::http_client::{HttpRequest, OAuthHttpClient};
use super::oauth_client::{OAuthClient, SessionState};
use super::token_store::TokenStore;
use super::types::AuthError;

/// Source of the `Authorization` header value for API requests.
#[async_trait]
pub trait AuthorizationHeaderProvider: Send + Sync {
    /// Returns a complete header value such as `Bearer <token>`.
    async fn authorization_header(&self) -> Result<String, AuthError>;
}

/// Header provider backed by the tokens an [`OAuthClient`] has stored.
///
/// A usable user token wins over the app-only bearer token. An expired user
/// token is refreshed under the client's session lock, and the token is
/// read again once the lock is held, so concurrent callers share one refresh.
pub struct TokenAuthorizer<C: OAuthHttpClient, S: TokenStore> {
    client: OAuthClient<C, S>,
}

impl<C: OAuthHttpClient, S: TokenStore> Clone for TokenAuthorizer<C, S> {
    fn clone(&self) -> Self {
        Self { client: self.client.clone() }
    }
}

impl<C: OAuthHttpClient, S: TokenStore> TokenAuthorizer<C, S> {
    pub fn new(client: OAuthClient<C, S>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OAuthClient<C, S> {
        &self.client
    }

    /// Sets the `Authorization` header on `request`, replacing any existing one.
    pub async fn authorize(&self, request: &mut HttpRequest) -> Result<(), AuthError> {
        let header = self.authorization_header().await?;
        request.headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        request.headers.push(("Authorization".to_string(), header));
        Ok(())
    }

    async fn user_header(&self) -> Result<Option<String>, AuthError> {
        let token = match self.client.current_token().await? {
            Some(token) if token.has_access_token() => token,
            _ => return Ok(None),
        };
        if !token.is_expired() {
            return Ok(token.authorization_header());
        }

        let _guard = self.client.lock_session().await;
        let token = match self.client.current_token().await? {
            Some(token) if token.has_access_token() => token,
            _ => return Ok(None),
        };
        if !token.is_expired() {
            debug!("token was refreshed by a concurrent caller");
            return Ok(token.authorization_header());
        }
        if !token.has_refresh_token() {
            warn!("access token expired and no refresh token is stored");
            self.client.mark_session(SessionState::ExpiredUnrecoverable).await;
            return Err(AuthError::ExpiredNoRefresh);
        }
        let refreshed = self.client.refresh_locked(None).await?;
        Ok(refreshed.authorization_header())
    }
}

#[async_trait]
impl<C: OAuthHttpClient, S: TokenStore> AuthorizationHeaderProvider for TokenAuthorizer<C, S> {
    #[instrument(skip(self), level = "debug")]
    async fn authorization_header(&self) -> Result<String, AuthError> {
        if let Some(header) = self.user_header().await? {
            return Ok(header);
        }
        let bearer = self.client.current_bearer_token().await?;
        if let Some(header) = bearer.and_then(|t| t.authorization_header()) {
            return Ok(header);
        }
        Err(AuthError::NoCredentials)
    }
}
