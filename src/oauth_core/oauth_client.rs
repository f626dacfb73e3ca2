use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, instrument, warn};

use super::callback::CallbackParams;
use super::config::{ClientAuthMethod, ClientConfig};
use super::crypto::{PkcePair, constant_time_eq, generate_state};
use super::grant_helpers::{Grant, TokenRequest};
use super::http_client::{HttpRequest, OAuthHttpClient};
use super::token::{BearerToken, OAuthToken};
use super::token_store::{StoreKeys, TokenStore};
use super::types::AuthError;
use crate::url_encoding::build_query;

/// Authorization parameters a caller may not supply or override.
pub const RESERVED_PARAMS: &[&str] = &[
    "response_type",
    "client_id",
    "redirect_uri",
    "scope",
    "state",
    "code_challenge",
    "code_challenge_method",
];

/// Progress of the current authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Start,
    AwaitingCallback,
    TokenExchanged,
    Failed,
}

/// Lifecycle of the authenticated user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Refreshed,
    ExpiredUnrecoverable,
    Revoked,
}

#[derive(Debug)]
struct FlowStatus {
    attempt: AttemptState,
    session: SessionState,
}

/// Drives the Authorization Code + PKCE flow, token refresh, revocation and
/// app-only bearer acquisition for one session of a [`TokenStore`].
///
/// Clones share the store, the status and a session lock, so callback
/// handling and refreshes issued through any clone are serialized: a code
/// is exchanged at most once and at most one refresh runs at a time.
/// Separate `OAuthClient` values built over the same store and [`StoreKeys`]
/// do not share that lock; callers must serialize those themselves.
pub struct OAuthClient<C: OAuthHttpClient, S: TokenStore> {
    config: Arc<ClientConfig>,
    http_client: C,
    store: Arc<S>,
    keys: StoreKeys,
    status: Arc<RwLock<FlowStatus>>,
    session_lock: Arc<Mutex<()>>,
}

impl<C: OAuthHttpClient, S: TokenStore> Clone for OAuthClient<C, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            http_client: self.http_client.clone(),
            store: self.store.clone(),
            keys: self.keys.clone(),
            status: self.status.clone(),
            session_lock: self.session_lock.clone(),
        }
    }
}

impl<C: OAuthHttpClient, S: TokenStore> OAuthClient<C, S> {
    /// Creates a client using the default session keys.
    pub fn new(config: ClientConfig, http_client: C, store: Arc<S>) -> Self {
        Self {
            config: Arc::new(config),
            http_client,
            store,
            keys: StoreKeys::default(),
            status: Arc::new(RwLock::new(FlowStatus {
                attempt: AttemptState::Start,
                session: SessionState::Unauthenticated,
            })),
            session_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Scopes every store entry of this client to `keys`.
    pub fn with_keys(mut self, keys: StoreKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn attempt_state(&self) -> AttemptState {
        self.status.read().await.attempt
    }

    pub async fn session_state(&self) -> SessionState {
        self.status.read().await.session
    }

    /// Builds the authorization URL for `scopes`.
    pub async fn build_authorization_url(&self, scopes: &[&str]) -> Result<String, AuthError> {
        self.build_authorization_url_with(scopes, &[]).await
    }

    /// Builds the authorization URL with caller-supplied extra parameters.
    ///
    /// A fresh verifier and state replace any in-flight attempt of this
    /// session. Extra parameters named in [`RESERVED_PARAMS`] are rejected
    /// before anything is generated or stored.
    #[instrument(skip(self, extra_params), level = "debug")]
    pub async fn build_authorization_url_with(
        &self,
        scopes: &[&str],
        extra_params: &[(&str, &str)],
    ) -> Result<String, AuthError> {
        let reserved = extra_params.iter().find(|(name, _)| RESERVED_PARAMS.contains(name));
        if let Some((name, _)) = reserved {
            return Err(AuthError::ReservedParameter(name.to_string()));
        }
        let pkce = PkcePair::generate(self.config.code_verifier_length)?;
        let state = generate_state(self.config.state_length)?;

        let _guard = self.session_lock.lock().await;
        self.store.set(&self.keys.code_verifier, pkce.verifier.clone()).await?;
        self.store.set(&self.keys.state, state.clone()).await?;

        let mut params: Vec<(&str, &str)> = vec![
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let scope = scopes.join(" ");
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }
        params.push(("state", state.as_str()));
        params.push(("code_challenge", pkce.challenge.as_str()));
        params.push(("code_challenge_method", pkce.method()));
        params.extend_from_slice(extra_params);

        let authorize_url = &self.config.endpoints.authorize_url;
        let separator = if authorize_url.contains('?') { '&' } else { '?' };
        self.status.write().await.attempt = AttemptState::AwaitingCallback;
        debug!(scopes = %scope, "authorization attempt started");
        Ok(format!("{}{}{}", authorize_url, separator, build_query(&params)))
    }

    /// Validates the returned `state` and exchanges `code` for a user token.
    ///
    /// The stored verifier and state are spent by any exchange that reaches
    /// the provider, so replaying a callback fails with `InvalidState`. A
    /// transport failure keeps them, and the same callback may be retried.
    /// A mismatched `state` is rejected without touching them.
    #[instrument(skip(self, received_state, code), level = "debug")]
    pub async fn handle_callback(
        &self,
        received_state: Option<&str>,
        code: &str,
    ) -> Result<OAuthToken, AuthError> {
        let _guard = self.session_lock.lock().await;
        self.check_state_locked(received_state).await?;
        self.exchange_code_locked(code).await
    }

    /// Like [`handle_callback`](Self::handle_callback), starting from the parsed redirect.
    ///
    /// State is checked first; a provider `error` then surfaces as
    /// `AuthorizationDenied` and ends the attempt.
    #[instrument(skip(self, params), level = "debug")]
    pub async fn handle_callback_params(
        &self,
        params: &CallbackParams,
    ) -> Result<OAuthToken, AuthError> {
        let _guard = self.session_lock.lock().await;
        self.check_state_locked(params.state.as_deref()).await?;
        let denied = match (&params.error, &params.code) {
            (Some(error), _) => Some(AuthError::AuthorizationDenied {
                error: error.clone(),
                description: params.error_description.clone(),
            }),
            (None, None) => Some(AuthError::AuthorizationDenied {
                error: "invalid_request".into(),
                description: Some("callback carries no authorization code".into()),
            }),
            (None, Some(_)) => None,
        };
        if let Some(err) = denied {
            warn!(error = %err, "authorization was not granted");
            self.fail_attempt().await?;
            return Err(err);
        }
        let code = params.code.as_deref().unwrap_or_default();
        self.exchange_code_locked(code).await
    }

    async fn check_state_locked(&self, received_state: Option<&str>) -> Result<(), AuthError> {
        let stored = match self.store.get(&self.keys.state).await? {
            Some(stored) if !stored.is_empty() => stored,
            _ => {
                warn!("callback arrived with no pending authorization attempt");
                self.fail_attempt().await?;
                return Err(AuthError::InvalidState);
            }
        };
        let matches = received_state.is_some_and(|received| constant_time_eq(&stored, received));
        if !matches {
            // A forged callback must not cancel the pending attempt, so the
            // stored verifier and state stay in place.
            warn!(received = received_state.is_some(), "callback state mismatched");
            self.status.write().await.attempt = AttemptState::Failed;
            return Err(AuthError::InvalidState);
        }
        Ok(())
    }

    async fn exchange_code_locked(&self, code: &str) -> Result<OAuthToken, AuthError> {
        let verifier = match self.store.get(&self.keys.code_verifier).await? {
            Some(verifier) if !verifier.is_empty() => verifier,
            _ => {
                warn!("no code verifier stored for this attempt");
                self.fail_attempt().await?;
                return Err(AuthError::MissingVerifier);
            }
        };
        let grant = Grant::AuthorizationCode {
            code,
            redirect_uri: &self.config.redirect_uri,
            code_verifier: &verifier,
        };
        let request = TokenRequest::grant(&self.config, grant).into_http_request(&self.config)?;
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "token endpoint unreachable, attempt kept for retry");
                return Err(err.into());
            }
        };

        self.clear_attempt().await?;
        match OAuthToken::from_response(&response) {
            Ok(token) => {
                self.save(&self.keys.oauth_token, &token).await?;
                let mut status = self.status.write().await;
                status.attempt = AttemptState::TokenExchanged;
                status.session = SessionState::Authenticated;
                info!(scopes = token.scopes().len(), "authorization code exchanged");
                Ok(token)
            }
            Err(err) => {
                warn!(status = response.status, error = %err, "token exchange failed");
                self.status.write().await.attempt = AttemptState::Failed;
                Err(err)
            }
        }
    }

    async fn clear_attempt(&self) -> Result<(), AuthError> {
        self.store.remove(&self.keys.code_verifier).await?;
        self.store.remove(&self.keys.state).await
    }

    async fn fail_attempt(&self) -> Result<(), AuthError> {
        self.status.write().await.attempt = AttemptState::Failed;
        self.clear_attempt().await
    }

    /// Exchanges a refresh token for a new user token and replaces the stored one.
    ///
    /// Uses `refresh_token` when given, else the stored token's. On failure
    /// the stored token is left as it was.
    #[instrument(skip(self, refresh_token), level = "debug")]
    pub async fn refresh_access_token(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<OAuthToken, AuthError> {
        let _guard = self.session_lock.lock().await;
        self.refresh_locked(refresh_token).await
    }

    /// Refresh body; the caller must hold the session lock.
    pub(crate) async fn refresh_locked(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<OAuthToken, AuthError> {
        let refresh_token = match refresh_token.filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => self
                .current_token()
                .await?
                .and_then(|token| token.refresh_token().map(str::to_string))
                .filter(|token| !token.is_empty())
                .ok_or(AuthError::NoRefreshToken)?,
        };
        let grant = Grant::RefreshToken { refresh_token: &refresh_token };
        let request = TokenRequest::grant(&self.config, grant).into_http_request(&self.config)?;
        let response = self.http_client.execute(request).await?;
        let token = match OAuthToken::from_response(&response) {
            Ok(token) => token.or_refresh_token(refresh_token),
            Err(err) => {
                warn!(status = response.status, error = %err, "token refresh failed");
                return Err(err);
            }
        };
        self.save(&self.keys.oauth_token, &token).await?;
        self.status.write().await.session = SessionState::Refreshed;
        info!("access token refreshed");
        Ok(token)
    }

    /// Revokes `token`; `Ok(true)` only when the provider answers 200.
    ///
    /// Stored tokens are kept; use [`forget_tokens`](Self::forget_tokens) to drop them.
    pub async fn revoke_access_token(&self, token: &str) -> Result<bool, AuthError> {
        self.revoke_token_with_hint(token, None).await
    }

    #[instrument(skip(self, token), level = "debug")]
    pub async fn revoke_token_with_hint(
        &self,
        token: &str,
        token_type_hint: Option<&str>,
    ) -> Result<bool, AuthError> {
        let request = TokenRequest::revocation(&self.config, token, token_type_hint)
            .into_http_request(&self.config)?;
        let response = self.http_client.execute(request).await?;
        let revoked = response.status == 200;
        if revoked {
            self.status.write().await.session = SessionState::Revoked;
            info!("token revoked");
        } else {
            warn!(status = response.status, "revocation not confirmed");
        }
        Ok(revoked)
    }

    /// Obtains an app-only bearer token (`client_credentials`) and stores it.
    ///
    /// Requires a client secret. A public-client configuration still
    /// authenticates this grant with HTTP Basic.
    #[instrument(skip(self), level = "debug")]
    pub async fn request_bearer_token(&self) -> Result<BearerToken, AuthError> {
        if !self.config.has_client_secret() {
            return Err(AuthError::Configuration(
                "client_secret is required to request a bearer token".into(),
            ));
        }
        let request = self.client_credentials_request()?;
        let response = self.http_client.execute(request).await?;
        let token = BearerToken::from_response(&response).inspect_err(|err| {
            warn!(status = response.status, error = %err, "bearer token request failed");
        })?;
        self.save(&self.keys.bearer_token, &token).await?;
        info!("bearer token obtained");
        Ok(token)
    }

    fn client_credentials_request(&self) -> Result<HttpRequest, AuthError> {
        if self.config.client_auth == ClientAuthMethod::None {
            let basic =
                ClientConfig { client_auth: ClientAuthMethod::Basic, ..(*self.config).clone() };
            TokenRequest::grant(&basic, Grant::ClientCredentials).into_http_request(&basic)
        } else {
            TokenRequest::grant(&self.config, Grant::ClientCredentials)
                .into_http_request(&self.config)
        }
    }

    /// Stores a user token obtained elsewhere (e.g. loaded from a database).
    pub async fn set_oauth_token(&self, token: &OAuthToken) -> Result<(), AuthError> {
        self.save(&self.keys.oauth_token, token).await?;
        self.status.write().await.session = SessionState::Authenticated;
        Ok(())
    }

    pub async fn set_bearer_token(&self, token: &BearerToken) -> Result<(), AuthError> {
        self.save(&self.keys.bearer_token, token).await
    }

    pub async fn current_token(&self) -> Result<Option<OAuthToken>, AuthError> {
        self.load(&self.keys.oauth_token).await
    }

    pub async fn current_bearer_token(&self) -> Result<Option<BearerToken>, AuthError> {
        self.load(&self.keys.bearer_token).await
    }

    /// Removes both stored tokens; the session becomes unauthenticated.
    pub async fn forget_tokens(&self) -> Result<(), AuthError> {
        self.store.remove(&self.keys.oauth_token).await?;
        self.store.remove(&self.keys.bearer_token).await?;
        self.status.write().await.session = SessionState::Unauthenticated;
        Ok(())
    }

    pub(crate) async fn lock_session(&self) -> MutexGuard<'_, ()> {
        self.session_lock.lock().await
    }

    pub(crate) async fn mark_session(&self, session: SessionState) {
        self.status.write().await.session = session;
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AuthError> {
        let encoded = serde_json::to_string(value).map_err(|e| AuthError::Store(e.to_string()))?;
        self.store.set(key, encoded).await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AuthError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AuthError::Store(format!("cannot decode {}: {}", key, e))),
            None => Ok(None),
        }
    }
}
