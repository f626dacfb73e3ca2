//! Error kinds surfaced by the authentication core.

use std::fmt;

use serde::Deserialize;

use super::http_client::{HttpClientError, HttpResponse, RateLimitInfo};

/// Fieldless discriminant of [`AuthError`], handy for matching and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    InvalidState,
    MissingVerifier,
    TokenExchangeFailed,
    NoRefreshToken,
    ExpiredNoRefresh,
    NoCredentials,
    UnexpectedTokenType,
    MalformedResponse,
    Transport,
    RandomSource,
    ReservedParameter,
    Configuration,
    AuthorizationDenied,
    Store,
}

/// Errors returned by the OAuth flow, the token value objects and the header provider.
///
/// Nothing is retried inside the crate. Only [`AuthError::Transport`] is worth
/// retrying as-is; see [`AuthError::is_transient`].
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The callback `state` is missing or does not match the stored one.
    InvalidState,
    /// No PKCE code verifier is stored for this callback.
    MissingVerifier,
    /// The token endpoint answered with a non-2xx status.
    TokenExchangeFailed {
        /// HTTP status returned by the provider.
        status: u16,
        /// Raw response body, usually an OAuth error document.
        body: String,
        /// Rate-limit headers, when the provider sent them.
        rate_limit: Option<RateLimitInfo>,
    },
    /// A refresh was requested but no refresh token is available.
    NoRefreshToken,
    /// The user token is expired and cannot be refreshed.
    ExpiredNoRefresh,
    /// Neither a user token nor an app-only bearer token is available.
    NoCredentials,
    /// The provider issued a token type other than `bearer`.
    UnexpectedTokenType(String),
    /// A 2xx token response is missing required fields or is not JSON.
    MalformedResponse(String),
    /// The HTTP client failed before a response was received.
    Transport(HttpClientError),
    /// The operating system's secure random source failed.
    RandomSource,
    /// A caller-supplied authorization parameter collides with a protected one.
    ReservedParameter(String),
    /// The client configuration cannot serve this request.
    Configuration(String),
    /// The provider redirected back with an `error` instead of a code.
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },
    /// The token store failed or holds undecodable data.
    Store(String),
}

/// Standard OAuth 2.0 error document (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl AuthError {
    /// Builds a `TokenExchangeFailed` from a non-2xx token endpoint response.
    pub fn token_exchange_failed(response: &HttpResponse) -> Self {
        AuthError::TokenExchangeFailed {
            status: response.status,
            body: response.body_text(),
            rate_limit: response.rate_limit(),
        }
    }

    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::InvalidState => AuthErrorKind::InvalidState,
            AuthError::MissingVerifier => AuthErrorKind::MissingVerifier,
            AuthError::TokenExchangeFailed { .. } => AuthErrorKind::TokenExchangeFailed,
            AuthError::NoRefreshToken => AuthErrorKind::NoRefreshToken,
            AuthError::ExpiredNoRefresh => AuthErrorKind::ExpiredNoRefresh,
            AuthError::NoCredentials => AuthErrorKind::NoCredentials,
            AuthError::UnexpectedTokenType(_) => AuthErrorKind::UnexpectedTokenType,
            AuthError::MalformedResponse(_) => AuthErrorKind::MalformedResponse,
            AuthError::Transport(_) => AuthErrorKind::Transport,
            AuthError::RandomSource => AuthErrorKind::RandomSource,
            AuthError::ReservedParameter(_) => AuthErrorKind::ReservedParameter,
            AuthError::Configuration(_) => AuthErrorKind::Configuration,
            AuthError::AuthorizationDenied { .. } => AuthErrorKind::AuthorizationDenied,
            AuthError::Store(_) => AuthErrorKind::Store,
        }
    }

    /// HTTP status attached to the error, if the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::TokenExchangeFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the token endpoint answered 429.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// True for transport failures (timeouts, resets), which callers may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::Transport(err) if err.is_transient())
    }

    /// Parsed OAuth error document from a `TokenExchangeFailed` body.
    pub fn provider_error(&self) -> Option<ProviderError> {
        match self {
            AuthError::TokenExchangeFailed { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState => write!(f, "Invalid or missing state parameter"),
            Self::MissingVerifier => {
                write!(f, "Code verifier not found for this authorization attempt")
            }
            Self::TokenExchangeFailed { status, .. } => match self.provider_error() {
                Some(ProviderError { error, error_description: Some(desc) }) => {
                    write!(f, "Token request failed: HTTP {} ({}: {})", status, error, desc)
                }
                Some(ProviderError { error, .. }) => {
                    write!(f, "Token request failed: HTTP {} ({})", status, error)
                }
                None => write!(f, "Token request failed: HTTP {}", status),
            },
            Self::NoRefreshToken => write!(f, "Refresh token not available"),
            Self::ExpiredNoRefresh => write!(f, "OAuth token is expired and cannot be refreshed"),
            Self::NoCredentials => write!(f, "No valid authentication method available"),
            Self::UnexpectedTokenType(t) => write!(f, "Unexpected token type: {}", t),
            Self::MalformedResponse(msg) => write!(f, "Invalid token response: {}", msg),
            Self::Transport(err) => write!(f, "Transport error: {}", err),
            Self::RandomSource => write!(f, "Secure random source unavailable"),
            Self::ReservedParameter(name) => write!(f, "Parameter '{}' cannot be overridden", name),
            Self::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Self::AuthorizationDenied { error, description: Some(desc) } => {
                write!(f, "Authorization denied: {} ({})", error, desc)
            }
            Self::AuthorizationDenied { error, description: None } => {
                write!(f, "Authorization denied: {}", error)
            }
            Self::Store(msg) => write!(f, "Token store error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HttpClientError> for AuthError {
    fn from(err: HttpClientError) -> Self {
        Self::Transport(err)
    }
}
