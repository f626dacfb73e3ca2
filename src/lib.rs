//! OAuth 2.0 Authorization Code + PKCE and app-only bearer authentication
//! for the Twitter API v2.
//!
//! [`OAuthClient`] runs the redirect flow and the token lifecycle against a
//! pluggable [`TokenStore`] and [`OAuthHttpClient`]; [`TokenAuthorizer`]
//! turns the stored tokens into `Authorization` headers, refreshing
//! expired user tokens on the way.

pub mod oauth_core;
pub mod url_encoding;

pub use oauth_core::authorizer::{AuthorizationHeaderProvider, TokenAuthorizer};
pub use oauth_core::callback::CallbackParams;
pub use oauth_core::config::{ClientAuthMethod, ClientConfig, Endpoints};
pub use oauth_core::crypto::{
    PkcePair, generate_code_challenge, generate_code_verifier, generate_state,
    verify_code_challenge,
};
pub use oauth_core::http_client::{
    HttpClientError, HttpMethod, HttpRequest, HttpResponse, InMemoryHttpClient, OAuthHttpClient,
    RateLimitInfo, RedirectPolicy,
};
#[cfg(feature = "reqwest")]
pub use oauth_core::http_client::ReqwestHttpClient;
pub use oauth_core::memory::InMemoryTokenStore;
pub use oauth_core::oauth_client::{AttemptState, OAuthClient, SessionState};
pub use oauth_core::token::{BearerToken, OAuthToken, TokenResponse};
pub use oauth_core::token_store::{StoreKeys, TokenStore};
pub use oauth_core::types::{AuthError, AuthErrorKind, ProviderError};
