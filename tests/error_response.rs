use std::error::Error;

use serde_json::json;
use twitter_oauth_v2::{AuthError, AuthErrorKind, HttpClientError, HttpResponse};

#[tokio::test]
async fn test_error_kinds_and_messages() {
    let cases = vec![
        (
            AuthError::InvalidState,
            AuthErrorKind::InvalidState,
            "Invalid or missing state parameter",
        ),
        (
            AuthError::MissingVerifier,
            AuthErrorKind::MissingVerifier,
            "Code verifier not found for this authorization attempt",
        ),
        (
            AuthError::NoRefreshToken,
            AuthErrorKind::NoRefreshToken,
            "Refresh token not available",
        ),
        (
            AuthError::ExpiredNoRefresh,
            AuthErrorKind::ExpiredNoRefresh,
            "OAuth token is expired and cannot be refreshed",
        ),
        (
            AuthError::NoCredentials,
            AuthErrorKind::NoCredentials,
            "No valid authentication method available",
        ),
        (
            AuthError::UnexpectedTokenType("mac".into()),
            AuthErrorKind::UnexpectedTokenType,
            "Unexpected token type: mac",
        ),
        (
            AuthError::ReservedParameter("state".into()),
            AuthErrorKind::ReservedParameter,
            "Parameter 'state' cannot be overridden",
        ),
        (
            AuthError::Transport(HttpClientError::Timeout),
            AuthErrorKind::Transport,
            "Transport error: Request timed out",
        ),
    ];

    for (err, expected_kind, expected_message) in cases {
        assert_eq!(err.kind(), expected_kind, "Kind for {:?}", err);
        assert_eq!(err.to_string(), expected_message, "Message for {:?}", err);
        assert_eq!(err.status(), None, "Status for {:?}", err);
    }
}

#[tokio::test]
async fn test_token_exchange_failure_carries_provider_error() {
    let response = HttpResponse::json(
        401,
        &json!({
            "error": "unauthorized_client",
            "error_description": "Missing valid authorization header"
        }),
    );
    let err = AuthError::token_exchange_failed(&response);
    assert_eq!(err.kind(), AuthErrorKind::TokenExchangeFailed);
    assert_eq!(err.status(), Some(401));
    assert!(!err.is_rate_limited());
    assert_eq!(
        err.to_string(),
        "Token request failed: HTTP 401 (unauthorized_client: Missing valid authorization header)"
    );
    let provider = err.provider_error().unwrap();
    assert_eq!(provider.error, "unauthorized_client");

    let plain = AuthError::token_exchange_failed(&HttpResponse::new(503, "upstream down"));
    assert_eq!(plain.to_string(), "Token request failed: HTTP 503");
    assert!(plain.provider_error().is_none());
    assert!(plain.source().is_none());
}

#[tokio::test]
async fn test_only_timeouts_and_connect_errors_are_transient() {
    assert!(AuthError::from(HttpClientError::Timeout).is_transient());
    assert!(AuthError::from(HttpClientError::Connect("reset".into())).is_transient());
    assert!(!AuthError::from(HttpClientError::Other("tls".into())).is_transient());
    assert!(!AuthError::token_exchange_failed(&HttpResponse::new(429, "")).is_transient());

    let err = AuthError::from(HttpClientError::Connect("reset".into()));
    assert_eq!(err.source().unwrap().to_string(), "Connection error: reset");
}
