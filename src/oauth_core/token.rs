//! Token value objects built from token endpoint responses.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::http_client::HttpResponse;
use super::types::AuthError;

/// Raw token endpoint body (RFC 6749 §5.1).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Checks status, JSON shape and token type of a token endpoint response.
    ///
    /// Non-2xx yields `TokenExchangeFailed`, missing `token_type` or
    /// `access_token` yields `MalformedResponse`, and anything but a
    /// (case-insensitive) `bearer` type yields `UnexpectedTokenType`.
    pub fn parse(response: &HttpResponse) -> Result<Self, AuthError> {
        if !response.is_success() {
            return Err(AuthError::token_exchange_failed(response));
        }
        let parsed: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            AuthError::MalformedResponse(format!("body is not a token document: {}", e))
        })?;
        let token_type = match parsed.token_type.as_deref() {
            Some(t) if parsed.access_token.as_deref().is_some_and(|a| !a.is_empty()) => t,
            Some(_) => return Err(AuthError::MalformedResponse("missing access_token".into())),
            None => return Err(AuthError::MalformedResponse("missing token_type".into())),
        };
        if !token_type.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::UnexpectedTokenType(token_type.to_string()));
        }
        if let Some(secs) = parsed.expires_in {
            if secs < 0 || expiry_after(Utc::now(), secs).is_none() {
                let msg = format!("expires_in out of range: {}", secs);
                return Err(AuthError::MalformedResponse(msg));
            }
        }
        Ok(parsed)
    }

    fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// `issued_at + secs`, or `None` when the deadline is not representable.
fn expiry_after(issued_at: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|lifetime| issued_at.checked_add_signed(lifetime))
}

/// App-only bearer token. The provider reports no expiry for these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    token: Option<String>,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Replaces the token value (rotation).
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// `Bearer <token>`, or `None` when no token is set.
    pub fn authorization_header(&self) -> Option<String> {
        if !self.has_token() {
            return None;
        }
        self.token.as_deref().map(|t| format!("Bearer {}", t))
    }

    /// Builds a bearer token from a `client_credentials` response.
    pub fn from_response(response: &HttpResponse) -> Result<Self, AuthError> {
        let parsed = TokenResponse::parse(response)?;
        Ok(Self { token: parsed.access_token })
    }
}

/// User-context OAuth 2.0 token.
///
/// `expires_at` is computed once, at construction, from the provider's
/// `expires_in`; it is serialized as an absolute time so a reloaded token
/// keeps its original deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    scopes: Vec<String>,
}

impl OAuthToken {
    /// Creates a token, capturing the current time for the expiry deadline.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self::issued_at(Utc::now(), access_token, refresh_token, expires_in, scopes)
    }

    /// Creates a token as if it had been issued at `issued_at`.
    ///
    /// A lifetime too large to represent leaves the token without an expiry.
    pub fn issued_at(
        issued_at: DateTime<Utc>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in.and_then(|secs| expiry_after(issued_at, secs)),
            scopes,
        }
    }

    /// Builds a user token from an `authorization_code` or `refresh_token` response.
    pub fn from_response(response: &HttpResponse) -> Result<Self, AuthError> {
        let parsed = TokenResponse::parse(response)?;
        let scopes = parsed.scopes();
        Ok(Self::new(
            parsed.access_token.unwrap_or_default(),
            parsed.refresh_token.filter(|t| !t.is_empty()),
            parsed.expires_in,
            scopes,
        ))
    }

    /// Same token, carrying `refresh_token` if it has none of its own.
    ///
    /// Providers that do not rotate refresh tokens omit them from refresh responses.
    pub fn or_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        if !self.has_refresh_token() {
            self.refresh_token = Some(refresh_token.into());
        }
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// True if an expiry is set and it is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// True if the token expires within `threshold` from now.
    pub fn expires_soon(&self, threshold: Duration) -> bool {
        self.expires_at.is_some_and(|at| at - Utc::now() < threshold)
    }

    /// Remaining lifetime; negative once expired, `None` without an expiry.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_at.map(|at| at - Utc::now())
    }

    /// `Bearer <access token>`, or `None` when the access token is empty.
    pub fn authorization_header(&self) -> Option<String> {
        self.has_access_token().then(|| format!("Bearer {}", self.access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expiry_is_fixed_at_construction() {
        let now = Utc::now();
        let token = OAuthToken::issued_at(now, "a", Some("b".into()), Some(3600), vec!["x".into()]);
        assert_eq!(token.expires_at(), Some(now + Duration::seconds(3600)));
        assert!(!token.is_expired_at(now));
        assert!(!token.is_expired_at(now + Duration::seconds(3599)));
        assert!(token.is_expired_at(now + Duration::seconds(3600)));
        assert!(token.is_expired_at(now + Duration::seconds(3601)));
    }

    #[test]
    fn fresh_token_is_not_expired_until_clock_moves() {
        let token = OAuthToken::new("a", Some("b".into()), Some(3600), vec!["x".into()]);
        assert!(!token.is_expired());
        assert!(token.is_expired_at(Utc::now() + Duration::seconds(3601)));
    }

    #[test]
    fn token_without_expiry_never_expires() {
        let token = OAuthToken::new("a", None, None, Vec::new());
        assert!(!token.is_expired_at(Utc::now() + Duration::days(3650)));
        assert!(token.expires_in().is_none());
    }

    #[test]
    fn empty_values_do_not_count() {
        let token = OAuthToken::new("", Some(String::new()), None, Vec::new());
        assert!(!token.has_access_token());
        assert!(!token.has_refresh_token());
        assert!(token.authorization_header().is_none());
        assert!(!BearerToken::new("").has_token());
        assert!(BearerToken::default().authorization_header().is_none());
    }

    #[test]
    fn parses_scopes_and_optional_fields() {
        let resp = HttpResponse::json(
            200,
            &json!({
                "access_token": "AT1",
                "token_type": "Bearer",
                "scope": "read write",
                "expires_in": 7200
            }),
        );
        let token = OAuthToken::from_response(&resp).unwrap();
        assert_eq!(token.access_token(), "AT1");
        assert_eq!(token.scopes(), ["read".to_string(), "write".to_string()]);
        assert!(token.has_scope("write"));
        assert!(token.refresh_token().is_none());
        assert!(!token.is_expired());
        assert_eq!(token.authorization_header().as_deref(), Some("Bearer AT1"));
    }

    #[test]
    fn missing_scope_gives_empty_list() {
        let resp = HttpResponse::json(200, &json!({"access_token": "AT1", "token_type": "bearer"}));
        let token = OAuthToken::from_response(&resp).unwrap();
        assert!(token.scopes().is_empty());
        assert!(token.expires_at().is_none());
    }

    #[test]
    fn rejects_non_bearer_token_type() {
        let resp = HttpResponse::json(200, &json!({"access_token": "AT1", "token_type": "mac"}));
        let err = OAuthToken::from_response(&resp).unwrap_err();
        assert!(matches!(err, AuthError::UnexpectedTokenType(ref t) if t == "mac"));
        let err = BearerToken::from_response(&resp).unwrap_err();
        assert!(matches!(err, AuthError::UnexpectedTokenType(_)));
    }

    #[test]
    fn rejects_missing_fields_and_bad_json() {
        let no_type = HttpResponse::json(200, &json!({"access_token": "AT1"}));
        let err = OAuthToken::from_response(&no_type).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
        let no_token = HttpResponse::json(200, &json!({"token_type": "bearer"}));
        let err = BearerToken::from_response(&no_token).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
        let garbage = HttpResponse::new(200, "<html>");
        let err = OAuthToken::from_response(&garbage).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_unrepresentable_or_negative_lifetime() {
        for expires_in in [json!(i64::MAX), json!(9_000_000_000_000_000_i64), json!(-1)] {
            let resp = HttpResponse::json(
                200,
                &json!({"token_type": "bearer", "access_token": "AT", "expires_in": expires_in}),
            );
            let err = OAuthToken::from_response(&resp).unwrap_err();
            assert!(matches!(err, AuthError::MalformedResponse(_)), "accepted {expires_in}");
        }
    }

    #[test]
    fn oversized_lifetime_in_constructor_does_not_panic() {
        let token = OAuthToken::new("a", None, Some(i64::MAX), vec![]);
        assert!(token.expires_at().is_none());
        assert!(!token.is_expired());
    }

    #[test]
    fn non_success_keeps_status_and_body() {
        let resp = HttpResponse::json(400, &json!({"error": "invalid_request"}));
        match BearerToken::from_response(&resp).unwrap_err() {
            AuthError::TokenExchangeFailed { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_request"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn serialized_token_keeps_deadline() {
        let issued = Utc::now() - Duration::seconds(10);
        let token = OAuthToken::issued_at(issued, "a", None, Some(5), vec![]);
        let json = serde_json::to_string(&token).unwrap();
        let back: OAuthToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        assert!(back.is_expired());
    }

    #[test]
    fn refresh_token_is_carried_only_when_missing() {
        let rotated =
            OAuthToken::new("a", Some("new".into()), None, vec![]).or_refresh_token("old");
        assert_eq!(rotated.refresh_token(), Some("new"));
        let kept = OAuthToken::new("a", None, None, vec![]).or_refresh_token("old");
        assert_eq!(kept.refresh_token(), Some("old"));
    }
}
