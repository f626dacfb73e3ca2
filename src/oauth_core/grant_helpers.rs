//! Form bodies and client authentication for token and revoke requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::config::{ClientAuthMethod, ClientConfig};
use super::http_client::{HttpMethod, HttpRequest, RedirectPolicy};
use super::types::AuthError;
use crate::url_encoding::build_query;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Grants sent to the token endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
        code_verifier: &'a str,
    },
    RefreshToken {
        refresh_token: &'a str,
    },
    /// App-only token; the client is identified by its credentials alone.
    ClientCredentials,
}

impl Grant<'_> {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::AuthorizationCode { .. } => "authorization_code",
            Grant::RefreshToken { .. } => "refresh_token",
            Grant::ClientCredentials => "client_credentials",
        }
    }

    fn identifies_client(&self) -> bool {
        !matches!(self, Grant::ClientCredentials)
    }
}

/// A form-encoded POST to the token or revoke endpoint, before client
/// authentication is applied.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    url: String,
    form: Vec<(String, String)>,
}

impl TokenRequest {
    /// Token endpoint request for `grant`.
    ///
    /// User grants carry `client_id` in the body whatever the auth method;
    /// `client_credentials` sends only `grant_type`.
    pub fn grant(config: &ClientConfig, grant: Grant<'_>) -> Self {
        let request =
            Self::new(&config.endpoints.token_url).param("grant_type", grant.grant_type());
        let request = match grant {
            Grant::AuthorizationCode { code, redirect_uri, code_verifier } => request
                .param("code", code)
                .param("redirect_uri", redirect_uri)
                .param("code_verifier", code_verifier),
            Grant::RefreshToken { refresh_token } => request.param("refresh_token", refresh_token),
            Grant::ClientCredentials => request,
        };
        if grant.identifies_client() {
            request.param("client_id", &config.client_id)
        } else {
            request
        }
    }

    /// Revoke endpoint request (RFC 7009).
    pub fn revocation(config: &ClientConfig, token: &str, token_type_hint: Option<&str>) -> Self {
        let request = Self::new(&config.endpoints.revoke_url).param("token", token);
        let request = match token_type_hint {
            Some(hint) => request.param("token_type_hint", hint),
            None => request,
        };
        request.param("client_id", &config.client_id)
    }

    fn new(url: &str) -> Self {
        Self { url: url.to_string(), form: Vec::new() }
    }

    /// Appends a form field.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    fn has_param(&self, name: &str) -> bool {
        self.form.iter().any(|(k, _)| k == name)
    }

    /// Applies client authentication plus the configured headers and timeout.
    ///
    /// Fails with `Configuration` when the auth method needs a secret that is not set.
    pub fn into_http_request(mut self, config: &ClientConfig) -> Result<HttpRequest, AuthError> {
        let mut headers = vec![
            ("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        match config.client_auth {
            ClientAuthMethod::Basic => {
                let secret = require_secret(config)?;
                let credentials = format!("{}:{}", config.client_id, secret);
                let header = format!("Basic {}", STANDARD.encode(credentials));
                headers.push(("Authorization".to_string(), header));
            }
            ClientAuthMethod::RequestBody => {
                let secret = require_secret(config)?.to_string();
                if !self.has_param("client_id") {
                    self = self.param("client_id", &config.client_id);
                }
                self = self.param("client_secret", secret);
            }
            ClientAuthMethod::None => {
                if !self.has_param("client_id") {
                    self = self.param("client_id", &config.client_id);
                }
            }
        }
        headers.push(("User-Agent".to_string(), config.user_agent.clone()));
        headers.extend(config.headers.iter().cloned());
        Ok(HttpRequest {
            method: HttpMethod::POST,
            url: self.url,
            headers,
            body: Some(build_query(&self.form).into_bytes()),
            timeout: Some(config.timeout),
            redirect_policy: RedirectPolicy::None,
        })
    }
}

fn require_secret(config: &ClientConfig) -> Result<&str, AuthError> {
    config.client_secret.as_deref().ok_or_else(|| {
        AuthError::Configuration("client_secret is required for client authentication".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confidential() -> ClientConfig {
        ClientConfig::new("cid", "https://app.local/cb").with_client_secret("csecret")
    }

    #[test]
    fn authorization_code_body_and_basic_header() {
        let grant = Grant::AuthorizationCode {
            code: "C1",
            redirect_uri: "https://app.local/cb",
            code_verifier: "V1",
        };
        let request = TokenRequest::grant(&confidential(), grant)
            .into_http_request(&confidential())
            .unwrap();
        assert_eq!(request.url, "https://api.twitter.com/2/oauth2/token");
        assert_eq!(request.method, HttpMethod::POST);
        assert_eq!(request.redirect_policy, RedirectPolicy::None);
        assert_eq!(request.header("content-type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(request.header("authorization"), Some("Basic Y2lkOmNzZWNyZXQ="));
        assert_eq!(request.form_param("grant_type").as_deref(), Some("authorization_code"));
        assert_eq!(request.form_param("code").as_deref(), Some("C1"));
        assert_eq!(request.form_param("redirect_uri").as_deref(), Some("https://app.local/cb"));
        assert_eq!(request.form_param("code_verifier").as_deref(), Some("V1"));
        assert_eq!(request.form_param("client_id").as_deref(), Some("cid"));
        assert!(request.form_param("client_secret").is_none());
    }

    #[test]
    fn client_credentials_sends_only_grant_type() {
        let config = confidential();
        let request = TokenRequest::grant(&config, Grant::ClientCredentials)
            .into_http_request(&config)
            .unwrap();
        assert_eq!(
            request.form_params(),
            vec![("grant_type".to_string(), "client_credentials".to_string())]
        );
        assert!(request.header("authorization").is_some());
    }

    #[test]
    fn request_body_auth_moves_secret_into_form() {
        let config = confidential().with_client_auth(ClientAuthMethod::RequestBody);
        let request = TokenRequest::grant(&config, Grant::RefreshToken { refresh_token: "R1" })
            .into_http_request(&config)
            .unwrap();
        assert!(request.header("authorization").is_none());
        assert_eq!(request.form_param("client_secret").as_deref(), Some("csecret"));
        let ids = request.form_params().into_iter().filter(|(k, _)| k == "client_id").count();
        assert_eq!(ids, 1);
    }

    #[test]
    fn basic_auth_without_secret_is_a_configuration_error() {
        let config = ClientConfig::new("cid", "https://app.local/cb")
            .with_client_auth(ClientAuthMethod::Basic);
        let err = TokenRequest::grant(&config, Grant::ClientCredentials)
            .into_http_request(&config)
            .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn revocation_carries_hint_and_config_headers() {
        let config = confidential().with_header("X-Trace", "t1").with_user_agent("ua/1");
        let request = TokenRequest::revocation(&config, "AT1", Some("access_token"))
            .into_http_request(&config)
            .unwrap();
        assert_eq!(request.url, "https://api.twitter.com/2/oauth2/revoke");
        assert_eq!(request.form_param("token").as_deref(), Some("AT1"));
        assert_eq!(request.form_param("token_type_hint").as_deref(), Some("access_token"));
        assert_eq!(request.header("x-trace"), Some("t1"));
        assert_eq!(request.header("user-agent"), Some("ua/1"));
        assert_eq!(request.timeout, Some(config.timeout));
    }
}
