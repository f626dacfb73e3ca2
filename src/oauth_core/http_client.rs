use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::url_encoding::parse_query;

/// HTTP methods used against the authorization server.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::GET => write!(f, "GET"),
            HttpMethod::POST => write!(f, "POST"),
        }
    }
}

/// Whether the transport may follow 3xx answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Return 3xx responses as they are.
    None,
    /// At most this many hops.
    Limit(u32),
}

/// Outgoing call to the token or revoke endpoint.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Sent in order; names are matched case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Form-encoded grant or revocation body.
    pub body: Option<Vec<u8>>,
    /// Overrides the transport's own timeout for this call.
    pub timeout: Option<Duration>,
    pub redirect_policy: RedirectPolicy,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Decodes an `application/x-www-form-urlencoded` body into pairs.
    pub fn form_params(&self) -> Vec<(String, String)> {
        match &self.body {
            Some(body) => parse_query(&String::from_utf8_lossy(body)),
            None => Vec::new(),
        }
    }

    /// First value of a form field in the body.
    pub fn form_param(&self, name: &str) -> Option<String> {
        self.form_params()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }
}

/// Status, headers and raw body of an endpoint answer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Builds a response with no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    /// Builds a JSON response, mostly useful for stubbing the token endpoint.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }

    /// Adds a header and returns the response.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Rate-limit headers reported by the API, if any are present.
    pub fn rate_limit(&self) -> Option<RateLimitInfo> {
        let read = |name: &str| self.header(name).and_then(|v| v.trim().parse::<u64>().ok());
        let info = RateLimitInfo {
            limit: read("x-rate-limit-limit"),
            remaining: read("x-rate-limit-remaining"),
            reset: read("x-rate-limit-reset"),
        };
        if info.limit.is_none() && info.remaining.is_none() && info.reset.is_none() {
            None
        } else {
            Some(info)
        }
    }
}

/// Values of the `x-rate-limit-*` response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Requests allowed in the current window.
    pub limit: Option<u64>,
    /// Requests left in the current window.
    pub remaining: Option<u64>,
    /// Unix timestamp at which the window resets.
    pub reset: Option<u64>,
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Transport-level failure. The request may never have reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpClientError {
    /// The request or connection timed out.
    Timeout,
    /// The connection could not be established or was reset.
    Connect(String),
    /// Anything else the transport reports.
    Other(String),
}

impl HttpClientError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, HttpClientError::Timeout | HttpClientError::Connect(_))
    }
}

impl fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "Request timed out"),
            Self::Connect(err) => write!(f, "Connection error: {}", err),
            Self::Other(err) => write!(f, "HTTP client error: {}", err),
        }
    }
}

impl std::error::Error for HttpClientError {}

/// Transport used for every call to the authorization server.
///
/// Implementations return `Ok` for any HTTP status; only failures to get a
/// response at all are `HttpClientError`s.
pub trait OAuthHttpClient: Send + Sync + Clone + 'static {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>>;
}

/// Scripted transport answering from per-URL responses, for tests.
///
/// Every executed request is recorded, so tests can assert on call counts and
/// inspect the form bodies that were sent.
#[derive(Clone, Default)]
pub struct InMemoryHttpClient {
    responses: Arc<DashMap<String, HttpResponse>>,
    failures: Arc<DashMap<String, HttpClientError>>,
    default_response: Option<HttpResponse>,
    requests: Arc<RwLock<Vec<HttpRequest>>>,
}

impl InMemoryHttpClient {
    /// Unknown URLs fail with `HttpClientError::Other`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unknown URLs get `response`.
    pub fn with_default(response: HttpResponse) -> Self {
        Self { default_response: Some(response), ..Self::default() }
    }

    /// Answer requests to `url` with `response`, replacing any earlier one.
    pub fn insert_response(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses.insert(url.into(), response);
    }

    /// Make every request to `url` fail at the transport level.
    pub fn insert_failure(&self, url: impl Into<String>, error: HttpClientError) {
        self.failures.insert(url.into(), error);
    }

    /// Drop a registered failure, so the URL answers normally again.
    pub fn clear_failure(&self, url: &str) {
        self.failures.remove(url);
    }

    /// All requests executed so far, oldest first.
    pub async fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().await.clone()
    }

    /// Number of requests executed so far.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Most recent request, if any.
    pub async fn last_request(&self) -> Option<HttpRequest> {
        self.requests.read().await.last().cloned()
    }
}

impl OAuthHttpClient for InMemoryHttpClient {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        let responses = self.responses.clone();
        let failures = self.failures.clone();
        let default = self.default_response.clone();
        let requests = self.requests.clone();
        Box::pin(async move {
            let url = request.url.clone();
            requests.write().await.push(request);
            if let Some(err) = failures.get(&url) {
                return Err(err.value().clone());
            }
            if let Some(entry) = responses.get(&url) {
                Ok(entry.value().clone())
            } else if let Some(resp) = default {
                Ok(resp)
            } else {
                Err(HttpClientError::Other(format!("no mock response for {}", url)))
            }
        })
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
mod reqwest_client {
    use super::*;
    use crate::oauth_core::config::ClientConfig;

    /// `OAuthHttpClient` backed by `reqwest`.
    ///
    /// Redirects are never followed; the token and revoke endpoints answer directly.
    #[derive(Clone)]
    pub struct ReqwestHttpClient {
        client: reqwest::Client,
    }

    impl ReqwestHttpClient {
        /// Builds a client using the timeouts and user agent of `config`.
        pub fn new(config: &ClientConfig) -> Result<Self, HttpClientError> {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .connect_timeout(config.connect_timeout)
                .timeout(config.timeout)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(|e| HttpClientError::Other(e.to_string()))?;
            Ok(Self { client })
        }

        /// Wraps an already configured `reqwest::Client`.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    fn map_error(err: reqwest::Error) -> HttpClientError {
        if err.is_timeout() {
            HttpClientError::Timeout
        } else if err.is_connect() {
            HttpClientError::Connect(err.to_string())
        } else {
            HttpClientError::Other(err.to_string())
        }
    }

    impl OAuthHttpClient for ReqwestHttpClient {
        fn execute(
            &self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
            let client = self.client.clone();
            Box::pin(async move {
                let method = match request.method {
                    HttpMethod::GET => reqwest::Method::GET,
                    HttpMethod::POST => reqwest::Method::POST,
                };
                let mut builder = client.request(method, &request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                if let Some(timeout) = request.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(body) = request.body {
                    builder = builder.body(body);
                }
                let response = builder.send().await.map_err(map_error)?;
                let status = response.status().as_u16();
                let headers = response
                    .headers()
                    .iter()
                    .map(|(k, v)| {
                        (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string())
                    })
                    .collect();
                let body = response.bytes().await.map_err(map_error)?.to_vec();
                Ok(HttpResponse { status, headers, body })
            })
        }
    }
}
