//! HTTP client implementation.

use crate::request::Request;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// HTTP client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("HTTP client timed out")]
    Timeout,
    #[error("Request error: {0}")]
    Request(String),
    #[error("Response error: {0}")]
    Response(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else {
            ClientError::Request(err.to_string())
        }
    }
}

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Overall limit reqwest applies to exchanges without their own deadline.
    /// Hitting it is a network failure, not a request timeout. `None` means
    /// no limit.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: u32,
    /// User agent string.
    pub user_agent: String,
    /// Accept header.
    pub accept: String,
    /// Base URL relative form actions are resolved against.
    pub base_url: Option<Url>,
    /// Keep session cookies between requests.
    pub store_cookies: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_redirects: 20,
            user_agent: format!("FacesClient/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            base_url: None,
            store_cookies: true,
        }
    }
}

/// HTTP client shared by all transports of a page session.
pub struct HttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ClientError::InvalidHeader(config.user_agent.clone()))?,
        );
        headers.insert(
            reqwest::header::ACCEPT,
            config
                .accept
                .parse()
                .map_err(|_| ClientError::InvalidHeader(config.accept.clone()))?,
        );

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let inner = builder
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .default_headers(headers)
            .cookie_store(config.store_cookies)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self { inner, config })
    }

    /// Resolve a possibly relative target against the configured base URL.
    pub fn resolve(&self, target: &str) -> Result<Url, ClientError> {
        Url::options()
            .base_url(self.config.base_url.as_ref())
            .parse(target)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", target, e)))
    }

    /// Send a request and return once the response head has arrived.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    pub(crate) async fn send(&self, request: Request) -> Result<reqwest::Response, ClientError> {
        let mut req_builder = self.inner.request(request.method.clone(), request.url.clone());

        for (name, value) in request.headers.iter() {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        tracing::debug!(method = %request.method, url = %request.url, "Executing request");

        Ok(req_builder.send().await?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// HTTP client builder.
pub struct HttpClientBuilder {
    config: ClientConfig,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the overall exchange limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set maximum redirects.
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Set user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the base URL for relative targets.
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    /// Enable or disable cookie storage.
    pub fn store_cookies(mut self, enabled: bool) -> Self {
        self.config.store_cookies = enabled;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, ClientError> {
        HttpClient::with_config(self.config)
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
