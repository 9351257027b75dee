//! Callback-driven transport for a single HTTP exchange.
//!
//! A [`Transport`] is armed with `open`, `set_header` and `set_timeout`, then
//! `send` starts the exchange. Completion is reported through a
//! [`TransportHandler`]: exactly one of `on_success`, `on_error` or
//! `on_timeout`, always followed by `on_done`.

use crate::client::HttpClient;
use crate::request::Request;
use crate::response::RawResponse;
use bytes::Bytes;
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors raised while arming or starting a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(Method),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Transport is not open")]
    NotOpen,
    #[error("No async runtime to drive the exchange")]
    NoRuntime,
}

/// A failed exchange as seen by the transport.
///
/// Network-level failures carry neither status nor status text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportFailure {
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub detail: Option<String>,
}

impl TransportFailure {
    /// A failure reported by the server through its status line.
    pub fn http(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            status_text: Some(status_text.into()),
            detail: None,
        }
    }

    /// A failure below HTTP: refused connection, reset, DNS.
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            status_text: None,
            detail: Some(detail.into()),
        }
    }
}

/// Receives the raw callbacks of one exchange.
pub trait TransportHandler: Send + Sync {
    /// The response head arrived.
    fn on_progress(&self) {}

    fn on_success(&self, response: RawResponse);

    fn on_error(&self, failure: TransportFailure);

    fn on_timeout(&self);

    /// Fires after the terminal callback, even if it panicked.
    fn on_done(&self);
}

/// One asynchronous HTTP exchange.
pub trait Transport: Send {
    /// Set method and target. Only GET and POST are accepted.
    fn open(&mut self, method: Method, url: &str) -> Result<(), TransportError>;

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError>;

    /// `None` disables the timeout.
    fn set_timeout(&mut self, timeout: Option<Duration>);

    /// Start the exchange. Callbacks may fire before this returns.
    fn send(
        &mut self,
        body: Option<Bytes>,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<(), TransportError>;

    /// Abandon the exchange; no callbacks fire for data arriving afterwards.
    fn abort(&mut self);
}

/// Creates a fresh transport for every send.
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Box<dyn Transport>;
}

/// Headroom between the transport deadline and reqwest's own limit, so the
/// deadline always wins.
const CLIENT_LIMIT_SLACK: Duration = Duration::from_secs(1);

/// Fires `on_done` when dropped, so cleanup survives a panicking callback.
struct DoneGuard(Arc<dyn TransportHandler>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.on_done();
    }
}

/// Transport backed by the shared reqwest client, driven on the tokio runtime.
pub struct HttpTransport {
    client: Arc<HttpClient>,
    request: Option<Request>,
    timeout: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl HttpTransport {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            request: None,
            timeout: None,
            task: None,
        }
    }
}

impl Transport for HttpTransport {
    fn open(&mut self, method: Method, url: &str) -> Result<(), TransportError> {
        if method != Method::GET && method != Method::POST {
            return Err(TransportError::UnsupportedMethod(method));
        }
        let url = self
            .client
            .resolve(url)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        self.request = Some(Request::new(method, url));
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        let request = self.request.as_mut().ok_or(TransportError::NotOpen)?;
        request.headers.insert(name, value);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout.filter(|t| !t.is_zero());
    }

    fn send(
        &mut self,
        body: Option<Bytes>,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let mut request = self.request.take().ok_or(TransportError::NotOpen)?;
        if let Some(body) = body {
            request.body = Some(body);
        }
        // Replaces any shorter client-wide limit for this exchange.
        request.timeout = self.timeout.map(|limit| limit + CLIENT_LIMIT_SLACK);

        let client = self.client.clone();
        let timeout = self.timeout;
        self.task = Some(runtime.spawn(run_exchange(client, request, timeout, handler)));
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_exchange(
    client: Arc<HttpClient>,
    request: Request,
    timeout: Option<Duration>,
    handler: Arc<dyn TransportHandler>,
) {
    let _done = DoneGuard(handler.clone());

    let exchange = async {
        let response = client.send(request).await?;
        handler.on_progress();
        RawResponse::from_reqwest(response).await
    };

    // Only the transport's own deadline counts as a timeout. A reqwest-level
    // timeout is a network failure.
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(?limit, "Exchange deadline elapsed");
                handler.on_timeout();
                return;
            }
        },
        None => exchange.await,
    };

    match result {
        Ok(response) if response.is_success() => handler.on_success(response),
        Ok(response) => {
            let failure = TransportFailure::http(response.status.as_u16(), response.status_text.clone());
            handler.on_error(failure);
        }
        Err(err) => {
            tracing::warn!(error = %err, "Exchange failed below HTTP");
            handler.on_error(TransportFailure::network(err.to_string()));
        }
    }
}

/// Factory handing out [`HttpTransport`]s sharing one client.
#[derive(Clone)]
pub struct HttpTransportFactory {
    client: Arc<HttpClient>,
}

impl HttpTransportFactory {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(HttpTransport::new(self.client.clone()))
    }
}
