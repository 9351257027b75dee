//! Request and queue configuration.

use networking::headers::content_type;
use std::time::Duration;
use thiserror::Error;

/// HTTP method of a partial request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AjaxMethod {
    Get,
    #[default]
    Post,
}

impl AjaxMethod {
    pub fn as_http(&self) -> http::Method {
        match self {
            AjaxMethod::Get => http::Method::GET,
            AjaxMethod::Post => http::Method::POST,
        }
    }

    /// Parse a method name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Some(AjaxMethod::Get),
            "POST" => Some(AjaxMethod::Post),
            _ => None,
        }
    }
}

/// Invalid per-request configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GET requests cannot carry a multipart payload")]
    MultipartGet,
    #[error("Content type must not be empty")]
    EmptyContentType,
    #[error("Partial id list contains an empty id")]
    EmptyPartialId,
}

/// Per-request configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestConfig {
    /// Abandon the request after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// HTTP method.
    pub method: AjaxMethod,
    /// Base content type, without charset or boundary.
    pub content_type: String,
    /// Pending bound the queue adopts when this request is enqueued.
    pub queue_size: Option<usize>,
    /// Ids to submit instead of the whole form.
    pub partial_ids: Option<Vec<String>>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            method: AjaxMethod::Post,
            content_type: content_type::FORM.to_string(),
            queue_size: None,
            partial_ids: None,
        }
    }
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeout in milliseconds; `0` disables it.
    pub fn with_timeout_ms(mut self, millis: u64) -> Self {
        self.timeout = (millis > 0).then(|| Duration::from_millis(millis));
        self
    }

    pub fn with_method(mut self, method: AjaxMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn multipart(self) -> Self {
        self.with_content_type(content_type::MULTIPART)
    }

    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = Some(size);
        self
    }

    pub fn with_partial_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partial_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// The partial ids, if any. An empty list means a full submit.
    pub fn partial_ids(&self) -> Option<&[String]> {
        self.partial_ids.as_deref().filter(|ids| !ids.is_empty())
    }

    pub fn is_multipart(&self) -> bool {
        content_type::is_multipart(&self.content_type)
    }

    /// Check the combination of settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_type.trim().is_empty() {
            return Err(ConfigError::EmptyContentType);
        }
        if self.method == AjaxMethod::Get && self.is_multipart() {
            return Err(ConfigError::MultipartGet);
        }
        if let Some(ids) = &self.partial_ids {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ConfigError::EmptyPartialId);
            }
        }
        Ok(())
    }
}

/// What the queue does with a request that arrives while it is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the incoming request; it is never sent.
    #[default]
    RejectNewest,
    /// Evict the oldest pending request to make room.
    DropOldest,
}

/// Queue configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of requests held, the active one included. `None` is unbounded.
    pub max_size: Option<usize>,
    pub overflow: OverflowPolicy,
}

impl QueueConfig {
    pub fn bounded(max_size: usize) -> Self {
        Self {
            max_size: Some(max_size),
            ..Self::default()
        }
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }
}
