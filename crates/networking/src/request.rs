//! Outbound HTTP request.

use crate::headers::HeaderMap;
use bytes::Bytes;
use http::Method;
use std::time::Duration;
use url::Url;

/// An HTTP request ready to be sent by the client.
#[derive(Clone, Debug)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
    /// Client-level timeout for this request, overriding the client default.
    pub timeout: Option<Duration>,
}

impl Request {
    /// Create a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}
