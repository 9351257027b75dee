//! Raw HTTP response handed to the response dispatcher.

use crate::client::ClientError;
use crate::headers::HeaderMap;
use bytes::Bytes;
use encoding_rs::Encoding;
use http::StatusCode;
use mime::Mime;
use url::Url;

/// A completed HTTP exchange: status line, headers and the full body.
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// Response status code.
    pub status: StatusCode,
    /// Reason phrase as sent by the server, or the canonical one.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL (after redirects).
    pub url: Option<Url>,
    /// Response body.
    body: Bytes,
    /// Content type.
    content_type: Option<Mime>,
}

impl RawResponse {
    /// Create a response from parts, used by transports that do not go through reqwest.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        let content_type = headers.content_type().and_then(|s| s.parse().ok());
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            url: None,
            body: body.into(),
            content_type,
        }
    }

    /// Create a response from a reqwest response, reading the whole body.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let url = response.url().clone();
        let status_text = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_string(), v.to_string());
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout
                } else {
                    ClientError::Response(e.to_string())
                }
            })?;

        Ok(Self {
            status,
            status_text,
            headers,
            url: Some(url),
            body,
            content_type,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// Body bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as text, honoring the charset parameter and BOMs.
    pub fn text(&self) -> String {
        let encoding = self.detect_encoding();
        let (text, _, _) = encoding.decode(&self.body);
        text.into_owned()
    }

    fn detect_encoding(&self) -> &'static Encoding {
        if let Some(mime) = &self.content_type {
            if let Some(charset) = mime.get_param("charset") {
                if let Some(encoding) = Encoding::for_label(charset.as_str().as_bytes()) {
                    return encoding;
                }
            }
        }

        if let Some((encoding, _)) = Encoding::for_bom(&self.body) {
            return encoding;
        }

        encoding_rs::UTF_8
    }
}
