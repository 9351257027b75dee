//! HTTP header handling.

use indexmap::IndexMap;

/// HTTP header map (case-insensitive keys, order-preserving).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: IndexMap<String, String>,
}

impl HeaderMap {
    /// Create a new empty header map.
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.insert(name, value.into());
    }

    /// Get a header value.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.headers.iter()
    }

    /// Get Content-Type header.
    pub fn content_type(&self) -> Option<&String> {
        self.get(names::CONTENT_TYPE)
    }
}

/// Header names used by partial requests.
pub mod names {
    pub const CONTENT_TYPE: &str = "content-type";
    pub const FACES_REQUEST: &str = "faces-request";
}

/// Content type utilities.
pub mod content_type {
    pub const FORM: &str = "application/x-www-form-urlencoded";
    pub const MULTIPART: &str = "multipart/form-data";

    /// Charset suffix applied to textual request bodies.
    pub const UTF8_SUFFIX: &str = "; charset=utf-8";

    /// Check if content type is multipart.
    pub fn is_multipart(content_type: &str) -> bool {
        content_type.trim_start().to_ascii_lowercase().starts_with(MULTIPART)
    }
}
