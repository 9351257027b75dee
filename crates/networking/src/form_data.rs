//! Form payloads for partial requests.
//!
//! A [`FormDataPayload`] collects name/value pairs (and file parts) in submit
//! order. It is finalized exactly once into an immutable [`FinalizedPayload`]
//! right before transmission.

use crate::headers::content_type;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use url::form_urlencoded;

static BOUNDARY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A binary part, only transmitted by multipart payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryPart {
    pub name: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Ordered form entries plus optional binary parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormDataPayload {
    entries: Vec<(String, String)>,
    parts: Vec<BinaryPart>,
}

/// The encoded body and the content type header that goes with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedPayload {
    pub body: Bytes,
    pub content_type: String,
}

impl FormDataPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a payload from existing entries.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            parts: Vec::new(),
        }
    }

    /// Append a name/value pair. Duplicate names are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Append a file part.
    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) {
        self.parts.push(BinaryPart {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        });
    }

    /// Whether an entry or part with this name exists.
    pub fn has_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name) || self.parts.iter().any(|p| p.name == name)
    }

    /// First value for a name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn parts(&self) -> &[BinaryPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.parts.is_empty()
    }

    /// Entries as an `application/x-www-form-urlencoded` string.
    pub fn to_urlencoded(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.entries {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }

    /// Encode the payload for the given base content type.
    ///
    /// Multipart content types get a fresh boundary; anything else is sent
    /// urlencoded with a utf-8 charset, in which case file parts are skipped.
    pub fn finalize(self, base_content_type: &str) -> FinalizedPayload {
        if content_type::is_multipart(base_content_type) {
            let boundary = new_boundary();
            let body = self.to_multipart(&boundary);
            return FinalizedPayload {
                body,
                content_type: format!("{}; boundary={}", content_type::MULTIPART, boundary),
            };
        }

        if !self.parts.is_empty() {
            tracing::debug!(
                parts = self.parts.len(),
                "Skipping file parts in urlencoded payload"
            );
        }

        FinalizedPayload {
            body: Bytes::from(self.to_urlencoded()),
            content_type: format!("{}{}", base_content_type, content_type::UTF8_SUFFIX),
        }
    }

    fn to_multipart(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();

        for (name, value) in &self.entries {
            put_str(&mut buf, &format!("--{}\r\n", boundary));
            put_str(
                &mut buf,
                &format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    escape_quoted(name)
                ),
            );
            put_str(&mut buf, value);
            put_str(&mut buf, "\r\n");
        }

        for part in &self.parts {
            put_str(&mut buf, &format!("--{}\r\n", boundary));
            put_str(
                &mut buf,
                &format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    escape_quoted(&part.name),
                    escape_quoted(&part.file_name)
                ),
            );
            put_str(&mut buf, &format!("Content-Type: {}\r\n\r\n", part.content_type));
            buf.put_slice(&part.data);
            put_str(&mut buf, "\r\n");
        }

        put_str(&mut buf, &format!("--{}--\r\n", boundary));
        buf.freeze()
    }
}

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_slice(s.as_bytes());
}

// Same escaping browsers apply to multipart field names.
fn escape_quoted(value: &str) -> String {
    value
        .replace('\r', "%0D")
        .replace('\n', "%0A")
        .replace('"', "%22")
}

fn new_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("----FacesFormBoundary{:016x}{:04x}", nanos, seq & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoded_preserves_order_and_escapes() {
        let mut payload = FormDataPayload::new();
        payload.append("form:name", "Jane Doe");
        payload.append("jakarta.faces.ViewState", "a+b/c");

        assert_eq!(
            payload.to_urlencoded(),
            "form%3Aname=Jane+Doe&jakarta.faces.ViewState=a%2Bb%2Fc"
        );
    }

    #[test]
    fn test_finalize_urlencoded_sets_charset() {
        let payload = FormDataPayload::from_entries([("a", "1")]);
        let finalized = payload.finalize(content_type::FORM);

        assert_eq!(
            finalized.content_type,
            "application/x-www-form-urlencoded; charset=utf-8"
        );
        assert_eq!(&finalized.body[..], b"a=1");
    }

    #[test]
    fn test_finalize_multipart_includes_files() {
        let mut payload = FormDataPayload::from_entries([("title", "report")]);
        payload.append_file("upload", "data.csv", "text/csv", &b"x,y\n1,2\n"[..]);

        let finalized = payload.finalize(content_type::MULTIPART);
        let boundary = finalized
            .content_type
            .split("boundary=")
            .nth(1)
            .unwrap()
            .to_string();
        let body = String::from_utf8(finalized.body.to_vec()).unwrap();

        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.contains("name=\"title\"\r\n\r\nreport\r\n"));
        assert!(body.contains("filename=\"data.csv\""));
        assert!(body.contains("Content-Type: text/csv\r\n\r\nx,y\n1,2\n\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn test_has_key_and_get() {
        let mut payload = FormDataPayload::new();
        payload.append("a", "1");
        payload.append("a", "2");
        payload.append_file("f", "x.bin", "application/octet-stream", vec![0u8, 1]);

        assert!(payload.has_key("a"));
        assert!(payload.has_key("f"));
        assert_eq!(payload.get("a"), Some("1"));
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn test_boundaries_differ() {
        assert_ne!(new_boundary(), new_boundary());
    }
}
