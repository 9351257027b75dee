//! Networking layer for partial requests.
//!
//! This crate handles:
//! - HTTP requests through a shared reqwest client
//! - Form payload encoding (urlencoded and multipart)
//! - Raw response handling
//! - The callback-driven transport used by the ajax request lifecycle

pub mod client;
pub mod form_data;
pub mod headers;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{ClientConfig, ClientError, HttpClient, HttpClientBuilder};
pub use form_data::{FinalizedPayload, FormDataPayload};
pub use headers::HeaderMap;
pub use request::Request;
pub use response::RawResponse;
pub use transport::{
    HttpTransport, HttpTransportFactory, Transport, TransportError, TransportFactory,
    TransportFailure, TransportHandler,
};
