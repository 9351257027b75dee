//! Partial-page ajax requests.
//!
//! This crate drives the request side of server-driven partial updates:
//! - Request configuration and caller context
//! - Form payload assembly (full and partial submits)
//! - The per-request lifecycle (begin, complete, timeout, error)
//! - A single-flight FIFO queue serializing requests of one page

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod form_data;
pub mod queue;
pub mod request;
pub mod services;

#[cfg(test)]
mod testing;

pub use config::{AjaxMethod, ConfigError, OverflowPolicy, QueueConfig, RequestConfig};
pub use context::RequestContext;
pub use error::{AjaxError, ErrorKind, ErrorReport, ErrorReporter, LoggingErrorReporter};
pub use events::{EventSink, LifecycleEvent, LifecycleEventKind, LoggingEventSink};
pub use form_data::{DomFormData, FormDataEncoder};
pub use queue::{QueueError, QueueStats, RequestQueue};
pub use request::{AjaxRequest, RequestId, RequestState};
pub use services::{AjaxServices, ResponseDispatcher};
