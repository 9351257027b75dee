//! Request errors and the error-reporting collaborator.

use crate::config::ConfigError;
use crate::context::RequestContext;
use crate::request::RequestId;
use common::FacesError;
use networking::{TransportError, TransportFailure};
use thiserror::Error;

/// Placeholder for a status code or text the transport could not supply.
pub const UNKNOWN: &str = "UNKNOWN";

/// Component name reported as the origin of request errors.
pub const COMPONENT: &str = "ajax::AjaxRequest";

/// Category of a request error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Construction,
    TransportOpen,
    Send,
    Http,
    Dispatch,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Construction => "constructionError",
            ErrorKind::TransportOpen => "transportOpenError",
            ErrorKind::Send => "sendError",
            ErrorKind::Http => "httpError",
            ErrorKind::Dispatch => "dispatchError",
        }
    }
}

/// Anything that can go wrong between building a request and processing its response.
#[derive(Error, Debug)]
pub enum AjaxError {
    #[error("Invalid request configuration: {0}")]
    Construction(#[from] ConfigError),

    #[error("Could not open transport: {0}")]
    TransportOpen(TransportError),

    #[error("Could not send request: {0}")]
    Send(String),

    #[error("Request failed with status {status} and reason {status_text}")]
    Http {
        code: Option<u16>,
        status: String,
        status_text: String,
    },

    #[error("Response processing failed: {0}")]
    Dispatch(FacesError),
}

impl AjaxError {
    /// Build an HTTP error, substituting [`UNKNOWN`] for missing parts.
    pub fn from_failure(failure: &TransportFailure) -> Self {
        AjaxError::Http {
            code: failure.status,
            status: failure
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            status_text: failure
                .status_text
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AjaxError::Construction(_) => ErrorKind::Construction,
            AjaxError::TransportOpen(_) => ErrorKind::TransportOpen,
            AjaxError::Send(_) => ErrorKind::Send,
            AjaxError::Http { .. } => ErrorKind::Http,
            AjaxError::Dispatch(_) => ErrorKind::Dispatch,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AjaxError::Http { code, .. } => *code,
            _ => None,
        }
    }
}

/// Everything the error reporter gets to see about one failure.
#[derive(Debug)]
pub struct ErrorReport<'a> {
    pub request: RequestId,
    pub context: &'a RequestContext,
    pub kind: ErrorKind,
    /// Error name, the kind's string form.
    pub name: &'static str,
    pub message: String,
    /// Free-form description; empty for request errors.
    pub description: String,
    pub status: Option<u16>,
    /// Originating component.
    pub component: &'static str,
    /// Originating method.
    pub method: &'static str,
}

/// Records or surfaces request errors.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: &ErrorReport<'_>);
}

/// Error reporter writing to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingErrorReporter;

impl ErrorReporter for LoggingErrorReporter {
    fn report(&self, report: &ErrorReport<'_>) {
        tracing::error!(
            request = %report.request,
            error = report.name,
            status = ?report.status,
            origin = %format_args!("{}::{}", report.component, report.method),
            form = %report.context.form.id,
            "{}",
            report.message
        );
    }
}
