//! Common error types.

use thiserror::Error;

/// Error type shared by the form model and the response side.
#[derive(Error, Debug)]
pub enum FacesError {
    #[error("Form error: {0}")]
    Form(String),

    #[error("Response processing error: {0}")]
    Dispatch(String),
}

pub type FacesResult<T> = Result<T, FacesError>;

impl FacesError {
    pub fn form(msg: impl Into<String>) -> Self {
        Self::Form(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }
}
