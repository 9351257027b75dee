//! Command-line client submitting forms as partial requests.
//!
//! This crate wires the pieces together:
//! - Submit configuration mapped onto client, queue and request settings
//! - A collector turning lifecycle events, errors and responses into a summary
//! - The `faces-submit` binary

pub mod config;
pub mod submit;

pub use config::{parse_field, SubmitConfig};
pub use submit::{submit, ResponseBody, SubmitError, SubmitSummary};

/// Client version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
