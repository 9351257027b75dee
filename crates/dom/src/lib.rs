//! Form model used to build partial requests.
//!
//! This crate provides the small slice of the document the ajax transport
//! needs: forms, their controls, and client id matching.

pub mod client_id;
pub mod control;
pub mod form;

pub use control::{ControlKind, FilePart, FormControl};
pub use form::HtmlForm;
