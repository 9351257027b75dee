//! Common types shared by the partial-ajax client crates.

pub mod error;
pub mod names;

pub use error::{FacesError, FacesResult};
