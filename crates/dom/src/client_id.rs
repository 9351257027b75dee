//! Client id helpers.
//!
//! Client ids are built from naming container ids joined by
//! [`NAMING_SEPARATOR`], e.g. `form:panel:name`.

use common::names::NAMING_SEPARATOR;

/// Check whether `client_id` is `target` or lives inside the naming container `target`.
pub fn is_within(client_id: &str, target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    match client_id.strip_prefix(target) {
        Some("") => true,
        Some(rest) => rest.starts_with(NAMING_SEPARATOR),
        None => false,
    }
}

/// Split a client id into its naming container segments.
pub fn segments(client_id: &str) -> impl Iterator<Item = &str> {
    client_id.split(NAMING_SEPARATOR).filter(|s| !s.is_empty())
}

/// The id of the closest naming container, if any.
pub fn parent(client_id: &str) -> Option<&str> {
    client_id.rfind(NAMING_SEPARATOR).map(|idx| &client_id[..idx])
}
