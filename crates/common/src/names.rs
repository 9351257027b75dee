//! Well-known request parameter and header names.

/// Hidden field carrying the server-side view state token.
pub const VIEW_STATE: &str = "jakarta.faces.ViewState";

/// Hidden field whose value overrides the form action as request target.
pub const ENCODED_URL: &str = "jakarta.faces.encodedURL";

/// Header marking a request as a partial request.
pub const FACES_REQUEST_HEADER: &str = "Faces-Request";

/// Value of [`FACES_REQUEST_HEADER`] for ajax requests.
pub const PARTIAL_AJAX: &str = "partial/ajax";

/// Separator between naming container ids in a client id.
pub const NAMING_SEPARATOR: char = ':';

/// Standard passthrough parameters of a partial request.
pub mod params {
    pub const SOURCE: &str = "jakarta.faces.source";
    pub const PARTIAL_AJAX: &str = "jakarta.faces.partial.ajax";
    pub const PARTIAL_EXECUTE: &str = "jakarta.faces.partial.execute";
    pub const PARTIAL_RENDER: &str = "jakarta.faces.partial.render";
}
