//! Caller-supplied request context.

use common::names::params;
use dom::{FormControl, HtmlForm};
use indexmap::IndexMap;
use std::sync::Arc;

/// State the caller hands to a request: who issued it, which form it
/// submits, and extra parameters sent along with every payload.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// The control that issued the request. Released when the request is done.
    pub source: Option<FormControl>,
    /// The form being submitted.
    pub form: Arc<HtmlForm>,
    /// Parameters appended after the form fields.
    pub pass_through: IndexMap<String, String>,
}

impl RequestContext {
    pub fn new(form: Arc<HtmlForm>) -> Self {
        Self {
            source: None,
            form,
            pass_through: IndexMap::new(),
        }
    }

    pub fn with_source(mut self, source: FormControl) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pass_through.insert(name.into(), value.into());
        self
    }

    /// Add the standard partial request parameters.
    ///
    /// `execute` and `render` are space separated client id lists.
    pub fn with_partial_params(self, source_id: &str, execute: &str, render: &str) -> Self {
        let mut ctx = self
            .with_param(params::SOURCE, source_id)
            .with_param(params::PARTIAL_AJAX, "true");
        if !execute.is_empty() {
            ctx = ctx.with_param(params::PARTIAL_EXECUTE, execute);
        }
        if !render.is_empty() {
            ctx = ctx.with_param(params::PARTIAL_RENDER, render);
        }
        ctx
    }

    /// Identifier of the issuing control, if still held.
    pub fn source_id(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.identifier())
    }
}
