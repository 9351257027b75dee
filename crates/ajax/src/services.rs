//! Collaborators shared by every request of a page.

use crate::context::RequestContext;
use crate::error::{ErrorReporter, LoggingErrorReporter};
use crate::events::{EventSink, LoggingEventSink};
use crate::form_data::{DomFormData, FormDataEncoder};
use common::FacesResult;
use networking::{HttpClient, HttpTransportFactory, RawResponse, TransportFactory};
use std::sync::Arc;

/// Consumes the response of a successful exchange.
pub trait ResponseDispatcher: Send + Sync {
    fn dispatch(&self, response: RawResponse, context: &RequestContext) -> FacesResult<()>;
}

impl<F> ResponseDispatcher for F
where
    F: Fn(RawResponse, &RequestContext) -> FacesResult<()> + Send + Sync,
{
    fn dispatch(&self, response: RawResponse, context: &RequestContext) -> FacesResult<()> {
        self(response, context)
    }
}

/// The service bundle a request resolves its collaborators from.
#[derive(Clone)]
pub struct AjaxServices {
    pub transports: Arc<dyn TransportFactory>,
    pub events: Arc<dyn EventSink>,
    pub errors: Arc<dyn ErrorReporter>,
    pub dispatcher: Arc<dyn ResponseDispatcher>,
    pub form_data: Arc<dyn FormDataEncoder>,
}

impl AjaxServices {
    /// Bundle with logging event and error sinks and the [`DomFormData`] encoder.
    pub fn new(
        transports: Arc<dyn TransportFactory>,
        dispatcher: Arc<dyn ResponseDispatcher>,
    ) -> Self {
        Self {
            transports,
            events: Arc::new(LoggingEventSink),
            errors: Arc::new(LoggingErrorReporter),
            dispatcher,
            form_data: Arc::new(DomFormData),
        }
    }

    /// Bundle sending over HTTP through `client`.
    pub fn http(client: Arc<HttpClient>, dispatcher: Arc<dyn ResponseDispatcher>) -> Self {
        Self::new(Arc::new(HttpTransportFactory::new(client)), dispatcher)
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_errors(mut self, errors: Arc<dyn ErrorReporter>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ResponseDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_form_data(mut self, form_data: Arc<dyn FormDataEncoder>) -> Self {
        self.form_data = form_data;
        self
    }
}

impl std::fmt::Debug for AjaxServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AjaxServices").finish_non_exhaustive()
    }
}
