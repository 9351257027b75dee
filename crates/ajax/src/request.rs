//! The lifecycle of one partial request.
//!
//! An [`AjaxRequest`] is created once, sent once, and reaches exactly one
//! terminal state. Transport callbacks drive it from `Sent` to `Completed`,
//! `TimedOut` or `Errored`; anything arriving after that is ignored. Every
//! failure is funneled through a single error handler, and the owning
//! [`RequestQueue`] is notified exactly once whatever the outcome.

use crate::config::{AjaxMethod, RequestConfig};
use crate::context::RequestContext;
use crate::error::{AjaxError, ErrorReport, COMPONENT};
use crate::events::{LifecycleEvent, LifecycleEventKind};
use crate::queue::RequestQueue;
use crate::services::AjaxServices;
use bytes::Bytes;
use common::names::PARTIAL_AJAX;
use networking::headers::{content_type, names};
use networking::{RawResponse, Transport, TransportFailure, TransportHandler};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique request identifier, increasing in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    Created,
    Sent,
    Completed,
    TimedOut,
    Errored,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::TimedOut | RequestState::Errored
        )
    }
}

#[derive(Clone, Copy, Debug)]
enum QueueNotice {
    Advance,
    Cleanup,
}

/// Runs queue cleanup when the error handler exits, even by unwinding.
struct CleanupGuard<'a>(&'a AjaxRequest);

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        self.0.notify_queue(QueueNotice::Cleanup);
    }
}

/// Runs request-done when dropped.
struct DoneGuard<'a>(&'a AjaxRequest);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.request_done();
    }
}

/// A partial request: payload assembly, transmission and callback handling.
pub struct AjaxRequest {
    id: RequestId,
    config: RequestConfig,
    context: RwLock<RequestContext>,
    services: AjaxServices,
    state: Mutex<RequestState>,
    transport: Mutex<Option<Box<dyn Transport>>>,
    queue: OnceCell<Weak<RequestQueue>>,
    queue_notified: AtomicBool,
    done: AtomicBool,
}

impl AjaxRequest {
    /// Create a request. An invalid configuration leaves it `Errored` and
    /// is reported through the error reporter rather than returned.
    pub fn new(context: RequestContext, config: RequestConfig, services: AjaxServices) -> Arc<Self> {
        let validation = config.validate();
        let request = Arc::new(Self {
            id: RequestId::next(),
            config,
            context: RwLock::new(context),
            services,
            state: Mutex::new(RequestState::Created),
            transport: Mutex::new(None),
            queue: OnceCell::new(),
            queue_notified: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });

        tracing::debug!(
            request = %request.id,
            method = ?request.config.method,
            partial = request.config.partial_ids().is_some(),
            "Created request"
        );

        if let Err(err) = validation {
            if request.transition(RequestState::Created, RequestState::Errored) {
                request.std_error_handler(AjaxError::Construction(err), "new");
                request.request_done();
            }
        }
        request
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Identifier of the issuing control, until the request is done.
    pub fn source_id(&self) -> Option<String> {
        self.context.read().source_id().map(str::to_string)
    }

    /// Whether the request belongs to a queue.
    pub fn is_queued(&self) -> bool {
        self.queue.get().is_some()
    }

    /// Attach the request to `queue`. Fails if it already belongs to one.
    pub(crate) fn bind_queue(&self, queue: &Arc<RequestQueue>) -> bool {
        self.queue.set(Arc::downgrade(queue)).is_ok()
    }

    /// Build the payload, arm a transport and start the exchange.
    ///
    /// Never fails outward: errors go to the error reporter and the request
    /// ends `Errored`. Calling this on a request that already left `Created`
    /// does nothing.
    pub fn send(self: &Arc<Self>) {
        if !self.transition(RequestState::Created, RequestState::Sent) {
            tracing::warn!(request = %self.id, state = ?self.state(), "Ignoring send on a request that was already started");
            return;
        }

        if let Err(err) = self.try_send() {
            if self.finish(RequestState::Errored) {
                self.std_error_handler(err, "send");
                self.request_done();
            } else {
                tracing::warn!(request = %self.id, error = %err, "Send failed after the request had finished");
            }
        }
    }

    fn try_send(self: &Arc<Self>) -> Result<(), AjaxError> {
        let (url, body, content_type) = self.build_exchange()?;
        let services = &self.services;

        let mut transport = services.transports.create();
        transport
            .open(self.config.method.as_http(), &url)
            .map_err(AjaxError::TransportOpen)?;
        transport.set_timeout(self.config.timeout);
        transport
            .set_header(names::CONTENT_TYPE, &content_type)
            .map_err(AjaxError::TransportOpen)?;
        transport
            .set_header(names::FACES_REQUEST, PARTIAL_AJAX)
            .map_err(AjaxError::TransportOpen)?;

        self.emit(LifecycleEventKind::Begin, None);
        tracing::debug!(request = %self.id, url = %url, "Sending request");

        let handler: Arc<dyn TransportHandler> = self.clone();
        transport
            .send(body, handler)
            .map_err(|e| AjaxError::Send(e.to_string()))?;

        // Callbacks may already have run; keep the handle only while in flight.
        let mut slot = self.transport.lock();
        match self.state() {
            RequestState::Sent => *slot = Some(transport),
            RequestState::TimedOut => transport.abort(),
            _ => {}
        }
        Ok(())
    }

    /// Target URL, body and content type for this request.
    fn build_exchange(&self) -> Result<(String, Option<Bytes>, String), AjaxError> {
        let services = &self.services;
        let context = self.context.read();

        let mut payload = match self.config.partial_ids() {
            Some(ids) => {
                let mut payload = services
                    .form_data
                    .encode_submittable_fields(&context.form, ids)
                    .map_err(|e| AjaxError::Send(e.to_string()))?;
                if let Some(source) = &context.source {
                    services.form_data.append_issuing_item(source, &mut payload);
                }
                payload
            }
            None => services
                .form_data
                .view_state(&context.form)
                .map_err(|e| AjaxError::Send(e.to_string()))?,
        };

        for (name, value) in &context.pass_through {
            payload.append(name.clone(), value.clone());
        }

        let target = context
            .form
            .target_url()
            .map_err(|e| AjaxError::Send(e.to_string()))?;

        Ok(match self.config.method {
            AjaxMethod::Get => (
                with_query(target, &payload.to_urlencoded()),
                None,
                format!("{}{}", self.config.content_type, content_type::UTF8_SUFFIX),
            ),
            AjaxMethod::Post => {
                let finalized = payload.finalize(&self.config.content_type);
                (target.to_string(), Some(finalized.body), finalized.content_type)
            }
        })
    }

    fn transition(&self, from: RequestState, to: RequestState) -> bool {
        let mut state = self.state.lock();
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    /// Move from `Sent` to a terminal state. False if already terminal.
    fn finish(&self, to: RequestState) -> bool {
        let finished = self.transition(RequestState::Sent, to);
        if !finished {
            tracing::debug!(request = %self.id, state = ?self.state(), ignored = ?to, "Ignoring late callback");
        }
        finished
    }

    fn emit(&self, kind: LifecycleEventKind, status: Option<u16>) {
        let context = self.context.read();
        let event = LifecycleEvent {
            kind,
            request: self.id,
            status,
            source: context.source_id().map(str::to_string),
        };
        self.services.events.on_event(&event, &context);
    }

    /// Report `err`, then let the queue clean up after this request.
    fn std_error_handler(&self, err: AjaxError, method: &'static str) {
        let _cleanup = CleanupGuard(self);
        let context = self.context.read();
        let kind = err.kind();
        let report = ErrorReport {
            request: self.id,
            context: &context,
            kind,
            name: kind.as_str(),
            message: err.to_string(),
            description: String::new(),
            status: err.status(),
            component: COMPONENT,
            method,
        };
        self.services.errors.report(&report);
    }

    /// Release the transport and the issuing control, then advance the queue.
    fn request_done(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let transport = self.transport.lock().take();
        drop(transport);
        self.context.write().source = None;
        tracing::debug!(request = %self.id, state = ?self.state(), "Request done");
        self.notify_queue(QueueNotice::Advance);
    }

    fn notify_queue(&self, notice: QueueNotice) {
        if self.queue_notified.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(queue) = self.queue.get().and_then(Weak::upgrade) else {
            return;
        };
        match notice {
            QueueNotice::Advance => queue.process_queue(self.id),
            QueueNotice::Cleanup => queue.cleanup(self.id),
        }
    }
}

impl TransportHandler for AjaxRequest {
    fn on_progress(&self) {
        tracing::trace!(request = %self.id, "Response head received");
    }

    fn on_success(&self, response: RawResponse) {
        if !self.finish(RequestState::Completed) {
            return;
        }
        self.emit(LifecycleEventKind::Complete, Some(response.status().as_u16()));

        let result = {
            let context = self.context.read();
            self.services.dispatcher.dispatch(response, &context)
        };
        if let Err(err) = result {
            self.std_error_handler(AjaxError::Dispatch(err), "on_success");
        }
    }

    fn on_error(&self, failure: TransportFailure) {
        if !self.finish(RequestState::Errored) {
            return;
        }
        self.emit(LifecycleEventKind::Complete, failure.status);
        if let Some(detail) = &failure.detail {
            tracing::debug!(request = %self.id, detail = %detail, "Transport failure");
        }
        self.std_error_handler(AjaxError::from_failure(&failure), "on_error");
    }

    fn on_timeout(&self) {
        if !self.finish(RequestState::TimedOut) {
            return;
        }
        let _done = DoneGuard(self);
        tracing::info!(request = %self.id, timeout = ?self.config.timeout, "Request timed out");
        self.emit(LifecycleEventKind::TimeoutEvent, None);
        if let Some(transport) = self.transport.lock().as_mut() {
            transport.abort();
        }
    }

    fn on_done(&self) {
        self.request_done();
    }
}

impl fmt::Debug for AjaxRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AjaxRequest")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Append a urlencoded query to `url`.
fn with_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    match fragment {
        Some(fragment) => format!("{base}{separator}{query}#{fragment}"),
        None => format!("{base}{separator}{query}"),
    }
}
