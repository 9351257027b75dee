//! Scripted collaborators for unit tests.

use crate::config::RequestConfig;
use crate::context::RequestContext;
use crate::error::{ErrorKind, ErrorReport, ErrorReporter};
use crate::events::{EventSink, LifecycleEvent, LifecycleEventKind};
use crate::request::{AjaxRequest, RequestId};
use crate::services::AjaxServices;
use bytes::Bytes;
use common::{FacesError, FacesResult};
use dom::{FormControl, HtmlForm};
use http::{Method, StatusCode};
use networking::{
    HeaderMap, RawResponse, Transport, TransportError, TransportFactory, TransportFailure,
    TransportHandler,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Everything the collaborators saw, in order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Entry {
    Header(String, String),
    Timeout(Option<Duration>),
    Sent { target: String, body: Option<String> },
    Aborted,
    Event(RequestId, LifecycleEventKind),
    Error(RequestId, ErrorKind, String),
    Dispatched(String),
}

pub(crate) type Journal = Arc<Mutex<Vec<Entry>>>;

/// How a scripted exchange plays out.
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Respond with this status and body; non-2xx statuses go to `on_error`.
    Succeed(u16, &'static str),
    Fail(TransportFailure),
    Timeout,
    /// Time out, then deliver stray success and error callbacks.
    TimeoutThenLateSuccess,
    /// Park the exchange until [`ScriptedTransportFactory::complete_next`].
    Defer,
    OpenFails,
    SendFails,
}

fn play(script: &Script, handler: &Arc<dyn TransportHandler>) {
    match script {
        Script::Succeed(status, body) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            handler.on_progress();
            if status.is_success() {
                handler.on_success(RawResponse::new(status, HeaderMap::new(), Bytes::from_static(body.as_bytes())));
            } else {
                let reason = status.canonical_reason().unwrap_or_default();
                handler.on_error(TransportFailure::http(status.as_u16(), reason));
            }
        }
        Script::Fail(failure) => handler.on_error(failure.clone()),
        Script::Timeout => handler.on_timeout(),
        Script::TimeoutThenLateSuccess => {
            handler.on_timeout();
            handler.on_success(RawResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new()));
            handler.on_error(TransportFailure::http(502, "Bad Gateway"));
        }
        Script::Defer | Script::OpenFails | Script::SendFails => {}
    }
    handler.on_done();
}

struct Shared {
    journal: Journal,
    default: Script,
    deferred: Mutex<VecDeque<Arc<dyn TransportHandler>>>,
}

/// Transport factory whose exchanges follow scripts instead of the network.
#[derive(Clone)]
pub(crate) struct ScriptedTransportFactory {
    shared: Arc<Shared>,
}

impl ScriptedTransportFactory {
    pub(crate) fn new(journal: Journal, default: Script) -> Self {
        Self {
            shared: Arc::new(Shared {
                journal,
                default,
                deferred: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Finish the oldest parked exchange with `script`.
    pub(crate) fn complete_next(&self, script: Script) {
        let handler = self.shared.deferred.lock().pop_front();
        if let Some(handler) = handler {
            play(&script, &handler);
        }
    }

    /// Number of parked exchanges.
    pub(crate) fn in_flight(&self) -> usize {
        self.shared.deferred.lock().len()
    }
}

impl TransportFactory for ScriptedTransportFactory {
    fn create(&self) -> Box<dyn Transport> {
        Box::new(ScriptedTransport {
            shared: self.shared.clone(),
            script: self.shared.default.clone(),
            target: None,
        })
    }
}

struct ScriptedTransport {
    shared: Arc<Shared>,
    script: Script,
    target: Option<String>,
}

impl Transport for ScriptedTransport {
    fn open(&mut self, method: Method, url: &str) -> Result<(), TransportError> {
        if matches!(self.script, Script::OpenFails) {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }
        self.target = Some(format!("{} {}", method, url));
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        self.shared
            .journal
            .lock()
            .push(Entry::Header(name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.shared.journal.lock().push(Entry::Timeout(timeout));
    }

    fn send(
        &mut self,
        body: Option<Bytes>,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<(), TransportError> {
        if matches!(self.script, Script::SendFails) {
            return Err(TransportError::NoRuntime);
        }
        let target = self.target.clone().ok_or(TransportError::NotOpen)?;
        self.shared.journal.lock().push(Entry::Sent {
            target,
            body: body.map(|b| String::from_utf8_lossy(&b).into_owned()),
        });

        if matches!(self.script, Script::Defer) {
            self.shared.deferred.lock().push_back(handler);
        } else {
            play(&self.script, &handler);
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.shared.journal.lock().push(Entry::Aborted);
    }
}

struct RecordingEvents(Journal);

impl EventSink for RecordingEvents {
    fn on_event(&self, event: &LifecycleEvent, _context: &RequestContext) {
        self.0.lock().push(Entry::Event(event.request, event.kind));
    }
}

struct RecordingErrors(Journal);

impl ErrorReporter for RecordingErrors {
    fn report(&self, report: &ErrorReport<'_>) {
        assert!(report.description.is_empty());
        self.0
            .lock()
            .push(Entry::Error(report.request, report.kind, report.message.clone()));
    }
}

/// Reporter that panics on every report.
pub(crate) struct PanickingReporter;

impl ErrorReporter for PanickingReporter {
    fn report(&self, report: &ErrorReport<'_>) {
        panic!("reporter failed on {}", report.request);
    }
}

struct RecordingDispatcher {
    journal: Journal,
    fail: bool,
}

impl crate::services::ResponseDispatcher for RecordingDispatcher {
    fn dispatch(&self, response: RawResponse, _context: &RequestContext) -> FacesResult<()> {
        self.journal.lock().push(Entry::Dispatched(response.text()));
        if self.fail {
            return Err(FacesError::dispatch("malformed partial-response"));
        }
        Ok(())
    }
}

/// A recording service bundle plus a small form.
pub(crate) struct Harness {
    pub(crate) journal: Journal,
    pub(crate) transports: ScriptedTransportFactory,
    pub(crate) services: AjaxServices,
    pub(crate) form: Arc<HtmlForm>,
}

impl Harness {
    pub(crate) fn new(default: Script) -> Self {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let transports = ScriptedTransportFactory::new(journal.clone(), default);
        let dispatcher = Arc::new(RecordingDispatcher {
            journal: journal.clone(),
            fail: false,
        });
        let services = AjaxServices::new(Arc::new(transports.clone()), dispatcher)
            .with_events(Arc::new(RecordingEvents(journal.clone())))
            .with_errors(Arc::new(RecordingErrors(journal.clone())));

        let form = HtmlForm::new("form", "/app/page.xhtml")
            .with_control(FormControl::text("fieldA", "a"))
            .with_control(FormControl::text("fieldB", "b"))
            .with_control(FormControl::submit("save", "Save"))
            .with_view_state("vs-1");

        Self {
            journal,
            transports,
            services,
            form: Arc::new(form),
        }
    }

    pub(crate) fn failing_dispatch(mut self) -> Self {
        let dispatcher = Arc::new(RecordingDispatcher {
            journal: self.journal.clone(),
            fail: true,
        });
        self.services = self.services.with_dispatcher(dispatcher);
        self
    }

    pub(crate) fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.services = self.services.with_errors(reporter);
        self
    }

    pub(crate) fn context(&self) -> RequestContext {
        RequestContext::new(self.form.clone())
    }

    pub(crate) fn request(&self, config: RequestConfig) -> Arc<AjaxRequest> {
        self.request_with(self.context(), config)
    }

    pub(crate) fn request_with(&self, context: RequestContext, config: RequestConfig) -> Arc<AjaxRequest> {
        AjaxRequest::new(context, config, self.services.clone())
    }

    pub(crate) fn journal(&self) -> Vec<Entry> {
        self.journal.lock().clone()
    }

    /// `("METHOD target", body)` per transmitted exchange.
    pub(crate) fn sent(&self) -> Vec<(String, Option<String>)> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Sent { target, body } => Some((target, body)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn headers(&self) -> Vec<(String, String)> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Header(name, value) => Some((name, value)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn events(&self) -> Vec<(RequestId, LifecycleEventKind)> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Event(id, kind) => Some((id, kind)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn events_for(&self, request: RequestId) -> Vec<LifecycleEventKind> {
        self.events()
            .into_iter()
            .filter(|(id, _)| *id == request)
            .map(|(_, kind)| kind)
            .collect()
    }

    pub(crate) fn errors(&self) -> Vec<(RequestId, ErrorKind, String)> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Error(id, kind, message) => Some((id, kind, message)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn dispatched(&self) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Dispatched(body) => Some(body),
                _ => None,
            })
            .collect()
    }
}
