//! Submitting a form through the request queue and collecting the outcome.

use crate::config::{SubmitConfig, EXCHANGE_LIMIT};
use ajax::{
    AjaxRequest, AjaxServices, ConfigError, ErrorKind, ErrorReport, ErrorReporter, EventSink, LifecycleEvent,
    LifecycleEventKind, QueueError, QueueStats, RequestContext, RequestQueue,
    ResponseDispatcher,
};
use common::FacesResult;
use networking::{ClientError, HttpClient, RawResponse};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Could not build HTTP client: {0}")]
    Client(#[from] ClientError),
    #[error("Invalid request settings: {0}")]
    Config(#[from] ConfigError),
    #[error("Nothing to submit: {0}")]
    NothingToSubmit(String),
    #[error("Gave up waiting after {0:?}")]
    Stalled(Duration),
}

/// A response body, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseBody {
    pub status: u16,
    pub text: String,
}

/// What happened to the submitted requests.
#[derive(Clone, Debug, Default)]
pub struct SubmitSummary {
    pub responses: Vec<ResponseBody>,
    pub errors: Vec<String>,
    pub timed_out: usize,
    pub rejected: usize,
    pub stats: QueueStats,
}

impl SubmitSummary {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.timed_out == 0 && self.rejected == 0
    }
}

enum Signal {
    Event(LifecycleEvent),
    Error { kind: ErrorKind, message: String },
    Response(ResponseBody),
}

/// Forwards everything the request lifecycle reports to the submit loop.
struct Collector {
    tx: UnboundedSender<Signal>,
}

impl Collector {
    fn forward(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("Submit loop gone, dropping signal");
        }
    }
}

impl EventSink for Collector {
    fn on_event(&self, event: &LifecycleEvent, _context: &RequestContext) {
        tracing::debug!(request = %event.request, event = event.kind.as_str(), status = ?event.status, "Lifecycle event");
        self.forward(Signal::Event(event.clone()));
    }
}

impl ErrorReporter for Collector {
    fn report(&self, report: &ErrorReport<'_>) {
        tracing::warn!(request = %report.request, error = report.name, "{}", report.message);
        self.forward(Signal::Error {
            kind: report.kind,
            message: report.message.clone(),
        });
    }
}

impl ResponseDispatcher for Collector {
    fn dispatch(&self, response: RawResponse, _context: &RequestContext) -> FacesResult<()> {
        self.forward(Signal::Response(ResponseBody {
            status: response.status().as_u16(),
            text: response.text(),
        }));
        Ok(())
    }
}

/// Submit the configured form `config.repeat` times through one queue and
/// wait until every accepted request has finished.
pub async fn submit(config: &SubmitConfig) -> Result<SubmitSummary, SubmitError> {
    if config.repeat == 0 {
        return Err(SubmitError::NothingToSubmit("repeat count is zero".into()));
    }
    config.request_config().validate()?;

    let client = Arc::new(HttpClient::with_config(config.client_config())?);
    let (tx, rx) = unbounded_channel();
    let collector = Arc::new(Collector { tx });
    let services = AjaxServices::http(client, collector.clone())
        .with_events(collector.clone())
        .with_errors(collector);

    let form = Arc::new(config.build_form());
    let queue = RequestQueue::new(config.queue_config());
    let mut summary = SubmitSummary::default();
    let mut queued: usize = 0;

    for _ in 0..config.repeat {
        let request = AjaxRequest::new(
            config.context(form.clone()),
            config.request_config(),
            services.clone(),
        );
        let id = request.id();
        match queue.enqueue(request) {
            Ok(()) => queued += 1,
            Err(QueueError::Rejected { .. }) => summary.rejected += 1,
            Err(err) => {
                tracing::warn!(request = %id, error = %err, "Request not queued");
                summary.errors.push(err.to_string());
            }
        }
    }
    // Evicted requests are dropped silently and never finish.
    let evicted = usize::try_from(queue.stats().evicted).unwrap_or(usize::MAX);
    let remaining = queued.saturating_sub(evicted);
    tracing::info!(queued, evicted, rejected = summary.rejected, "Requests enqueued");

    let limit = wait_limit(config);
    tokio::time::timeout(limit, collect(rx, remaining, &mut summary))
        .await
        .map_err(|_| SubmitError::Stalled(limit))?;

    summary.stats = queue.stats();
    Ok(summary)
}

/// Drain signals until `remaining` requests have finished. Each request
/// finishes with exactly one response, timeout or non-dispatch error.
async fn collect(mut rx: UnboundedReceiver<Signal>, mut remaining: usize, summary: &mut SubmitSummary) {
    while remaining > 0 {
        let Some(signal) = rx.recv().await else {
            break;
        };
        match signal {
            Signal::Event(event) => {
                if event.kind == LifecycleEventKind::TimeoutEvent {
                    summary.timed_out += 1;
                    remaining -= 1;
                }
            }
            Signal::Error { kind, message, .. } => {
                summary.errors.push(message);
                if kind != ErrorKind::Dispatch {
                    remaining -= 1;
                }
            }
            Signal::Response(body) => {
                summary.responses.push(body);
                remaining -= 1;
            }
        }
    }
}

fn wait_limit(config: &SubmitConfig) -> Duration {
    let per_request = if config.timeout_ms > 0 {
        Duration::from_millis(config.timeout_ms)
    } else {
        config.client_config().timeout.unwrap_or(EXCHANGE_LIMIT)
    };
    let repeat = u32::try_from(config.repeat).unwrap_or(u32::MAX);
    per_request
        .checked_mul(repeat)
        .and_then(|total| total.checked_add(Duration::from_secs(5)))
        .unwrap_or(Duration::MAX)
}
