//! Lifecycle events emitted to external listeners.

use crate::context::RequestContext;
use crate::request::RequestId;

/// Points in a request's life listeners are told about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEventKind {
    /// Right before transmission.
    Begin,
    /// A response or transport error arrived.
    Complete,
    /// No response within the configured timeout.
    TimeoutEvent,
}

impl LifecycleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventKind::Begin => "begin",
            LifecycleEventKind::Complete => "complete",
            LifecycleEventKind::TimeoutEvent => "timeout",
        }
    }
}

/// A lifecycle notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub request: RequestId,
    /// HTTP status, when one is known at this point.
    pub status: Option<u16>,
    /// Identifier of the issuing control.
    pub source: Option<String>,
}

/// Receives lifecycle events.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent, context: &RequestContext);
}

/// Event sink writing to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn on_event(&self, event: &LifecycleEvent, context: &RequestContext) {
        tracing::debug!(
            request = %event.request,
            event = event.kind.as_str(),
            status = ?event.status,
            source = ?event.source,
            form = %context.form.id,
            "Lifecycle event"
        );
    }
}
