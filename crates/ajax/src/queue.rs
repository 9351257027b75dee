//! Single-flight FIFO request queue.
//!
//! At most one request of a queue is in flight. Others wait in arrival order
//! and are promoted one at a time as the active request finishes, whether it
//! succeeds, fails or times out.

use crate::config::{OverflowPolicy, QueueConfig};
use crate::request::{AjaxRequest, RequestId, RequestState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Request {0} cannot be queued in state {1:?}")]
    NotSendable(RequestId, RequestState),
    #[error("Request {0} already belongs to a queue")]
    AlreadyQueued(RequestId),
    #[error("Queue full ({capacity}), request {request} rejected")]
    Rejected { request: RequestId, capacity: usize },
}

/// Queue counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub sent: u64,
    pub advanced: u64,
}

struct QueueState {
    pending: VecDeque<Arc<AjaxRequest>>,
    active: Option<RequestId>,
    max_size: Option<usize>,
    stats: QueueStats,
}

impl QueueState {
    fn occupancy(&self) -> usize {
        self.pending.len() + usize::from(self.active.is_some())
    }

    /// Pop pending requests until one that can still be sent turns up.
    fn promote_next(&mut self) -> Option<Arc<AjaxRequest>> {
        while let Some(next) = self.pending.pop_front() {
            if next.state() == RequestState::Created {
                self.active = Some(next.id());
                self.stats.sent += 1;
                return Some(next);
            }
            tracing::warn!(request = %next.id(), state = ?next.state(), "Skipping pending request that was started elsewhere");
        }
        self.active = None;
        None
    }
}

/// Serializes the requests of one page.
///
/// The state lock is never held while a request is sent, so a callback may
/// enqueue further requests.
pub struct RequestQueue {
    overflow: OverflowPolicy,
    state: Mutex<QueueState>,
}

impl RequestQueue {
    pub fn new(config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            overflow: config.overflow,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                active: None,
                max_size: config.max_size,
                stats: QueueStats::default(),
            }),
        })
    }

    pub fn unbounded() -> Arc<Self> {
        Self::new(QueueConfig::default())
    }

    /// Add a request. It is sent right away if the queue is idle.
    pub fn enqueue(self: &Arc<Self>, request: Arc<AjaxRequest>) -> Result<(), QueueError> {
        let id = request.id();
        let state_now = request.state();
        if state_now != RequestState::Created {
            return Err(QueueError::NotSendable(id, state_now));
        }
        if request.is_queued() {
            return Err(QueueError::AlreadyQueued(id));
        }

        let to_send = {
            let mut state = self.state.lock();
            if let Some(size) = request.config().queue_size {
                state.max_size = Some(size);
            }

            let mut evicted = None;
            if let Some(capacity) = state.max_size {
                if state.occupancy() >= capacity {
                    let victim = match self.overflow {
                        OverflowPolicy::RejectNewest => None,
                        OverflowPolicy::DropOldest => state.pending.front().map(|r| r.id()),
                    };
                    let Some(victim) = victim else {
                        state.stats.rejected += 1;
                        tracing::warn!(request = %id, capacity, "Queue full, dropping request");
                        return Err(QueueError::Rejected { request: id, capacity });
                    };
                    evicted = Some(victim);
                }
            }

            if !request.bind_queue(self) {
                return Err(QueueError::AlreadyQueued(id));
            }
            if let Some(victim) = evicted {
                state.pending.pop_front();
                state.stats.evicted += 1;
                tracing::warn!(request = %victim, replaced_by = %id, "Queue full, evicted oldest pending request");
            }

            state.stats.enqueued += 1;
            if state.active.is_none() {
                state.active = Some(id);
                state.stats.sent += 1;
                Some(request)
            } else {
                tracing::debug!(request = %id, pending = state.pending.len() + 1, "Request queued");
                state.pending.push_back(request);
                None
            }
        };

        if let Some(request) = to_send {
            request.send();
        }
        Ok(())
    }

    /// Advance past `finished`, sending the next pending request if any.
    /// Ignored unless `finished` is the active request.
    pub fn process_queue(&self, finished: RequestId) {
        let next = {
            let mut state = self.state.lock();
            if state.active != Some(finished) {
                tracing::debug!(request = %finished, active = ?state.active, "Ignoring completion of inactive request");
                return;
            }
            state.stats.advanced += 1;
            state.promote_next()
        };

        match next {
            Some(request) => {
                tracing::debug!(finished = %finished, next = %request.id(), "Promoting next request");
                request.send();
            }
            None => tracing::trace!(finished = %finished, "Queue idle"),
        }
    }

    /// Forget `failed` and advance as [`process_queue`](Self::process_queue) does.
    pub fn cleanup(&self, failed: RequestId) {
        {
            let mut state = self.state.lock();
            state.pending.retain(|r| r.id() != failed);
        }
        tracing::debug!(request = %failed, "Cleaning up after failed request");
        self.process_queue(failed);
    }

    /// Number of pending requests, the active one excluded.
    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No request active and none pending.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.active.is_none() && state.pending.is_empty()
    }

    pub fn active_id(&self) -> Option<RequestId> {
        self.state.lock().active
    }

    pub fn max_size(&self) -> Option<usize> {
        self.state.lock().max_size
    }

    pub fn stats(&self) -> QueueStats {
        self.state.lock().stats
    }
}

impl std::fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RequestQueue")
            .field("active", &state.active)
            .field("pending", &state.pending.len())
            .field("max_size", &state.max_size)
            .field("overflow", &self.overflow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestConfig;
    use crate::error::ErrorKind;
    use crate::events::LifecycleEventKind;
    use crate::testing::{Harness, PanickingReporter, Script};
    use networking::TransportFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_requests_sent_in_order_one_at_a_time() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        let requests: Vec<_> = (0..3).map(|_| harness.request(RequestConfig::new())).collect();
        for request in &requests {
            queue.enqueue(request.clone()).unwrap();
        }

        assert_eq!(harness.sent().len(), 1);
        assert_eq!(queue.active_id(), Some(requests[0].id()));
        assert_eq!(queue.len(), 2);

        for (done, request) in requests.iter().enumerate() {
            assert_eq!(queue.active_id(), Some(request.id()));
            assert_eq!(harness.sent().len(), done + 1);
            harness.transports.complete_next(Script::Succeed(200, ""));
        }

        assert!(queue.is_idle());
        let begins: Vec<_> = harness
            .events()
            .into_iter()
            .filter(|(_, kind)| *kind == LifecycleEventKind::Begin)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(begins, requests.iter().map(|r| r.id()).collect::<Vec<_>>());
    }

    #[test]
    fn test_no_overlap_between_requests() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        for _ in 0..4 {
            queue.enqueue(harness.request(RequestConfig::new())).unwrap();
        }
        while harness.transports.in_flight() > 0 {
            assert_eq!(harness.transports.in_flight(), 1);
            harness.transports.complete_next(Script::Succeed(200, ""));
        }

        // Each BEGIN is followed by that request's COMPLETE before the next BEGIN.
        let events = harness.events();
        for pair in events.chunks(2) {
            assert_eq!(pair[0].0, pair[1].0);
            assert_eq!(pair[0].1, LifecycleEventKind::Begin);
            assert_eq!(pair[1].1, LifecycleEventKind::Complete);
        }
        assert_eq!(events.len(), 8);
    }

    #[test]
    fn test_bounded_queue_rejects_newest() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::new(QueueConfig::bounded(3));
        let mut rejected = Vec::new();
        for _ in 0..4 {
            let request = harness.request(RequestConfig::new());
            if let Err(err) = queue.enqueue(request.clone()) {
                rejected.push((request.id(), err));
            }
        }

        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0].1, QueueError::Rejected { capacity: 3, .. }));

        while harness.transports.in_flight() > 0 {
            harness.transports.complete_next(Script::Succeed(200, ""));
        }
        assert_eq!(harness.sent().len(), 3);
        assert_eq!(queue.stats().rejected, 1);
        assert_eq!(queue.stats().sent, 3);
    }

    #[test]
    fn test_bounded_queue_drop_oldest() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::new(QueueConfig::bounded(2).with_overflow(OverflowPolicy::DropOldest));
        let requests: Vec<_> = (0..3).map(|_| harness.request(RequestConfig::new())).collect();
        for request in &requests {
            queue.enqueue(request.clone()).unwrap();
        }

        assert_eq!(queue.stats().evicted, 1);
        while harness.transports.in_flight() > 0 {
            harness.transports.complete_next(Script::Succeed(200, ""));
        }
        assert_eq!(harness.sent().len(), 2);
        assert_eq!(requests[1].state(), RequestState::Created);
        assert_eq!(requests[2].state(), RequestState::Completed);
    }

    #[test]
    fn test_drop_oldest_rejects_when_nothing_pending() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::new(QueueConfig::bounded(1).with_overflow(OverflowPolicy::DropOldest));
        queue.enqueue(harness.request(RequestConfig::new())).unwrap();

        let result = queue.enqueue(harness.request(RequestConfig::new()));
        assert!(matches!(result, Err(QueueError::Rejected { capacity: 1, .. })));
    }

    #[test]
    fn test_request_queue_size_is_adopted() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        queue
            .enqueue(harness.request(RequestConfig::new().with_queue_size(2)))
            .unwrap();
        assert_eq!(queue.max_size(), Some(2));

        queue.enqueue(harness.request(RequestConfig::new())).unwrap();
        assert!(queue.enqueue(harness.request(RequestConfig::new())).is_err());
    }

    #[test]
    fn test_advances_exactly_once_per_terminal_event() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        for _ in 0..4 {
            queue.enqueue(harness.request(RequestConfig::new())).unwrap();
        }

        harness.transports.complete_next(Script::Succeed(200, ""));
        assert_eq!(queue.stats().advanced, 1);
        harness.transports.complete_next(Script::Succeed(503, ""));
        assert_eq!(queue.stats().advanced, 2);
        harness.transports.complete_next(Script::Timeout);
        assert_eq!(queue.stats().advanced, 3);
        harness.transports.complete_next(Script::Fail(TransportFailure::network("reset")));
        assert_eq!(queue.stats().advanced, 4);

        assert!(queue.is_idle());
        assert_eq!(queue.stats().sent, 4);
    }

    #[test]
    fn test_timeout_advances_queue_without_error() {
        let harness = Harness::new(Script::Timeout);
        let queue = RequestQueue::unbounded();
        let first = harness.request(RequestConfig::new().with_timeout_ms(5000));
        let second = harness.request(RequestConfig::new());
        queue.enqueue(first.clone()).unwrap();
        queue.enqueue(second.clone()).unwrap();

        assert_eq!(first.state(), RequestState::TimedOut);
        assert_eq!(second.state(), RequestState::TimedOut);
        assert!(harness.errors().is_empty());
        assert_eq!(
            harness.events_for(first.id()),
            vec![LifecycleEventKind::Begin, LifecycleEventKind::TimeoutEvent]
        );
        assert!(queue.is_idle());
    }

    #[test]
    fn test_failure_does_not_block_queue() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        let form = dom::HtmlForm::new("broken", "");
        let broken = harness.request_with(
            crate::context::RequestContext::new(Arc::new(form)),
            RequestConfig::new(),
        );
        let next = harness.request(RequestConfig::new());

        queue.enqueue(harness.request(RequestConfig::new())).unwrap();
        queue.enqueue(broken.clone()).unwrap();
        queue.enqueue(next.clone()).unwrap();

        harness.transports.complete_next(Script::Succeed(200, ""));
        assert_eq!(broken.state(), RequestState::Errored);
        assert_eq!(queue.active_id(), Some(next.id()));
        assert_eq!(harness.errors()[0].1, ErrorKind::Send);

        harness.transports.complete_next(Script::Succeed(200, ""));
        assert!(queue.is_idle());
        assert_eq!(queue.stats().advanced, 3);
    }

    #[test]
    fn test_reporter_panic_still_cleans_up() {
        let harness = Harness::new(Script::Defer).with_reporter(Arc::new(PanickingReporter));
        let queue = RequestQueue::unbounded();
        let first = harness.request(RequestConfig::new());
        let second = harness.request(RequestConfig::new());
        queue.enqueue(first).unwrap();
        queue.enqueue(second.clone()).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            harness.transports.complete_next(Script::Succeed(500, ""));
        }));
        assert!(result.is_err());
        assert_eq!(queue.active_id(), Some(second.id()));
        assert_eq!(second.state(), RequestState::Sent);
    }

    #[test]
    fn test_reentrant_enqueue_from_dispatcher() {
        let queue = RequestQueue::unbounded();
        let dispatched = Arc::new(AtomicUsize::new(0));
        let harness = Harness::new(Script::Succeed(200, "ok"));

        let follow_up = {
            let queue = Arc::downgrade(&queue);
            let harness_services = harness.services.clone();
            let form = harness.form.clone();
            let dispatched = dispatched.clone();
            move |_response: networking::RawResponse,
                  _context: &crate::context::RequestContext|
                  -> common::FacesResult<()> {
                let count = dispatched.fetch_add(1, Ordering::SeqCst);
                if count == 0 {
                    if let Some(queue) = queue.upgrade() {
                        let request = AjaxRequest::new(
                            crate::context::RequestContext::new(form.clone()),
                            RequestConfig::new(),
                            harness_services.clone(),
                        );
                        queue.enqueue(request).map_err(|e| common::FacesError::dispatch(e.to_string()))?;
                    }
                }
                Ok(())
            }
        };
        let services = harness.services.clone().with_dispatcher(Arc::new(follow_up));

        let first = AjaxRequest::new(
            crate::context::RequestContext::new(harness.form.clone()),
            RequestConfig::new(),
            services,
        );
        queue.enqueue(first).unwrap();

        assert_eq!(dispatched.load(Ordering::SeqCst), 1);
        assert_eq!(harness.sent().len(), 2);
        assert!(queue.is_idle());
        assert_eq!(queue.stats().advanced, 2);
    }

    #[test]
    fn test_enqueue_rejects_started_or_bound_requests() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        let other = RequestQueue::unbounded();

        let started = harness.request(RequestConfig::new());
        started.send();
        assert!(matches!(
            queue.enqueue(started),
            Err(QueueError::NotSendable(_, RequestState::Sent))
        ));

        let busy = harness.request(RequestConfig::new());
        let waiting = harness.request(RequestConfig::new());
        other.enqueue(busy).unwrap();
        other.enqueue(waiting.clone()).unwrap();
        assert!(matches!(queue.enqueue(waiting), Err(QueueError::AlreadyQueued(_))));
    }

    #[test]
    fn test_stray_completion_is_ignored() {
        let harness = Harness::new(Script::Defer);
        let queue = RequestQueue::unbounded();
        let request = harness.request(RequestConfig::new());
        queue.enqueue(request.clone()).unwrap();

        queue.process_queue(harness.request(RequestConfig::new()).id());
        assert_eq!(queue.active_id(), Some(request.id()));
        assert_eq!(queue.stats().advanced, 0);
    }

    #[tokio::test]
    async fn test_http_round_trip_through_queue() {
        use crate::context::RequestContext;
        use crate::services::AjaxServices;
        use common::{FacesError, FacesResult};
        use dom::{FormControl, HtmlForm};
        use networking::{HttpClientBuilder, RawResponse};
        use std::time::Duration;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap();
                seen.push(String::from_utf8_lossy(&buf[..n]).to_string());
                socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 19\r\nConnection: close\r\n\r\n<partial-response/>",
                    )
                    .await
                    .unwrap();
                socket.shutdown().await.ok();
            }
            seen
        });

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let dispatcher = move |response: RawResponse, _context: &RequestContext| -> FacesResult<()> {
            tx.send(response.text())
                .map_err(|e| FacesError::dispatch(e.to_string()))
        };
        let client = Arc::new(HttpClientBuilder::new().build().unwrap());
        let services = AjaxServices::http(client, Arc::new(dispatcher));

        let form = Arc::new(
            HtmlForm::new("form", format!("http://{}/page.xhtml", addr))
                .with_control(FormControl::text("q", "1"))
                .with_view_state("vs"),
        );
        let queue = RequestQueue::unbounded();
        for _ in 0..2 {
            let request = AjaxRequest::new(
                RequestContext::new(form.clone()),
                RequestConfig::new().with_timeout_ms(5000),
                services.clone(),
            );
            queue.enqueue(request).unwrap();
        }

        for _ in 0..2 {
            let body = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .unwrap();
            assert_eq!(body.as_deref(), Some("<partial-response/>"));
        }

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 2);
        for request in &seen {
            assert!(request.starts_with("POST /page.xhtml HTTP/1.1"));
            assert!(request.to_ascii_lowercase().contains("faces-request: partial/ajax"));
        }
        assert_eq!(queue.stats().sent, 2);
    }
}
