//! Assembled tracing pipeline
//!
//! The [`Tracer`] bundles sampler, identity and the async batching reporter.
//! It is constructed once per interceptor instance at setup time, shared
//! read-only by every hook invocation, and released on interceptor teardown.
//!
//! Span export is fire-and-forget: `Span::finish` pushes onto an unbounded
//! channel and a background task batches and delivers to the sink. The hot
//! path never blocks on network I/O.

use crate::context::TraceContext;
use crate::propagation::Extraction;
use crate::sampler::Sampler;
use crate::sink::SpanSender;
use crate::span::{Span, SpanData};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Spans buffered before a batch is forced out
const MAX_BATCH: usize = 512;

/// Periodic flush interval for partially filled batches
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Random span/trace ID source (atomic xorshift64, lock-free)
struct IdGenerator {
    state: AtomicU64,
}

impl IdGenerator {
    fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0xDEADBEEF);
        Self {
            state: AtomicU64::new(seed | 1),
        }
    }

    /// Next nonzero 64-bit ID
    fn next_id(&self) -> u64 {
        loop {
            let old = self.state.load(Ordering::Acquire);
            let mut x = old;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            if self
                .state
                .compare_exchange_weak(old, x, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return x;
            }
        }
    }

    fn next_trace_id(&self, wide: bool) -> u128 {
        if wide {
            ((self.next_id() as u128) << 64) | self.next_id() as u128
        } else {
            self.next_id() as u128
        }
    }
}

enum ReporterMsg {
    Report(SpanData),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Cloneable handle spans use to report themselves on finish.
#[derive(Clone)]
pub struct ReporterHandle {
    tx: mpsc::UnboundedSender<ReporterMsg>,
}

impl ReporterHandle {
    /// Queue a finished span; non-blocking, drops silently after shutdown
    pub(crate) fn report(&self, span: SpanData) {
        let _ = self.tx.send(ReporterMsg::Report(span));
    }
}

async fn reporter_worker(
    mut rx: mpsc::UnboundedReceiver<ReporterMsg>,
    sender: Arc<dyn SpanSender>,
) {
    let mut batch: Vec<SpanData> = Vec::new();
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(ReporterMsg::Report(span)) => {
                    batch.push(span);
                    if batch.len() >= MAX_BATCH {
                        deliver(&sender, &mut batch).await;
                    }
                }
                Some(ReporterMsg::Flush(ack)) => {
                    deliver(&sender, &mut batch).await;
                    let _ = ack.send(());
                }
                Some(ReporterMsg::Shutdown) | None => {
                    deliver(&sender, &mut batch).await;
                    if let Err(e) = sender.shutdown().await {
                        error!(sink = sender.name(), error = %e, "error during sink shutdown");
                    }
                    return;
                }
            },
            _ = ticker.tick() => {
                deliver(&sender, &mut batch).await;
            }
        }
    }
}

async fn deliver(sender: &Arc<dyn SpanSender>, batch: &mut Vec<SpanData>) {
    if batch.is_empty() {
        return;
    }
    match sender.send(batch).await {
        Ok(()) => debug!(sink = sender.name(), count = batch.len(), "spans reported"),
        Err(e) => error!(
            sink = sender.name(),
            error = %e,
            count = batch.len(),
            "failed to report spans, batch dropped"
        ),
    }
    batch.clear();
}

/// The assembled {sampler, reporter, identity} pipeline.
///
/// Safe for concurrent span creation/finish from many interceptor instances;
/// all mutability sits behind atomics or the reporter channel.
pub struct Tracer {
    sampler: Sampler,
    ids: IdGenerator,
    local_service_name: String,
    trace_id_128bit: bool,
    reporter: Option<ReporterHandle>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("local_service_name", &self.local_service_name)
            .field("trace_id_128bit", &self.trace_id_128bit)
            .finish_non_exhaustive()
    }
}

impl Tracer {
    /// Assemble a tracer. When `sender` is present the async batching
    /// reporter task is spawned; with no sender, spans are created but never
    /// exported.
    ///
    /// Must be called within a tokio runtime when a sender is supplied.
    pub fn new(
        sampler: Sampler,
        sender: Option<Arc<dyn SpanSender>>,
        local_service_name: impl Into<String>,
        trace_id_128bit: bool,
    ) -> Self {
        let (reporter, worker) = match sender {
            Some(sender) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let handle = tokio::spawn(reporter_worker(rx, sender));
                (Some(ReporterHandle { tx }), Some(handle))
            }
            None => (None, None),
        };
        Self {
            sampler,
            ids: IdGenerator::new(),
            local_service_name: local_service_name.into(),
            trace_id_128bit,
            reporter,
            worker: Mutex::new(worker),
        }
    }

    /// True when configuration disabled tracing entirely (the sampler can
    /// never record). Interceptors short-circuit whole batches on this.
    pub fn is_noop(&self) -> bool {
        self.sampler.is_never()
    }

    /// The local endpoint service name baked into every span
    pub fn local_service_name(&self) -> &str {
        &self.local_service_name
    }

    /// Start the next span from an extraction result: a child of an
    /// extracted context, a root honoring an extracted sampling decision,
    /// or a fresh root sampled by this tracer's sampler.
    pub fn next_span(&self, extraction: &Extraction) -> Span {
        let context = match extraction {
            Extraction::Context(parent) => TraceContext {
                trace_id: parent.trace_id,
                span_id: self.ids.next_id(),
                parent_span_id: Some(parent.span_id),
                sampled: Some(
                    parent.sampled.unwrap_or_else(|| self.sampler.is_sampled()),
                ),
            },
            Extraction::Decision(sampled) => TraceContext {
                trace_id: self.ids.next_trace_id(self.trace_id_128bit),
                span_id: self.ids.next_id(),
                parent_span_id: None,
                sampled: Some(*sampled),
            },
            Extraction::Missing => TraceContext {
                trace_id: self.ids.next_trace_id(self.trace_id_128bit),
                span_id: self.ids.next_id(),
                parent_span_id: None,
                sampled: Some(self.sampler.is_sampled()),
            },
        };
        Span::new(context, &self.local_service_name, self.reporter.clone())
    }

    /// Force out any buffered spans and wait for delivery to complete
    pub async fn flush(&self) {
        if let Some(reporter) = &self.reporter {
            let (ack_tx, ack_rx) = oneshot::channel();
            if reporter.tx.send(ReporterMsg::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.await;
            }
        }
    }

    /// Flush and release the reporter and its sink. Idempotent.
    pub async fn close(&self) {
        if let Some(reporter) = &self.reporter {
            let _ = reporter.tx.send(ReporterMsg::Shutdown);
        }
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "reporter task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testutil::CaptureSender;

    fn capture_tracer(rate: f64) -> (Arc<CaptureSender>, Tracer) {
        let sender = Arc::new(CaptureSender::new());
        let tracer = Tracer::new(
            Sampler::new(rate),
            Some(sender.clone()),
            "kafka-client",
            true,
        );
        (sender, tracer)
    }

    #[tokio::test]
    async fn next_span_from_missing_is_a_sampled_root() {
        let (_sender, tracer) = capture_tracer(1.0);
        let span = tracer.next_span(&Extraction::Missing);
        assert!(!span.is_noop());
        assert_eq!(span.context().parent_span_id, None);
        assert!(span.context().trace_id >> 64 != 0, "expected 128-bit id");
        tracer.close().await;
    }

    #[tokio::test]
    async fn next_span_from_context_is_a_child() {
        let (_sender, tracer) = capture_tracer(1.0);
        let parent = TraceContext {
            trace_id: 0xabc,
            span_id: 0xdef,
            parent_span_id: None,
            sampled: Some(true),
        };
        let span = tracer.next_span(&Extraction::Context(parent.clone()));
        assert_eq!(span.context().trace_id, parent.trace_id);
        assert_eq!(span.context().parent_span_id, Some(parent.span_id));
        assert_ne!(span.context().span_id, parent.span_id);
        tracer.close().await;
    }

    #[tokio::test]
    async fn extracted_negative_decision_yields_noop_span() {
        let (sender, tracer) = capture_tracer(1.0);
        let mut span = tracer.next_span(&Extraction::Decision(false));
        assert!(span.is_noop());
        assert_eq!(span.context().sampled, Some(false));
        span.start();
        span.finish();
        tracer.flush().await;
        assert!(sender.spans().is_empty());
        tracer.close().await;
    }

    #[tokio::test]
    async fn finished_spans_reach_the_sink_on_flush() {
        let (sender, tracer) = capture_tracer(1.0);
        for _ in 0..3 {
            let mut span = tracer.next_span(&Extraction::Missing);
            span.name("on_send").start();
            span.finish();
        }
        tracer.flush().await;
        assert_eq!(sender.spans().len(), 3);
        tracer.close().await;
    }

    #[tokio::test]
    async fn close_flushes_pending_spans() {
        let (sender, tracer) = capture_tracer(1.0);
        let mut span = tracer.next_span(&Extraction::Missing);
        span.name("poll").start();
        span.finish();
        tracer.close().await;
        assert_eq!(sender.spans().len(), 1);
        assert!(sender.was_shutdown());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_sender, tracer) = capture_tracer(1.0);
        tracer.close().await;
        tracer.close().await;
    }

    #[tokio::test]
    async fn narrow_trace_ids_fit_in_64_bits() {
        let tracer = Tracer::new(Sampler::new(1.0), None, "kafka-client", false);
        let span = tracer.next_span(&Extraction::Missing);
        assert_eq!(span.context().trace_id >> 64, 0);
    }

    #[tokio::test]
    async fn zero_rate_tracer_is_noop() {
        let tracer = Tracer::new(Sampler::never(), None, "kafka-client", true);
        assert!(tracer.is_noop());
        let span = tracer.next_span(&Extraction::Missing);
        assert!(span.is_noop());
    }
}
