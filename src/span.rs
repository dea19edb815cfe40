//! Span handle and reported span data
//!
//! A [`Span`] is a started/finished named operation created and finished
//! strictly within one interceptor hook invocation (produce) or one
//! batch-processing pass (consume). Finishing a recording span hands an
//! immutable [`SpanData`] to the tracer's reporter; finishing a no-op span
//! does nothing.

use crate::context::TraceContext;
use crate::tracer::ReporterHandle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Span kind, as reported to the trace sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanKind {
    /// Outgoing-record span
    Producer,
    /// Incoming-record span
    Consumer,
}

/// A service endpoint attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Logical service name
    pub service_name: String,
}

/// A finished span in Zipkin v2 shape, ready for encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanData {
    /// Trace ID, lowercase hex (16 or 32 chars)
    pub trace_id: String,
    /// Parent span ID, lowercase hex, absent for roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Span ID, lowercase hex (16 chars)
    pub id: String,
    /// Span kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SpanKind>,
    /// Operation name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Start time, epoch microseconds
    pub timestamp: u64,
    /// Duration in microseconds, at least 1
    pub duration: u64,
    /// The service this interceptor runs in
    pub local_endpoint: Endpoint,
    /// The peer service, when tagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<Endpoint>,
    /// Fixed tag set (topic, key, client id, group id)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

struct Recording {
    data: SpanData,
    started: Option<Instant>,
    reporter: Option<ReporterHandle>,
}

/// A span under construction.
///
/// No-op spans (unsampled) keep their context for propagation but record
/// nothing: every mutator is a cheap no-op and `finish` reports nothing.
pub struct Span {
    context: TraceContext,
    recording: Option<Recording>,
}

impl Span {
    pub(crate) fn new(
        context: TraceContext,
        local_service_name: &str,
        reporter: Option<ReporterHandle>,
    ) -> Self {
        let recording = context.is_sampled().then(|| Recording {
            data: SpanData {
                trace_id: context.trace_id_hex(),
                parent_id: context.parent_span_id_hex(),
                id: context.span_id_hex(),
                kind: None,
                name: None,
                timestamp: 0,
                duration: 0,
                local_endpoint: Endpoint {
                    service_name: local_service_name.to_string(),
                },
                remote_endpoint: None,
                tags: BTreeMap::new(),
            },
            started: None,
            reporter,
        });
        Self { context, recording }
    }

    /// The context this span occupies, used for header injection
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// True when this span records nothing
    pub fn is_noop(&self) -> bool {
        self.recording.is_none()
    }

    /// Set the operation name
    pub fn name(&mut self, name: &str) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.data.name = Some(name.to_string());
        }
        self
    }

    /// Set the span kind
    pub fn kind(&mut self, kind: SpanKind) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.data.kind = Some(kind);
        }
        self
    }

    /// Set the remote endpoint service name
    pub fn remote_service_name(&mut self, service_name: &str) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.data.remote_endpoint = Some(Endpoint {
                service_name: service_name.to_string(),
            });
        }
        self
    }

    /// Attach a tag; later writes to the same key win
    pub fn tag(&mut self, key: &str, value: &str) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.data.tags.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Mark the span's start time
    pub fn start(&mut self) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.data.timestamp = now_micros();
            rec.started = Some(Instant::now());
        }
        self
    }

    /// Finish the span, reporting it if it records and a reporter is wired.
    /// Spans are never held across hook invocations, so this consumes self.
    pub fn finish(self) {
        let Some(mut rec) = self.recording else {
            return;
        };
        match rec.started {
            Some(started) => {
                rec.data.duration = (started.elapsed().as_micros() as u64).max(1);
            }
            None => {
                // Finished without an explicit start; record a point in time.
                rec.data.timestamp = now_micros();
                rec.data.duration = 1;
            }
        }
        if let Some(reporter) = &rec.reporter {
            reporter.report(rec.data);
        }
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sampled_context() -> TraceContext {
        TraceContext {
            trace_id: 0xa1,
            span_id: 0xb2,
            parent_span_id: Some(0xc3),
            sampled: Some(true),
        }
    }

    #[test]
    fn recording_span_carries_ids_and_tags() {
        let mut span = Span::new(sampled_context(), "kafka-client", None);
        assert!(!span.is_noop());

        span.name("on_send")
            .kind(SpanKind::Producer)
            .remote_service_name("kafka")
            .tag("kafka.topic", "topic")
            .start();

        let rec = span.recording.as_ref().unwrap();
        assert_eq!(rec.data.trace_id, "00000000000000a1");
        assert_eq!(rec.data.id, "00000000000000b2");
        assert_eq!(rec.data.parent_id, Some("00000000000000c3".to_string()));
        assert_eq!(rec.data.name.as_deref(), Some("on_send"));
        assert_eq!(rec.data.kind, Some(SpanKind::Producer));
        assert_eq!(
            rec.data.remote_endpoint.as_ref().unwrap().service_name,
            "kafka"
        );
        assert_eq!(rec.data.tags.get("kafka.topic").unwrap(), "topic");
        assert!(rec.data.timestamp > 0);
    }

    #[test]
    fn unsampled_span_is_noop() {
        let context = TraceContext {
            sampled: Some(false),
            ..sampled_context()
        };
        let mut span = Span::new(context, "kafka-client", None);
        assert!(span.is_noop());
        span.name("ignored").tag("k", "v").start();
        span.finish(); // reports nothing, must not panic
    }

    #[test]
    fn context_survives_for_noop_spans() {
        let context = TraceContext {
            sampled: Some(false),
            ..sampled_context()
        };
        let span = Span::new(context.clone(), "kafka-client", None);
        assert_eq!(span.context(), &context);
    }
}
