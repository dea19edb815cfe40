//! Producer-side interceptor
//!
//! Sees every outgoing record once, on the client's send path. Creates a
//! `PRODUCER` span, overwrites any upstream trace context in the record's
//! headers with the span's own, and hands the record back otherwise
//! untouched.

use super::{activate, State};
use crate::config::TracingConfig;
use crate::error::Result;
use crate::propagation::{self, Extraction};
use crate::record::{ProducerRecord, RecordMetadata};
use crate::span::SpanKind;
use crate::tag_keys;
use tracing::debug;

/// Intercepts outgoing records and traces each send as one span.
pub struct TracingProducerInterceptor {
    state: State,
}

impl Default for TracingProducerInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingProducerInterceptor {
    /// Create an inert interceptor; call [`configure`](Self::configure)
    /// before the first hook.
    pub fn new() -> Self {
        Self {
            state: State::Unconfigured,
        }
    }

    /// Arm the interceptor from the host client's properties.
    ///
    /// # Errors
    /// Invalid configuration, or a second call on an armed interceptor.
    pub async fn configure(&mut self, config: &TracingConfig) -> Result<()> {
        if matches!(self.state, State::Active(_)) {
            return Err(crate::error::TraceError::Config(
                "producer interceptor already configured".to_string(),
            ));
        }
        self.state = State::Active(activate(config)?);
        Ok(())
    }

    /// Trace one outgoing record.
    ///
    /// Any extracted upstream context parents the new span and is then
    /// replaced in the headers, so the record leaves carrying exactly this
    /// send's context. Topic, key and payload are returned unchanged.
    ///
    /// # Errors
    /// [`TraceError::NotConfigured`](crate::TraceError::NotConfigured) when
    /// invoked before `configure`.
    pub fn on_send(&self, mut record: ProducerRecord) -> Result<ProducerRecord> {
        let active = self.state.active()?;

        let extraction = propagation::extract(&record.headers);
        let mut span = active.tracer.next_span(&extraction);
        if !span.is_noop() {
            span.name("on_send")
                .kind(SpanKind::Producer)
                .remote_service_name(&active.remote_service_name)
                .tag(tag_keys::KAFKA_TOPIC, &record.topic);
            if let Some(key) = record.key.as_deref().filter(|k| !k.is_empty()) {
                span.tag(tag_keys::KAFKA_KEY, key);
            }
            if let Some(client_id) = &active.client_id {
                span.tag(tag_keys::KAFKA_CLIENT_ID, client_id);
            }
            span.start();
        }

        propagation::clear(&mut record.headers);
        propagation::inject(span.context(), &mut record.headers);
        debug!(
            topic = %record.topic,
            context = %span.context(),
            continued = matches!(extraction, Extraction::Context(_)),
            "send traced"
        );
        span.finish();
        Ok(record)
    }

    /// Broker acknowledgment hook; intentionally does nothing. The send span
    /// closes in [`on_send`](Self::on_send) and no context survives to here.
    pub fn on_acknowledgement(&self, _metadata: &RecordMetadata) {}

    /// Flush in-flight spans and disarm. Idempotent.
    pub async fn close(&mut self) {
        if let State::Active(active) = &self.state {
            active.tracer.close().await;
        }
        self.state = State::Unconfigured;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::testsupport::{capture_active, noop_active};
    use super::*;
    use crate::config::SAMPLER_RATE_CONFIG;
    use crate::context::TraceContext;
    use crate::propagation::B3_HEADER;
    use crate::span::SpanKind;
    use bytes::Bytes;

    fn record() -> ProducerRecord {
        ProducerRecord::new("topic", Some("key"), Bytes::from_static(b"payload"))
    }

    #[tokio::test]
    async fn hooks_before_configure_are_rejected() {
        let interceptor = TracingProducerInterceptor::new();
        let err = interceptor.on_send(record()).unwrap_err();
        assert_eq!(err, crate::error::TraceError::NotConfigured);
    }

    #[tokio::test]
    async fn double_configure_is_rejected() {
        let mut interceptor = TracingProducerInterceptor::new();
        let config = TracingConfig::new();
        interceptor.configure(&config).await.unwrap();
        assert!(interceptor.configure(&config).await.is_err());
    }

    #[tokio::test]
    async fn configure_close_configure_rearms() {
        let mut interceptor = TracingProducerInterceptor::new();
        let config = TracingConfig::new();
        interceptor.configure(&config).await.unwrap();
        interceptor.close().await;
        interceptor.configure(&config).await.unwrap();
        assert!(interceptor.on_send(record()).is_ok());
    }

    #[tokio::test]
    async fn on_send_injects_context_and_preserves_the_record() {
        let (sender, active) = capture_active(None);
        let mut interceptor = TracingProducerInterceptor::new();
        interceptor.state = State::Active(active);

        let traced = interceptor.on_send(record()).unwrap();

        assert_eq!(traced.topic, "topic");
        assert_eq!(traced.key.as_deref(), Some("key"));
        assert_eq!(traced.payload, Bytes::from_static(b"payload"));
        assert!(traced.headers.last_value(B3_HEADER).is_some());

        interceptor.close().await;
        let spans = sender.spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name.as_deref(), Some("on_send"));
        assert_eq!(span.kind, Some(SpanKind::Producer));
        assert_eq!(span.local_endpoint.service_name, "kafka-client");
        assert_eq!(span.remote_endpoint.as_ref().unwrap().service_name, "kafka");
        assert_eq!(span.tags.get("kafka.topic").unwrap(), "topic");
        assert_eq!(span.tags.get("kafka.key").unwrap(), "key");
        assert_eq!(span.tags.get("kafka.client.id").unwrap(), "client-1");
        assert!(span.duration >= 1);
    }

    #[tokio::test]
    async fn empty_key_is_not_tagged() {
        let (sender, active) = capture_active(None);
        let mut interceptor = TracingProducerInterceptor::new();
        interceptor.state = State::Active(active);

        let record = ProducerRecord::new("topic", Some(""), Bytes::from_static(b"payload"));
        interceptor.on_send(record).unwrap();

        interceptor.close().await;
        assert!(sender.spans()[0].tags.get("kafka.key").is_none());
    }

    #[tokio::test]
    async fn upstream_context_is_continued_and_replaced() {
        let (sender, active) = capture_active(None);
        let mut interceptor = TracingProducerInterceptor::new();
        interceptor.state = State::Active(active);

        let upstream = TraceContext {
            trace_id: 0xa1,
            span_id: 0xb2,
            parent_span_id: None,
            sampled: Some(true),
        };
        let mut incoming = record();
        propagation::inject(&upstream, &mut incoming.headers);

        let traced = interceptor.on_send(incoming).unwrap();

        // The outgoing header carries the new span, parented on upstream.
        let raw = traced.headers.last_value(B3_HEADER).unwrap();
        let value = std::str::from_utf8(raw).unwrap();
        assert!(value.starts_with("00000000000000a1-"));
        assert!(value.ends_with("-1-00000000000000b2"));

        interceptor.close().await;
        let spans = sender.spans();
        assert_eq!(spans[0].trace_id, "00000000000000a1");
        assert_eq!(spans[0].parent_id.as_deref(), Some("00000000000000b2"));
    }

    #[tokio::test]
    async fn noop_tracer_still_propagates_context() {
        let mut interceptor = TracingProducerInterceptor::new();
        interceptor.state = State::Active(noop_active());

        let traced = interceptor.on_send(record()).unwrap();
        // Unsampled context is still written so downstream hops stay consistent.
        let raw = traced.headers.last_value(B3_HEADER).unwrap();
        assert!(std::str::from_utf8(raw).unwrap().ends_with("-0"));
    }

    #[tokio::test]
    async fn zero_rate_configuration_disables_recording() {
        let mut interceptor = TracingProducerInterceptor::new();
        let config = TracingConfig::new().with(SAMPLER_RATE_CONFIG, "0.0");
        interceptor.configure(&config).await.unwrap();
        let traced = interceptor.on_send(record()).unwrap();
        assert_eq!(traced.topic, "topic");
    }

    #[tokio::test]
    async fn acknowledgement_hook_is_a_noop() {
        let mut interceptor = TracingProducerInterceptor::new();
        interceptor.configure(&TracingConfig::new()).await.unwrap();
        interceptor.on_acknowledgement(&RecordMetadata {
            topic: "topic".to_string(),
            partition: 0,
            offset: 42,
        });
    }
}
