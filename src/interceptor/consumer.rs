//! Consumer-side interceptor
//!
//! Sees each polled batch once, before the application does. Records that
//! arrive carrying trace context each get their own `CONSUMER` span
//! continuing that trace; records without context are grouped under one
//! shared "poll" span per topic, so an uninstrumented producer does not
//! explode a large poll into hundreds of root spans.

use super::{activate, Active, State};
use crate::config::TracingConfig;
use crate::error::Result;
use crate::propagation;
use crate::record::{ConsumerRecord, ConsumerRecords, TopicPartition};
use crate::span::{Span, SpanKind};
use crate::tag_keys;
use tracing::debug;

/// Intercepts polled batches and traces each record's consumption.
pub struct TracingConsumerInterceptor {
    state: State,
}

impl Default for TracingConsumerInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingConsumerInterceptor {
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
                "consumer interceptor already configured".to_string(),
            ));
        }
        self.state = State::Active(activate(config)?);
        Ok(())
    }

    /// Trace one polled batch.
    ///
    /// Partition membership, record identity and ordering are preserved;
    /// only header contents change. Empty batches and no-op tracers pass
    /// through untouched.
    ///
    /// # Errors
    /// [`TraceError::NotConfigured`](crate::TraceError::NotConfigured) when
    /// invoked before `configure`.
    pub fn on_consume(&self, mut records: ConsumerRecords) -> Result<ConsumerRecords> {
        let active = self.state.active()?;
        if records.is_empty() || active.tracer.is_noop() {
            return Ok(records);
        }

        // Shared span per topic, scoped to this batch only. Batches are
        // small in topic count, so a linear scan beats a map.
        let mut shared: Vec<(String, Span)> = Vec::new();
        let mut continued = 0usize;

        for (partition, partition_records) in records.partitions_mut() {
            for record in partition_records.iter_mut() {
                let extraction = propagation::extract(&record.headers);
                if extraction.has_context() {
                    self.trace_continued(active, partition, record, &extraction);
                    continued += 1;
                } else {
                    let idx = match shared.iter().position(|(t, _)| *t == partition.topic) {
                        Some(idx) => idx,
                        None => {
                            let span = self.start_shared(active, partition, &extraction);
                            shared.push((partition.topic.clone(), span));
                            shared.len() - 1
                        }
                    };
                    if let Some((_, span)) = shared.get(idx) {
                        propagation::inject(span.context(), &mut record.headers);
                    }
                }
            }
        }

        debug!(
            count = records.count(),
            continued,
            shared = shared.len(),
            "batch traced"
        );
        for (_, span) in shared {
            span.finish();
        }
        Ok(records)
    }

    /// A record that arrived with upstream context gets a dedicated span
    /// continuing that trace, finished immediately.
    fn trace_continued(
        &self,
        active: &Active,
        partition: &TopicPartition,
        record: &mut ConsumerRecord,
        extraction: &propagation::Extraction,
    ) {
        let mut span = active.tracer.next_span(extraction);
        if !span.is_noop() {
            span.name("on_consume")
                .kind(SpanKind::Consumer)
                .remote_service_name(&active.remote_service_name)
                .tag(tag_keys::KAFKA_TOPIC, &partition.topic);
            if let Some(client_id) = &active.client_id {
                span.tag(tag_keys::KAFKA_CLIENT_ID, client_id);
            }
            if let Some(group_id) = &active.group_id {
                span.tag(tag_keys::KAFKA_GROUP_ID, group_id);
            }
            span.start();
        }
        propagation::clear(&mut record.headers);
        propagation::inject(span.context(), &mut record.headers);
        span.finish();
    }

    /// First context-less record of a topic opens the topic's shared span;
    /// later ones join it.
    fn start_shared(
        &self,
        active: &Active,
        partition: &TopicPartition,
        extraction: &propagation::Extraction,
    ) -> Span {
        let mut span = active.tracer.next_span(extraction);
        if !span.is_noop() {
            span.name("poll")
                .kind(SpanKind::Consumer)
                .remote_service_name(&active.remote_service_name)
                .tag(tag_keys::KAFKA_TOPIC, &partition.topic);
            if let Some(client_id) = &active.client_id {
                span.tag(tag_keys::KAFKA_CLIENT_ID, client_id);
            }
            if let Some(group_id) = &active.group_id {
                span.tag(tag_keys::KAFKA_GROUP_ID, group_id);
            }
            span.start();
        }
        span
    }

    /// Offset-commit hook; intentionally does nothing.
    pub fn on_commit(&self) {}

    /// Flush in-flight spans and disarm. Idempotent.
    pub async fn close(&mut self) {
        if let State::Active(active) = &self.state {
            active.tracer.close().await;
        }
        self.state = State::Unconfigured;
    }
}
