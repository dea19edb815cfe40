//! Broker-native span sink
//!
//! Publishes encoded span batches back onto the message broker itself, on
//! the conventional `zipkin` topic. The underlying producer is built lazily
//! on first send, so constructing this sink performs no network I/O.

use crate::encoding::Encoding;
use crate::error::{Result, TraceError};
use crate::sink::SpanSender;
use crate::span::SpanData;
use async_trait::async_trait;
use parking_lot::Mutex;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::collections::HashMap;
use std::time::Duration;

/// Topic span batches are published to
pub const DEFAULT_TOPIC: &str = "zipkin";

/// Broker acknowledgment timeout for span publishes
const SEND_TIMEOUT_SECS: u64 = 30;

/// Kafka sender that reports spans through the broker
pub struct KafkaSender {
    bootstrap_servers: String,
    topic: String,
    encoding: Encoding,
    overrides: HashMap<String, String>,
    producer: Mutex<Option<FutureProducer>>,
}

impl KafkaSender {
    /// Create a sender for the given bootstrap address
    ///
    /// `overrides` are forwarded verbatim to the producer's client
    /// configuration; the bootstrap-servers key is resolved separately and
    /// must not appear in them.
    pub fn new(
        bootstrap_servers: impl Into<String>,
        encoding: Encoding,
        overrides: HashMap<String, String>,
    ) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            topic: DEFAULT_TOPIC.to_string(),
            encoding,
            overrides,
            producer: Mutex::new(None),
        }
    }

    /// The resolved bootstrap address
    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }

    /// The configured span encoding
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Passthrough client configuration forwarded to the producer
    pub fn overrides(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    /// Get or lazily create the producer
    fn get_producer(&self) -> Result<FutureProducer> {
        let mut guard = self.producer.lock();
        if let Some(producer) = guard.as_ref() {
            return Ok(producer.clone());
        }

        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        for (key, value) in &self.overrides {
            config.set(key, value);
        }
        let producer: FutureProducer = config
            .create()
            .map_err(|e| TraceError::Connection(e.to_string()))?;

        *guard = Some(producer.clone());
        Ok(producer)
    }
}

#[async_trait]
impl SpanSender for KafkaSender {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn send(&self, spans: &[SpanData]) -> Result<()> {
        let payload = self.encoding.encode(spans)?;
        let producer = self.get_producer()?;

        producer
            .send(
                FutureRecord::<(), Vec<u8>>::to(&self.topic).payload(&payload),
                Timeout::After(Duration::from_secs(SEND_TIMEOUT_SECS)),
            )
            .await
            .map_err(|(e, _)| TraceError::Send(e.to_string()))?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(producer) = self.producer.lock().take() {
            producer
                .flush(Timeout::After(Duration::from_secs(SEND_TIMEOUT_SECS)))
                .map_err(|e| TraceError::Shutdown(e.to_string()))?;
        }
        Ok(())
    }
}
