//! JALKI - Zipkin-style tracing interceptors for Kafka clients
//!
//! Instruments a Kafka-like client's produce/consume path: propagates trace
//! context through record headers and emits one span per send (and a grouped
//! span per topic per poll) to a configurable Zipkin sink.
//!
//! # Pipeline
//!
//! ```text
//! host client ──► interceptor ──► tracer ──► async reporter ──► sink
//!                     │                                          (HTTP / Kafka / none)
//!                     └─► record headers (b3 inject/extract)
//! ```
//!
//! Interceptors are configured once from the host client's flat key/value
//! configuration and then invoked per record (produce) or per batch (consume).
//! Tracing failures never disrupt record delivery: span export is
//! fire-and-forget into the reporter's own buffering task.
//!
//! # Example
//!
//! ```ignore
//! use jalki::{TracingConfig, TracingProducerInterceptor, ProducerRecord};
//!
//! let config = TracingConfig::new()
//!     .with(jalki::config::SENDER_TYPE_CONFIG, "HTTP")
//!     .with(jalki::config::SAMPLER_RATE_CONFIG, "0.1");
//!
//! let mut interceptor = TracingProducerInterceptor::new();
//! interceptor.configure(&config).await?;
//!
//! let record = ProducerRecord::new("orders", Some("order-1"), payload);
//! let record = interceptor.on_send(record)?; // headers now carry b3 context
//! ```

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod builder;
pub mod config;
pub mod context;
pub mod encoding;
pub mod error;
pub mod interceptor;
pub mod propagation;
pub mod record;
pub mod sampler;
pub mod sink;
pub mod span;
pub mod tag_keys;
pub mod tracer;

pub use builder::{SenderType, TracingBuilder};
pub use config::{ConfigValue, TracingConfig};
pub use context::TraceContext;
pub use encoding::Encoding;
pub use error::{Result, TraceError};
pub use interceptor::{TracingConsumerInterceptor, TracingProducerInterceptor};
pub use propagation::Extraction;
pub use record::{
    ConsumerRecord, ConsumerRecords, Headers, ProducerRecord, RecordMetadata, TopicPartition,
};
pub use sink::HttpSender;
#[cfg(feature = "kafka")]
pub use sink::KafkaSender;
pub use sink::SpanSender;
pub use span::{Span, SpanData, SpanKind};
pub use tracer::Tracer;

#[cfg(test)]
pub(crate) mod testutil;
