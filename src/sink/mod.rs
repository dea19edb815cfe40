//! Span sinks
//!
//! Sinks transport finished span batches to a tracing backend. The reporter
//! fans batches into exactly one sink; failures are logged there and never
//! reach the produce/consume hot path.

#[cfg(feature = "kafka")]
pub mod kafka;

pub mod http;

use crate::error::Result;
use crate::span::SpanData;
use async_trait::async_trait;

pub use http::HttpSender;
#[cfg(feature = "kafka")]
pub use kafka::KafkaSender;

/// Span sink transport
///
/// Implementations must be `Send + Sync`: one sink instance is shared by the
/// reporter task and whoever drives shutdown.
#[async_trait]
pub trait SpanSender: Send + Sync {
    /// Sink name for identification and logging
    fn name(&self) -> &'static str;

    /// Deliver one encoded span batch to the backend
    ///
    /// # Errors
    /// Any delivery failure. The reporter logs it and drops the batch;
    /// tracing never disrupts record delivery.
    async fn send(&self, spans: &[SpanData]) -> Result<()>;

    /// Graceful shutdown: flush buffers, close connections
    ///
    /// Default implementation does nothing.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
