//! HTTP span sink
//!
//! POSTs encoded span batches to a Zipkin-compatible collector endpoint.

use crate::encoding::Encoding;
use crate::error::{Result, TraceError};
use crate::sink::SpanSender;
use crate::span::SpanData;
use async_trait::async_trait;
use std::time::Duration;

/// Request timeout for collector POSTs
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP sender that reports spans to a collector URL
pub struct HttpSender {
    endpoint: String,
    encoding: Encoding,
    client: reqwest::Client,
}

impl HttpSender {
    /// Create a sender for the given collector endpoint
    pub fn new(endpoint: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            endpoint: endpoint.into(),
            encoding,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The configured collector endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured span encoding
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

#[async_trait]
impl SpanSender for HttpSender {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn send(&self, spans: &[SpanData]) -> Result<()> {
        let payload = self.encoding.encode(spans)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", self.encoding.content_type())
            .body(payload)
            .send()
            .await
            .map_err(|e| TraceError::Connection(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| TraceError::Send(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_keeps_endpoint_and_encoding() {
        let sender = HttpSender::new("http://localhost:9411/api/v2/spans", Encoding::Json);
        assert_eq!(sender.name(), "http");
        assert_eq!(sender.endpoint(), "http://localhost:9411/api/v2/spans");
        assert_eq!(sender.encoding(), Encoding::Json);
    }
}
