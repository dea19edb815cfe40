//! Shared test doubles

use crate::error::Result;
use crate::sink::SpanSender;
use crate::span::SpanData;
use async_trait::async_trait;
use parking_lot::Mutex;

/// Sink that captures every reported span in memory.
pub(crate) struct CaptureSender {
    spans: Mutex<Vec<SpanData>>,
    shutdown: Mutex<bool>,
}

impl CaptureSender {
    pub(crate) fn new() -> Self {
        Self {
            spans: Mutex::new(Vec::new()),
            shutdown: Mutex::new(false),
        }
    }

    pub(crate) fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    pub(crate) fn was_shutdown(&self) -> bool {
        *self.shutdown.lock()
    }
}

#[async_trait]
impl SpanSender for CaptureSender {
    fn name(&self) -> &'static str {
        "capture"
    }

    async fn send(&self, spans: &[SpanData]) -> Result<()> {
        self.spans.lock().extend_from_slice(spans);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        *self.shutdown.lock() = true;
        Ok(())
    }
}
