//! Trace context identifiers
//!
//! A [`TraceContext`] locates one span within a distributed trace. Contexts
//! are immutable once created: the tracer mints them, the propagation codec
//! serializes them into record headers.

use std::fmt;

/// Position of a span in a distributed trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// Trace identifier. 64-bit traces keep the high bits zero.
    pub trace_id: u128,
    /// This span's identifier
    pub span_id: u64,
    /// Parent span identifier, absent for root spans
    pub parent_span_id: Option<u64>,
    /// Sampling decision carried with the context, if one was made
    pub sampled: Option<bool>,
}

impl TraceContext {
    /// Hex form of the trace ID: 16 chars when the high 64 bits are zero,
    /// 32 chars otherwise.
    pub fn trace_id_hex(&self) -> String {
        if self.trace_id >> 64 == 0 {
            format!("{:016x}", self.trace_id as u64)
        } else {
            format!("{:032x}", self.trace_id)
        }
    }

    /// Hex form of the span ID (16 chars)
    pub fn span_id_hex(&self) -> String {
        format!("{:016x}", self.span_id)
    }

    /// Hex form of the parent span ID, if any
    pub fn parent_span_id_hex(&self) -> Option<String> {
        self.parent_span_id.map(|id| format!("{id:016x}"))
    }

    /// True when this context carries an explicit "record this trace" decision
    pub fn is_sampled(&self) -> bool {
        self.sampled == Some(true)
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.trace_id_hex(), self.span_id_hex())
    }
}
