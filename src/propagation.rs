//! Context propagation through record headers
//!
//! Serializes trace context into the single `b3` header using the B3 single
//! text format: `{trace_id}-{span_id}[-{1|0|d}[-{parent_span_id}]]`, plus the
//! one-character sampling-only forms `0`, `1` and `d`.
//!
//! Write discipline: always remove existing values for a propagation key
//! before appending, so a header set leaving an interceptor carries at most
//! one current encoding. Read discipline: last value wins; malformed bytes
//! degrade to [`Extraction::Missing`], never an error.

use crate::context::TraceContext;
use crate::record::Headers;

/// The B3 single propagation header key.
pub const B3_HEADER: &str = "b3";

/// Every header key this codec owns. Stripped wholesale when a fresh context
/// replaces a prior hop's.
pub const PROPAGATION_HEADERS: &[&str] = &[B3_HEADER];

/// Outcome of reading trace context out of a header set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A full trace context was present
    Context(TraceContext),
    /// Only a bare sampling decision was present, no request-scoped data
    Decision(bool),
    /// Nothing usable was found
    Missing,
}

impl Extraction {
    /// True when request-scoped context was extracted
    pub fn has_context(&self) -> bool {
        matches!(self, Extraction::Context(_))
    }
}

/// Write `context` into `headers`, replacing any prior value under the
/// propagation key. Existing values under *other* propagation keys are left
/// alone; callers that need a clean slate call [`clear`] first.
pub fn inject(context: &TraceContext, headers: &mut Headers) {
    headers.remove(B3_HEADER);
    headers.append(B3_HEADER, encode(context).into_bytes());
}

/// Remove every propagation header, discarding any prior hop's context.
pub fn clear(headers: &mut Headers) {
    for key in PROPAGATION_HEADERS {
        headers.remove(key);
    }
}

/// Read the last propagation header value and parse it. Absent or malformed
/// values yield [`Extraction::Missing`].
pub fn extract(headers: &Headers) -> Extraction {
    let Some(raw) = headers.last_value(B3_HEADER) else {
        return Extraction::Missing;
    };
    let Ok(value) = std::str::from_utf8(raw) else {
        return Extraction::Missing;
    };
    decode(value)
}

fn encode(context: &TraceContext) -> String {
    let mut out = format!("{}-{}", context.trace_id_hex(), context.span_id_hex());
    if let Some(sampled) = context.sampled {
        out.push('-');
        out.push(if sampled { '1' } else { '0' });
        if let Some(parent) = context.parent_span_id_hex() {
            out.push('-');
            out.push_str(&parent);
        }
    }
    out
}

fn decode(value: &str) -> Extraction {
    // Sampling-only form: a single sampling state character.
    match value {
        "0" => return Extraction::Decision(false),
        "1" | "d" => return Extraction::Decision(true),
        _ => {}
    }

    let mut parts = value.split('-');
    let (Some(trace), Some(span)) = (parts.next(), parts.next()) else {
        return Extraction::Missing;
    };
    let Some(trace_id) = parse_trace_id(trace) else {
        return Extraction::Missing;
    };
    let Some(span_id) = parse_span_id(span) else {
        return Extraction::Missing;
    };
    let sampled = match parts.next() {
        None => None,
        Some("0") => Some(false),
        Some("1") | Some("d") => Some(true),
        Some(_) => return Extraction::Missing,
    };
    let parent_span_id = match parts.next() {
        None => None,
        Some(parent) => match parse_span_id(parent) {
            Some(id) => Some(id),
            None => return Extraction::Missing,
        },
    };
    if parts.next().is_some() {
        return Extraction::Missing;
    }
    Extraction::Context(TraceContext {
        trace_id,
        span_id,
        parent_span_id,
        sampled,
    })
}

fn parse_trace_id(value: &str) -> Option<u128> {
    if value.len() != 16 && value.len() != 32 {
        return None;
    }
    u128::from_str_radix(value, 16).ok()
}

fn parse_span_id(value: &str) -> Option<u64> {
    if value.len() != 16 {
        return None;
    }
    u64::from_str_radix(value, 16).ok()
}
