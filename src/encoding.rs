//! Span wire encodings
//!
//! Closed set of encodings the trace sink understands. Parsing an unknown
//! encoding name is a hard configuration error, never a silent default.

use crate::error::{Result, TraceError};
use crate::span::{SpanData, SpanKind};
use prost::Message;
use std::str::FromStr;

/// Zipkin v2 proto3 wire types, kept in sync with `zipkin.proto` by hand
/// (the message set is small and stable).
pub mod proto {
    /// A batch of spans, the unit both sinks transmit.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListOfSpans {
        /// Spans in report order
        #[prost(message, repeated, tag = "1")]
        pub spans: ::prost::alloc::vec::Vec<Span>,
    }

    /// One finished span.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Span {
        /// Trace ID bytes (8 or 16)
        #[prost(bytes = "vec", tag = "1")]
        pub trace_id: ::prost::alloc::vec::Vec<u8>,
        /// Parent span ID bytes, empty for roots
        #[prost(bytes = "vec", tag = "2")]
        pub parent_id: ::prost::alloc::vec::Vec<u8>,
        /// Span ID bytes (8)
        #[prost(bytes = "vec", tag = "3")]
        pub id: ::prost::alloc::vec::Vec<u8>,
        /// Span kind
        #[prost(enumeration = "span::Kind", tag = "4")]
        pub kind: i32,
        /// Operation name
        #[prost(string, tag = "5")]
        pub name: ::prost::alloc::string::String,
        /// Start time, epoch microseconds
        #[prost(fixed64, tag = "6")]
        pub timestamp: u64,
        /// Duration in microseconds
        #[prost(uint64, tag = "7")]
        pub duration: u64,
        /// Local endpoint
        #[prost(message, optional, tag = "8")]
        pub local_endpoint: ::core::option::Option<Endpoint>,
        /// Remote endpoint
        #[prost(message, optional, tag = "9")]
        pub remote_endpoint: ::core::option::Option<Endpoint>,
        /// Tags
        #[prost(map = "string, string", tag = "11")]
        pub tags: ::std::collections::HashMap<
            ::prost::alloc::string::String,
            ::prost::alloc::string::String,
        >,
    }

    /// Nested types for [`Span`].
    pub mod span {
        /// Span kind enumeration.
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum Kind {
            /// Unknown kind
            SpanKindUnspecified = 0,
            /// Client span
            Client = 1,
            /// Server span
            Server = 2,
            /// Producer span
            Producer = 3,
            /// Consumer span
            Consumer = 4,
        }
    }

    /// A network endpoint (service name only in this crate).
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Endpoint {
        /// Logical service name
        #[prost(string, tag = "1")]
        pub service_name: ::prost::alloc::string::String,
    }
}

/// Span batch encoding selected at tracer construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Zipkin v2 JSON list
    Json,
    /// Zipkin v2 proto3 `ListOfSpans`
    Proto3,
}

impl Encoding {
    /// HTTP content type for payloads in this encoding
    pub fn content_type(&self) -> &'static str {
        match self {
            Encoding::Json => "application/json",
            Encoding::Proto3 => "application/x-protobuf",
        }
    }

    /// Encode a span batch into one sink payload
    pub fn encode(&self, spans: &[SpanData]) -> Result<Vec<u8>> {
        match self {
            Encoding::Json => {
                serde_json::to_vec(spans).map_err(|e| TraceError::Serialization(e.to_string()))
            }
            Encoding::Proto3 => {
                let list = proto::ListOfSpans {
                    spans: spans.iter().map(to_proto).collect(),
                };
                Ok(list.encode_to_vec())
            }
        }
    }
}

impl FromStr for Encoding {
    type Err = TraceError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "JSON" => Ok(Encoding::Json),
            "PROTO3" => Ok(Encoding::Proto3),
            other => Err(TraceError::Config(format!(
                "zipkin encoding unknown: {other}"
            ))),
        }
    }
}

fn to_proto(span: &SpanData) -> proto::Span {
    proto::Span {
        trace_id: hex_bytes(&span.trace_id),
        parent_id: span.parent_id.as_deref().map(hex_bytes).unwrap_or_default(),
        id: hex_bytes(&span.id),
        kind: match span.kind {
            Some(SpanKind::Producer) => proto::span::Kind::Producer as i32,
            Some(SpanKind::Consumer) => proto::span::Kind::Consumer as i32,
            None => proto::span::Kind::SpanKindUnspecified as i32,
        },
        name: span.name.clone().unwrap_or_default(),
        timestamp: span.timestamp,
        duration: span.duration,
        local_endpoint: Some(proto::Endpoint {
            service_name: span.local_endpoint.service_name.clone(),
        }),
        remote_endpoint: span.remote_endpoint.as_ref().map(|e| proto::Endpoint {
            service_name: e.service_name.clone(),
        }),
        tags: span
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

// IDs are lowercase hex strings of even length by construction.
fn hex_bytes(hex: &str) -> Vec<u8> {
    hex.as_bytes()
        .chunks(2)
        .filter_map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (*pair.get(1)? as char).to_digit(16)?;
            Some(((hi << 4) | lo) as u8)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::span::Endpoint;
    use std::collections::BTreeMap;

    fn span_data() -> SpanData {
        let mut tags = BTreeMap::new();
        tags.insert("kafka.topic".to_string(), "topic".to_string());
        SpanData {
            trace_id: "000000000000000000000000000000a1".to_string(),
            parent_id: None,
            id: "00000000000000b2".to_string(),
            kind: Some(SpanKind::Producer),
            name: Some("on_send".to_string()),
            timestamp: 1_000_000,
            duration: 25,
            local_endpoint: Endpoint {
                service_name: "kafka-client".to_string(),
            },
            remote_endpoint: Some(Endpoint {
                service_name: "kafka".to_string(),
            }),
            tags,
        }
    }

    #[test]
    fn parses_known_encodings() {
        assert_eq!("JSON".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("PROTO3".parse::<Encoding>().unwrap(), Encoding::Proto3);
    }

    #[test]
    fn unknown_encoding_fails_fast() {
        let err = "THRIFT".parse::<Encoding>().unwrap_err();
        assert!(matches!(err, TraceError::Config(_)));
    }

    #[test]
    fn json_encoding_produces_zipkin_v2_shape() {
        let payload = Encoding::Json.encode(&[span_data()]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        let span = &value.as_array().unwrap()[0];
        assert_eq!(span["traceId"], "000000000000000000000000000000a1");
        assert_eq!(span["id"], "00000000000000b2");
        assert_eq!(span["kind"], "PRODUCER");
        assert_eq!(span["name"], "on_send");
        assert_eq!(span["localEndpoint"]["serviceName"], "kafka-client");
        assert_eq!(span["remoteEndpoint"]["serviceName"], "kafka");
        assert_eq!(span["tags"]["kafka.topic"], "topic");
        assert!(span.get("parentId").is_none());
    }

    #[test]
    fn proto_encoding_round_trips() {
        let payload = Encoding::Proto3.encode(&[span_data()]).unwrap();
        let decoded = proto::ListOfSpans::decode(payload.as_slice()).unwrap();

        assert_eq!(decoded.spans.len(), 1);
        let span = &decoded.spans[0];
        assert_eq!(span.trace_id.len(), 16);
        assert_eq!(span.trace_id[15], 0xa1);
        assert_eq!(span.id, vec![0, 0, 0, 0, 0, 0, 0, 0xb2]);
        assert!(span.parent_id.is_empty());
        assert_eq!(span.kind, proto::span::Kind::Producer as i32);
        assert_eq!(span.name, "on_send");
        assert_eq!(span.tags.get("kafka.topic").unwrap(), "topic");
    }

    #[test]
    fn content_types_match_encodings() {
        assert_eq!(Encoding::Json.content_type(), "application/json");
        assert_eq!(Encoding::Proto3.content_type(), "application/x-protobuf");
    }
}
