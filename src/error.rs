//! Error types for JALKI

use thiserror::Error;

/// Result type alias for JALKI operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Main error type for JALKI
///
/// Transport errors from optional sink backends are carried as strings so
/// the error type stays the same regardless of which sinks are compiled in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// Operator misconfiguration that must fail interceptor setup loudly:
    /// unknown sender type, unknown encoding, missing bootstrap servers.
    #[error("configuration error: {0}")]
    Config(String),

    /// A hook was invoked before `configure`, or after `close`.
    #[error("interceptor is not configured")]
    NotConfigured,

    /// Span batch could not be delivered to the sink.
    #[error("send failed: {0}")]
    Send(String),

    /// Sink connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// Span batch could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Graceful shutdown failed.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}
