//! Tracing configuration accessor
//!
//! Wraps the flat, untyped key/value properties supplied by the host Kafka
//! client and gives typed access to them. Values are either a scalar string
//! or a list of strings; anything else is treated as absent and logged, never
//! raised as an error.

use std::collections::HashMap;
use tracing::warn;

/// Sink transport selector: `NONE`, `HTTP` or `KAFKA`.
pub const SENDER_TYPE_CONFIG: &str = "zipkin.sender.type";
/// Default sink transport (spans are created but never exported).
pub const SENDER_TYPE_DEFAULT: &str = "NONE";
/// Zipkin collector endpoint for the HTTP sink.
pub const HTTP_ENDPOINT_CONFIG: &str = "zipkin.http.endpoint";
/// Default local collector URL.
pub const HTTP_ENDPOINT_DEFAULT: &str = "http://localhost:9411/api/v2/spans";
/// Bootstrap servers for the Kafka sink. Falls back to the generic client
/// `bootstrap.servers` setting when unset.
pub const KAFKA_BOOTSTRAP_SERVERS_CONFIG: &str = "zipkin.kafka.bootstrap.servers";
/// Prefix for passthrough settings forwarded verbatim to the Kafka sink's
/// own client configuration (e.g. `zipkin.kafka.acks` forwards `acks`).
pub const KAFKA_OVERRIDE_PREFIX: &str = "zipkin.kafka.";
/// Service name reported as the span's local endpoint.
pub const LOCAL_SERVICE_NAME_CONFIG: &str = "zipkin.local.service.name";
/// Default local service name.
pub const LOCAL_SERVICE_NAME_DEFAULT: &str = "kafka-client";
/// Service name reported as the span's remote endpoint.
pub const REMOTE_SERVICE_NAME_CONFIG: &str = "zipkin.remote.service.name";
/// Default remote service name.
pub const REMOTE_SERVICE_NAME_DEFAULT: &str = "kafka";
/// Whether generated trace IDs are 128-bit (16 hex chars high + low) or 64-bit.
pub const TRACE_ID_128BIT_ENABLED_CONFIG: &str = "zipkin.trace.id.128bit.enabled";
/// 128-bit trace IDs are enabled by default.
pub const TRACE_ID_128BIT_ENABLED_DEFAULT: &str = "true";
/// Span wire encoding: `JSON` or `PROTO3`.
pub const ENCODING_CONFIG: &str = "zipkin.encoding";
/// Default span encoding.
pub const ENCODING_DEFAULT: &str = "JSON";
/// Decimal sampling rate in `(0, 1]`.
pub const SAMPLER_RATE_CONFIG: &str = "zipkin.sampler.rate";
/// Default sampling rate (trace everything).
pub const SAMPLER_RATE_DEFAULT: &str = "1.0";

/// Host client keys read for span tags and bootstrap fallback.
pub const BOOTSTRAP_SERVERS_CONFIG: &str = "bootstrap.servers";
/// Host client id, tagged on every recording span.
pub const CLIENT_ID_CONFIG: &str = "client.id";
/// Consumer group id, tagged on consumer spans.
pub const GROUP_ID_CONFIG: &str = "group.id";

/// A configuration value as supplied by the host client: a scalar string or
/// a list of strings. Any other shape the host might hold is not represented
/// and reads as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    /// Scalar string value
    String(String),
    /// List-of-strings value, joined with `,` on read
    List(Vec<String>),
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::List(value)
    }
}

impl From<Vec<&str>> for ConfigValue {
    fn from(value: Vec<&str>) -> Self {
        ConfigValue::List(value.into_iter().map(str::to_string).collect())
    }
}

/// Immutable flat configuration map, supplied once at interceptor setup and
/// read many times. Nothing in this crate mutates it after `configure`.
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    entries: HashMap<String, ConfigValue>,
}

impl TracingConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for wiring and tests
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Value as a scalar string. Missing keys and non-scalar values read as
    /// `None` with a warning.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(ConfigValue::String(value)) => Some(value.clone()),
            _ => {
                warn!(key, "string value not found in properties");
                None
            }
        }
    }

    /// Same lookup as [`get_string`](Self::get_string), substituting
    /// `default` on miss.
    pub fn get_string_or_default(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// List value joined with `,`. Scalar or missing values read as `None`
    /// with a warning.
    pub fn get_string_list(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(ConfigValue::List(values)) => Some(values.join(",")),
            _ => {
                warn!(key, "list value not found in properties");
                None
            }
        }
    }

    /// List-join if the value is list-typed, else the scalar lookup.
    pub fn get_string_or_string_list(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(ConfigValue::List(values)) => Some(values.join(",")),
            _ => self.get_string(key),
        }
    }

    /// Collect passthrough overrides for a sink client: every key starting
    /// with `prefix` except `exclude_key` is copied with the prefix stripped.
    /// Empty values are skipped. This forwards arbitrary settings without the
    /// factory needing to know every possible key in advance.
    pub fn overrides(&self, prefix: &str, exclude_key: &str) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for key in self.entries.keys() {
            if !key.starts_with(prefix) || key == exclude_key {
                continue;
            }
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };
            if let Some(value) = self.get_string_or_string_list(key) {
                if !value.is_empty() {
                    result.insert(stripped.to_string(), value);
                }
            }
        }
        result
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for TracingConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for TracingConfig {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}
