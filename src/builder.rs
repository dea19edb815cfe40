//! Tracer assembly from flat configuration
//!
//! [`TracingBuilder`] turns the host client's properties into a running
//! [`Tracer`]: it resolves the sink transport, encoding, sampling rate and
//! identity, failing fast on unknown closed-set values and falling back
//! safely on invalid open-set ones.

use crate::config::{self, TracingConfig};
use crate::encoding::Encoding;
use crate::error::{Result, TraceError};
use crate::sampler::Sampler;
use crate::sink::{HttpSender, SpanSender};
use crate::tracer::Tracer;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sink transport selected by `zipkin.sender.type`.
///
/// Closed set: anything else is a configuration error, surfaced at setup
/// time rather than silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderType {
    /// Spans are created and sampled but never exported
    None,
    /// Report to a Zipkin collector over HTTP
    Http,
    /// Report onto the broker's `zipkin` topic
    Kafka,
}

impl FromStr for SenderType {
    type Err = TraceError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "NONE" => Ok(SenderType::None),
            "HTTP" => Ok(SenderType::Http),
            "KAFKA" => Ok(SenderType::Kafka),
            other => Err(TraceError::Config(format!(
                "zipkin sender type unknown: {other}"
            ))),
        }
    }
}

/// Builds a [`Tracer`] from a [`TracingConfig`].
pub struct TracingBuilder {
    config: TracingConfig,
    local_service_name: String,
    trace_id_128bit: bool,
}

impl TracingBuilder {
    /// Capture the identity settings up front; everything else is resolved
    /// during [`build`](Self::build).
    pub fn new(config: &TracingConfig) -> Self {
        let local_service_name = config.get_string_or_default(
            config::LOCAL_SERVICE_NAME_CONFIG,
            config::LOCAL_SERVICE_NAME_DEFAULT,
        );
        let trace_id_128bit = config
            .get_string_or_default(
                config::TRACE_ID_128BIT_ENABLED_CONFIG,
                config::TRACE_ID_128BIT_ENABLED_DEFAULT,
            )
            .eq_ignore_ascii_case("true");
        Self {
            config: config.clone(),
            local_service_name,
            trace_id_128bit,
        }
    }

    /// The resolved local endpoint service name
    pub fn local_service_name(&self) -> &str {
        &self.local_service_name
    }

    /// Assemble the tracer
    ///
    /// Must run inside a tokio runtime when a sink is configured, since the
    /// reporter task is spawned here.
    ///
    /// # Errors
    /// Unknown sender type or encoding, and a `KAFKA` sink with no
    /// resolvable bootstrap servers.
    pub fn build(&self) -> Result<Tracer> {
        let encoding = encoding_from(&self.config)?;
        let sampler = sampler_from(&self.config);
        let sender = sender_from(&self.config, encoding)?;
        debug!(
            local_service_name = %self.local_service_name,
            trace_id_128bit = self.trace_id_128bit,
            sink = sender.as_ref().map(|s| s.name()).unwrap_or("none"),
            "tracer assembled"
        );
        Ok(Tracer::new(
            sampler,
            sender,
            &self.local_service_name,
            self.trace_id_128bit,
        ))
    }
}

fn encoding_from(config: &TracingConfig) -> Result<Encoding> {
    config
        .get_string_or_default(config::ENCODING_CONFIG, config::ENCODING_DEFAULT)
        .parse()
}

/// Resolve the sampler from the configured rate. A rate outside `(0, 1]` or
/// one that does not parse as a number disables sampling rather than failing
/// the whole client.
fn sampler_from(config: &TracingConfig) -> Sampler {
    let raw =
        config.get_string_or_default(config::SAMPLER_RATE_CONFIG, config::SAMPLER_RATE_DEFAULT);
    match raw.parse::<f64>() {
        Ok(rate) if rate > 0.0 && rate <= 1.0 && !rate.is_nan() => Sampler::new(rate),
        Ok(rate) => {
            warn!(
                rate,
                "invalid sampler rate, must be in (0, 1]; tracing disabled"
            );
            Sampler::never()
        }
        Err(_) => {
            warn!(rate = %raw, "sampler rate is not a number; tracing disabled");
            Sampler::never()
        }
    }
}

fn sender_from(
    config: &TracingConfig,
    encoding: Encoding,
) -> Result<Option<Arc<dyn SpanSender>>> {
    let sender_type: SenderType = config
        .get_string_or_default(config::SENDER_TYPE_CONFIG, config::SENDER_TYPE_DEFAULT)
        .parse()?;
    match sender_type {
        SenderType::None => Ok(None),
        SenderType::Http => {
            let endpoint = config.get_string_or_default(
                config::HTTP_ENDPOINT_CONFIG,
                config::HTTP_ENDPOINT_DEFAULT,
            );
            Ok(Some(Arc::new(HttpSender::new(endpoint, encoding))))
        }
        SenderType::Kafka => kafka_sender_from(config, encoding),
    }
}

fn kafka_sender_from(
    config: &TracingConfig,
    encoding: Encoding,
) -> Result<Option<Arc<dyn SpanSender>>> {
    let bootstrap_servers = kafka_bootstrap_servers(config)?;
    let overrides = config.overrides(
        config::KAFKA_OVERRIDE_PREFIX,
        config::KAFKA_BOOTSTRAP_SERVERS_CONFIG,
    );
    #[cfg(feature = "kafka")]
    {
        Ok(Some(Arc::new(crate::sink::KafkaSender::new(
            bootstrap_servers,
            encoding,
            overrides,
        ))))
    }
    #[cfg(not(feature = "kafka"))]
    {
        let _ = (bootstrap_servers, encoding, overrides);
        Err(TraceError::Config(
            "KAFKA sender requires the `kafka` feature".to_string(),
        ))
    }
}

/// Bootstrap servers for the Kafka sink, in precedence order: the dedicated
/// `zipkin.kafka.bootstrap.servers` key, then the host client's own
/// `bootstrap.servers` as a scalar, then as a list.
fn kafka_bootstrap_servers(config: &TracingConfig) -> Result<String> {
    config
        .get_string_or_string_list(config::KAFKA_BOOTSTRAP_SERVERS_CONFIG)
        .or_else(|| config.get_string(config::BOOTSTRAP_SERVERS_CONFIG))
        .or_else(|| config.get_string_list(config::BOOTSTRAP_SERVERS_CONFIG))
        .ok_or_else(|| {
            TraceError::Config("no bootstrap servers resolvable for KAFKA sender".to_string())
        })
}
