//! Produce/consume interceptors
//!
//! The two interceptors share a strict two-phase lifecycle: constructed
//! inert, armed exactly once by `configure`, then invoked per record or per
//! batch until `close`. Hooks on an unconfigured interceptor are rejected
//! rather than silently skipped, so a wiring mistake surfaces immediately.

mod consumer;
mod producer;

pub use consumer::TracingConsumerInterceptor;
pub use producer::TracingProducerInterceptor;

use crate::builder::TracingBuilder;
use crate::config::{self, TracingConfig};
use crate::error::{Result, TraceError};
use crate::tracer::Tracer;

/// The armed half of the lifecycle: everything a hook invocation reads.
struct Active {
    tracer: Tracer,
    remote_service_name: String,
    client_id: Option<String>,
    group_id: Option<String>,
}

enum State {
    Unconfigured,
    Active(Active),
}

impl State {
    fn active(&self) -> Result<&Active> {
        match self {
            State::Active(active) => Ok(active),
            State::Unconfigured => Err(TraceError::NotConfigured),
        }
    }
}

/// Resolve configuration into the armed state. Shared by both interceptors;
/// each gets its own tracer and reporter.
fn activate(config: &TracingConfig) -> Result<Active> {
    let tracer = TracingBuilder::new(config).build()?;
    Ok(Active {
        tracer,
        remote_service_name: config.get_string_or_default(
            config::REMOTE_SERVICE_NAME_CONFIG,
            config::REMOTE_SERVICE_NAME_DEFAULT,
        ),
        client_id: config.get_string(config::CLIENT_ID_CONFIG),
        group_id: config.get_string(config::GROUP_ID_CONFIG),
    })
}

#[cfg(test)]
mod testsupport {
    use super::*;
    use crate::sampler::Sampler;
    use crate::testutil::CaptureSender;
    use std::sync::Arc;

    /// Armed state wired to an in-memory sink, for hook tests.
    pub(super) fn capture_active(group_id: Option<&str>) -> (Arc<CaptureSender>, Active) {
        let sender = Arc::new(CaptureSender::new());
        let tracer = Tracer::new(Sampler::new(1.0), Some(sender.clone()), "kafka-client", true);
        let active = Active {
            tracer,
            remote_service_name: "kafka".to_string(),
            client_id: Some("client-1".to_string()),
            group_id: group_id.map(str::to_string),
        };
        (sender, active)
    }

    pub(super) fn noop_active() -> Active {
        Active {
            tracer: Tracer::new(Sampler::never(), None, "kafka-client", true),
            remote_service_name: "kafka".to_string(),
            client_id: None,
            group_id: None,
        }
    }
}
