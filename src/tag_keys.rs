//! Reserved tag key constants for interceptor spans
//!
//! Fixed keys tagged on every span the produce/consume interceptors create.

/// Topic the record was sent to or received from
pub const KAFKA_TOPIC: &str = "kafka.topic";

/// Record key, tagged on producer spans when it is a non-empty string
pub const KAFKA_KEY: &str = "kafka.key";

/// Host client id
pub const KAFKA_CLIENT_ID: &str = "kafka.client.id";

/// Consumer group id
pub const KAFKA_GROUP_ID: &str = "kafka.group.id";
