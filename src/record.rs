//! Record and header types for the host pipeline
//!
//! The host client owns these at runtime; the interceptors only borrow them
//! for the duration of a hook call and mutate nothing but header contents.
//!
//! Payloads use `Bytes` so cloning a record never copies the body.

use bytes::Bytes;

/// A single record header: string key, opaque byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header key
    pub key: String,
    /// Header value bytes
    pub value: Vec<u8>,
}

/// Ordered multimap of record headers.
///
/// Duplicate keys are allowed; reads resolve to the *last* value for a key,
/// matching broker header semantics. Mutated in place by the interceptors
/// before/after context propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    /// Create an empty header set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping any existing values for the same key
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.0.push(Header {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Remove every header with the given key
    pub fn remove(&mut self, key: &str) {
        self.0.retain(|h| h.key != key);
    }

    /// Last value for a key, if any
    pub fn last_value(&self, key: &str) -> Option<&[u8]> {
        self.0
            .iter()
            .rev()
            .find(|h| h.key == key)
            .map(|h| h.value.as_slice())
    }

    /// Iterate headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    /// Number of headers, duplicates included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no headers are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An outgoing record, intercepted once before it reaches the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerRecord {
    /// Destination topic
    pub topic: String,
    /// Optional record key
    pub key: Option<String>,
    /// Record payload
    pub payload: Bytes,
    /// Record headers, mutated in place by the interceptor
    pub headers: Headers,
}

impl ProducerRecord {
    /// Create a record with empty headers
    pub fn new(topic: impl Into<String>, key: Option<&str>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            key: key.map(str::to_string),
            payload: payload.into(),
            headers: Headers::new(),
        }
    }
}

/// An incoming record delivered by one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerRecord {
    /// Source topic
    pub topic: String,
    /// Source partition
    pub partition: i32,
    /// Offset within the partition
    pub offset: i64,
    /// Optional record key
    pub key: Option<String>,
    /// Record payload
    pub payload: Bytes,
    /// Record headers, mutated in place by the interceptor
    pub headers: Headers,
}

impl ConsumerRecord {
    /// Create a record with empty headers
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        key: Option<&str>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: key.map(str::to_string),
            payload: payload.into(),
            headers: Headers::new(),
        }
    }
}

/// A topic/partition pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    /// Topic name
    pub topic: String,
    /// Partition number
    pub partition: i32,
}

impl TopicPartition {
    /// Create a topic/partition pair
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// The batch delivered to one consume-hook invocation: an ordered collection
/// of partitions, each holding records in arrival order.
///
/// The interceptor never alters partition membership, record identity or
/// ordering; only header contents of individual records change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerRecords {
    partitions: Vec<(TopicPartition, Vec<ConsumerRecord>)>,
}

impl ConsumerRecords {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from partition groups, preserving their order
    pub fn from_partitions(
        partitions: impl IntoIterator<Item = (TopicPartition, Vec<ConsumerRecord>)>,
    ) -> Self {
        Self {
            partitions: partitions.into_iter().collect(),
        }
    }

    /// True when the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(|(_, records)| records.is_empty())
    }

    /// Total record count across partitions
    pub fn count(&self) -> usize {
        self.partitions.iter().map(|(_, records)| records.len()).sum()
    }

    /// Partition groups in delivery order
    pub fn partitions(&self) -> &[(TopicPartition, Vec<ConsumerRecord>)] {
        &self.partitions
    }

    /// Mutable access for header rewriting
    pub(crate) fn partitions_mut(&mut self) -> &mut [(TopicPartition, Vec<ConsumerRecord>)] {
        &mut self.partitions
    }
}

/// Broker acknowledgment metadata handed to the no-op acknowledge hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    /// Destination topic
    pub topic: String,
    /// Assigned partition
    pub partition: i32,
    /// Assigned offset
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_value_wins_for_duplicate_keys() {
        let mut headers = Headers::new();
        headers.append("b3", b"first".to_vec());
        headers.append("other", b"x".to_vec());
        headers.append("b3", b"second".to_vec());

        assert_eq!(headers.last_value("b3"), Some(b"second".as_slice()));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn remove_drops_every_value_for_a_key() {
        let mut headers = Headers::new();
        headers.append("b3", b"a".to_vec());
        headers.append("b3", b"b".to_vec());
        headers.append("keep", b"c".to_vec());

        headers.remove("b3");

        assert_eq!(headers.last_value("b3"), None);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.last_value("keep"), Some(b"c".as_slice()));
    }

    #[test]
    fn missing_key_reads_none() {
        let headers = Headers::new();
        assert_eq!(headers.last_value("b3"), None);
    }

    #[test]
    fn batch_counts_records_across_partitions() {
        let records = ConsumerRecords::from_partitions(vec![
            (
                TopicPartition::new("topic", 0),
                vec![
                    ConsumerRecord::new("topic", 0, 0, Some("k"), Bytes::from_static(b"v")),
                    ConsumerRecord::new("topic", 0, 1, Some("k"), Bytes::from_static(b"v")),
                ],
            ),
            (
                TopicPartition::new("topic", 1),
                vec![ConsumerRecord::new(
                    "topic",
                    1,
                    0,
                    Some("k"),
                    Bytes::from_static(b"v"),
                )],
            ),
        ]);
        assert_eq!(records.count(), 3);
        assert!(!records.is_empty());
        assert!(ConsumerRecords::new().is_empty());
    }
}
