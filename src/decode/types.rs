//! Event types and the decoder trait

use crate::error::Result;
use crate::types::{PartitionId, Position};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of raw event bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderFormat {
    /// JSON-encoded [`StreamEvent`] (default)
    #[default]
    Json,
    /// Fixed-width little-endian encoding
    Binary,
}

/// An event as stored in the log, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Per-partition sequence number assigned by the log
    pub sequence: Position,
    /// When the log accepted the event, if the source reports it
    pub enqueued_at: Option<DateTime<Utc>>,
    /// Undecoded payload
    pub body: Bytes,
}

impl RawEvent {
    /// Create a raw event without an enqueue timestamp
    pub fn new(sequence: Position, body: impl Into<Bytes>) -> Self {
        Self {
            sequence,
            enqueued_at: None,
            body: body.into(),
        }
    }

    /// Set the enqueue timestamp
    #[must_use]
    pub fn with_enqueued_at(mut self, at: DateTime<Utc>) -> Self {
        self.enqueued_at = Some(at);
        self
    }
}

/// A decoded event as consumed by the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A data event occurring at `sync_time`
    Point {
        /// Event time in ticks
        sync_time: i64,
        /// Event payload
        payload: i64,
    },
    /// Watermark: no further event will carry an earlier `sync_time`
    Punctuation {
        /// Event time in ticks
        sync_time: i64,
    },
}

impl StreamEvent {
    /// Create a data event
    pub fn point(sync_time: i64, payload: i64) -> Self {
        Self::Point { sync_time, payload }
    }

    /// Create a punctuation
    pub fn punctuation(sync_time: i64) -> Self {
        Self::Punctuation { sync_time }
    }

    /// Event time of this event
    pub fn sync_time(&self) -> i64 {
        match self {
            Self::Point { sync_time, .. } | Self::Punctuation { sync_time } => *sync_time,
        }
    }

    /// Check if this is a data event
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Point { .. })
    }

    /// Check if this is a punctuation
    pub fn is_punctuation(&self) -> bool {
        matches!(self, Self::Punctuation { .. })
    }
}

/// A decoded event tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Partition the event was read from
    pub partition: PartitionId,
    /// Sequence number within that partition
    pub sequence: Position,
    /// When the log accepted the event, if known
    pub enqueued_at: Option<DateTime<Utc>>,
    /// Decoded payload
    pub payload: StreamEvent,
}

/// Trait for decoding raw event bodies
pub trait EventDecoder: Send + Sync {
    /// Decode a raw body into a stream event
    fn decode(&self, body: &[u8]) -> Result<StreamEvent>;

    /// Encode a stream event into a raw body
    fn encode(&self, event: &StreamEvent) -> Result<Vec<u8>>;
}
