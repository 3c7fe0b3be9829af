//! Decoder implementations
//!
//! Each decoder handles a specific body format.

use super::types::{DecoderFormat, EventDecoder, StreamEvent};
use crate::error::{Error, Result};
use bytes::{Buf, BufMut};
use std::sync::Arc;

/// Build the decoder for a configured format
pub fn decoder_for(format: DecoderFormat) -> Arc<dyn EventDecoder> {
    match format {
        DecoderFormat::Json => Arc::new(JsonEventDecoder::new()),
        DecoderFormat::Binary => Arc::new(BinaryEventDecoder::new()),
    }
}

// ============================================================================
// JSON Decoder
// ============================================================================

/// Decodes bodies of the form `{"kind":"point","sync_time":1,"payload":2}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventDecoder;

impl JsonEventDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self
    }
}

impl EventDecoder for JsonEventDecoder {
    fn decode(&self, body: &[u8]) -> Result<StreamEvent> {
        serde_json::from_slice(body).map_err(|e| Error::decode(format!("invalid JSON event: {e}")))
    }

    fn encode(&self, event: &StreamEvent) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(event)?)
    }
}

// ============================================================================
// Binary Decoder
// ============================================================================

const TAG_POINT: u8 = 0;
const TAG_PUNCTUATION: u8 = 1;

/// Encoded size: tag byte, sync time, payload
const BINARY_EVENT_LEN: usize = 1 + 8 + 8;

/// Fixed-width little-endian encoding: `tag:u8 | sync_time:i64 | payload:i64`
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryEventDecoder;

impl BinaryEventDecoder {
    /// Create a new binary decoder
    pub fn new() -> Self {
        Self
    }
}

impl EventDecoder for BinaryEventDecoder {
    fn decode(&self, body: &[u8]) -> Result<StreamEvent> {
        if body.len() != BINARY_EVENT_LEN {
            return Err(Error::decode(format!(
                "binary event must be {BINARY_EVENT_LEN} bytes, got {}",
                body.len()
            )));
        }

        let mut buf = body;
        let tag = buf.get_u8();
        let sync_time = buf.get_i64_le();
        let payload = buf.get_i64_le();

        match tag {
            TAG_POINT => Ok(StreamEvent::point(sync_time, payload)),
            TAG_PUNCTUATION => Ok(StreamEvent::punctuation(sync_time)),
            other => Err(Error::decode(format!("unknown binary event tag {other}"))),
        }
    }

    fn encode(&self, event: &StreamEvent) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(BINARY_EVENT_LEN);
        match *event {
            StreamEvent::Point { sync_time, payload } => {
                buf.put_u8(TAG_POINT);
                buf.put_i64_le(sync_time);
                buf.put_i64_le(payload);
            }
            StreamEvent::Punctuation { sync_time } => {
                buf.put_u8(TAG_PUNCTUATION);
                buf.put_i64_le(sync_time);
                buf.put_i64_le(0);
            }
        }
        Ok(buf)
    }
}
