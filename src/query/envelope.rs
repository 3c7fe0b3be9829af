//! Versioned checkpoint envelope
//!
//! Engine checkpoints are opaque, so they are wrapped with the id of the
//! format that produced them and its version. Restoring a checkpoint written
//! by a different engine, or by a newer version of this one, fails loudly
//! instead of misreading the payload.

use crate::error::{Error, Result};
use crate::types::base64_bytes;
use serde::{Deserialize, Serialize};

/// Opaque payload tagged with its format and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEnvelope {
    /// Identifier of the engine/format that wrote the payload
    pub format: String,
    /// Format version
    pub version: u32,
    /// Engine-specific state
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl CheckpointEnvelope {
    /// Wrap a payload
    pub fn new(format: impl Into<String>, version: u32, payload: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            version,
            payload,
        }
    }

    /// Serialize the envelope to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::checkpoint(format!("Failed to encode envelope: {e}")))
    }

    /// Parse an envelope without checking its format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::checkpoint(format!("Failed to decode envelope: {e}")))
    }

    /// Parse an envelope and check it was written by `format` at a version
    /// no newer than `max_version`
    pub fn open(bytes: &[u8], format: &str, max_version: u32) -> Result<Self> {
        let envelope = Self::decode(bytes)?;

        if envelope.format != format || envelope.version > max_version {
            return Err(Error::IncompatibleCheckpoint {
                expected: format!("{format} v{max_version}"),
                found: format!("{} v{}", envelope.format, envelope.version),
            });
        }

        Ok(envelope)
    }
}
