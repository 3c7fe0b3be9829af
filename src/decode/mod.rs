//! Event decoder module
//!
//! Supports: JSON, compact binary
//!
//! # Overview
//!
//! Log sources hand out [`RawEvent`]s whose body is an opaque byte payload.
//! A decoder turns that body into a [`StreamEvent`] the query understands,
//! and the partition reader wraps it into a delivered [`Event`].

mod decoders;
mod types;

pub use decoders::{decoder_for, BinaryEventDecoder, JsonEventDecoder};
pub use types::{DecoderFormat, Event, EventDecoder, RawEvent, StreamEvent};

#[cfg(test)]
mod tests;
