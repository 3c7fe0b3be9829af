//! Tests for the decode module

use super::*;
use chrono::{TimeZone, Utc};

// ============================================================================
// JSON Decoder Tests
// ============================================================================

#[test]
fn test_json_decode_point() {
    let decoder = JsonEventDecoder::new();
    let event = decoder
        .decode(br#"{"kind":"point","sync_time":10,"payload":42}"#)
        .unwrap();
    assert_eq!(event, StreamEvent::point(10, 42));
    assert!(event.is_data());
    assert_eq!(event.sync_time(), 10);
}

#[test]
fn test_json_decode_punctuation() {
    let decoder = JsonEventDecoder::new();
    let event = decoder
        .decode(br#"{"kind":"punctuation","sync_time":99}"#)
        .unwrap();
    assert!(event.is_punctuation());
    assert_eq!(event.sync_time(), 99);
}

#[test]
fn test_json_decode_garbage() {
    let decoder = JsonEventDecoder::new();
    let err = decoder.decode(b"not json").unwrap_err();
    assert!(err.to_string().contains("invalid JSON event"));

    let err = decoder.decode(br#"{"kind":"interval"}"#).unwrap_err();
    assert!(matches!(err, crate::Error::Decode { .. }));
}

// ============================================================================
// Binary Decoder Tests
// ============================================================================

#[test]
fn test_binary_layout() {
    let decoder = BinaryEventDecoder::new();
    let body = decoder.encode(&StreamEvent::point(1, -2)).unwrap();

    assert_eq!(body.len(), 17);
    assert_eq!(body[0], 0);
    assert_eq!(&body[1..9], &1i64.to_le_bytes());
    assert_eq!(&body[9..17], &(-2i64).to_le_bytes());
    assert_eq!(decoder.decode(&body).unwrap(), StreamEvent::point(1, -2));
}

#[test]
fn test_binary_rejects_bad_input() {
    let decoder = BinaryEventDecoder::new();
    assert!(decoder.decode(&[0u8; 3]).is_err());

    let mut body = decoder.encode(&StreamEvent::punctuation(5)).unwrap();
    body[0] = 9;
    let err = decoder.decode(&body).unwrap_err();
    assert!(err.to_string().contains("unknown binary event tag 9"));
}

#[test]
fn test_decoder_for_format() {
    let json = decoder_for(DecoderFormat::Json);
    let body = json.encode(&StreamEvent::punctuation(3)).unwrap();
    assert_eq!(json.decode(&body).unwrap(), StreamEvent::punctuation(3));

    let binary = decoder_for(DecoderFormat::Binary);
    assert_eq!(binary.encode(&StreamEvent::point(0, 0)).unwrap().len(), 17);
}

// ============================================================================
// Raw Event Tests
// ============================================================================

#[test]
fn test_raw_event_builder() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let raw = RawEvent::new(7, b"x".to_vec()).with_enqueued_at(at);
    assert_eq!(raw.sequence, 7);
    assert_eq!(raw.enqueued_at, Some(at));
    assert_eq!(&raw.body[..], b"x");
}

#[test]
fn test_decoder_format_serde() {
    let format: DecoderFormat = serde_json::from_str("\"binary\"").unwrap();
    assert_eq!(format, DecoderFormat::Binary);
    assert_eq!(DecoderFormat::default(), DecoderFormat::Json);
}
