//! Frame-level coverage: a raw relay frame (zlib over JSON) through
//! decompression, envelope decoding, and timestamp resolution.

use chrono::{TimeZone, Utc};
use listener::relay;
use listener::router::{self, Envelope};
use std::io::Write;

fn compress(document: &serde_json::Value) -> Vec<u8> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(document.to_string().as_bytes())
        .unwrap();
    encoder.finish().unwrap()
}

#[test]
fn a_journal_frame_decodes_end_to_end() {
    let frame = compress(&serde_json::json!({
        "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
        "header": {
            "gatewayTimestamp": "2025-05-01T10:00:00.123456Z",
            "uploaderID": "abc123",
        },
        "message": {
            "timestamp": "2025-05-01T09:59:58Z",
            "event": "FSDJump",
            "SystemAddress": 10477373803i64,
            "StarSystem": "Sol",
            "StarPos": [0.0, 0.0, 0.0],
        },
    }));

    let decoded = relay::decompress(&frame).unwrap();
    let envelope: Envelope = serde_json::from_slice(&decoded).unwrap();

    assert_eq!(envelope.schema_ref, "https://eddn.edcd.io/schemas/journal/1");
    assert!(router::SYSTEM_SCHEMAS.contains(&envelope.schema_ref.as_str()));
    assert_eq!(
        router::effective_timestamp(&envelope),
        Some(Utc.with_ymd_and_hms(2025, 5, 1, 9, 59, 58).unwrap()),
        "the message timestamp outranks the gateway's"
    );
}

#[test]
fn a_commodity_frame_routes_by_schema() {
    let frame = compress(&serde_json::json!({
        "$schemaRef": router::COMMODITY_SCHEMA,
        "header": {"gatewayTimestamp": "2025-05-01T10:00:00Z"},
        "message": {
            "marketId": 128666762i64,
            "stationName": "Abraham Lincoln",
            "systemName": "Sol",
            "commodities": [],
        },
    }));

    let decoded = relay::decompress(&frame).unwrap();
    let envelope: Envelope = serde_json::from_slice(&decoded).unwrap();

    assert_eq!(envelope.schema_ref, router::COMMODITY_SCHEMA);
    assert_eq!(
        router::effective_timestamp(&envelope),
        Some(Utc.with_ymd_and_hms(2025, 5, 1, 10, 0, 0).unwrap()),
        "gatewayTimestamp backfills a message without its own"
    );
}

#[test]
fn truncated_frames_fail_decompression() {
    let mut frame = compress(&serde_json::json!({"$schemaRef": "x", "message": {}}));
    frame.truncate(frame.len() / 2);

    assert!(relay::decompress(&frame).is_err());
}
