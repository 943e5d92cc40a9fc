//! Streaming decode of the cold-start archive: a gzip-compressed JSON array
//! of system records, visited one element at a time so the archive is never
//! materialised in memory.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeSeed, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::ops::ControlFlow;
use store::SystemRecord;

/// One element of the archive, with only the fields this import reads.
/// Everything else in the dump is skipped by serde.
#[derive(Debug, Deserialize)]
pub struct DumpRecord {
    pub id64: Option<i64>,
    pub name: Option<String>,
    pub coords: Option<Coords>,
    /// Present and true only for permit-locked systems; most dump entries
    /// omit it.
    #[serde(rename = "requirePermit", default)]
    pub require_permit: bool,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Coords {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// Parses the dump's `YYYY-MM-DD HH:MM:SS+0000` timestamps. Some dumps
/// carry the short `+00` offset form, which is padded before parsing.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let padded;
    let raw = if raw.len() == 22 && matches!(raw.as_bytes()[19], b'+' | b'-') {
        padded = format!("{raw}00");
        &padded
    } else {
        raw
    };
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z")
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Validates one dump record into an upsert record. The id, name, coords
/// object, and a parseable timestamp are all essential; individual missing
/// axes fall back to the store's sentinel.
pub fn to_system_record(record: DumpRecord) -> Option<SystemRecord> {
    let system_address = record.id64?;
    let name = record.name?;
    let coords = record.coords?;
    let updated_at = parse_timestamp(record.update_time.as_deref()?)?;

    Some(SystemRecord {
        system_address,
        name: Some(name),
        x: coords.x,
        y: coords.y,
        z: coords.z,
        requires_permit: record.require_permit,
        updated_at,
    })
}

/// Drives `callback` over every element of the JSON array read from
/// `reader`. The callback may stop the stream early by returning
/// `ControlFlow::Break`, which abandons the remainder of the document.
pub fn stream_dump<R, F>(reader: R, mut callback: F) -> serde_json::Result<()>
where
    R: std::io::Read,
    F: FnMut(DumpRecord) -> ControlFlow<()>,
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    SeqSink {
        callback: &mut callback,
    }
    .deserialize(&mut deserializer)
}

struct SeqSink<'a, F> {
    callback: &'a mut F,
}

impl<'de, F> DeserializeSeed<'de> for SeqSink<'_, F>
where
    F: FnMut(DumpRecord) -> ControlFlow<()>,
{
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, F> Visitor<'de> for SeqSink<'_, F>
where
    F: FnMut(DumpRecord) -> ControlFlow<()>,
{
    type Value = ();

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a JSON array of system records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(record) = seq.next_element::<DumpRecord>()? {
            if let ControlFlow::Break(()) = (self.callback)(record) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_long_and_short_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 11, 3, 17, 5, 30).unwrap();
        assert_eq!(parse_timestamp("2024-11-03 17:05:30+0000"), Some(expected));
        assert_eq!(parse_timestamp("2024-11-03 17:05:30+00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-11-03 18:05:30+0100"),
            Some(expected),
            "explicit offsets normalize to UTC"
        );
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert_eq!(parse_timestamp("2024-11-03T17:05:30Z"), None);
        assert_eq!(parse_timestamp("not a timestamp"), None);
    }

    #[test]
    fn every_essential_field_is_required() {
        let complete = || DumpRecord {
            id64: Some(10477373803),
            name: Some("Sol".to_owned()),
            coords: Some(Coords {
                x: Some(0.0),
                y: Some(0.0),
                z: Some(0.0),
            }),
            require_permit: false,
            update_time: Some("2024-11-03 17:05:30+00".to_owned()),
        };

        assert!(to_system_record(complete()).is_some());
        assert!(to_system_record(DumpRecord {
            id64: None,
            ..complete()
        })
        .is_none());
        assert!(to_system_record(DumpRecord {
            name: None,
            ..complete()
        })
        .is_none());
        assert!(to_system_record(DumpRecord {
            coords: None,
            ..complete()
        })
        .is_none());
        assert!(to_system_record(DumpRecord {
            update_time: Some("garbage".to_owned()),
            ..complete()
        })
        .is_none());
    }

    #[test]
    fn missing_axes_stay_absent_for_the_sentinel_policy() {
        let record = to_system_record(DumpRecord {
            id64: Some(1),
            name: Some("Nowhere".to_owned()),
            coords: Some(Coords {
                x: Some(1.0),
                y: None,
                z: Some(3.0),
            }),
            require_permit: true,
            update_time: Some("2024-11-03 17:05:30+00".to_owned()),
        })
        .unwrap();

        assert_eq!(record.x, Some(1.0));
        assert_eq!(record.y, None);
        assert_eq!(record.z, Some(3.0));
        assert!(record.requires_permit);
    }

    #[test]
    fn streams_array_elements_in_order() {
        let body = r#"[
            {"id64": 1, "name": "One", "extraField": true},
            {"id64": 2, "name": "Two", "coords": {"x": 1.5, "y": 2.5, "z": 3.5}}
        ]"#;

        let mut seen = Vec::new();
        stream_dump(body.as_bytes(), |record| {
            seen.push(record.id64);
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(seen, vec![Some(1), Some(2)]);
    }

    #[test]
    fn break_stops_the_stream_early() {
        let body = r#"[{"id64": 1}, {"id64": 2}, {"id64": 3}]"#;

        let mut seen = 0;
        stream_dump(body.as_bytes(), |_| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        assert_eq!(seen, 2);
    }

    #[test]
    fn non_array_documents_are_errors() {
        assert!(stream_dump(r#"{"id64": 1}"#.as_bytes(), |_| ControlFlow::Continue(())).is_err());
    }
}
