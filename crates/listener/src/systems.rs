//! The system ingestor: turns journal, FSS, and nav-route message bodies
//! into freshness-guarded system upserts.

use crate::router::Disposition;
use chrono::{DateTime, Utc};
use serde_json::Value;
use store::SystemRecord;

/// Applies one system-bearing message body. Nav-route bodies fan out into
/// one record per route leg, all sharing the message timestamp; the body is
/// Accepted when at least one record was.
pub async fn ingest(
    pool: &sqlx::PgPool,
    body: &Value,
    ts: DateTime<Utc>,
) -> anyhow::Result<Disposition> {
    let records = extract(body, ts);
    if records.is_empty() {
        tracing::debug!(
            event = body.get("event").and_then(serde_json::Value::as_str),
            "skipping message without a SystemAddress"
        );
        return Ok(Disposition::Ignored);
    }

    let mut accepted = false;
    for record in records {
        if upsert_if_fresh(pool, record).await? {
            accepted = true;
        }
    }
    Ok(if accepted {
        Disposition::Accepted
    } else {
        Disposition::Ignored
    })
}

async fn upsert_if_fresh(pool: &sqlx::PgPool, record: SystemRecord) -> anyhow::Result<bool> {
    if let Some(existing) =
        store::systems::lookup_system_by_address(pool, record.system_address).await?
    {
        if existing.updated_at >= record.updated_at {
            tracing::debug!(
                system_address = record.system_address,
                stored = %existing.updated_at,
                incoming = %record.updated_at,
                "skipping stale system update"
            );
            return Ok(false);
        }
    }

    tracing::info!(
        system_address = record.system_address,
        name = record.name.as_deref(),
        has_coords = record.x.is_some(),
        timestamp = %record.updated_at,
        "updating system"
    );
    store::systems::bulk_upsert_systems(pool, std::slice::from_ref(&record)).await?;
    Ok(true)
}

/// Extracts the upsert records carried by `body`: the legs of a `Route`
/// array when present, else the body itself. Elements without a
/// `SystemAddress` contribute nothing.
pub(crate) fn extract(body: &Value, ts: DateTime<Utc>) -> Vec<SystemRecord> {
    if let Some(route) = body.get("Route").and_then(Value::as_array) {
        return route.iter().filter_map(|leg| extract_one(leg, ts)).collect();
    }
    extract_one(body, ts).into_iter().collect()
}

fn extract_one(body: &Value, ts: DateTime<Utc>) -> Option<SystemRecord> {
    let system_address = body.get("SystemAddress").and_then(Value::as_i64)?;

    let name = body
        .get("StarSystem")
        .or_else(|| body.get("System"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    // StarPos must be a 3-vector of doubles; any other shape yields null
    // coordinates and the store's sentinel policy applies.
    let coords = body
        .get("StarPos")
        .and_then(Value::as_array)
        .filter(|star_pos| star_pos.len() == 3)
        .and_then(|star_pos| {
            Some((
                star_pos[0].as_f64()?,
                star_pos[1].as_f64()?,
                star_pos[2].as_f64()?,
            ))
        });

    Some(SystemRecord {
        system_address,
        name,
        x: coords.map(|(x, _, _)| x),
        y: coords.map(|(_, y, _)| y),
        z: coords.map(|(_, _, z)| z),
        // Journal traffic never reports permit status; the store keeps any
        // flag set by the bulk import.
        requires_permit: false,
        updated_at: ts,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn extracts_a_full_journal_body() {
        let records = extract(
            &json!({
                "event": "FSDJump",
                "SystemAddress": 10477373803i64,
                "StarSystem": "Sol",
                "StarPos": [0.0, 0.0, 0.0],
            }),
            ts(),
        );

        assert_eq!(
            records,
            vec![SystemRecord {
                system_address: 10477373803,
                name: Some("Sol".to_owned()),
                x: Some(0.0),
                y: Some(0.0),
                z: Some(0.0),
                requires_permit: false,
                updated_at: ts(),
            }]
        );
    }

    #[test]
    fn missing_system_address_extracts_nothing() {
        assert!(extract(&json!({"event": "Scan", "BodyName": "Sol A"}), ts()).is_empty());
    }

    #[test]
    fn system_key_is_a_name_fallback() {
        let records = extract(&json!({"SystemAddress": 7, "System": "Achenar"}), ts());
        assert_eq!(records[0].name.as_deref(), Some("Achenar"));
    }

    #[test]
    fn address_only_updates_are_still_records() {
        let records = extract(&json!({"SystemAddress": 7}), ts());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, None);
        assert_eq!(records[0].x, None);
    }

    #[test]
    fn malformed_star_pos_yields_null_coordinates() {
        for star_pos in [json!([1.0, 2.0]), json!("0,0,0"), json!([1.0, "a", 3.0])] {
            let records = extract(&json!({"SystemAddress": 7, "StarPos": star_pos.clone()}), ts());
            assert_eq!(records[0].x, None, "StarPos: {star_pos}");
            assert_eq!(records[0].z, None);
        }
    }

    #[test]
    fn nav_route_fans_out_per_leg_skipping_addressless_ones() {
        // Three legs, one missing its address: exactly two records.
        let records = extract(
            &json!({
                "event": "NavRoute",
                "Route": [
                    {"SystemAddress": 1, "StarSystem": "Alpha", "StarPos": [1.0, 2.0, 3.0]},
                    {"StarSystem": "Nameless"},
                    {"SystemAddress": 3, "StarSystem": "Gamma", "StarPos": [7.0, 8.0, 9.0]},
                ],
            }),
            ts(),
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].system_address, 1);
        assert_eq!(records[1].system_address, 3);
        assert!(records.iter().all(|r| r.updated_at == ts()));
    }

    #[test]
    fn empty_route_extracts_nothing() {
        assert!(extract(&json!({"SystemAddress": 5, "Route": []}), ts()).is_empty());
    }
}
