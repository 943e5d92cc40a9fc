//! Schema routing: maps each decoded feed document to the system or market
//! ingestor by its `$schemaRef`, after resolving the document's effective
//! timestamp.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Schema carrying station market snapshots.
pub const COMMODITY_SCHEMA: &str = "https://eddn.edcd.io/schemas/commodity/3";

/// Schemas whose message bodies carry system sightings. Everything outside
/// this list and [`COMMODITY_SCHEMA`] is ignored.
pub const SYSTEM_SCHEMAS: [&str; 10] = [
    "https://eddn.edcd.io/schemas/journal/1",
    "https://eddn.edcd.io/schemas/fssallbodiesfound/1",
    "https://eddn.edcd.io/schemas/navroute/1",
    "https://eddn.edcd.io/schemas/approachsettlement/1",
    "https://eddn.edcd.io/schemas/codexentry/1",
    "https://eddn.edcd.io/schemas/fssbodysignals/1",
    "https://eddn.edcd.io/schemas/fssdiscoveryscan/1",
    "https://eddn.edcd.io/schemas/fsssignaldiscovered/1",
    "https://eddn.edcd.io/schemas/navbeaconscan/1",
    "https://eddn.edcd.io/schemas/scanbarycentre/1",
];

/// One decoded feed document.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "$schemaRef", default)]
    pub schema_ref: String,
    #[serde(default)]
    pub header: Header,
    #[serde(default)]
    pub message: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct Header {
    #[serde(rename = "gatewayTimestamp")]
    pub gateway_timestamp: Option<String>,
}

/// What became of a routed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Accepted,
    Ignored,
}

/// Resolves the authoritative timestamp of a document: the message's own
/// `timestamp` when present, else the relay's `gatewayTimestamp`. A document
/// with neither (or with an unparseable value) has no authority and is
/// dropped by the caller.
pub fn effective_timestamp(envelope: &Envelope) -> Option<DateTime<Utc>> {
    let raw = match envelope.message.get("timestamp").and_then(Value::as_str) {
        Some(raw) => raw,
        None => {
            let raw = envelope.header.gateway_timestamp.as_deref()?;
            tracing::debug!("message missing 'timestamp', using header gatewayTimestamp");
            raw
        }
    };
    parse_timestamp(raw)
}

/// Parses an ISO 8601 instant, accepting a trailing `Z` or an explicit
/// offset, normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Dispatches one document to its ingestor.
pub async fn route(pool: &sqlx::PgPool, envelope: &Envelope) -> anyhow::Result<Disposition> {
    let Some(ts) = effective_timestamp(envelope) else {
        tracing::warn!(
            schema = %envelope.schema_ref,
            "skipping message with no resolvable timestamp"
        );
        return Ok(Disposition::Ignored);
    };

    if envelope.schema_ref == COMMODITY_SCHEMA {
        crate::markets::ingest(pool, &envelope.message, ts).await
    } else if SYSTEM_SCHEMAS.contains(&envelope.schema_ref.as_str()) {
        crate::systems::ingest(pool, &envelope.message, ts).await
    } else {
        tracing::debug!(schema = %envelope.schema_ref, "ignoring unsupported schema");
        Ok(Disposition::Ignored)
    }
}
