//! The commodity ingestor: turns market snapshot bodies into one
//! station-plus-listings transaction.

use crate::router::Disposition;
use chrono::{DateTime, Utc};
use serde_json::Value;
use store::stations::{ListingRecord, StationAttrs, UpsertOutcome};

/// Applies one market snapshot. Bodies missing the market id, station name,
/// or system name are rejected outright; the store enforces the
/// station-granularity freshness guard inside the transaction.
pub async fn ingest(
    pool: &sqlx::PgPool,
    body: &Value,
    ts: DateTime<Utc>,
) -> anyhow::Result<Disposition> {
    let Some(snapshot) = extract(body) else {
        tracing::debug!("skipping commodity message with missing mandatory fields");
        return Ok(Disposition::Ignored);
    };

    let outcome = store::stations::upsert_station_and_listings(
        pool,
        snapshot.market_id,
        &snapshot.station,
        &snapshot.listings,
        ts,
    )
    .await?;

    match outcome {
        UpsertOutcome::Stale => {
            tracing::info!(
                market_id = snapshot.market_id,
                incoming = %ts,
                "skipping stale market snapshot"
            );
            Ok(Disposition::Ignored)
        }
        UpsertOutcome::Applied { listings } => {
            tracing::info!(
                market_id = snapshot.market_id,
                station = %snapshot.station.name,
                listings,
                "processed market snapshot"
            );
            Ok(Disposition::Accepted)
        }
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct MarketSnapshot {
    pub market_id: i64,
    pub station: StationAttrs,
    pub listings: Vec<ListingRecord>,
}

/// Pulls the station attributes and listings out of a snapshot body.
/// Returns `None` when `marketId`, `stationName`, or `systemName` is absent.
pub(crate) fn extract(body: &Value) -> Option<MarketSnapshot> {
    let market_id = body.get("marketId").and_then(Value::as_i64)?;
    let station_name = body.get("stationName").and_then(Value::as_str)?;
    let system_name = body.get("systemName").and_then(Value::as_str)?;

    let prohibited = body.get("prohibited").and_then(Value::as_array).map(|list| {
        list.iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    });

    let listings = body
        .get("commodities")
        .and_then(Value::as_array)
        .map(|commodities| commodities.iter().filter_map(extract_listing).collect())
        .unwrap_or_default();

    Some(MarketSnapshot {
        market_id,
        station: StationAttrs {
            name: station_name.to_owned(),
            system_name: system_name.to_owned(),
            prohibited,
        },
        listings,
    })
}

/// A listing needs a commodity name; every numeric field coerces null and
/// absent values to zero and clamps negatives away.
fn extract_listing(value: &Value) -> Option<ListingRecord> {
    let name = value.get("name").and_then(Value::as_str)?;
    Some(ListingRecord {
        name: name.to_owned(),
        buy_price: non_negative(value.get("buyPrice")),
        sell_price: non_negative(value.get("sellPrice")),
        demand: non_negative(value.get("demand")),
        demand_bracket: non_negative(value.get("demandBracket")),
        stock: non_negative(value.get("stock")),
        stock_bracket: non_negative(value.get("stockBracket")),
        mean_price: non_negative(value.get("meanPrice")),
    })
}

fn non_negative(value: Option<&Value>) -> i32 {
    value
        .and_then(Value::as_i64)
        .unwrap_or(0)
        .clamp(0, i64::from(i32::MAX)) as i32
}
