//! The station/market write path: one transaction that refreshes a station
//! row, registers any newly-sighted commodities, and replaces the station's
//! commodity listings.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Attributes of a station as carried by one market snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StationAttrs {
    pub name: String,
    /// Name of the parent system. Resolved to a `system_address` at write
    /// time; stations may arrive before their system and are linked later.
    pub system_name: String,
    /// Commodity names disallowed at this station. Replaces the stored list
    /// wholesale.
    pub prohibited: Option<Vec<String>>,
}

/// One commodity listing within a market snapshot. Prices and quantities are
/// already coerced to non-negative integers by the ingestor.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub name: String,
    pub buy_price: i32,
    pub sell_price: i32,
    pub demand: i32,
    pub demand_bracket: i32,
    pub stock: i32,
    pub stock_bracket: i32,
    pub mean_price: i32,
}

/// Result of [`upsert_station_and_listings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The snapshot was fresher than the stored station and was written.
    Applied { listings: usize },
    /// The stored station is at least as fresh; nothing was written.
    Stale,
}

/// Applies one market snapshot as a single transaction.
///
/// The freshness guard runs at station granularity: if the stored
/// `stations.updated_at` is `>= ts` the whole snapshot is dropped. Past the
/// guard, the station row is overwritten, novel commodity names get ids, and
/// every listing is upserted unconditionally on `(market_id, commodity_id)`.
/// Listings for commodities a later snapshot omits are left in place; they
/// simply stop being refreshed.
#[tracing::instrument(level = "debug", skip(pool, station, listings), fields(listings = listings.len()))]
pub async fn upsert_station_and_listings(
    pool: &sqlx::PgPool,
    market_id: i64,
    station: &StationAttrs,
    listings: &[ListingRecord],
    ts: DateTime<Utc>,
) -> sqlx::Result<UpsertOutcome> {
    let mut txn = pool.begin().await?;

    let stored_at: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT updated_at FROM stations WHERE market_id = $1")
            .bind(market_id)
            .fetch_optional(&mut txn)
            .await?;
    if matches!(stored_at, Some(stored) if stored >= ts) {
        // Dropping the transaction rolls it back; nothing was written yet.
        return Ok(UpsertOutcome::Stale);
    }

    let system_address: Option<i64> =
        sqlx::query_scalar("SELECT system_address FROM systems WHERE name = $1 LIMIT 1")
            .bind(&station.system_name)
            .fetch_optional(&mut txn)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO stations (market_id, name, system_address, prohibited, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (market_id) DO UPDATE SET
            name = EXCLUDED.name,
            system_address = COALESCE(stations.system_address, EXCLUDED.system_address),
            prohibited = EXCLUDED.prohibited,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(market_id)
    .bind(&station.name)
    .bind(system_address)
    .bind(&station.prohibited)
    .bind(ts)
    .execute(&mut txn)
    .await?;

    // A snapshot may repeat a commodity; the last entry wins. Deduplicating
    // here also keeps the single-statement upsert below from touching one
    // row twice.
    let deduped: BTreeMap<&str, &ListingRecord> = listings
        .iter()
        .map(|listing| (listing.name.as_str(), listing))
        .collect();
    let written = if deduped.is_empty() {
        0
    } else {
        let names: Vec<String> = deduped.keys().map(|name| (*name).to_owned()).collect();

        sqlx::query(
            r#"
            INSERT INTO commodities (name)
            SELECT * FROM UNNEST($1::text[])
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&names)
        .execute(&mut txn)
        .await?;

        let ids: Vec<(i32, String)> =
            sqlx::query_as("SELECT id, name FROM commodities WHERE name = ANY($1)")
                .bind(&names)
                .fetch_all(&mut txn)
                .await?;
        let ids: BTreeMap<String, i32> = ids.into_iter().map(|(id, name)| (name, id)).collect();

        let mut commodity_ids = Vec::with_capacity(deduped.len());
        let mut buy = Vec::with_capacity(deduped.len());
        let mut sell = Vec::with_capacity(deduped.len());
        let mut demand = Vec::with_capacity(deduped.len());
        let mut demand_bracket = Vec::with_capacity(deduped.len());
        let mut stock = Vec::with_capacity(deduped.len());
        let mut stock_bracket = Vec::with_capacity(deduped.len());
        let mut mean = Vec::with_capacity(deduped.len());
        for (name, listing) in &deduped {
            let Some(id) = ids.get(*name) else { continue };
            commodity_ids.push(*id);
            buy.push(listing.buy_price);
            sell.push(listing.sell_price);
            demand.push(listing.demand);
            demand_bracket.push(listing.demand_bracket);
            stock.push(listing.stock);
            stock_bracket.push(listing.stock_bracket);
            mean.push(listing.mean_price);
        }

        sqlx::query(
            r#"
            INSERT INTO station_commodities (
                station_market_id, commodity_id, buy_price, sell_price,
                demand, demand_bracket, stock, stock_bracket, mean_price, updated_at
            )
            SELECT $1, u.commodity_id, u.buy_price, u.sell_price,
                   u.demand, u.demand_bracket, u.stock, u.stock_bracket, u.mean_price, $10
            FROM UNNEST(
                $2::integer[], $3::integer[], $4::integer[], $5::integer[],
                $6::integer[], $7::integer[], $8::integer[], $9::integer[]
            ) AS u(commodity_id, buy_price, sell_price, demand,
                   demand_bracket, stock, stock_bracket, mean_price)
            ON CONFLICT (station_market_id, commodity_id) DO UPDATE SET
                buy_price = EXCLUDED.buy_price,
                sell_price = EXCLUDED.sell_price,
                demand = EXCLUDED.demand,
                demand_bracket = EXCLUDED.demand_bracket,
                stock = EXCLUDED.stock,
                stock_bracket = EXCLUDED.stock_bracket,
                mean_price = EXCLUDED.mean_price,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(market_id)
        .bind(&commodity_ids)
        .bind(&buy)
        .bind(&sell)
        .bind(&demand)
        .bind(&demand_bracket)
        .bind(&stock)
        .bind(&stock_bracket)
        .bind(&mean)
        .bind(ts)
        .execute(&mut txn)
        .await?;

        commodity_ids.len()
    };

    txn.commit().await?;
    Ok(UpsertOutcome::Applied { listings: written })
}
