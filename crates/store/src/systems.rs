//! Queries over the `systems` table: point lookups, the freshness-guarded
//! bulk upsert, bounding-box candidate queries, and the ordered name stream
//! consumed by the autocomplete export.

use crate::{BoundingBox, System, SystemRecord, COORD_SENTINEL};
use futures::stream::BoxStream;

const SYSTEM_COLUMNS: &str = "system_address, name, x, y, z, requires_permit, updated_at";

pub async fn lookup_system_by_address(
    pool: &sqlx::PgPool,
    system_address: i64,
) -> sqlx::Result<Option<System>> {
    sqlx::query_as::<_, System>(&format!(
        "SELECT {SYSTEM_COLUMNS} FROM systems WHERE system_address = $1",
    ))
    .bind(system_address)
    .fetch_optional(pool)
    .await
}

/// Exact, case-sensitive name match. Names are not unique; the first match
/// wins, as with the interactive tooling this backs.
pub async fn lookup_system_by_name(
    pool: &sqlx::PgPool,
    name: &str,
) -> sqlx::Result<Option<System>> {
    sqlx::query_as::<_, System>(&format!(
        "SELECT {SYSTEM_COLUMNS} FROM systems WHERE name = $1 LIMIT 1",
    ))
    .bind(name)
    .fetch_optional(pool)
    .await
}

/// Upserts `records` keyed by `system_address`, overwriting a stored row only
/// when the incoming `updated_at` is strictly newer. Returns the number of
/// rows actually written.
///
/// A record without a name inserts as `'Unknown'` and leaves an existing name
/// untouched on update; absent coordinates take the sentinel value. This is
/// the only write path for systems: there is deliberately no unguarded
/// per-row variant.
#[tracing::instrument(level = "debug", skip_all, fields(records = records.len()))]
pub async fn bulk_upsert_systems(
    pool: &sqlx::PgPool,
    records: &[SystemRecord],
) -> sqlx::Result<u64> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut addresses = Vec::with_capacity(records.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(records.len());
    let mut xs = Vec::with_capacity(records.len());
    let mut ys = Vec::with_capacity(records.len());
    let mut zs = Vec::with_capacity(records.len());
    let mut permits = Vec::with_capacity(records.len());
    let mut timestamps = Vec::with_capacity(records.len());

    for record in records {
        addresses.push(record.system_address);
        names.push(record.name.clone());
        xs.push(record.x.unwrap_or(COORD_SENTINEL));
        ys.push(record.y.unwrap_or(COORD_SENTINEL));
        zs.push(record.z.unwrap_or(COORD_SENTINEL));
        permits.push(record.requires_permit);
        timestamps.push(record.updated_at);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO systems (system_address, name, x, y, z, coords, requires_permit, updated_at)
        SELECT
            u.system_address,
            COALESCE(u.name, 'Unknown'),
            u.x,
            u.y,
            u.z,
            ST_SetSRID(ST_MakePoint(u.x, u.y, u.z), 0),
            u.requires_permit,
            u.updated_at
        FROM UNNEST(
            $1::bigint[],
            $2::text[],
            $3::double precision[],
            $4::double precision[],
            $5::double precision[],
            $6::boolean[],
            $7::timestamptz[]
        ) AS u(system_address, name, x, y, z, requires_permit, updated_at)
        ON CONFLICT (system_address) DO UPDATE SET
            name = COALESCE(NULLIF(EXCLUDED.name, 'Unknown'), systems.name),
            x = EXCLUDED.x,
            y = EXCLUDED.y,
            z = EXCLUDED.z,
            coords = EXCLUDED.coords,
            requires_permit = systems.requires_permit OR EXCLUDED.requires_permit,
            updated_at = EXCLUDED.updated_at
        WHERE systems.updated_at < EXCLUDED.updated_at
        "#,
    )
    .bind(&addresses)
    .bind(&names)
    .bind(&xs)
    .bind(&ys)
    .bind(&zs)
    .bind(&permits)
    .bind(&timestamps)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// All systems whose stored `(x, y, z)` fall inside `bounds`. Per-axis range
/// predicates keep the query on the btree indexes; callers needing sphere
/// geometry filter the result themselves.
pub async fn systems_in_box(
    pool: &sqlx::PgPool,
    bounds: BoundingBox,
) -> sqlx::Result<Vec<System>> {
    sqlx::query_as::<_, System>(&format!(
        r#"
        SELECT {SYSTEM_COLUMNS} FROM systems
        WHERE x BETWEEN $1 AND $2
          AND y BETWEEN $3 AND $4
          AND z BETWEEN $5 AND $6
        "#,
    ))
    .bind(bounds.min_x)
    .bind(bounds.max_x)
    .bind(bounds.min_y)
    .bind(bounds.max_y)
    .bind(bounds.min_z)
    .bind(bounds.max_z)
    .fetch_all(pool)
    .await
}

/// Every system name in lexicographic order, streamed row-by-row so the
/// export never materialises the full corpus.
pub fn stream_system_names(pool: &sqlx::PgPool) -> BoxStream<'_, sqlx::Result<String>> {
    sqlx::query_scalar::<_, String>("SELECT name FROM systems ORDER BY name").fetch(pool)
}
