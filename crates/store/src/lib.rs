//! Persistence layer for the Resupply Planner: the spatial+relational store
//! that owns systems, stations, commodities, and per-station commodity
//! listings.
//!
//! Every write operation here is one transaction with last-writer-wins
//! semantics guarded on the authoritative `updated_at` of the incoming
//! observation, which makes ingestion idempotent under duplicated,
//! re-delivered, and out-of-order messages. Schema DDL lives in
//! `schema.sql` beside this crate.

pub mod stations;
pub mod systems;

use chrono::{DateTime, Utc};

/// Coordinate value stored when a system's position is not yet known.
pub const COORD_SENTINEL: f64 = 999999.999;

/// A star system row. `coords` is derived from `(x, y, z)` inside the
/// database and is never read back into Rust.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct System {
    pub system_address: i64,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub requires_permit: bool,
    pub updated_at: DateTime<Utc>,
}

impl System {
    /// Euclidean distance to `other` in light-years.
    pub fn distance_to(&self, other: &System) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One system observation bound for [`systems::bulk_upsert_systems`].
///
/// `name` and the coordinates are optional: pure address sightings still
/// advance `updated_at`, and the store substitutes [`COORD_SENTINEL`] for
/// unknown axes. `requires_permit` latches: the feed never reports a permit
/// being lifted, so a stored `true` survives later observations that carry
/// `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemRecord {
    pub system_address: i64,
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub requires_permit: bool,
    pub updated_at: DateTime<Utc>,
}

/// An axis-aligned box for spatial candidate queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl BoundingBox {
    /// The cube of the given half-side length centered on `(x, y, z)`.
    pub fn cube(center: (f64, f64, f64), half_side: f64) -> Self {
        let (x, y, z) = center;
        BoundingBox {
            min_x: x - half_side,
            max_x: x + half_side,
            min_y: y - half_side,
            max_y: y + half_side,
            min_z: z - half_side,
            max_z: z + half_side,
        }
    }

    pub fn contains(&self, point: (f64, f64, f64)) -> bool {
        let (x, y, z) = point;
        x >= self.min_x
            && x <= self.max_x
            && y >= self.min_y
            && y <= self.max_y
            && z >= self.min_z
            && z <= self.max_z
    }
}
