//! Greedy long-range route planning over the spatial store.
//!
//! The planner never materialises a jump graph. Each hop projects a target
//! point one full jump along the straight line to the goal, then grows an
//! axis-aligned search cube around that target until a reachable candidate
//! appears, preferring whichever candidate lands closest to a full-range
//! jump.

pub mod geometry;
pub mod route;
pub mod search;

pub use route::{plan_route, MAX_HOPS};
pub use search::SystemsSource;
