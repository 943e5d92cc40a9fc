//! The expanding-box candidate search around a projected target point.

use crate::geometry::{distance, target_coordinates};
use store::{BoundingBox, System};

/// Where the planner reads candidate systems from. The store's bounding-box
/// query in production; an in-memory fixture in tests.
#[async_trait::async_trait]
pub trait SystemsSource: Sync {
    async fn systems_in_box(&self, bounds: BoundingBox) -> anyhow::Result<Vec<System>>;
}

#[async_trait::async_trait]
impl SystemsSource for sqlx::PgPool {
    async fn systems_in_box(&self, bounds: BoundingBox) -> anyhow::Result<Vec<System>> {
        Ok(store::systems::systems_in_box(self, bounds).await?)
    }
}

/// The chosen next hop and the radius index it was found at, fed back into
/// the next hop's starting index.
#[derive(Debug)]
pub struct Candidate {
    pub system: System,
    pub radius_index: usize,
}

/// Picks the index to start the bubble sequence at: one below the previous
/// hop's winning index, or for the first hop the smallest radius of at
/// least 5 LY. Re-using the previous index amortises density transitions
/// between sparse and dense regions.
fn start_index(previous_index: Option<usize>, radii: &[f64]) -> usize {
    match previous_index {
        Some(index) => index.saturating_sub(1),
        None => radii.iter().position(|radius| *radius >= 5.0).unwrap_or(0),
    }
}

/// Finds the best next hop at approximately `range` light-years from
/// `current` along the straight line toward `goal`.
///
/// Integer bubble radii `1..=⌊range⌋` grow around the projected target until
/// some radius yields a candidate within jump range; the candidate
/// minimising `|distance - range|` wins. Returns `None` when even the
/// largest bubble holds nothing reachable.
pub async fn find_best_system_at_range<S: SystemsSource>(
    source: &S,
    current: &System,
    goal: &System,
    range: f64,
    previous_index: Option<usize>,
) -> anyhow::Result<Option<Candidate>> {
    let target = target_coordinates(current, goal, range);
    tracing::debug!(
        target_x = target.0,
        target_y = target.1,
        target_z = target.2,
        "searching around projected target"
    );

    let radii: Vec<f64> = (1..=range.floor() as i64).map(|radius| radius as f64).collect();
    let mut index = start_index(previous_index, &radii);

    while index < radii.len() {
        let candidates = source
            .systems_in_box(BoundingBox::cube(target, radii[index]))
            .await?;
        let in_bubble = candidates.len();

        let mut best: Option<(System, f64)> = None;
        for candidate in candidates {
            if candidate.system_address == current.system_address {
                continue;
            }
            let jump = distance(current, &candidate);
            if jump > range {
                continue;
            }
            let score = (jump - range).abs();
            if best.as_ref().map_or(true, |(_, held)| score < *held) {
                best = Some((candidate, score));
            }
        }

        if let Some((system, _)) = best {
            tracing::debug!(
                radius = radii[index],
                in_bubble,
                chosen = %system.name,
                jump = distance(current, &system),
                "bubble search found a candidate"
            );
            return Ok(Some(Candidate {
                system,
                radius_index: index,
            }));
        }

        index += 1;
    }

    tracing::warn!(
        from = %current.name,
        range,
        "no reachable system near the target coordinates"
    );
    Ok(None)
}
