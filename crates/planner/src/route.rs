//! The greedy hop loop.

use crate::geometry::distance;
use crate::search::{find_best_system_at_range, SystemsSource};
use std::collections::HashSet;
use store::System;

/// Upper bound on hops before planning gives up.
pub const MAX_HOPS: usize = 100;

/// Plans a route from `start` to `goal` where no hop exceeds `range`
/// light-years. Returns `None` when no route was found: a hop with no
/// reachable candidate, a candidate already visited, or the hop budget
/// exhausted.
#[tracing::instrument(level = "info", skip_all, fields(start = %start.name, goal = %goal.name, range = range))]
pub async fn plan_route<S: SystemsSource>(
    source: &S,
    start: &System,
    goal: &System,
    range: f64,
) -> anyhow::Result<Option<Vec<System>>> {
    let direct = distance(start, goal);
    tracing::info!(direct, "planning route");

    if direct <= range {
        tracing::info!("direct jump possible");
        return Ok(Some(vec![start.clone(), goal.clone()]));
    }

    let mut route = vec![start.clone()];
    let mut current = start.clone();
    let mut visited: HashSet<i64> = HashSet::from([start.system_address]);
    let mut previous_index = None;

    for hop in 1..=MAX_HOPS {
        let remaining = distance(&current, goal);
        if remaining <= range {
            tracing::info!(hops = route.len(), "goal within reach");
            route.push(goal.clone());
            return Ok(Some(route));
        }

        let Some(candidate) =
            find_best_system_at_range(source, &current, goal, range, previous_index).await?
        else {
            tracing::warn!(from = %current.name, "no reachable systems; giving up");
            return Ok(None);
        };

        if !visited.insert(candidate.system.system_address) {
            tracing::warn!(
                system = %candidate.system.name,
                "best candidate already visited; giving up"
            );
            return Ok(None);
        }

        tracing::info!(
            hop,
            chosen = %candidate.system.name,
            jump = distance(&current, &candidate.system),
            remaining = distance(&candidate.system, goal),
            "added hop"
        );
        previous_index = Some(candidate.radius_index);
        route.push(candidate.system.clone());
        current = candidate.system;
    }

    tracing::warn!(max_hops = MAX_HOPS, "route not found within the hop budget");
    Ok(None)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use store::BoundingBox;

    fn system(address: i64, (x, y, z): (f64, f64, f64)) -> System {
        System {
            system_address: address,
            name: format!("Test {address}"),
            x,
            y,
            z,
            requires_permit: false,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    struct Fixture(Vec<System>);

    #[async_trait::async_trait]
    impl SystemsSource for Fixture {
        async fn systems_in_box(&self, bounds: BoundingBox) -> anyhow::Result<Vec<System>> {
            Ok(self
                .0
                .iter()
                .filter(|s| bounds.contains((s.x, s.y, s.z)))
                .cloned()
                .collect())
        }
    }

    fn assert_route_valid(route: &[System], start: &System, goal: &System, range: f64) {
        assert_eq!(route.first().unwrap().system_address, start.system_address);
        assert_eq!(route.last().unwrap().system_address, goal.system_address);
        for pair in route.windows(2) {
            let jump = distance(&pair[0], &pair[1]);
            assert!(
                jump <= range + 1e-9,
                "hop {} -> {} is {jump} LY, over the {range} LY range",
                pair[0].name,
                pair[1].name
            );
        }
        let mut seen = HashSet::new();
        for stop in route {
            assert!(seen.insert(stop.system_address), "{} visited twice", stop.name);
        }
    }

    #[tokio::test]
    async fn direct_jump_when_goal_is_in_range() {
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(2, (5.0, 0.0, 0.0));
        let fixture = Fixture(vec![start.clone(), goal.clone()]);

        let route = plan_route(&fixture, &start, &goal, 10.0)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(route.len(), 2);
        assert_route_valid(&route, &start, &goal, 10.0);
    }

    #[tokio::test]
    async fn hops_along_a_sparse_chain() {
        // Systems spaced 4.9 LY apart on a line; a 5 LY range has to take
        // every stepping stone.
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(10, (20.0, 0.0, 0.0));
        let mut systems = vec![start.clone(), goal.clone()];
        for (address, x) in [(2, 4.9), (3, 9.8), (4, 14.7), (5, 19.6)] {
            systems.push(system(address, (x, 0.0, 0.0)));
        }
        let fixture = Fixture(systems);

        let route = plan_route(&fixture, &start, &goal, 5.0)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(route.len(), 6);
        assert_route_valid(&route, &start, &goal, 5.0);
    }

    #[tokio::test]
    async fn dense_bubbles_still_make_forward_progress() {
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(100, (40.0, 0.0, 0.0));
        let mut systems = vec![start.clone(), goal.clone()];
        // A cloud of systems every 2 LY along the line with slight lateral
        // scatter.
        for step in 1..=19 {
            let x = f64::from(step) * 2.0;
            let y = if step % 2 == 0 { 0.4 } else { -0.4 };
            systems.push(system(i64::from(step) + 1, (x, y, 0.0)));
        }
        let fixture = Fixture(systems);

        let route = plan_route(&fixture, &start, &goal, 8.0)
            .await
            .unwrap()
            .unwrap();

        assert_route_valid(&route, &start, &goal, 8.0);
        assert!(route.len() <= 8, "greedy planner took {} stops", route.len());
    }

    #[tokio::test]
    async fn unreachable_goal_reports_failure() {
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(2, (100.0, 0.0, 0.0));
        let fixture = Fixture(vec![start.clone(), goal.clone()]);

        assert!(plan_route(&fixture, &start, &goal, 10.0)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn dead_end_chain_terminates_without_a_route() {
        // One stepping stone that leads nowhere: after hopping to it, no
        // further candidate exists and planning must stop cleanly.
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(2, (100.0, 0.0, 0.0));
        let fixture = Fixture(vec![
            start.clone(),
            goal.clone(),
            system(3, (9.0, 0.0, 0.0)),
        ]);

        assert!(plan_route(&fixture, &start, &goal, 10.0)
            .await
            .unwrap()
            .is_none());
    }
}
