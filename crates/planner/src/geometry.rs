//! 3-D Euclidean helpers shared by the search and the route loop.

use store::System;

/// Distance between two systems in light-years.
pub fn distance(a: &System, b: &System) -> f64 {
    a.distance_to(b)
}

/// The point at exactly `range` light-years from `current` along the
/// straight line toward `goal`: where a full jump on the direct heading
/// would land.
pub fn target_coordinates(current: &System, goal: &System, range: f64) -> (f64, f64, f64) {
    let total = distance(current, goal);
    let direction = (
        (goal.x - current.x) / total,
        (goal.y - current.y) / total,
        (goal.z - current.z) / total,
    );
    (
        current.x + direction.0 * range,
        current.y + direction.1 * range,
        current.z + direction.2 * range,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

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

    #[test]
    fn target_sits_range_along_the_heading() {
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(2, (100.0, 0.0, 0.0));

        assert_eq!(target_coordinates(&start, &goal, 30.0), (30.0, 0.0, 0.0));
    }

    #[test]
    fn target_handles_diagonal_headings() {
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(2, (3.0, 4.0, 0.0));
        let (x, y, z) = target_coordinates(&start, &goal, 10.0);

        assert!((x - 6.0).abs() < 1e-9);
        assert!((y - 8.0).abs() < 1e-9);
        assert_eq!(z, 0.0);
    }

    #[test]
    fn target_beyond_the_goal_overshoots_on_the_same_line() {
        let start = system(1, (0.0, 0.0, 0.0));
        let goal = system(2, (5.0, 0.0, 0.0));
        let (x, _, _) = target_coordinates(&start, &goal, 20.0);

        assert!((x - 20.0).abs() < 1e-9);
    }
}
