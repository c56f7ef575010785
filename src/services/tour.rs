//! Tour construction (nearest neighbor) and improvement (2-opt)
//!
//! Both work on matrix indices; index 0 is the fixed start and never moves.

use tracing::{debug, warn};

use crate::defaults::{TWO_OPT_EPSILON, TWO_OPT_MAX_PASSES};
use crate::services::matrix::DistanceMatrix;

/// Greedy nearest-neighbor tour starting at index 0.
///
/// Ties resolve to the lowest index. When only sentinel edges remain, one is
/// still taken so the tour always covers every node.
pub fn nearest_neighbor(matrix: &DistanceMatrix) -> Vec<usize> {
    let n = matrix.size();
    if n == 0 {
        return vec![];
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = 0;
    visited[0] = true;
    order.push(0);

    while order.len() < n {
        let mut best: Option<(usize, f64)> = None;
        for candidate in 0..n {
            if visited[candidate] {
                continue;
            }
            let d = matrix.distance(current, candidate);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((candidate, d)),
            }
        }

        let Some((next, _)) = best else {
            break;
        };

        if matrix.is_sentinel(current, next) {
            warn!(
                "No reachable stop from index {}; forcing unreachable edge to {}",
                current, next
            );
        }

        visited[next] = true;
        order.push(next);
        current = next;
    }

    order
}

/// 2-opt local search over `order`, keeping position 0 fixed.
///
/// A candidate reverses positions `i..=j`; it is accepted when it shortens the
/// tour by more than the improvement epsilon. Stops after a pass without
/// improvement or after the pass cap.
pub fn two_opt(matrix: &DistanceMatrix, mut order: Vec<usize>, closed: bool) -> Vec<usize> {
    let len = order.len();
    if len < 3 {
        return order;
    }

    let mut best = matrix.path_distance(&order, closed);
    let mut passes = 0;
    let mut improved = true;

    while improved && passes < TWO_OPT_MAX_PASSES {
        improved = false;
        passes += 1;

        for i in 1..=len - 2 {
            for j in i + 1..=len - 1 {
                let mut candidate = order.clone();
                candidate[i..=j].reverse();
                let distance = matrix.path_distance(&candidate, closed);
                if distance < best - TWO_OPT_EPSILON {
                    order = candidate;
                    best = distance;
                    improved = true;
                }
            }
        }
    }

    debug!("2-opt finished after {} passes, distance {:.1} m", passes, best);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::SENTINEL_DISTANCE_METERS;

    fn triangle() -> DistanceMatrix {
        DistanceMatrix::from_distances(vec![
            vec![0.0, 10.0, 15.0],
            vec![10.0, 0.0, 20.0],
            vec![15.0, 20.0, 0.0],
        ])
    }

    /// Points on a line at the given positions; distance is |a - b|
    fn line(positions: &[f64]) -> DistanceMatrix {
        DistanceMatrix::from_distances(
            positions
                .iter()
                .map(|a| positions.iter().map(|b| (a - b).abs()).collect())
                .collect(),
        )
    }

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        sorted == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn test_three_stop_scenario() {
        let matrix = triangle();
        let nn = nearest_neighbor(&matrix);
        assert_eq!(nn, vec![0, 1, 2]);
        assert_eq!(matrix.path_distance(&nn, false), 30.0);

        // Reversing 1..=2 gives [0, 2, 1] at 35, which is rejected
        assert_eq!(matrix.path_distance(&[0, 2, 1], false), 35.0);
        let improved = two_opt(&matrix, nn, false);
        assert_eq!(improved, vec![0, 1, 2]);
        assert_eq!(matrix.path_distance(&improved, false), 30.0);
    }

    #[test]
    fn test_nearest_neighbor_ties_pick_lowest_index() {
        let matrix = DistanceMatrix::from_distances(vec![
            vec![0.0, 5.0, 5.0],
            vec![5.0, 0.0, 5.0],
            vec![5.0, 5.0, 0.0],
        ]);
        assert_eq!(nearest_neighbor(&matrix), vec![0, 1, 2]);
    }

    #[test]
    fn test_nearest_neighbor_forces_sentinel_edges() {
        let s = SENTINEL_DISTANCE_METERS;
        let matrix = DistanceMatrix::from_distances(vec![
            vec![0.0, s, s],
            vec![s, 0.0, 4.0],
            vec![s, 4.0, 0.0],
        ]);
        let order = nearest_neighbor(&matrix);
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_nearest_neighbor_trivial_sizes() {
        assert!(nearest_neighbor(&DistanceMatrix::from_distances(vec![])).is_empty());
        assert_eq!(nearest_neighbor(&DistanceMatrix::from_distances(vec![vec![0.0]])), vec![0]);
    }

    #[test]
    fn test_two_opt_untangles_crossing() {
        // Start at 0, visiting 3 before 1 and 2 doubles back
        let matrix = line(&[0.0, 1.0, 2.0, 3.0]);
        let tangled = vec![0, 3, 1, 2];
        let before = matrix.path_distance(&tangled, false);

        let improved = two_opt(&matrix, tangled, false);
        assert_eq!(improved, vec![0, 1, 2, 3]);
        assert!(matrix.path_distance(&improved, false) < before);
    }

    #[test]
    fn test_two_opt_never_worsens_and_keeps_start() {
        let positions = [5.0, 1.0, 9.0, 3.0, 7.0, 2.0, 8.0, 4.0];
        let matrix = line(&positions);

        for closed in [false, true] {
            let nn = nearest_neighbor(&matrix);
            let nn_distance = matrix.path_distance(&nn, closed);
            let improved = two_opt(&matrix, nn, closed);

            assert_eq!(improved[0], 0);
            assert!(is_permutation(&improved, positions.len()));
            assert!(matrix.path_distance(&improved, closed) <= nn_distance);
        }
    }

    #[test]
    fn test_two_opt_closed_counts_return_edge() {
        // Open-path optimum runs 0 → 1 → 2 → 3 but ends far from home
        let matrix = line(&[0.0, 1.0, 2.0, 3.0]);
        let open = two_opt(&matrix, vec![0, 1, 2, 3], false);
        let closed = two_opt(&matrix, vec![0, 1, 2, 3], true);
        assert_eq!(matrix.path_distance(&open, false), 3.0);
        assert_eq!(matrix.path_distance(&closed, true), 6.0);
    }

    #[test]
    fn test_two_opt_short_orders_unchanged() {
        let matrix = triangle();
        assert_eq!(two_opt(&matrix, vec![0, 2], false), vec![0, 2]);
        assert_eq!(two_opt(&matrix, vec![0], true), vec![0]);
    }
}
