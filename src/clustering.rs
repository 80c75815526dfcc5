//! Merging of near-duplicate 3D candidates.
//!
//! With three or more cameras the same object is triangulated once per camera
//! pair. Candidates are grouped by single linkage: two points closer than the
//! merge distance share a cluster, transitively. Each cluster collapses to the
//! mean of its members.

use nalgebra::{Point3, Vector3};
use std::collections::VecDeque;

/// Cluster index of every point
///
/// Clusters are numbered by their lowest member index, so membership does not
/// depend on input order.
#[must_use]
pub fn cluster_labels(points: &[Point3<f64>], threshold: f64) -> Vec<usize> {
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut next_label = 0;
    let mut queue = VecDeque::new();

    for seed in 0..points.len() {
        if labels[seed].is_some() {
            continue;
        }
        labels[seed] = Some(next_label);
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            for (other, label) in labels.iter_mut().enumerate() {
                if label.is_none() && nalgebra::distance(&points[current], &points[other]) < threshold {
                    *label = Some(next_label);
                    queue.push_back(other);
                }
            }
        }
        next_label += 1;
    }

    labels.into_iter().map(|label| label.unwrap_or_default()).collect()
}

/// Collapse each single-linkage cluster to its centroid
///
/// The output holds one point per cluster, ordered by the cluster's lowest
/// input index.
#[must_use]
pub fn merge_close_points(points: &[Point3<f64>], threshold: f64) -> Vec<Point3<f64>> {
    if points.len() <= 1 {
        return points.to_vec();
    }

    let labels = cluster_labels(points, threshold);
    let clusters = labels.iter().copied().max().map_or(0, |max| max + 1);

    let mut sums = vec![Vector3::zeros(); clusters];
    let mut counts = vec![0usize; clusters];
    for (point, &label) in points.iter().zip(&labels) {
        sums[label] += point.coords;
        counts[label] += 1;
    }

    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            #[allow(clippy::cast_precision_loss)]
            let n = count as f64;
            Point3::from(sum / n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_and_single() {
        assert!(merge_close_points(&[], 15.0).is_empty());
        let single = [Point3::new(1.0, 2.0, 3.0)];
        assert_eq!(merge_close_points(&single, 15.0), single.to_vec());
    }

    #[test]
    fn test_close_points_merge_to_mean() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(100.0, 0.0, 0.0),
        ];
        let merged = merge_close_points(&points, 15.0);

        assert_eq!(merged.len(), 2);
        assert_relative_eq!(merged[0].x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(merged[1].x, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_chains_merge_transitively() {
        // 0-10 and 10-20 are linked even though 0-20 is not
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(20.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ];
        let labels = cluster_labels(&points, 15.0);
        assert_eq!(labels, vec![0, 0, 0]);

        let merged = merge_close_points(&points, 15.0);
        assert_eq!(merged.len(), 1);
        assert_relative_eq!(merged[0].x, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_equal_to_threshold_does_not_merge() {
        let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(15.0, 0.0, 0.0)];
        assert_eq!(merge_close_points(&points, 15.0).len(), 2);
    }

    #[test]
    fn test_membership_is_order_independent() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(50.0, 0.0, 0.0),
            Point3::new(20.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(60.0, 5.0, 0.0),
        ];
        let mut reversed = points.clone();
        reversed.reverse();

        let forward = cluster_labels(&points, 15.0);
        let backward = cluster_labels(&reversed, 15.0);

        let n = points.len();
        for i in 0..n {
            for j in 0..n {
                let together = forward[i] == forward[j];
                let together_reversed = backward[n - 1 - i] == backward[n - 1 - j];
                assert_eq!(together, together_reversed, "pair ({i}, {j})");
            }
        }
    }
}
