use crate::config::Config;
use crate::geometry::{Box3, Point3, PointCluster};

/// Classic brute-force DBSCAN over a point list.
///
/// Neighbor search is O(n^2) euclidean distance, appropriate at the scale
/// this runs at (hundreds of filtered points per frame, not millions) - a
/// spatial index could be dropped in behind this same function signature
/// later without changing callers.
fn region_query(points: &[Point3], idx: usize, eps: f32) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(j, p)| *j != idx && points[idx].distance(p) <= eps)
        .map(|(j, _)| j)
        .collect()
}

/// Runs DBSCAN and returns one [`PointCluster`] per discovered cluster
/// (noise points, which DBSCAN assigns cluster id 0, are dropped).
pub fn cluster(points: &[Point3], cfg: &Config) -> Vec<PointCluster> {
    let min_pts = cfg.dbscan_min_points_cluster;
    let eps = cfg.dbscan_search_range_epsilon;
    let n = points.len();
    let mut labels = vec![0i32; n]; // 0 = unvisited, -1 = noise, >0 = cluster id
    let mut next_cluster = 0i32;

    for i in 0..n {
        if labels[i] != 0 {
            continue;
        }
        let neighbors = region_query(points, i, eps);
        if neighbors.len() + 1 < min_pts {
            labels[i] = -1;
            continue;
        }

        next_cluster += 1;
        labels[i] = next_cluster;
        let mut seeds = neighbors;
        let mut cursor = 0;
        while cursor < seeds.len() {
            let j = seeds[cursor];
            cursor += 1;
            if labels[j] == -1 {
                labels[j] = next_cluster;
            }
            if labels[j] != 0 {
                continue;
            }
            labels[j] = next_cluster;
            let j_neighbors = region_query(points, j, eps);
            if j_neighbors.len() + 1 >= min_pts {
                for &k in &j_neighbors {
                    if labels[k] <= 0 {
                        seeds.push(k);
                    }
                }
            }
        }
    }

    let mut clusters: Vec<Vec<Point3>> = vec![Vec::new(); next_cluster as usize];
    for (i, &label) in labels.iter().enumerate() {
        if label > 0 {
            clusters[(label - 1) as usize].push(points[i]);
        }
    }

    clusters.into_iter().map(PointCluster::new).collect()
}

/// Builds the axis-aligned box for a cluster: center = mean, extents from
/// min/max on each axis (x,y floored at 0.1 m; z exact).
pub fn cluster_bbox(cluster: &PointCluster, id: i64) -> Option<Box3> {
    let (min, max) = cluster.bounds()?;
    let c = cluster.center();
    Some(Box3::new(
        c.x,
        c.y,
        c.z,
        max.0 - min.0,
        max.1 - min.1,
        max.2 - min.2,
        id,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_cluster_at(cx: f32, cy: f32, cz: f32, n: usize) -> Vec<Point3> {
        (0..n)
            .map(|i| {
                let jitter = (i as f32 % 5.0) * 0.01 - 0.02;
                Point3::new(cx + jitter, cy + jitter, cz, 1.0)
            })
            .collect()
    }

    #[test]
    fn dense_cluster_is_found() {
        let mut cfg = Config::default();
        cfg.dbscan_min_points_cluster = 10;
        cfg.dbscan_search_range_epsilon = 0.2;
        let points = tight_cluster_at(3.0, 0.0, 0.5, 25);
        let clusters = cluster(&points, &cfg);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 25);
    }

    #[test]
    fn sparse_points_are_noise_and_dropped() {
        let mut cfg = Config::default();
        cfg.dbscan_min_points_cluster = 10;
        cfg.dbscan_search_range_epsilon = 0.05;
        let points: Vec<Point3> = (0..5)
            .map(|i| Point3::new(i as f32 * 10.0, 0.0, 0.0, 1.0))
            .collect();
        let clusters = cluster(&points, &cfg);
        assert!(clusters.is_empty());
    }

    #[test]
    fn two_well_separated_clusters_stay_distinct() {
        let mut cfg = Config::default();
        cfg.dbscan_min_points_cluster = 8;
        cfg.dbscan_search_range_epsilon = 0.2;
        let mut points = tight_cluster_at(0.0, 0.0, 0.0, 15);
        points.extend(tight_cluster_at(10.0, 0.0, 0.0, 15));
        let clusters = cluster(&points, &cfg);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn cluster_bbox_has_floored_xy_extents() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0, 1.0),
            Point3::new(0.01, 0.01, 0.2, 1.0),
        ];
        let pc = PointCluster::new(points);
        let b = cluster_bbox(&pc, 1).unwrap();
        assert!(b.x_width >= 0.1);
        assert!(b.y_width >= 0.1);
        assert!((b.z_width - 0.2).abs() < 1e-4);
    }
}
