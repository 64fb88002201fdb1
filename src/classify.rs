//! Votes on whether each track is moving by comparing its current point
//! cluster to one `frame_skip` ticks back, gated by whether each point
//! would have been visible from that past pose.

use crate::config::Config;
use crate::geometry::{Point3, Pose, PoseHistory};
use crate::track::Track;

const HALF_FOV_H_DEG: f32 = 31.0;
const HALF_FOV_V_DEG: f32 = 21.8;

/// `true` iff `point` (world frame) would have been inside the camera's
/// frustum at `pose`.
pub fn in_fov(point: &Point3, pose: &Pose, depth_max_value: f32) -> bool {
    let cam = pose.to_camera(point.as_vector());
    let (rx, ry, rz) = (cam.x.abs(), cam.y.abs(), cam.z.abs());
    if rz <= f32::EPSILON {
        return false;
    }
    let tan_h = HALF_FOV_H_DEG.to_radians().tan();
    let tan_v = HALF_FOV_V_DEG.to_radians().tan();
    rx / rz < tan_h && ry / rz < tan_v && rz < depth_max_value
}

fn nearest_neighbor<'a>(p: &Point3, candidates: &'a [Point3], max_dist: f32) -> Option<&'a Point3> {
    candidates
        .iter()
        .map(|q| (q, p.distance(q)))
        .filter(|(_, d)| *d <= max_dist)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(q, _)| q)
}

/// Classifies one track as dynamic or not. Returns `true` immediately for a
/// track whose newest box already carries `is_dynamic` (Yolo-sourced),
/// without inspecting motion.
pub fn classify_track(track: &Track, pose_history: &PoseHistory, cfg: &Config) -> bool {
    if track.newest_box().is_dynamic {
        return true;
    }

    let k = cfg.frame_skip;
    if track.pc_hist.len() < k + 1 {
        return false;
    }

    let cur_pc = &track.pc_hist[0];
    let prev_pc = &track.pc_hist[k];
    let Some(pose_k) = pose_history.get(k) else {
        return false;
    };

    let dt = cfg.time_difference;
    let newest_box = track.newest_box();
    let box_k = &track.box_hist[k];
    let v_box = (
        (newest_box.x - box_k.x) / (dt * k as f32),
        (newest_box.y - box_k.y) / (dt * k as f32),
        (newest_box.z - box_k.z) / (dt * k as f32),
    );
    let v_kf = (newest_box.vx, newest_box.vy, 0.0f32);

    let mut n = 0usize;
    let mut votes = 0usize;
    let mut skip = 0usize;

    for p in &cur_pc.points {
        if !in_fov(p, pose_k, cfg.depth_max_value) {
            skip += 1;
            continue;
        }
        let Some(q) = nearest_neighbor(p, &prev_pc.points, 2.0) else {
            skip += 1;
            continue;
        };
        let mut v_cur = (
            (p.x - q.x) / (dt * k as f32),
            (p.y - q.y) / (dt * k as f32),
            0.0f32,
        );
        v_cur.2 = 0.0;

        let dot = v_cur.0 * v_box.0 + v_cur.1 * v_box.1 + v_cur.2 * v_box.2;
        if dot < 0.0 {
            skip += 1;
            continue;
        }

        n += 1;
        let speed = (v_cur.0 * v_cur.0 + v_cur.1 * v_cur.1 + v_cur.2 * v_cur.2).sqrt();
        if speed > cfg.dynamic_velocity_threshold {
            votes += 1;
        }
    }

    if n == 0 {
        return false;
    }

    let vote_ratio = votes as f32 / n as f32;
    let skip_ratio = skip as f32 / n as f32;
    let v_kf_norm = (v_kf.0 * v_kf.0 + v_kf.1 * v_kf.1 + v_kf.2 * v_kf.2).sqrt();

    vote_ratio >= cfg.dynamic_voting_threshold
        && v_kf_norm >= cfg.dynamic_velocity_threshold
        && skip_ratio < cfg.maximum_skip_ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointCluster;
    use nalgebra::{Rotation3, Vector3};

    /// A camera pose looking down the world +x axis (yaw applied about
    /// world z on top of that baseline), so that the moving-along-x test
    /// clusters sit squarely in front of the camera at yaw == 0.
    fn forward_pose(yaw: f32) -> Pose {
        let to_forward_x = Rotation3::from_axis_angle(&Vector3::y_axis(), -std::f32::consts::FRAC_PI_2);
        let yaw_rot = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw);
        Pose::new(Vector3::zeros(), yaw_rot * to_forward_x)
    }

    fn make_track_with_motion(speed: f32, k: usize, n_points: usize) -> (Track, PoseHistory) {
        let cfg = Config::default();
        let mut tracker = crate::track::Tracker::new();
        let dt = cfg.time_difference;
        let mut pose_history = PoseHistory::new(k + 1);

        let mut x = 3.0;
        for _ in 0..=k {
            let cluster = PointCluster::new(
                (0..n_points)
                    .map(|i| Point3::new(x + (i as f32 % 3.0) * 0.01, 0.0, 0.5, 3.0))
                    .collect(),
            );
            let det = crate::fusion::FusedDetection {
                bbox: crate::geometry::Box3::new(x, 0.0, 0.5, 0.6, 0.6, 1.6, 0),
                cluster,
            };
            tracker.update(&[det], (0.0, 0.0, 0.0), &cfg);
            pose_history.push(forward_pose(0.0));
            x += speed * dt;
        }
        (tracker.tracks()[0].clone(), pose_history)
    }

    #[test]
    fn yolo_sourced_track_is_dynamic_without_motion_check() {
        let cfg = Config::default();
        let mut tracker = crate::track::Tracker::new();
        let det = crate::fusion::FusedDetection {
            bbox: crate::geometry::Box3::new(3.0, 0.0, 0.5, 0.5, 0.5, 1.8, 0).with_dynamic(true),
            cluster: PointCluster::default(),
        };
        tracker.update(&[det], (0.0, 0.0, 0.0), &cfg);
        let pose_history = PoseHistory::new(cfg.frame_skip);
        assert!(classify_track(&tracker.tracks()[0], &pose_history, &cfg));
    }

    #[test]
    fn insufficient_history_is_not_dynamic() {
        let cfg = Config::default();
        let mut tracker = crate::track::Tracker::new();
        let det = crate::fusion::FusedDetection {
            bbox: crate::geometry::Box3::new(3.0, 0.0, 0.5, 0.6, 0.6, 1.6, 0),
            cluster: PointCluster::new(vec![Point3::new(3.0, 0.0, 0.5, 3.0); 10]),
        };
        tracker.update(&[det], (0.0, 0.0, 0.0), &cfg);
        let pose_history = PoseHistory::new(cfg.frame_skip);
        assert!(!classify_track(&tracker.tracks()[0], &pose_history, &cfg));
    }

    #[test]
    fn s5_fast_moving_cluster_is_classified_dynamic() {
        let cfg = Config::default();
        let (track, pose_history) = make_track_with_motion(1.0, cfg.frame_skip, 30);
        assert!(classify_track(&track, &pose_history, &cfg));
    }

    #[test]
    fn s6_fov_rotation_suppresses_dynamic_classification() {
        let cfg = Config::default();
        let k = cfg.frame_skip;
        let mut tracker = crate::track::Tracker::new();
        let dt = cfg.time_difference;
        let mut pose_history = PoseHistory::new(k + 1);

        let mut x = 3.0;
        for i in 0..=k {
            let cluster = PointCluster::new(
                (0..30).map(|j| Point3::new(x + (j as f32 % 3.0) * 0.01, 0.0, 0.5, 3.0)).collect(),
            );
            let det = crate::fusion::FusedDetection {
                bbox: crate::geometry::Box3::new(x, 0.0, 0.5, 0.6, 0.6, 1.6, 0),
                cluster,
            };
            tracker.update(&[det], (0.0, 0.0, 0.0), &cfg);
            // The oldest pushed pose (i == 0) ends up as `poseK` once the
            // history fills - rotate the camera away from the cluster's
            // direction of travel only on that first tick, so the current
            // (forward-facing) cluster falls outside *that* historical FoV.
            let pose = if i == 0 {
                forward_pose(std::f32::consts::FRAC_PI_2)
            } else {
                forward_pose(0.0)
            };
            pose_history.push(pose);
            x += 1.0 * dt;
        }
        let dynamic = classify_track(&tracker.tracks()[0], &pose_history, &cfg);
        assert!(!dynamic);
    }
}
