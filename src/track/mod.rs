//! Associates fused detections to persistent tracks by feature-cosine
//! similarity with linear motion prediction, and maintains one
//! constant-velocity Kalman filter per track.

pub mod kalman;

use crate::config::Config;
use crate::fusion::FusedDetection;
use crate::geometry::{iou, Box3, PointCluster};
use kalman::{KalmanFilter2D, KalmanState};
use std::collections::VecDeque;

/// Feature weights applied to `(dx, dy, dz, x_width, y_width, z_width,
/// cluster_len, std_x, std_y, std_z)`.
const FEATURE_WEIGHTS: [f32; 10] = [2.0, 2.0, 2.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5];

fn feature_vector(bbox: &Box3, cluster: &PointCluster, ego: (f32, f32, f32)) -> [f32; 10] {
    let (sx, sy, sz) = cluster.std();
    let raw = [
        bbox.x - ego.0,
        bbox.y - ego.1,
        bbox.z - ego.2,
        bbox.x_width,
        bbox.y_width,
        bbox.z_width,
        cluster.len() as f32,
        sx,
        sy,
        sz,
    ];
    let mut out = [0.0f32; 10];
    for i in 0..10 {
        out[i] = raw[i] * FEATURE_WEIGHTS[i];
    }
    out
}

fn cosine_similarity(a: &[f32; 10], b: &[f32; 10]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= 0.0 || norm_b <= 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// A persistent tracked identity: bounded box/cluster history, one Kalman
/// filter, and an eviction counter.
///
/// History capacity is `max(history_size, frame_skip + 1)`, not
/// `history_size` alone - the classifier indexes `frame_skip` ticks back
/// (`pc_hist[frame_skip]`), which needs `frame_skip + 1` entries to be
/// reachable even when `frame_skip == history_size`. Mirrors why
/// `PoseHistory` is sized `frame_skip + 1` in `pipeline::Pipeline::new`.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: i64,
    pub box_hist: VecDeque<Box3>,
    pub pc_hist: VecDeque<PointCluster>,
    pub kalman: KalmanState,
    missed_ticks: usize,
    capacity: usize,
}

impl Track {
    fn new(id: i64, bbox: Box3, cluster: PointCluster, kalman: KalmanState, capacity: usize) -> Self {
        let mut box_hist = VecDeque::with_capacity(capacity);
        let mut pc_hist = VecDeque::with_capacity(capacity);
        box_hist.push_front(bbox);
        pc_hist.push_front(cluster);
        Self {
            id,
            box_hist,
            pc_hist,
            kalman,
            missed_ticks: 0,
            capacity,
        }
    }

    fn push_history(&mut self, bbox: Box3, cluster: PointCluster) {
        self.box_hist.push_front(bbox);
        self.pc_hist.push_front(cluster);
        while self.box_hist.len() > self.capacity {
            self.box_hist.pop_back();
        }
        while self.pc_hist.len() > self.capacity {
            self.pc_hist.pop_back();
        }
    }

    pub(crate) fn predicted_box(&self, dt: f32) -> Box3 {
        let newest = self.box_hist[0];
        let mut predicted = newest;
        predicted.x += newest.vx * dt;
        predicted.y += newest.vy * dt;
        predicted
    }

    pub fn newest_box(&self) -> &Box3 {
        &self.box_hist[0]
    }

    pub fn newest_cluster(&self) -> &PointCluster {
        &self.pc_hist[0]
    }
}

/// Owns the set of active [`Track`]s and runs association/update/eviction
/// each detect tick.
#[derive(Debug, Default)]
pub struct Tracker {
    tracks: Vec<Track>,
    next_id: i64,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn new_kalman(cfg: &Config) -> KalmanFilter2D {
        KalmanFilter2D::new(cfg.e_p, cfg.e_q, cfg.e_r, cfg.time_difference)
    }

    /// Runs one detect-tick's worth of association, Kalman update, history
    /// append and eviction. Returns the index order into `self.tracks()`
    /// mirroring the order of `detections`, i.e. `result[i]` is the track
    /// index that detection `i` ended up in.
    pub fn update(&mut self, detections: &[FusedDetection], ego: (f32, f32, f32), cfg: &Config) -> Vec<usize> {
        if self.tracks.is_empty() {
            let mut order = Vec::with_capacity(detections.len());
            for det in detections {
                order.push(self.spawn_track(det, cfg));
            }
            return order;
        }

        let filter = Self::new_kalman(cfg);
        let predicted: Vec<Box3> = self
            .tracks
            .iter()
            .map(|t| t.predicted_box(cfg.time_difference))
            .collect();
        let predicted_features: Vec<[f32; 10]> = self
            .tracks
            .iter()
            .zip(predicted.iter())
            .map(|(t, p)| feature_vector(p, t.newest_cluster(), ego))
            .collect();

        let mut matched_this_tick = vec![false; self.tracks.len()];
        let mut order = Vec::with_capacity(detections.len());

        for det in detections {
            let det_feature = feature_vector(&det.bbox, &det.cluster, ego);

            let best = predicted_features
                .iter()
                .enumerate()
                .map(|(j, f)| (j, cosine_similarity(f, &det_feature)))
                .filter(|(j, sim)| *sim > cfg.similarity_threshold && iou(&det.bbox, &predicted[*j]) > 0.0)
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

            match best {
                Some((j, _)) => {
                    let prev = *self.tracks[j].newest_box();
                    let predicted_state = filter.predict(&self.tracks[j].kalman);
                    let updated = filter.update(&predicted_state, det.bbox.x, det.bbox.y, prev.x, prev.y);
                    let mut new_box = det.bbox;
                    new_box.x = updated.x();
                    new_box.y = updated.y();
                    new_box.vx = updated.vx();
                    new_box.vy = updated.vy();
                    new_box.id = self.tracks[j].id;
                    self.tracks[j].kalman = updated;
                    self.tracks[j].push_history(new_box, det.cluster.clone());
                    self.tracks[j].missed_ticks = 0;
                    matched_this_tick[j] = true;
                    order.push(j);
                }
                None => {
                    let idx = self.spawn_track(det, cfg);
                    order.push(idx);
                    if idx < matched_this_tick.len() {
                        matched_this_tick[idx] = true;
                    } else {
                        matched_this_tick.push(true);
                    }
                }
            }
        }

        for (j, matched) in matched_this_tick.iter().enumerate() {
            if j >= self.tracks.len() {
                continue;
            }
            if !*matched {
                self.tracks[j].missed_ticks += 1;
            }
        }

        let evict_at = cfg.history_size;
        let order_ids: Vec<i64> = order.iter().map(|&j| self.tracks[j].id).collect();
        self.tracks.retain(|t| t.missed_ticks < evict_at);

        order_ids
            .into_iter()
            .map(|id| self.tracks.iter().position(|t| t.id == id).unwrap())
            .collect()
    }

    fn spawn_track(&mut self, det: &FusedDetection, cfg: &Config) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let filter = Self::new_kalman(cfg);
        let kalman = filter.initiate(det.bbox.x, det.bbox.y);
        let mut bbox = det.bbox;
        bbox.id = id;
        let capacity = cfg.history_size.max(cfg.frame_skip + 1);
        self.tracks
            .push(Track::new(id, bbox, det.cluster.clone(), kalman, capacity));
        self.tracks.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;

    fn det(x: f32, y: f32, z: f32) -> FusedDetection {
        FusedDetection {
            bbox: Box3::new(x, y, z, 0.6, 0.6, 1.6, 0),
            cluster: PointCluster::new(vec![Point3::new(x, y, z, 1.0); 10]),
        }
    }

    #[test]
    fn first_detections_each_spawn_a_track() {
        let mut tracker = Tracker::new();
        let cfg = Config::default();
        let order = tracker.update(&[det(1.0, 0.0, 0.0), det(5.0, 0.0, 0.0)], (0.0, 0.0, 0.0), &cfg);
        assert_eq!(order.len(), 2);
        assert_eq!(tracker.tracks().len(), 2);
    }

    #[test]
    fn history_length_is_bounded_by_history_size() {
        let mut tracker = Tracker::new();
        let mut cfg = Config::default();
        cfg.history_size = 3;
        cfg.frame_skip = 2;
        let mut x = 3.0;
        for _ in 0..10 {
            tracker.update(&[det(x, 0.0, 0.5)], (0.0, 0.0, 0.0), &cfg);
            x += 0.01;
        }
        let t = &tracker.tracks()[0];
        assert!(t.box_hist.len() <= 3);
        assert_eq!(t.box_hist.len(), t.pc_hist.len());
    }

    #[test]
    fn track_is_evicted_after_history_size_misses() {
        let mut tracker = Tracker::new();
        let mut cfg = Config::default();
        cfg.history_size = 2;
        tracker.update(&[det(3.0, 0.0, 0.5)], (0.0, 0.0, 0.0), &cfg);
        assert_eq!(tracker.tracks().len(), 1);
        // two consecutive empty ticks -> evicted
        tracker.update(&[], (0.0, 0.0, 0.0), &cfg);
        tracker.update(&[], (0.0, 0.0, 0.0), &cfg);
        assert_eq!(tracker.tracks().len(), 0);
    }

    #[test]
    fn moving_target_converges_to_constant_velocity() {
        let mut tracker = Tracker::new();
        let cfg = Config::default();
        tracker.update(&[det(3.0, 0.0, 0.5)], (0.0, 0.0, 0.0), &cfg);
        tracker.update(&[det(3.033, 0.0, 0.5)], (0.0, 0.0, 0.0), &cfg);
        tracker.update(&[det(3.066, 0.0, 0.5)], (0.0, 0.0, 0.0), &cfg);
        let t = &tracker.tracks()[0];
        let vx = t.kalman.vx();
        assert!((vx - 1.0).abs() < 0.5, "vx={}", vx);
    }
}
