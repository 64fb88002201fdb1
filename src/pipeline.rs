//! The orchestrator that wires the three detectors, the fuser, the tracker
//! and the classifier into a tick-driven loop. There is no internal thread
//! or timer - the embedding application drives ticks at whatever cadence
//! its own sensor and render loops run at.
//!
//! Two cadences are expected to differ in practice: `detect_and_track` is the
//! expensive tick (depth unprojection, DBSCAN, association, Kalman update)
//! and should run at the sensor's detect rate; `visualize` is cheap (just a
//! linear extrapolation of each track's last Kalman estimate) and can be
//! called every render frame in between.

use crate::config::Config;
use crate::detect::{
    cluster, cluster_bbox, lift_uv_boxes, lift_yolo_detection, project_depth_frame, DepthFrame,
    Detection2D, NullUvDetector, UvDetector,
};
use crate::errors::Errors;
use crate::classify::classify_track;
use crate::detect::VoxelFilter;
use crate::fusion::{fuse_uv_dbscan, overlay_yolo};
use crate::geometry::{Box3, Pose, PoseHistory};
use crate::track::{Track, Tracker};

/// Voxel edge length used to downsample unprojected depth points before
/// clustering. Distinct from the DBSCAN search radius - this is a coarser
/// pre-filter, DBSCAN does the actual cluster separation.
const VOXEL_RESOLUTION_M: f32 = 0.05;

/// One tracked obstacle as reported to the embedding application: current
/// box estimate, stable track id, and the latest dynamic/static classification.
#[derive(Debug, Clone, Copy)]
pub struct TrackedObstacle {
    pub id: i64,
    pub bbox: Box3,
    pub is_dynamic: bool,
}

/// Owns all per-session state: the configured detectors, the active track
/// set, and the pose history the classifier gates against. Constructed once
/// per robot session; `detect_and_track` and `visualize` are called
/// repeatedly thereafter.
pub struct Pipeline {
    cfg: Config,
    uv_detector: Box<dyn UvDetector + Send>,
    voxel_filter: VoxelFilter,
    tracker: Tracker,
    pose_history: PoseHistory,
    next_id: i64,
    new_detection: bool,
    tick_count: u64,
}

impl Pipeline {
    /// Validates `cfg` and builds a pipeline around a caller-supplied
    /// U-V disparity collaborator. Fails only if `cfg` violates one of the
    /// structural invariants `Config::validate` checks.
    pub fn new(cfg: Config, uv_detector: Box<dyn UvDetector + Send>) -> Result<Self, Errors> {
        cfg.validate()?;
        let pose_history_capacity = cfg.frame_skip + 1;
        Ok(Self {
            cfg,
            uv_detector,
            voxel_filter: VoxelFilter::new(VOXEL_RESOLUTION_M),
            tracker: Tracker::new(),
            pose_history: PoseHistory::new(pose_history_capacity),
            next_id: 0,
            new_detection: false,
            tick_count: 0,
        })
    }

    /// Convenience constructor for callers with no real U-V collaborator
    /// wired in yet (tests, or a deployment that relies on DBSCAN + Yolo alone).
    pub fn with_null_uv_detector(cfg: Config) -> Result<Self, Errors> {
        Self::new(cfg, Box::new(NullUvDetector))
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn tracks(&self) -> &[Track] {
        self.tracker.tracks()
    }

    /// Whether the most recent `detect_and_track` tick produced at least one
    /// fused detection, before association. Useful for deciding whether a
    /// render tick should treat the scene as freshly observed.
    pub fn new_detection(&self) -> bool {
        self.new_detection
    }

    /// Runs one full detect tick: unprojects `depth`, downsamples and
    /// clusters it, runs the U-V collaborator, optionally lifts `yolo`
    /// detections against `aligned_color_depth`, fuses all three proposals,
    /// associates them against existing tracks, and classifies every live
    /// track as dynamic or static.
    ///
    /// `body_pose` is the robot's pose in the world frame for this tick;
    /// camera poses are derived from it via `Config::body_to_camera` /
    /// `body_to_camera_color`.
    pub fn detect_and_track(
        &mut self,
        depth: &DepthFrame,
        aligned_color_depth: Option<&[u16]>,
        yolo: &[Detection2D],
        body_pose: Pose,
    ) -> Result<Vec<TrackedObstacle>, Errors> {
        if depth.rows != self.cfg.image_rows || depth.cols != self.cfg.image_cols {
            return Err(Errors::InputShape {
                expected: (self.cfg.image_rows, self.cfg.image_cols),
                got: (depth.rows, depth.cols),
            });
        }

        let depth_camera_pose = body_pose.compose(&self.cfg.body_to_camera());
        let color_camera_pose = body_pose.compose(&self.cfg.body_to_camera_color());
        let ego = (body_pose.position.x, body_pose.position.y, body_pose.position.z);

        let raw_points = project_depth_frame(depth, &self.cfg.depth_intrinsics, &depth_camera_pose, &self.cfg);

        let voxel_center = (
            depth_camera_pose.position.x,
            depth_camera_pose.position.y,
            depth_camera_pose.position.z,
        );
        let voxel_extent = (
            self.cfg.raycast_max_length,
            self.cfg.raycast_max_length,
            self.cfg.raycast_max_length,
        );
        let filtered_points = self
            .voxel_filter
            .filter(&raw_points, voxel_center, voxel_extent, &self.cfg);

        let dbscan: Vec<(Box3, crate::geometry::PointCluster)> = cluster(&filtered_points, &self.cfg)
            .into_iter()
            .filter_map(|c| {
                let id = self.next_id;
                self.next_id += 1;
                cluster_bbox(&c, id).map(|b| (b, c))
            })
            .collect();

        let max_dist_mm = self.cfg.raycast_max_length * 1000.0;
        let uv_frame_boxes = self
            .uv_detector
            .detect(&depth.data, depth.rows, depth.cols, max_dist_mm);
        let uv_boxes = lift_uv_boxes(&uv_frame_boxes, &depth_camera_pose, &mut self.next_id);

        let mut yolo_boxes = Vec::new();
        if let Some(aligned) = aligned_color_depth {
            for det in yolo {
                let id = self.next_id;
                self.next_id += 1;
                if let Some(b) = lift_yolo_detection(
                    det,
                    aligned,
                    self.cfg.image_rows,
                    self.cfg.image_cols,
                    &self.cfg.color_intrinsics,
                    &color_camera_pose,
                    &self.cfg,
                    id,
                ) {
                    yolo_boxes.push(b);
                }
            }
        }

        let mut filtered = fuse_uv_dbscan(&uv_boxes, &dbscan, self.cfg.filtering_bbox_iou_threshold);
        overlay_yolo(
            &mut filtered,
            &yolo_boxes,
            self.cfg.filtering_bbox_iou_threshold,
            self.cfg.yolo_overwrite_distance,
            ego,
        );

        self.new_detection = !filtered.is_empty();

        let order = self.tracker.update(&filtered, ego, &self.cfg);
        log::debug!(
            "tick {}: {} fused detections matched to tracks {:?}",
            self.tick_count,
            filtered.len(),
            order
        );

        self.pose_history.push(depth_camera_pose);
        self.tick_count += 1;

        Ok(self
            .tracker
            .tracks()
            .iter()
            .map(|t| TrackedObstacle {
                id: t.id,
                bbox: *t.newest_box(),
                is_dynamic: classify_track(t, &self.pose_history, &self.cfg),
            })
            .collect())
    }

    /// Extrapolates every live track `dt` seconds forward under its own
    /// Kalman velocity estimate, without reclustering or re-associating.
    /// Meant for render ticks between `detect_and_track` calls.
    pub fn visualize(&self, dt: f32) -> Vec<TrackedObstacle> {
        self.tracker
            .tracks()
            .iter()
            .map(|t| TrackedObstacle {
                id: t.id,
                bbox: t.predicted_box(dt),
                is_dynamic: t.newest_box().is_dynamic,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use nalgebra::Vector3;

    fn flat_depth(rows: usize, cols: usize, meters: f32, scale: f32) -> Vec<u16> {
        vec![(meters * scale) as u16; rows * cols]
    }

    fn center_detection() -> Detection2D {
        Detection2D {
            tx: 300.0,
            ty: 200.0,
            sx: 40.0,
            sy: 100.0,
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = Config::default();
        cfg.time_difference = 0.0;
        assert!(Pipeline::with_null_uv_detector(cfg).is_err());
    }

    #[test]
    fn rejects_mismatched_depth_frame_shape() {
        let cfg = Config::default();
        let mut pipeline = Pipeline::with_null_uv_detector(cfg).unwrap();
        let depth = DepthFrame::new(10, 10, vec![0u16; 100]);
        let result = pipeline.detect_and_track(&depth, None, &[], Pose::identity());
        assert!(matches!(result, Err(Errors::InputShape { .. })));
    }

    #[test]
    fn yolo_only_tick_produces_a_dynamic_track() {
        let cfg = Config::default();
        let rows = cfg.image_rows;
        let cols = cfg.image_cols;
        let mut pipeline = Pipeline::with_null_uv_detector(cfg.clone()).unwrap();

        let depth = DepthFrame::new(rows, cols, vec![0u16; rows * cols]);
        let aligned = flat_depth(rows, cols, 3.0, cfg.depth_scale_factor);
        let det = center_detection();

        let outputs = pipeline
            .detect_and_track(&depth, Some(&aligned), &[det], Pose::identity())
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].is_dynamic);
        assert!(pipeline.new_detection());
    }

    #[test]
    fn repeated_ticks_at_the_same_location_keep_the_same_track_id() {
        let cfg = Config::default();
        let rows = cfg.image_rows;
        let cols = cfg.image_cols;
        let mut pipeline = Pipeline::with_null_uv_detector(cfg.clone()).unwrap();

        let depth = DepthFrame::new(rows, cols, vec![0u16; rows * cols]);
        let aligned = flat_depth(rows, cols, 3.0, cfg.depth_scale_factor);
        let det = center_detection();

        let first = pipeline
            .detect_and_track(&depth, Some(&aligned), &[det], Pose::identity())
            .unwrap();
        let second = pipeline
            .detect_and_track(&depth, Some(&aligned), &[det], Pose::identity())
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn empty_tick_reports_no_new_detection() {
        let cfg = Config::default();
        let rows = cfg.image_rows;
        let cols = cfg.image_cols;
        let mut pipeline = Pipeline::with_null_uv_detector(cfg).unwrap();
        let depth = DepthFrame::new(rows, cols, vec![0u16; rows * cols]);

        let outputs = pipeline
            .detect_and_track(&depth, None, &[], Pose::identity())
            .unwrap();

        assert!(outputs.is_empty());
        assert!(!pipeline.new_detection());
    }

    #[test]
    fn visualize_extrapolates_without_changing_track_count() {
        let cfg = Config::default();
        let rows = cfg.image_rows;
        let cols = cfg.image_cols;
        let mut pipeline = Pipeline::with_null_uv_detector(cfg.clone()).unwrap();
        let depth = DepthFrame::new(rows, cols, vec![0u16; rows * cols]);
        let aligned = flat_depth(rows, cols, 3.0, cfg.depth_scale_factor);
        let det = center_detection();
        pipeline
            .detect_and_track(&depth, Some(&aligned), &[det], Pose::identity())
            .unwrap();

        let visual = pipeline.visualize(0.033);
        assert_eq!(visual.len(), 1);
        assert!(visual[0].is_dynamic);
    }

    #[test]
    fn body_pose_composes_into_depth_camera_pose_used_for_projection() {
        let mut cfg = Config::default();
        cfg.body_to_camera = Some(Pose::new(Vector3::new(0.0, 0.0, 0.2), nalgebra::Rotation3::identity()));
        let rows = cfg.image_rows;
        let cols = cfg.image_cols;
        let mut pipeline = Pipeline::with_null_uv_detector(cfg).unwrap();
        let depth = DepthFrame::new(rows, cols, vec![0u16; rows * cols]);
        let outputs = pipeline
            .detect_and_track(&depth, None, &[], Pose::new(Vector3::new(1.0, 0.0, 0.0), nalgebra::Rotation3::identity()))
            .unwrap();
        assert!(outputs.is_empty());
    }
}
