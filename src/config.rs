use crate::errors::Errors;
use crate::geometry::Pose;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics `(fx, fy, cx, cy)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Default for Intrinsics {
    fn default() -> Self {
        // A plausible default for a 640x480 depth sensor; real deployments
        // always override this from the camera's factory calibration.
        Self {
            fx: 554.0,
            fy: 554.0,
            cx: 320.0,
            cy: 240.0,
        }
    }
}

/// Which localization source feeds ego-pose: a direct 6-DoF pose stream, or
/// odometry. Both are external collaborator contracts - this crate only
/// records which one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalizationMode {
    Pose,
    Odometry,
}

impl Default for LocalizationMode {
    fn default() -> Self {
        LocalizationMode::Pose
    }
}

/// In-memory, validated parameter set covering every tunable this pipeline
/// uses. Parsing this from an external source (file, ROS param server, CLI
/// flags) is the embedding application's responsibility - `Config` itself
/// is just data plus `validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub localization_mode: LocalizationMode,
    pub depth_intrinsics: Intrinsics,
    pub color_intrinsics: Intrinsics,
    /// Body-to-depth-camera extrinsic. `None` means "not yet supplied" -
    /// deserializing a config that omits this key yields `None` rather than
    /// silently falling back to identity; `Config::validate` rejects it.
    #[serde(default)]
    pub body_to_camera: Option<Pose>,
    /// Body-to-color-camera extrinsic, same missing-is-fatal contract as
    /// `body_to_camera`.
    #[serde(default)]
    pub body_to_camera_color: Option<Pose>,

    pub depth_scale_factor: f32,
    pub depth_min_value: f32,
    pub depth_max_value: f32,
    pub depth_filter_margin: usize,
    pub depth_skip_pixel: usize,
    pub image_cols: usize,
    pub image_rows: usize,
    pub raycast_max_length: f32,

    pub voxel_occupied_thresh: u32,
    pub ground_height: f32,

    pub dbscan_min_points_cluster: usize,
    pub dbscan_search_range_epsilon: f32,

    pub filtering_bbox_iou_threshold: f32,
    pub yolo_overwrite_distance: f32,

    pub history_size: usize,
    pub time_difference: f32,
    pub similarity_threshold: f32,
    pub frame_skip: usize,

    pub dynamic_velocity_threshold: f32,
    pub dynamic_voting_threshold: f32,
    pub maximum_skip_ratio: f32,

    pub e_p: f32,
    pub e_q: f32,
    pub e_r: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            localization_mode: LocalizationMode::default(),
            depth_intrinsics: Intrinsics::default(),
            color_intrinsics: Intrinsics::default(),
            // `Config::default()` is an in-code convenience constructor, not
            // a stand-in for a deserialized config - it's reasonable for it
            // to assume identity extrinsics until overridden. A config
            // parsed from an external source that omits these keys gets
            // `None` instead (see the field's `#[serde(default)]`) and is
            // rejected by `validate`.
            body_to_camera: Some(Pose::identity()),
            body_to_camera_color: Some(Pose::identity()),

            depth_scale_factor: 1000.0,
            depth_min_value: 0.2,
            depth_max_value: 5.0,
            depth_filter_margin: 0,
            depth_skip_pixel: 1,
            image_cols: 640,
            image_rows: 480,
            raycast_max_length: 5.0,

            voxel_occupied_thresh: 10,
            ground_height: 0.1,

            dbscan_min_points_cluster: 18,
            dbscan_search_range_epsilon: 0.3,

            filtering_bbox_iou_threshold: 0.5,
            yolo_overwrite_distance: 3.5,

            history_size: 5,
            time_difference: 0.033,
            similarity_threshold: 0.9,
            frame_skip: 5,

            dynamic_velocity_threshold: 0.35,
            dynamic_voting_threshold: 0.8,
            maximum_skip_ratio: 0.5,

            e_p: 0.5,
            e_q: 0.5,
            e_r: 0.5,
        }
    }
}

impl Config {
    /// Checks the structural invariants this pipeline relies on and returns
    /// a `Configuration` error describing the first violation found.
    pub fn validate(&self) -> Result<(), Errors> {
        if self.frame_skip > self.history_size {
            return Err(Errors::Configuration(format!(
                "frame_skip ({}) must be <= history_size ({})",
                self.frame_skip, self.history_size
            )));
        }
        if self.time_difference <= 0.0 {
            return Err(Errors::Configuration(
                "time_difference must be positive".into(),
            ));
        }
        if self.depth_min_value >= self.depth_max_value {
            return Err(Errors::Configuration(
                "depth_min_value must be < depth_max_value".into(),
            ));
        }
        if self.image_cols == 0 || self.image_rows == 0 {
            return Err(Errors::Configuration(
                "image_cols and image_rows must be positive".into(),
            ));
        }
        if self.body_to_camera.is_none() {
            return Err(Errors::Configuration(
                "body_to_camera extrinsic is missing".into(),
            ));
        }
        if self.body_to_camera_color.is_none() {
            return Err(Errors::Configuration(
                "body_to_camera_color extrinsic is missing".into(),
            ));
        }
        Ok(())
    }

    /// The body-to-depth-camera extrinsic. Panics if called on a `Config`
    /// that hasn't passed `validate` - every path that reaches this, starting
    /// with `Pipeline::new`, validates first.
    pub fn body_to_camera(&self) -> Pose {
        self.body_to_camera
            .expect("Config::validate guarantees body_to_camera is set")
    }

    /// The body-to-color-camera extrinsic, same contract as `body_to_camera`.
    pub fn body_to_camera_color(&self) -> Pose {
        self.body_to_camera_color
            .expect("Config::validate guarantees body_to_camera_color is set")
    }
}
