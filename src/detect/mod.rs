//! The three parallel 3D detectors: depth unprojection and voxel
//! downsampling feed DBSCAN clustering; a black-box U-V disparity
//! collaborator and a monocular Yolo lifter contribute their own
//! independent 3D box proposals. [`crate::fusion`] reconciles all three.

pub mod dbscan;
pub mod depth_projector;
pub mod uv_detector;
pub mod voxel_filter;
pub mod yolo_lifter;

pub use dbscan::{cluster, cluster_bbox};
pub use depth_projector::{project_depth_frame, unproject_to_pixel, DepthFrame};
pub use uv_detector::{lift_uv_boxes, CameraFrameBox, NullUvDetector, UvDetector};
pub use voxel_filter::VoxelFilter;
pub use yolo_lifter::{lift_yolo_detection, Detection2D};
