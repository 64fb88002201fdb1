//! World-frame geometric primitives shared by every detector, the fuser,
//! the tracker and the classifier: points and clusters, axis-aligned boxes
//! and their C-IoU metric, camera poses, and the corner-transform helper
//! that lifts a local-frame box into the world frame.

pub mod bbox;
pub mod point;
pub mod pose;
pub mod transform;

pub use bbox::{iou, Box3};
pub use point::{Point3, PointCluster};
pub use pose::{Pose, PoseHistory};
pub use transform::transform_box_to_world;
