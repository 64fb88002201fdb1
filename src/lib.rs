//!
//! # dynobs-tracker
//!
//! A 3D dynamic-obstacle detection, fusion and tracking pipeline for a
//! moving robot carrying a depth+color camera. Depth frames are unprojected
//! and clustered, a U-V disparity collaborator and a monocular Yolo lifter
//! contribute independent box proposals, all three are fused by mutual-best
//! IoU, and the fused detections are associated against persistent tracks
//! with a constant-velocity Kalman filter per track. A final classifier
//! votes each track dynamic or static from its recent point-cluster motion,
//! gated by what would have been visible from the camera's past poses.
//!
//! The crate exposes this as a tick-driven [`pipeline::Pipeline`]: there is
//! no internal thread, timer or async runtime. The embedding application
//! calls [`pipeline::Pipeline::detect_and_track`] once per sensor frame and
//! [`pipeline::Pipeline::visualize`] as often as its render loop needs an
//! extrapolated estimate in between.
//!
//! ## Performance
//!
//! * [rayon](https://docs.rs/rayon/latest/rayon/) - per-row depth
//!   unprojection is fanned out across threads when a frame is large enough
//!   to amortize the dispatch cost.
//! * [nalgebra](https://nalgebra.org/) - poses, rotations and the Kalman
//!   filter's linear algebra.

pub mod classify;
pub mod config;
pub mod detect;
pub mod errors;
pub mod fusion;
pub mod geometry;
pub mod pipeline;
pub mod track;

pub use config::Config;
pub use errors::Errors;
pub use pipeline::{Pipeline, TrackedObstacle};

#[cfg(test)]
pub(crate) const EPS: f32 = 0.00001;
