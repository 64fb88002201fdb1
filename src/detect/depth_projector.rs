use crate::config::{Config, Intrinsics};
use crate::geometry::{Point3, Pose};
use nalgebra::Vector3;
use rayon::prelude::*;

/// A raw 16-bit depth frame, row-major, `rows * cols` samples.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<u16>,
}

impl DepthFrame {
    pub fn new(rows: usize, cols: usize, data: Vec<u16>) -> Self {
        debug_assert_eq!(rows * cols, data.len());
        Self { rows, cols, data }
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> u16 {
        self.data[row * self.cols + col]
    }
}

/// Unprojects a depth frame into world-frame points.
///
/// Returns the filtered world points together with their camera-Z depth
/// (meters). Rows are processed independently and fanned out with rayon
/// when the frame is large enough to amortize the dispatch cost - the
/// per-pixel rule itself has no cross-pixel dependency.
pub fn project_depth_frame(
    frame: &DepthFrame,
    intrinsics: &Intrinsics,
    pose: &Pose,
    cfg: &Config,
) -> Vec<Point3> {
    let margin = cfg.depth_filter_margin;
    let skip = cfg.depth_skip_pixel.max(1);
    let scale = cfg.depth_scale_factor;
    let d_min = cfg.depth_min_value;
    let d_max = cfg.depth_max_value;
    let raycast_max = cfg.raycast_max_length;

    if frame.rows <= 2 * margin || frame.cols <= 2 * margin {
        return Vec::new();
    }

    let row_range: Vec<usize> = (margin..frame.rows - margin).step_by(skip).collect();

    let per_row = |v: usize| -> Vec<Point3> {
        let mut out = Vec::new();
        let mut u = margin;
        while u < frame.cols - margin {
            let raw = frame.at(v, u);
            let depth = if raw == 0 {
                Some(raycast_max + 0.1)
            } else {
                let meters = raw as f32 / scale;
                if meters < d_min {
                    None
                } else if meters > d_max {
                    Some(raycast_max + 0.1)
                } else {
                    Some(meters)
                }
            };

            if let Some(d) = depth {
                let xc = (u as f32 - intrinsics.cx) * d / intrinsics.fx;
                let yc = (v as f32 - intrinsics.cy) * d / intrinsics.fy;
                let world = pose.to_world(Vector3::new(xc, yc, d));
                out.push(Point3::from_vector(world, d));
            }
            u += skip;
        }
        out
    };

    if row_range.len() > 32 {
        row_range.par_iter().map(|&v| per_row(v)).flatten().collect()
    } else {
        row_range.iter().flat_map(|&v| per_row(v)).collect()
    }
}

/// Inverse of the camera-frame unprojection: given a world point and the
/// pose/intrinsics used to project it, recovers the originating pixel.
/// Used only by this module's round-trip test.
pub fn unproject_to_pixel(world: Vector3<f32>, intrinsics: &Intrinsics, pose: &Pose) -> (f32, f32) {
    let cam = pose.to_camera(world);
    let u = cam.x * intrinsics.fx / cam.z + intrinsics.cx;
    let v = cam.y * intrinsics.fy / cam.z + intrinsics.cy;
    (u, v)
}
