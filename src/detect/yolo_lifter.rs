use crate::config::{Config, Intrinsics};
use crate::geometry::{transform_box_to_world, Box3, Pose};
use nalgebra::Vector3;

/// Predefined human bounding-box size `(x, y, z)` in meters, used to sanity
/// clamp Yolo-lifted extents.
const HUMAN_SIZE: (f32, f32, f32) = (0.5, 0.5, 1.8);
const CLAMP_LOW: f32 = 0.5;
const CLAMP_HIGH: f32 = 2.0;

/// A 2D object detection in the aligned-depth image frame: top-left corner
/// and size, both in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection2D {
    pub tx: f32,
    pub ty: f32,
    pub sx: f32,
    pub sy: f32,
}

fn median(sorted: &[f32]) -> f32 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Lifts one 2D detection to a world-frame [`Box3`] using a single
/// median-absolute-deviation pass over the ROI's valid depth values. Despite
/// what a "double MAD" might suggest, only one MAD stage is computed and
/// used here; the function is named for what it actually does.
pub fn lift_yolo_detection(
    det: &Detection2D,
    aligned_depth: &[u16],
    rows: usize,
    cols: usize,
    color_intrinsics: &Intrinsics,
    pose: &Pose,
    cfg: &Config,
    id: i64,
) -> Option<Box3> {
    let margin = cfg.depth_filter_margin as f32;
    let x0 = (det.tx + margin).max(0.0) as usize;
    let y0 = (det.ty + margin).max(0.0) as usize;
    let x1 = ((det.tx + det.sx - margin).max(0.0) as usize).min(cols);
    let y1 = ((det.ty + det.sy - margin).max(0.0) as usize).min(rows);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let mut depths: Vec<f32> = Vec::new();
    for v in y0..y1 {
        for u in x0..x1 {
            let raw = aligned_depth[v * cols + u];
            if raw == 0 {
                continue;
            }
            let meters = raw as f32 / cfg.depth_scale_factor;
            if meters >= cfg.depth_min_value && meters <= cfg.depth_max_value {
                depths.push(meters);
            }
        }
    }

    if depths.is_empty() {
        return None;
    }

    let mut sorted = depths.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let depth_median = median(&sorted);

    let mut abs_dev: Vec<f32> = depths.iter().map(|d| (d - depth_median).abs()).collect();
    abs_dev.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mad = median(&abs_dev);

    let lo = depth_median - 1.5 * mad;
    let hi = depth_median + 1.5 * mad;

    let depth_min = sorted.iter().copied().find(|&d| d >= lo)?;
    let depth_max = sorted.iter().copied().rev().find(|&d| d <= hi)?;
    if depth_max < depth_min {
        return None;
    }

    let mut z_extent = depth_max - depth_min;
    let human_z = HUMAN_SIZE.2;
    if z_extent < CLAMP_LOW * human_z || z_extent > CLAMP_HIGH * human_z {
        z_extent = human_z;
    }

    let cx = det.tx + det.sx / 2.0;
    let cy = det.ty + det.sy / 2.0;
    let x_c = (cx - color_intrinsics.cx) * depth_median / color_intrinsics.fx;
    let y_c = (cy - color_intrinsics.cy) * depth_median / color_intrinsics.fy;
    let x_w = (det.sx) * depth_median / color_intrinsics.fx;
    let y_w = (det.sy) * depth_median / color_intrinsics.fy;

    let center = Vector3::new(x_c, y_c, depth_median);
    let extents = Vector3::new(x_w, y_w, z_extent);

    let mut world = transform_box_to_world(pose, center, extents, id);

    let clamp_extent = |extent: &mut f32, human: f32, center_component: &mut f32, snap: Option<f32>| {
        if *extent < CLAMP_LOW * human || *extent > CLAMP_HIGH * human {
            *extent = human;
            if let Some(s) = snap {
                *center_component = s;
            }
        }
    };

    clamp_extent(&mut world.x_width, HUMAN_SIZE.0, &mut world.x, None);
    clamp_extent(&mut world.y_width, HUMAN_SIZE.1, &mut world.y, None);
    clamp_extent(
        &mut world.z_width,
        HUMAN_SIZE.2,
        &mut world.z,
        Some(HUMAN_SIZE.2 / 2.0),
    );

    world.is_dynamic = true;
    Some(world)
}
