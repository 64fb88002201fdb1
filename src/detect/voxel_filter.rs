use crate::config::Config;
use crate::geometry::Point3;
use std::collections::HashMap;

/// Per-voxel occupancy-count downsampler.
///
/// Voxel coordinates are floor-divided into a sparse `HashMap` rather than a
/// flat pre-sized array, since the world extent here is unbounded; this
/// changes nothing about the per-voxel firing semantics.
pub struct VoxelFilter {
    res: f32,
}

impl VoxelFilter {
    pub fn new(res: f32) -> Self {
        Self { res }
    }

    fn voxel_index(&self, p: &Point3) -> (i64, i64, i64) {
        (
            (p.x / self.res).floor() as i64,
            (p.y / self.res).floor() as i64,
            (p.z / self.res).floor() as i64,
        )
    }

    /// Filters `points` against the ground plane, raycast cutoff and local
    /// extent, then emits exactly one point per voxel, on the tick its
    /// occupancy counter reaches `voxel_occupied_thresh`.
    pub fn filter(&self, points: &[Point3], center: (f32, f32, f32), extent: (f32, f32, f32), cfg: &Config) -> Vec<Point3> {
        let mut counts: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut out = Vec::new();

        for p in points {
            if p.depth > cfg.raycast_max_length {
                continue;
            }
            if p.z < cfg.ground_height {
                continue;
            }
            if (p.x - center.0).abs() > extent.0
                || (p.y - center.1).abs() > extent.1
                || (p.z - center.2).abs() > extent.2
            {
                continue;
            }

            let idx = self.voxel_index(p);
            let count = counts.entry(idx).or_insert(0);
            *count += 1;
            if *count == cfg.voxel_occupied_thresh {
                out.push(*p);
            }
        }

        out
    }
}
