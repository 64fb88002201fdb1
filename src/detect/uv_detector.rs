use crate::geometry::Pose;
use nalgebra::Vector3;

/// A camera-frame box proposal as returned by a [`UvDetector`]: center and
/// extents in the camera's own frame, not yet lifted to world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrameBox {
    pub center: Vector3<f32>,
    pub extents: Vector3<f32>,
}

/// The U-V disparity geometric detector is treated as a black-box
/// collaborator: its internal bird-view/U-map construction is out of this
/// crate's scope, only its contract is. Callers supply their own
/// implementation; [`NullUvDetector`] is a deterministic stand-in that
/// always reports no boxes, usable in tests and as a default when no real
/// collaborator is wired in.
pub trait UvDetector {
    /// `raw_depth` is the same 16-bit frame the pipeline received; `max_dist`
    /// is `raycast_max_length * 1000.0`.
    fn detect(&mut self, raw_depth: &[u16], rows: usize, cols: usize, max_dist: f32) -> Vec<CameraFrameBox>;
}

/// Deterministic no-op [`UvDetector`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUvDetector;

impl UvDetector for NullUvDetector {
    fn detect(&mut self, _raw_depth: &[u16], _rows: usize, _cols: usize, _max_dist: f32) -> Vec<CameraFrameBox> {
        Vec::new()
    }
}

/// Lifts every box a [`UvDetector`] proposed into world-frame [`Box3`]es via
/// the shared corner-transform helper.
pub fn lift_uv_boxes(boxes: &[CameraFrameBox], pose: &Pose, next_id: &mut i64) -> Vec<crate::geometry::Box3> {
    boxes
        .iter()
        .map(|b| {
            let id = *next_id;
            *next_id += 1;
            crate::geometry::transform_box_to_world(pose, b.center, b.extents, id)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detector_always_returns_empty() {
        let mut d = NullUvDetector;
        let out = d.detect(&[0u16; 16], 4, 4, 5000.0);
        assert!(out.is_empty());
    }

    #[test]
    fn lift_uv_boxes_assigns_increasing_ids() {
        let boxes = vec![
            CameraFrameBox {
                center: Vector3::new(0.0, 0.0, 1.0),
                extents: Vector3::new(0.6, 0.6, 1.6),
            },
            CameraFrameBox {
                center: Vector3::new(1.0, 0.0, 1.0),
                extents: Vector3::new(0.6, 0.6, 1.6),
            },
        ];
        let mut next_id = 5;
        let lifted = lift_uv_boxes(&boxes, &Pose::identity(), &mut next_id);
        assert_eq!(lifted[0].id, 5);
        assert_eq!(lifted[1].id, 6);
        assert_eq!(next_id, 7);
    }
}
