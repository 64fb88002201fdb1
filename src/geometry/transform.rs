use super::bbox::Box3;
use super::pose::Pose;
use nalgebra::Vector3;

/// Transforms an axis-aligned box given in a local frame (center, extents)
/// into an axis-aligned box in the world frame under a rigid transform: the
/// 8 corners are rotated and translated individually, then the result is the
/// per-axis min/max of the transformed corners. This is the only correct way
/// to keep a box axis-aligned in the target frame when the source box is
/// itself only guaranteed axis-aligned in its own frame.
///
/// Shared by the UV detector adapter (camera-frame box -> world) and the
/// Yolo lifter (camera-frame box -> world).
pub fn transform_box_to_world(
    pose: &Pose,
    center: Vector3<f32>,
    extents: Vector3<f32>,
    id: i64,
) -> Box3 {
    let half = extents / 2.0;
    let mut min = Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);

    for sx in [-1.0f32, 1.0] {
        for sy in [-1.0f32, 1.0] {
            for sz in [-1.0f32, 1.0] {
                let corner = center + Vector3::new(sx * half.x, sy * half.y, sz * half.z);
                let world = pose.to_world(corner);
                min.x = min.x.min(world.x);
                min.y = min.y.min(world.y);
                min.z = min.z.min(world.z);
                max.x = max.x.max(world.x);
                max.y = max.y.max(world.y);
                max.z = max.z.max(world.z);
            }
        }
    }

    let world_center = (min + max) / 2.0;
    let world_extents = max - min;
    Box3::new(
        world_center.x,
        world_center.y,
        world_center.z,
        world_extents.x,
        world_extents.y,
        world_extents.z,
        id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EPS;
    use nalgebra::Rotation3;

    #[test]
    fn identity_pose_preserves_center_and_extents() {
        let pose = Pose::identity();
        let center = Vector3::new(2.0, 1.0, 0.5);
        let extents = Vector3::new(0.6, 0.4, 1.8);
        let b = transform_box_to_world(&pose, center, extents, 7);
        assert!((b.x - center.x).abs() < EPS);
        assert!((b.y - center.y).abs() < EPS);
        assert!((b.z - center.z).abs() < EPS);
        assert!((b.x_width - extents.x).abs() < EPS);
        assert!((b.y_width - extents.y).abs() < EPS);
        assert!((b.z_width - extents.z).abs() < EPS);
        assert_eq!(b.id, 7);
    }

    #[test]
    fn translation_only_shifts_center() {
        let pose = Pose::new(Vector3::new(10.0, 0.0, 0.0), Rotation3::identity());
        let center = Vector3::new(1.0, 0.0, 0.0);
        let extents = Vector3::new(1.0, 1.0, 1.0);
        let b = transform_box_to_world(&pose, center, extents, 0);
        assert!((b.x - 11.0).abs() < EPS);
        assert!((b.x_width - 1.0).abs() < EPS);
    }

    #[test]
    fn ninety_degree_yaw_swaps_extents() {
        let pose = Pose::new(Vector3::zeros(), Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            std::f32::consts::FRAC_PI_2,
        ));
        let center = Vector3::new(0.0, 0.0, 0.0);
        let extents = Vector3::new(2.0, 0.4, 1.0);
        let b = transform_box_to_world(&pose, center, extents, 0);
        assert!((b.x_width - 0.4).abs() < 1e-4);
        assert!((b.y_width - 2.0).abs() < 1e-4);
    }
}
