use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A rigid camera pose in the world ("map") frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub orientation: Rotation3<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, orientation: Rotation3<f32>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: Rotation3::identity(),
        }
    }

    /// Transforms a local (camera-frame) point into the world frame:
    /// `Xw = R * Xc + t`.
    pub fn to_world(&self, local: Vector3<f32>) -> Vector3<f32> {
        self.orientation * local + self.position
    }

    /// Transforms a world-frame point into this pose's camera frame:
    /// `r = R^T * (p - position)`.
    pub fn to_camera(&self, world: Vector3<f32>) -> Vector3<f32> {
        self.orientation.transpose() * (world - self.position)
    }

    /// Composes two rigid transforms: `self` is the outer (e.g. body-in-world)
    /// pose, `local` is the inner (e.g. camera-in-body) pose. The result maps
    /// points given in `local`'s own frame directly into `self`'s world frame.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose::new(self.to_world(local.position), self.orientation * local.orientation)
    }
}

/// Bounded history of camera poses matched to detection frames, one entry
/// per detect tick, newest at the front. Capacity is `skip_frame`.
///
/// A naive version of this might push a new entry only while the history is
/// below capacity and, once full, merely pop the oldest without pushing a
/// replacement - the history would eventually drain to empty. This always
/// pushes the newest pose to the front and then truncates, so a primed
/// history never empties.
#[derive(Debug, Clone)]
pub struct PoseHistory {
    capacity: usize,
    poses: VecDeque<Pose>,
}

impl PoseHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            poses: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, pose: Pose) {
        self.poses.push_front(pose);
        while self.poses.len() > self.capacity {
            self.poses.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Pose `k` ticks back from the newest (`k == 0` is the newest).
    pub fn get(&self, k: usize) -> Option<&Pose> {
        self.poses.get(k)
    }
}
