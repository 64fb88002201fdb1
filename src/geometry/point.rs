use nalgebra::Vector3;

/// A world-frame 3D point carried together with the raw camera-Z depth it was
/// unprojected from. The depth is kept alongside the point because several
/// downstream filters (range clipping, raycast cutoff) reason about it
/// directly rather than re-deriving it from the world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub depth: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32, depth: f32) -> Self {
        Self { x, y, z, depth }
    }

    pub fn as_vector(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector(v: Vector3<f32>, depth: f32) -> Self {
        Self::new(v.x, v.y, v.z, depth)
    }

    pub fn distance(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// An ordered set of [`Point3`] belonging to one DBSCAN cluster, with derived
/// mean and per-axis standard deviation.
///
/// The standard deviation follows a population (divide-by-N) formula; see
/// DESIGN.md for why that convention was chosen over a sample (N-1)
/// correction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCluster {
    pub points: Vec<Point3>,
}

impl PointCluster {
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn center(&self) -> Point3 {
        if self.points.is_empty() {
            return Point3::new(0.0, 0.0, 0.0, 0.0);
        }
        let n = self.points.len() as f32;
        let (mut sx, mut sy, mut sz, mut sd) = (0.0, 0.0, 0.0, 0.0);
        for p in &self.points {
            sx += p.x;
            sy += p.y;
            sz += p.z;
            sd += p.depth;
        }
        Point3::new(sx / n, sy / n, sz / n, sd / n)
    }

    /// Per-axis population standard deviation `(std_x, std_y, std_z)`.
    pub fn std(&self) -> (f32, f32, f32) {
        if self.points.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let n = self.points.len() as f32;
        let c = self.center();
        let (mut vx, mut vy, mut vz) = (0.0, 0.0, 0.0);
        for p in &self.points {
            vx += (p.x - c.x).powi(2);
            vy += (p.y - c.y).powi(2);
            vz += (p.z - c.z).powi(2);
        }
        ((vx / n).sqrt(), (vy / n).sqrt(), (vz / n).sqrt())
    }

    /// Axis-aligned min/max extent of the cluster, as `(min, max)` corners.
    pub fn bounds(&self) -> Option<((f32, f32, f32), (f32, f32, f32))> {
        let mut iter = self.points.iter();
        let first = iter.next()?;
        let mut min = (first.x, first.y, first.z);
        let mut max = min;
        for p in iter {
            min.0 = min.0.min(p.x);
            min.1 = min.1.min(p.y);
            min.2 = min.2.min(p.z);
            max.0 = max.0.max(p.x);
            max.1 = max.1.max(p.y);
            max.2 = max.2.max(p.z);
        }
        Some((min, max))
    }
}
