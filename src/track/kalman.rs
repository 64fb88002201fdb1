use nalgebra::{SMatrix, SVector};

const DIM: usize = 4; // [x, y, vx, vy]

/// Mean + covariance of a constant-velocity 2D Kalman filter's state.
#[derive(Debug, Clone, Copy)]
pub struct KalmanState {
    pub mean: SVector<f32, DIM>,
    pub covariance: SMatrix<f32, DIM, DIM>,
}

impl KalmanState {
    pub fn x(&self) -> f32 {
        self.mean[0]
    }
    pub fn y(&self) -> f32 {
        self.mean[1]
    }
    pub fn vx(&self) -> f32 {
        self.mean[2]
    }
    pub fn vy(&self) -> f32 {
        self.mean[3]
    }
}

/// One constant-velocity 2D Kalman filter, shared by every [`crate::track::Track`].
/// `e_p`/`e_q`/`e_r` are each read from their own configuration field, kept
/// fully independent rather than letting one silently shadow another.
#[derive(Debug, Clone)]
pub struct KalmanFilter2D {
    motion_matrix: SMatrix<f32, DIM, DIM>,
    update_matrix: SMatrix<f32, DIM, DIM>,
    e_p: f32,
    e_q: f32,
    e_r: f32,
    dt: f32,
}

impl KalmanFilter2D {
    pub fn new(e_p: f32, e_q: f32, e_r: f32, dt: f32) -> Self {
        let mut motion_matrix: SMatrix<f32, DIM, DIM> = SMatrix::identity();
        motion_matrix[(0, 2)] = dt;
        motion_matrix[(1, 3)] = dt;

        Self {
            motion_matrix,
            update_matrix: SMatrix::identity(),
            e_p,
            e_q,
            e_r,
            dt,
        }
    }

    /// Initiates state at `(x, y)` with zero velocity, `P0 = e_p * I`.
    pub fn initiate(&self, x: f32, y: f32) -> KalmanState {
        KalmanState {
            mean: SVector::from_iterator([x, y, 0.0, 0.0]),
            covariance: SMatrix::identity() * self.e_p,
        }
    }

    pub fn predict(&self, state: &KalmanState) -> KalmanState {
        let mean = self.motion_matrix * state.mean;
        let q: SMatrix<f32, DIM, DIM> = SMatrix::identity() * self.e_q;
        let covariance = self.motion_matrix * state.covariance * self.motion_matrix.transpose() + q;
        KalmanState { mean, covariance }
    }

    /// Updates with observation `z = [x_det, y_det, (x_det-x_prev)/dt,
    /// (y_det-y_prev)/dt]`, built from the current detection and the
    /// track's previous (x, y).
    pub fn update(&self, state: &KalmanState, x_det: f32, y_det: f32, x_prev: f32, y_prev: f32) -> KalmanState {
        let z: SVector<f32, DIM> = SVector::from_iterator([
            x_det,
            y_det,
            (x_det - x_prev) / self.dt,
            (y_det - y_prev) / self.dt,
        ]);

        let r: SMatrix<f32, DIM, DIM> = SMatrix::identity() * self.e_r;
        let innovation_cov =
            self.update_matrix * state.covariance * self.update_matrix.transpose() + r;

        let gain = match innovation_cov.try_inverse() {
            Some(inv) => state.covariance * self.update_matrix.transpose() * inv,
            // Degenerate covariance: treat the update as a no-op, keep the
            // predicted state rather than propagate a garbage correction.
            None => return *state,
        };

        let residual = z - self.update_matrix * state.mean;
        let mean = state.mean + gain * residual;
        let identity: SMatrix<f32, DIM, DIM> = SMatrix::identity();
        let covariance = (identity - gain * self.update_matrix) * state.covariance;
        KalmanState { mean, covariance }
    }
}
