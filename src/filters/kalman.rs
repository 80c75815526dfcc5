use super::PositionFilter;
use log::warn;
use nalgebra::{Matrix3, Matrix6, Point3, SMatrix, Vector3, Vector6};

type Matrix3x6 = SMatrix<f64, 3, 6>;

/// Constant-velocity Kalman filter over `[x, y, z, vx, vy, vz]`
#[derive(Debug, Clone)]
pub struct KalmanFilter3D {
    // State: [x, y, z, vx, vy, vz]
    state: Vector6<f64>,
    // State covariance
    covariance: Matrix6<f64>,
    // Process noise
    process_noise: Matrix6<f64>,
    // Measurement noise
    measurement_noise: Matrix3<f64>,
    // State transition matrix
    transition: Matrix6<f64>,
    // Measurement matrix (position only)
    measurement: Matrix3x6,
    initial_covariance: f64,
}

impl KalmanFilter3D {
    /// Create a filter at `initial` with zero velocity
    ///
    /// `q` and `r` are the diagonal process and measurement noise, `p0` the
    /// diagonal initial covariance.
    #[must_use]
    pub fn new(initial: Point3<f64>, dt: f64, q: f64, r: f64, p0: f64) -> Self {
        let mut transition = Matrix6::identity();
        for i in 0..3 {
            transition[(i, i + 3)] = dt;
        }

        let mut measurement = Matrix3x6::zeros();
        measurement.fixed_view_mut::<3, 3>(0, 0).fill_with_identity();

        let mut state = Vector6::zeros();
        state.fixed_rows_mut::<3>(0).copy_from(&initial.coords);

        Self {
            state,
            covariance: Matrix6::identity() * p0,
            process_noise: Matrix6::identity() * q,
            measurement_noise: Matrix3::identity() * r,
            transition,
            measurement,
            initial_covariance: p0,
        }
    }

    /// Full state vector
    #[must_use]
    pub fn state(&self) -> &Vector6<f64> {
        &self.state
    }

    /// Estimated velocity
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.state.fixed_rows::<3>(3).into_owned()
    }

    /// State covariance
    #[must_use]
    pub fn covariance(&self) -> &Matrix6<f64> {
        &self.covariance
    }

    /// Overwrite the velocity estimate
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.state.fixed_rows_mut::<3>(3).copy_from(&velocity);
    }
}

impl PositionFilter for KalmanFilter3D {
    fn predict(&mut self) {
        // Predict state
        self.state = self.transition * self.state;

        // Predict covariance
        self.covariance = self.transition * self.covariance * self.transition.transpose() + self.process_noise;
    }

    fn update(&mut self, measurement: &Point3<f64>) -> Point3<f64> {
        // Innovation
        let innovation = measurement.coords - self.measurement * self.state;

        // Innovation covariance, symmetric positive definite for r > 0
        let innovation_cov =
            self.measurement * self.covariance * self.measurement.transpose() + self.measurement_noise;
        let Some(cholesky) = innovation_cov.cholesky() else {
            warn!("Innovation covariance not positive definite, skipping correction");
            return self.position();
        };

        // Kalman gain K = P Hᵀ S⁻¹
        let gain = self.covariance * self.measurement.transpose() * cholesky.inverse();

        // Update state
        self.state += gain * innovation;

        // Joseph form keeps the covariance symmetric
        let i_kh = Matrix6::identity() - gain * self.measurement;
        self.covariance = i_kh * self.covariance * i_kh.transpose()
            + gain * self.measurement_noise * gain.transpose();

        self.position()
    }

    fn position(&self) -> Point3<f64> {
        Point3::from(self.state.fixed_rows::<3>(0).into_owned())
    }

    fn reset(&mut self, position: Point3<f64>) {
        self.state = Vector6::zeros();
        self.state.fixed_rows_mut::<3>(0).copy_from(&position.coords);
        self.covariance = Matrix6::identity() * self.initial_covariance;
    }

    fn name(&self) -> &str {
        "KalmanFilter3D"
    }
}
