//! Per-track temporal filters.
//!
//! Every track owns one filter that smooths its triangulated positions. The
//! constant-velocity Kalman filter is the default; the pass-through filter
//! reports raw measurements and is useful when comparing against the filter.

/// Constant-velocity Kalman filter in 3D
pub mod kalman;

/// Temporal outlier guard applied before the filter update
pub mod jump_guard;

use crate::config::FilterConfig;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

pub use jump_guard::JumpGuard;
pub use kalman::KalmanFilter3D;

/// Trait for all position filters
pub trait PositionFilter: Send + Sync {
    /// Advance the estimate by one time step
    fn predict(&mut self);

    /// Correct the estimate with a measurement and return the smoothed position
    fn update(&mut self, measurement: &Point3<f64>) -> Point3<f64>;

    /// Current position estimate
    fn position(&self) -> Point3<f64>;

    /// Restart the filter at `position`
    fn reset(&mut self, position: Point3<f64>);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes measurements through unchanged
#[derive(Debug, Clone)]
pub struct PassThroughFilter {
    position: Point3<f64>,
}

impl PassThroughFilter {
    /// Create a pass-through filter at `initial`
    #[must_use]
    pub fn new(initial: Point3<f64>) -> Self {
        Self { position: initial }
    }
}

impl PositionFilter for PassThroughFilter {
    fn predict(&mut self) {}

    fn update(&mut self, measurement: &Point3<f64>) -> Point3<f64> {
        self.position = *measurement;
        self.position
    }

    fn position(&self) -> Point3<f64> {
        self.position
    }

    fn reset(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    fn name(&self) -> &str {
        "PassThroughFilter"
    }
}

/// Which filter new tracks receive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Constant-velocity Kalman filter
    #[default]
    Kalman,
    /// Raw measurements
    None,
}

/// Create a filter for a new track at `initial`
#[must_use]
pub fn create_filter(config: &FilterConfig, initial: Point3<f64>) -> Box<dyn PositionFilter> {
    match config.kind {
        FilterKind::Kalman => Box::new(KalmanFilter3D::new(
            initial,
            config.dt,
            config.process_noise,
            config.measurement_noise,
            config.initial_covariance,
        )),
        FilterKind::None => Box::new(PassThroughFilter::new(initial)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through_filter() {
        let mut filter = PassThroughFilter::new(Point3::origin());
        filter.predict();
        let out = filter.update(&Point3::new(10.0, 20.0, 30.0));
        assert_eq!(out, Point3::new(10.0, 20.0, 30.0));
        assert_eq!(filter.position(), out);
    }

    #[test]
    fn test_create_filter() {
        let mut config = FilterConfig::default();
        let filter = create_filter(&config, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(filter.name(), "KalmanFilter3D");
        assert_eq!(filter.position(), Point3::new(1.0, 2.0, 3.0));

        config.kind = FilterKind::None;
        assert_eq!(create_filter(&config, Point3::origin()).name(), "PassThroughFilter");
    }
}
