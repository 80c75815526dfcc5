use crate::config::JumpGuardConfig;
use nalgebra::Point3;

/// Damps implausible frame-to-frame jumps
///
/// When a raw point lies more than `threshold` away from the previous smoothed
/// position it is pulled back to `previous + damping · (raw - previous)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpGuard {
    threshold: f64,
    damping: f64,
}

impl JumpGuard {
    /// Create a new jump guard
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is negative or `damping` is outside `[0, 1]`.
    #[must_use]
    pub fn new(threshold: f64, damping: f64) -> Self {
        assert!(threshold >= 0.0, "Jump threshold must be non-negative");
        assert!((0.0..=1.0).contains(&damping), "Damping must be in [0, 1]");
        Self { threshold, damping }
    }

    /// Build a guard from configuration, `None` when disabled
    #[must_use]
    pub fn from_config(config: &JumpGuardConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.threshold, config.damping))
    }

    /// Clamp `raw` relative to `previous`
    #[must_use]
    pub fn apply(&self, previous: &Point3<f64>, raw: &Point3<f64>) -> Point3<f64> {
        let jump = raw - previous;
        if jump.norm() > self.threshold {
            previous + jump * self.damping
        } else {
            *raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_small_jump_passes() {
        let guard = JumpGuard::new(20.0, 0.3);
        let raw = Point3::new(5.0, 5.0, 5.0);
        assert_eq!(guard.apply(&Point3::origin(), &raw), raw);
    }

    #[test]
    fn test_large_jump_is_damped() {
        let guard = JumpGuard::new(20.0, 0.3);
        let out = guard.apply(&Point3::new(0.0, 0.0, -20.0), &Point3::new(100.0, 0.0, -20.0));
        assert_relative_eq!(out.x, 30.0, epsilon = 1e-12);
        assert_relative_eq!(out.z, -20.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "Damping must be in [0, 1]")]
    fn test_invalid_damping() {
        let _ = JumpGuard::new(20.0, 1.5);
    }
}
