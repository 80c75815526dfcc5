//! Least-squares intersection of camera rays.
//!
//! For rays `(oᵢ, dᵢ)` with unit directions the point minimising the summed
//! squared perpendicular distance solves
//!
//! ```text
//! A·x = b,   A = Σ (I - dᵢdᵢᵀ),   b = Σ (I - dᵢdᵢᵀ)·oᵢ
//! ```
//!
//! `A` is symmetric positive semi-definite and becomes singular when all rays
//! are parallel, so its eigenvalues are checked before solving.

use crate::{
    camera::Ray,
    constants::{DEFAULT_MAX_CONDITION_NUMBER, MIN_EIGENVALUE},
    motion_detector::Detection,
    CameraModel, Error, Result,
};
use log::debug;
use nalgebra::{Matrix3, Point3, Vector3};

/// Ray intersection with a conditioning guard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangulator {
    max_condition_number: f64,
}

impl Default for Triangulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONDITION_NUMBER)
    }
}

impl Triangulator {
    /// Create a triangulator rejecting systems with `λmax/λmin > max_condition_number`
    #[must_use]
    pub fn new(max_condition_number: f64) -> Self {
        Self { max_condition_number }
    }

    /// Closest point to all rays
    ///
    /// # Errors
    ///
    /// Returns `Error::IllConditionedTriangulation` for fewer than two rays,
    /// near-parallel rays or a non-finite solution.
    pub fn intersect(&self, rays: &[Ray]) -> Result<Point3<f64>> {
        if rays.len() < 2 {
            return Err(Error::IllConditionedTriangulation(format!(
                "need at least 2 rays, got {}",
                rays.len()
            )));
        }

        let mut a = Matrix3::zeros();
        let mut b = Vector3::zeros();
        for ray in rays {
            let d = ray.direction.into_inner();
            let projector = Matrix3::identity() - d * d.transpose();
            a += projector;
            b += projector * ray.origin.coords;
        }

        let eigenvalues = a.symmetric_eigenvalues();
        let lambda_min = eigenvalues.min();
        let lambda_max = eigenvalues.max();
        if !(lambda_min.is_finite() && lambda_min > MIN_EIGENVALUE) {
            return Err(Error::IllConditionedTriangulation(format!(
                "singular system (smallest eigenvalue {lambda_min:.3e})"
            )));
        }
        let condition = lambda_max / lambda_min;
        if condition > self.max_condition_number {
            return Err(Error::IllConditionedTriangulation(format!(
                "condition number {condition:.3e} exceeds {:.3e}",
                self.max_condition_number
            )));
        }

        let solution = a
            .cholesky()
            .map(|cholesky| cholesky.solve(&b))
            .ok_or_else(|| Error::IllConditionedTriangulation("normal matrix not positive definite".to_string()))?;

        if !solution.iter().all(|c| c.is_finite()) {
            return Err(Error::IllConditionedTriangulation("non-finite solution".to_string()));
        }
        Ok(Point3::from(solution))
    }

    /// Triangulate one candidate per cross-camera pair of detections
    ///
    /// Detections whose ray is degenerate are skipped, as are pairs whose
    /// intersection is ill-conditioned.
    #[must_use]
    pub fn pairwise_candidates(&self, cameras: &[CameraModel], detections: &[Detection]) -> Vec<Point3<f64>> {
        let rays = cast_rays(cameras, detections);

        let mut candidates = Vec::new();
        for (i, first) in rays.iter().enumerate() {
            for second in &rays[i + 1..] {
                if first.camera == second.camera {
                    continue;
                }
                match self.intersect(&[first.clone(), second.clone()]) {
                    Ok(point) => candidates.push(point),
                    Err(e) => debug!(
                        "Skipping pair (camera {}, camera {}): {}",
                        first.camera, second.camera, e
                    ),
                }
            }
        }
        candidates
    }

    /// Triangulate a single candidate from every detection at once
    ///
    /// Intended for coarse mode, where each camera contributes at most one
    /// detection.
    #[must_use]
    pub fn joint_candidate(&self, cameras: &[CameraModel], detections: &[Detection]) -> Option<Point3<f64>> {
        let rays = cast_rays(cameras, detections);
        match self.intersect(&rays) {
            Ok(point) => Some(point),
            Err(e) => {
                debug!("Skipping joint triangulation of {} rays: {}", rays.len(), e);
                None
            }
        }
    }
}

/// Back-project detections into rays, dropping degenerate ones
#[must_use]
pub fn cast_rays(cameras: &[CameraModel], detections: &[Detection]) -> Vec<Ray> {
    detections
        .iter()
        .filter_map(|detection| {
            let Some(camera) = cameras.get(detection.camera) else {
                debug!("Detection references unknown camera {}", detection.camera);
                return None;
            };
            match camera.ray_through_pixel(detection.camera, detection.u, detection.v) {
                Ok(ray) => Some(ray),
                Err(e) => {
                    debug!("Rejecting detection: {}", e);
                    None
                }
            }
        })
        .collect()
}
