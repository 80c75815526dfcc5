//! Pinhole camera model and pixel-to-ray back-projection.
//!
//! Cameras look down their local `-z` axis with `+y` up. A pixel `(u, v)` in a
//! `width × height` frame maps to the camera-space direction
//! `(u - width/2, -(v - height/2), -focal_pixels)`, which the camera-to-world
//! rotation carries into the world frame.

use crate::{
    constants::{EPSILON, ORTHONORMAL_TOLERANCE},
    Error, Result,
};
use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};

/// A line of sight from a camera centre through a detected pixel
#[derive(Debug, Clone, PartialEq)]
pub struct Ray {
    /// Index of the camera that cast the ray
    pub camera: usize,
    /// Camera position in world coordinates
    pub origin: Point3<f64>,
    /// Unit direction in world coordinates
    pub direction: Unit<Vector3<f64>>,
}

impl Ray {
    /// Point at parameter `t` along the ray
    #[must_use]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction.into_inner() * t
    }

    /// Perpendicular distance from `point` to the (infinite) line of the ray
    #[must_use]
    pub fn distance_to(&self, point: &Point3<f64>) -> f64 {
        let offset = point - self.origin;
        let along = offset.dot(self.direction.as_ref());
        (offset - self.direction.into_inner() * along).norm()
    }
}

/// Immutable calibrated camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    position: Point3<f64>,
    rotation: Matrix3<f64>,
    focal_pixels: f64,
    width: u32,
    height: u32,
}

impl CameraModel {
    /// Create a camera from an explicit camera-to-world rotation
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the rotation is not orthonormal with
    /// determinant +1, the focal length is not positive and finite, or the
    /// frame size is zero.
    pub fn new(
        position: Point3<f64>,
        rotation: Matrix3<f64>,
        focal_pixels: f64,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if !position.coords.iter().all(|c| c.is_finite()) {
            return Err(Error::Config(format!("Camera position must be finite, got {position}")));
        }
        if !(focal_pixels.is_finite() && focal_pixels > 0.0) {
            return Err(Error::Config(format!(
                "Focal length must be positive, got {focal_pixels}"
            )));
        }
        if width == 0 || height == 0 {
            return Err(Error::Config(format!("Invalid frame size {width}x{height}")));
        }

        let gram_error = (rotation.transpose() * rotation - Matrix3::identity()).amax();
        if !gram_error.is_finite() || gram_error > ORTHONORMAL_TOLERANCE {
            return Err(Error::Config(format!(
                "Rotation is not orthonormal (max |RᵀR - I| = {gram_error:.3e})"
            )));
        }
        let det = rotation.determinant();
        if (det - 1.0).abs() > ORTHONORMAL_TOLERANCE {
            return Err(Error::Config(format!(
                "Rotation must be proper (det = {det:.6}, expected 1)"
            )));
        }

        Ok(Self {
            position,
            rotation,
            focal_pixels,
            width,
            height,
        })
    }

    /// Create a camera from Euler angles (radians) and a horizontal field of view
    ///
    /// The rotation is composed as `Rz(euler.z) · Ry(euler.y) · Rx(euler.x)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the field of view is outside `(0, π)` or the
    /// derived camera fails validation.
    pub fn from_euler(
        position: Point3<f64>,
        euler: Vector3<f64>,
        field_of_view: f64,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let rotation = Rotation3::from_euler_angles(euler.x, euler.y, euler.z).into_inner();
        let focal_pixels = focal_from_fov(width, field_of_view)?;
        Self::new(position, rotation, focal_pixels, width, height)
    }

    /// Camera centre in world coordinates
    #[must_use]
    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    /// Camera-to-world rotation
    #[must_use]
    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// Focal length in pixels
    #[must_use]
    pub fn focal_pixels(&self) -> f64 {
        self.focal_pixels
    }

    /// Calibrated frame size `(width, height)`
    #[must_use]
    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// World-space optical axis (the direction of the principal point)
    #[must_use]
    pub fn optical_axis(&self) -> Unit<Vector3<f64>> {
        Unit::new_normalize(self.rotation * Vector3::new(0.0, 0.0, -1.0))
    }

    /// Back-project pixel `(u, v)` into a world-space ray
    ///
    /// # Errors
    ///
    /// Returns `Error::DegenerateRay` if the camera-space vector has zero
    /// length or is not finite.
    pub fn ray_through_pixel(&self, camera: usize, u: f64, v: f64) -> Result<Ray> {
        let half_w = f64::from(self.width) / 2.0;
        let half_h = f64::from(self.height) / 2.0;
        let local = Vector3::new(u - half_w, -(v - half_h), -self.focal_pixels);

        let norm = local.norm();
        if !norm.is_finite() || norm <= EPSILON {
            return Err(Error::DegenerateRay { camera, u, v });
        }

        let world = self.rotation * (local / norm);
        let direction = Unit::try_new(world, EPSILON).ok_or(Error::DegenerateRay { camera, u, v })?;

        Ok(Ray {
            camera,
            origin: self.position,
            direction,
        })
    }

    /// Project a world point to pixel coordinates, if it lies in front of the camera
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Option<(f64, f64)> {
        let local = self.rotation.transpose() * (point - self.position);
        if local.z >= -EPSILON {
            return None;
        }
        let scale = self.focal_pixels / -local.z;
        let u = local.x * scale + f64::from(self.width) / 2.0;
        let v = -local.y * scale + f64::from(self.height) / 2.0;
        Some((u, v))
    }
}

/// Focal length in pixels for a horizontal field of view (radians)
///
/// # Errors
///
/// Returns `Error::Config` if the field of view is outside `(0, π)`.
pub fn focal_from_fov(width: u32, field_of_view: f64) -> Result<f64> {
    if !(field_of_view.is_finite() && field_of_view > 0.0 && field_of_view < std::f64::consts::PI) {
        return Err(Error::Config(format!(
            "Field of view must be in (0, 180) degrees, got {:.3} degrees",
            field_of_view.to_degrees()
        )));
    }
    Ok(f64::from(width) / (2.0 * (field_of_view / 2.0).tan()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn forward_camera() -> CameraModel {
        CameraModel::from_euler(Point3::origin(), Vector3::zeros(), 60f64.to_radians(), 640, 480).unwrap()
    }

    #[test]
    fn test_principal_point_ray_follows_optical_axis() {
        let camera = forward_camera();
        let ray = camera.ray_through_pixel(0, 320.0, 240.0).unwrap();

        assert_relative_eq!(ray.direction.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ray.direction.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_is_unit_length() {
        let camera = forward_camera();
        for &(u, v) in &[(0.0, 0.0), (639.0, 479.0), (100.0, 400.0)] {
            let ray = camera.ray_through_pixel(0, u, v).unwrap();
            assert_relative_eq!(ray.direction.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_image_up_is_world_up() {
        let camera = forward_camera();
        // Smaller v is higher in the image
        let ray = camera.ray_through_pixel(0, 320.0, 100.0).unwrap();
        assert!(ray.direction.y > 0.0);
        let ray = camera.ray_through_pixel(0, 500.0, 240.0).unwrap();
        assert!(ray.direction.x > 0.0);
    }

    #[test]
    fn test_focal_from_fov() {
        let focal = focal_from_fov(640, 90f64.to_radians()).unwrap();
        assert_relative_eq!(focal, 320.0, epsilon = 1e-9);
        assert!(focal_from_fov(640, 0.0).is_err());
        assert!(focal_from_fov(640, std::f64::consts::PI).is_err());
    }

    #[test]
    fn test_yaw_rotates_optical_axis() {
        let camera = CameraModel::from_euler(
            Point3::origin(),
            Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
            60f64.to_radians(),
            640,
            480,
        )
        .unwrap();
        // Yaw about Z leaves -z untouched
        let axis = camera.optical_axis();
        assert_relative_eq!(axis.z, -1.0, epsilon = 1e-12);

        let pitched = CameraModel::from_euler(
            Point3::origin(),
            Vector3::new(0.0, std::f64::consts::FRAC_PI_2, 0.0),
            60f64.to_radians(),
            640,
            480,
        )
        .unwrap();
        // Ry(90°) maps -z onto -x
        assert_relative_eq!(pitched.optical_axis().x, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_project_inverts_ray() {
        let camera = CameraModel::from_euler(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.1, -0.2, 0.3),
            70f64.to_radians(),
            800,
            600,
        )
        .unwrap();
        let ray = camera.ray_through_pixel(0, 123.0, 456.0).unwrap();
        let (u, v) = camera.project(&ray.at(25.0)).unwrap();
        assert_relative_eq!(u, 123.0, epsilon = 1e-8);
        assert_relative_eq!(v, 456.0, epsilon = 1e-8);
    }

    #[test]
    fn test_rejects_non_orthonormal_rotation() {
        let skewed = Matrix3::new(1.0, 0.1, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let result = CameraModel::new(Point3::origin(), skewed, 500.0, 640, 480);
        assert!(matches!(result, Err(Error::Config(_))));

        let mirrored = Matrix3::new(-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(CameraModel::new(Point3::origin(), mirrored, 500.0, 640, 480).is_err());
    }

    #[test]
    fn test_rejects_non_positive_focal_length() {
        assert!(CameraModel::new(Point3::origin(), Matrix3::identity(), 0.0, 640, 480).is_err());
        assert!(CameraModel::new(Point3::origin(), Matrix3::identity(), -5.0, 640, 480).is_err());
        assert!(CameraModel::new(Point3::origin(), Matrix3::identity(), f64::NAN, 640, 480).is_err());
    }

    #[test]
    fn test_non_finite_pixel_is_degenerate() {
        let camera = forward_camera();
        let result = camera.ray_through_pixel(3, f64::NAN, 10.0);
        assert!(matches!(result, Err(Error::DegenerateRay { camera: 3, .. })));
    }

    #[test]
    fn test_ray_distance_to_point() {
        let ray = Ray {
            camera: 0,
            origin: Point3::origin(),
            direction: Vector3::z_axis(),
        };
        assert_relative_eq!(ray.distance_to(&Point3::new(3.0, 4.0, 10.0)), 5.0, epsilon = 1e-12);
    }
}
