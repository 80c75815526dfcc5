//! Configuration management for the multi-camera tracker

use crate::{
    camera::CameraModel,
    constants::{
        DEFAULT_FIELD_OF_VIEW_DEG, DEFAULT_FILTER_DT, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH,
        DEFAULT_GATING_DISTANCE, DEFAULT_INITIAL_COVARIANCE, DEFAULT_JUMP_DAMPING, DEFAULT_JUMP_THRESHOLD,
        DEFAULT_MAX_CONDITION_NUMBER, DEFAULT_MAX_MISSED_FRAMES, DEFAULT_MEASUREMENT_NOISE, DEFAULT_MERGE_DISTANCE,
        DEFAULT_MIN_BLOB_AREA, DEFAULT_MOTION_THRESHOLD, DEFAULT_PROCESS_NOISE,
    },
    filters::FilterKind,
    motion_detector::DetectionMode,
    Error, Result,
};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Motion detection configuration
    pub motion: MotionConfig,

    /// Triangulation configuration
    pub triangulation: TriangulationConfig,

    /// Candidate merging configuration
    pub clustering: ClusteringConfig,

    /// Track association configuration
    pub association: AssociationConfig,

    /// Filter configuration
    pub filter: FilterConfig,

    /// Jump guard configuration
    pub jump_guard: JumpGuardConfig,

    /// Unit of `rotation_euler` and `field_of_view` in the camera list
    pub angle_unit: AngleUnit,

    /// Camera calibrations, in frame-set order
    pub cameras: Vec<CameraCalibration>,
}

/// Motion detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Pixels whose difference exceeds this value count as changed (1-254)
    pub threshold: u8,

    /// Regions must be larger than this many pixels
    pub min_blob_area: u32,

    /// Coarse (one detection per camera) or multi-blob detection
    pub mode: DetectionMode,
}

/// Triangulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    /// Largest accepted eigenvalue ratio of the normal matrix
    pub max_condition_number: f64,
}

/// Candidate merging parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Candidates closer than this collapse into one point
    pub merge_distance: f64,
}

/// Track association parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Candidates closer than this to a track continue it
    pub gating_distance: f64,

    /// Consecutive unmatched frames before a track is dropped
    pub max_missed_frames: u32,
}

/// Filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter given to new tracks
    pub kind: FilterKind,

    /// Time step between frames
    pub dt: f64,

    /// Process noise (diagonal)
    pub process_noise: f64,

    /// Measurement noise (diagonal)
    pub measurement_noise: f64,

    /// Initial state covariance (diagonal)
    pub initial_covariance: f64,
}

/// Temporal outlier guard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpGuardConfig {
    /// Enable the guard
    pub enabled: bool,

    /// Jumps longer than this are damped
    pub threshold: f64,

    /// Fraction of an oversized jump that is kept (0.0-1.0)
    pub damping: f64,
}

/// Angle unit used in calibration entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    /// Degrees
    #[default]
    Degrees,
    /// Radians
    Radians,
}

impl AngleUnit {
    /// Convert an angle in this unit to radians
    #[must_use]
    pub fn to_radians(self, angle: f64) -> f64 {
        match self {
            Self::Degrees => angle.to_radians(),
            Self::Radians => angle,
        }
    }
}

/// Plain `{x, y, z}` triple as it appears in calibration files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Xyz {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Xyz {
    /// Create a triple
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Extrinsic and intrinsic calibration of one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraCalibration {
    /// Camera centre in world units
    pub position: Xyz,

    /// Camera-to-world Euler angles, composed as `Rz · Ry · Rx`
    pub rotation_euler: Xyz,

    /// Horizontal field of view
    pub field_of_view: f64,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MOTION_THRESHOLD,
            min_blob_area: DEFAULT_MIN_BLOB_AREA,
            mode: DetectionMode::default(),
        }
    }
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            max_condition_number: DEFAULT_MAX_CONDITION_NUMBER,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            merge_distance: DEFAULT_MERGE_DISTANCE,
        }
    }
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            gating_distance: DEFAULT_GATING_DISTANCE,
            max_missed_frames: DEFAULT_MAX_MISSED_FRAMES,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::default(),
            dt: DEFAULT_FILTER_DT,
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            initial_covariance: DEFAULT_INITIAL_COVARIANCE,
        }
    }
}

impl Default for JumpGuardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_JUMP_THRESHOLD,
            damping: DEFAULT_JUMP_DAMPING,
        }
    }
}

impl Default for CameraCalibration {
    fn default() -> Self {
        Self {
            position: Xyz::default(),
            rotation_euler: Xyz::default(),
            field_of_view: DEFAULT_FIELD_OF_VIEW_DEG,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl CameraCalibration {
    /// Build the camera model, interpreting angles in `unit`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the calibration is not a valid camera.
    pub fn to_model(&self, unit: AngleUnit) -> Result<CameraModel> {
        let euler = Vector3::new(
            unit.to_radians(self.rotation_euler.x),
            unit.to_radians(self.rotation_euler.y),
            unit.to_radians(self.rotation_euler.z),
        );
        CameraModel::from_euler(
            Point3::new(self.position.x, self.position.y, self.position.z),
            euler,
            unit.to_radians(self.field_of_view),
            self.width,
            self.height,
        )
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build one camera model per calibration entry
    pub fn camera_models(&self) -> Result<Vec<CameraModel>> {
        self.cameras
            .iter()
            .enumerate()
            .map(|(index, calibration)| {
                calibration
                    .to_model(self.angle_unit)
                    .map_err(|e| Error::Config(format!("Camera {}: {}", index, e)))
            })
            .collect()
    }

    /// Validate configuration, including the camera rig
    pub fn validate(&self) -> Result<()> {
        self.validate_parameters()?;

        if self.cameras.len() < 2 {
            return Err(Error::Config(format!(
                "At least 2 cameras are required, got {}",
                self.cameras.len()
            )));
        }
        self.camera_models()?;

        Ok(())
    }

    /// Validate the tunable parameters, ignoring the camera list
    pub fn validate_parameters(&self) -> Result<()> {
        // Validate motion detection
        if !(1..=254).contains(&self.motion.threshold) {
            return Err(Error::Config("Motion threshold must be between 1 and 254".to_string()));
        }
        if self.motion.min_blob_area == 0 {
            return Err(Error::Config("Minimum blob area must be greater than 0".to_string()));
        }

        // Validate geometry thresholds
        if !(self.triangulation.max_condition_number.is_finite() && self.triangulation.max_condition_number >= 1.0) {
            return Err(Error::Config("Max condition number must be finite and at least 1".to_string()));
        }
        if !(self.clustering.merge_distance.is_finite() && self.clustering.merge_distance > 0.0) {
            return Err(Error::Config("Merge distance must be greater than 0".to_string()));
        }
        if !(self.association.gating_distance.is_finite() && self.association.gating_distance > 0.0) {
            return Err(Error::Config("Gating distance must be greater than 0".to_string()));
        }
        if self.association.max_missed_frames == 0 {
            return Err(Error::Config("Max missed frames must be greater than 0".to_string()));
        }

        // Validate filter parameters
        let filter = &self.filter;
        for (name, value) in [
            ("Filter time step", filter.dt),
            ("Process noise", filter.process_noise),
            ("Measurement noise", filter.measurement_noise),
            ("Initial covariance", filter.initial_covariance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        // Validate jump guard
        if !(self.jump_guard.threshold.is_finite() && self.jump_guard.threshold >= 0.0) {
            return Err(Error::Config("Jump threshold must be non-negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.jump_guard.damping) {
            return Err(Error::Config("Jump damping must be between 0.0 and 1.0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Multi-camera tracker configuration

# Frame differencing
motion:
  threshold: 10
  min_blob_area: 100
  mode: multi_blob    # or "coarse" for a single target

# Ray intersection
triangulation:
  max_condition_number: 100000.0

# Merging of duplicate candidates
clustering:
  merge_distance: 15.0

# Track continuity
association:
  gating_distance: 30.0
  max_missed_frames: 5

# Per-track smoothing
filter:
  kind: kalman        # or "none"
  dt: 1.0
  process_noise: 0.1
  measurement_noise: 10.0
  initial_covariance: 500.0

# Temporal outlier guard
jump_guard:
  enabled: false
  threshold: 20.0
  damping: 0.3

# Angles below are in this unit
angle_unit: degrees

# Camera rig, in frame order
cameras:
  - position: { x: -5.0, y: 0.0, z: 0.0 }
    rotation_euler: { x: 0.0, y: -14.036, z: 0.0 }
    field_of_view: 60.0
    width: 640
    height: 480
  - position: { x: 5.0, y: 0.0, z: 0.0 }
    rotation_euler: { x: 0.0, y: 14.036, z: 0.0 }
    field_of_view: 60.0
    width: 640
    height: 480
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_needs_cameras() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.cameras.len(), 2);
        assert_eq!(config.motion.mode, DetectionMode::MultiBlob);
        assert!(!config.jump_guard.enabled);
    }

    #[test]
    fn test_angle_units() {
        assert!((AngleUnit::Degrees.to_radians(180.0) - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(AngleUnit::Radians.to_radians(1.5), 1.5);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        config.motion.threshold = 0;
        assert!(config.validate().is_err());
        config.motion.threshold = 255;
        assert!(config.validate().is_err());
    }
}
