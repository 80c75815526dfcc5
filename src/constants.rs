//! Constants used throughout the tracker

/// Default intensity difference above which a pixel counts as changed
pub const DEFAULT_MOTION_THRESHOLD: u8 = 10;

/// Default connected-region size in pixels that a region must exceed
pub const DEFAULT_MIN_BLOB_AREA: u32 = 100;

/// Default distance below which raw 3D candidates are merged
pub const DEFAULT_MERGE_DISTANCE: f64 = 15.0;

/// Default maximum distance between a candidate and a track's last position
pub const DEFAULT_GATING_DISTANCE: f64 = 30.0;

/// Consecutive unmatched frames after which a track is evicted
pub const DEFAULT_MAX_MISSED_FRAMES: u32 = 5;

/// Kalman filter defaults
pub const DEFAULT_FILTER_DT: f64 = 1.0;
pub const DEFAULT_PROCESS_NOISE: f64 = 0.1;
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 10.0;
pub const DEFAULT_INITIAL_COVARIANCE: f64 = 500.0;

/// Jump guard defaults
pub const DEFAULT_JUMP_THRESHOLD: f64 = 20.0;
pub const DEFAULT_JUMP_DAMPING: f64 = 0.3;

/// Largest accepted `λmax / λmin` of the triangulation normal matrix
pub const DEFAULT_MAX_CONDITION_NUMBER: f64 = 1e5;

/// Smallest accepted eigenvalue of the triangulation normal matrix
pub const MIN_EIGENVALUE: f64 = 1e-12;

/// Default horizontal field of view in degrees
pub const DEFAULT_FIELD_OF_VIEW_DEG: f64 = 60.0;

/// Default calibrated frame size
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Tolerance for `RᵀR = I` and `det R = 1`
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
