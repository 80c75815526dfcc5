//! Error types for the multi-camera tracker.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization of frame results failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Detection maps to a zero-length (or non-finite) camera-space vector
    #[error("Degenerate ray from camera {camera} at pixel ({u}, {v})")]
    DegenerateRay {
        /// Index of the camera that produced the detection
        camera: usize,
        /// Horizontal pixel coordinate
        u: f64,
        /// Vertical pixel coordinate
        v: f64,
    },

    /// Ray intersection system is singular or too poorly conditioned to solve
    #[error("Ill-conditioned triangulation: {0}")]
    IllConditionedTriangulation(String),

    /// A camera did not deliver a usable frame this cycle
    #[error("Missing frame from camera {camera}: {reason}")]
    MissingFrame {
        /// Index of the camera
        camera: usize,
        /// Why the frame is unusable
        reason: String,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration or calibration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
