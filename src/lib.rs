//! Multi-camera 3D motion tracking from synchronized grayscale frames.
//!
//! Each camera is a calibrated pinhole model at a known pose. Per frame set the
//! pipeline:
//! 1. Differences every camera's frame against its previous one and extracts
//!    connected regions of change as 2D detections
//! 2. Back-projects detections into world-space rays
//! 3. Triangulates cross-camera rays by least squares, rejecting
//!    near-parallel systems
//! 4. Merges near-duplicate 3D candidates
//! 5. Associates candidates with persistent tracks and smooths each track with
//!    a constant-velocity Kalman filter
//!
//! # Examples
//!
//! ## Stepping the pipeline
//!
//! ```no_run
//! use multicam_tracker::{config::{Config, EXAMPLE_CONFIG}, Pipeline};
//! use image::GrayImage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_yaml(EXAMPLE_CONFIG)?;
//! let pipeline = Pipeline::from_config(config)?;
//! let mut state = pipeline.new_state();
//!
//! let frames = vec![Some(GrayImage::new(640, 480)), Some(GrayImage::new(640, 480))];
//! let result = pipeline.step(&mut state, &frames);
//! for (id, position) in &result.positions {
//!     println!("track {id}: ({:.2}, {:.2}, {:.2})", position.x, position.y, position.z);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Triangulating rays directly
//!
//! ```no_run
//! use multicam_tracker::{CameraModel, triangulation::Triangulator};
//! use nalgebra::{Point3, Vector3};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fov = 60f64.to_radians();
//! let yaw = (5.0f64 / 20.0).atan();
//! let left = CameraModel::from_euler(Point3::new(-5.0, 0.0, 0.0), Vector3::new(0.0, -yaw, 0.0), fov, 640, 480)?;
//! let right = CameraModel::from_euler(Point3::new(5.0, 0.0, 0.0), Vector3::new(0.0, yaw, 0.0), fov, 640, 480)?;
//!
//! let rays = [left.ray_through_pixel(0, 320.0, 240.0)?, right.ray_through_pixel(1, 320.0, 240.0)?];
//! let point = Triangulator::default().intersect(&rays)?;
//! println!("{point}");
//! # Ok(())
//! # }
//! ```

/// Pinhole camera model and pixel back-projection
pub mod camera;

/// Frame differencing and region extraction
pub mod motion_detector;

/// Least-squares ray intersection
pub mod triangulation;

/// Merging of near-duplicate candidates
pub mod clustering;

/// Track table and nearest-neighbour association
pub mod association;

/// Per-track position filters
pub mod filters;

/// Per-frame pipeline driver
pub mod pipeline;

/// Frame sources
pub mod source;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use association::{TrackAssociator, TrackId, TrackTable};
pub use camera::{CameraModel, Ray};
pub use error::{Error, Result};
pub use motion_detector::{Detection, DetectionMode, MotionDetector};
pub use pipeline::{FrameResult, FrameSet, Pipeline, PipelineState, RunSummary};
pub use source::{FrameSource, ImageSequenceSource, VecFrameSource};
