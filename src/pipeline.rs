//! Per-frame driver: detection, triangulation, merging, association and filtering.
//!
//! `Pipeline` holds the immutable rig and tunables. Everything that changes
//! from frame to frame lives in a caller-owned `PipelineState`, so one pipeline
//! can drive several independent runs.

use crate::{
    association::{TrackAssociator, TrackId, TrackTable},
    camera::CameraModel,
    clustering::merge_close_points,
    config::Config,
    motion_detector::{Detection, DetectionMode, MotionDetector},
    source::FrameSource,
    triangulation::Triangulator,
    Error, Result,
};
use image::GrayImage;
use log::{debug, info, warn};
use nalgebra::Point3;
use serde::Serialize;
use std::collections::BTreeMap;

/// One optional frame per camera, in camera order; `None` marks a missing frame
pub type FrameSet = Vec<Option<GrayImage>>;

/// Smoothed positions produced by one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    /// Zero-based index of the processed frame set
    pub frame_index: u64,
    /// Smoothed position of every track updated this frame
    pub positions: BTreeMap<TrackId, Point3<f64>>,
}

impl FrameResult {
    /// Whether no track was updated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Totals reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Number of frame sets stepped through
    pub frames_processed: u64,
    /// Number of track ids issued
    pub tracks_created: u64,
}

/// Mutable per-run state
#[derive(Debug)]
pub struct PipelineState {
    detectors: Vec<MotionDetector>,
    tracks: TrackTable,
    frame_index: u64,
}

impl PipelineState {
    /// Index the next step will report
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Live tracks
    #[must_use]
    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    /// Per-camera motion detectors
    #[must_use]
    pub fn detectors(&self) -> &[MotionDetector] {
        &self.detectors
    }
}

/// Immutable rig plus the stages configured from it
#[derive(Debug, Clone)]
pub struct Pipeline {
    cameras: Vec<CameraModel>,
    config: Config,
    triangulator: Triangulator,
    associator: TrackAssociator,
}

impl Pipeline {
    /// Create a pipeline for an explicit camera list
    ///
    /// `config.cameras` is ignored; `cameras` defines the rig.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if fewer than two cameras are given or a tunable
    /// is out of range.
    pub fn new(cameras: Vec<CameraModel>, config: Config) -> Result<Self> {
        config.validate_parameters()?;
        if cameras.len() < 2 {
            return Err(Error::Config(format!(
                "At least 2 cameras are required, got {}",
                cameras.len()
            )));
        }

        info!(
            "Pipeline ready: {} cameras, {:?} detection, {:?} filter",
            cameras.len(),
            config.motion.mode,
            config.filter.kind
        );

        Ok(Self {
            triangulator: Triangulator::new(config.triangulation.max_condition_number),
            associator: TrackAssociator::new(&config.association, &config.filter, &config.jump_guard),
            cameras,
            config,
        })
    }

    /// Create a pipeline from a configuration that carries its own calibration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not validate.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let cameras = config.camera_models()?;
        Self::new(cameras, config)
    }

    /// Fresh state for a new run
    #[must_use]
    pub fn new_state(&self) -> PipelineState {
        PipelineState {
            detectors: (0..self.cameras.len())
                .map(|camera| MotionDetector::from_config(camera, &self.config.motion))
                .collect(),
            tracks: TrackTable::new(),
            frame_index: 0,
        }
    }

    /// Camera rig
    #[must_use]
    pub fn cameras(&self) -> &[CameraModel] {
        &self.cameras
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one frame set
    ///
    /// Missing or mis-sized frames drop their camera from this step; its
    /// detector keeps the last good frame.
    pub fn step(&self, state: &mut PipelineState, frames: &FrameSet) -> FrameResult {
        let frame_index = state.frame_index;
        state.frame_index += 1;

        if frames.len() != self.cameras.len() {
            warn!(
                "Frame {}: got {} frames for {} cameras",
                frame_index,
                frames.len(),
                self.cameras.len()
            );
        }

        let mut detections = Vec::new();
        for (camera, detector) in state.detectors.iter_mut().enumerate() {
            let frame = frames.get(camera).and_then(Option::as_ref);
            match self.usable_frame(camera, frame) {
                Ok(frame) => detections.extend(detector.detect(frame)),
                Err(e) => warn!("Frame {}: {}", frame_index, e),
            }
        }

        let candidates = self.candidates(&detections);
        debug!(
            "Frame {}: {} detections, {} candidates",
            frame_index,
            detections.len(),
            candidates.len()
        );

        let positions = self.associator.update(&mut state.tracks, &candidates);
        FrameResult { frame_index, positions }
    }

    /// Pull frames from `sources` until one of them ends
    ///
    /// A source that fails to deliver a frame counts as a missing frame for that
    /// step. Every result is handed to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the number of sources differs from the
    /// number of cameras, or any error raised by `sink`.
    pub fn run<F>(&self, state: &mut PipelineState, sources: &mut [Box<dyn FrameSource>], sink: F) -> Result<RunSummary>
    where
        F: FnMut(&FrameResult) -> Result<()>,
    {
        self.run_limited(state, sources, None, sink)
    }

    /// Like [`Pipeline::run`], stopping after at most `max_frames` frame sets
    pub fn run_limited<F>(
        &self,
        state: &mut PipelineState,
        sources: &mut [Box<dyn FrameSource>],
        max_frames: Option<u64>,
        mut sink: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&FrameResult) -> Result<()>,
    {
        if sources.len() != self.cameras.len() {
            return Err(Error::InvalidInput(format!(
                "{} frame sources for {} cameras",
                sources.len(),
                self.cameras.len()
            )));
        }

        let mut frames_processed = 0;
        'frames: loop {
            if max_frames.is_some_and(|limit| frames_processed >= limit) {
                info!("Reached frame limit of {}", frames_processed);
                break;
            }

            let mut frames = FrameSet::with_capacity(sources.len());
            for (camera, source) in sources.iter_mut().enumerate() {
                match source.next_frame() {
                    Ok(Some(frame)) => frames.push(Some(frame)),
                    Ok(None) => {
                        info!("Camera {} ({}) reached end of stream", camera, source.name());
                        break 'frames;
                    }
                    Err(e) => {
                        warn!("Camera {} ({}): {}", camera, source.name(), e);
                        frames.push(None);
                    }
                }
            }

            let result = self.step(state, &frames);
            sink(&result)?;
            frames_processed += 1;
        }

        Ok(RunSummary {
            frames_processed,
            tracks_created: state.tracks.next_id(),
        })
    }

    fn usable_frame<'a>(&self, camera: usize, frame: Option<&'a GrayImage>) -> Result<&'a GrayImage> {
        let Some(frame) = frame else {
            return Err(Error::MissingFrame {
                camera,
                reason: "no frame delivered".to_string(),
            });
        };

        let expected = self.cameras[camera].frame_size();
        if frame.dimensions() != expected {
            return Err(Error::MissingFrame {
                camera,
                reason: format!(
                    "frame is {}x{}, calibrated for {}x{}",
                    frame.width(),
                    frame.height(),
                    expected.0,
                    expected.1
                ),
            });
        }
        Ok(frame)
    }

    fn candidates(&self, detections: &[Detection]) -> Vec<Point3<f64>> {
        let mut cameras_seen: Vec<usize> = detections.iter().map(|d| d.camera).collect();
        cameras_seen.dedup();
        if cameras_seen.len() < 2 {
            return Vec::new();
        }

        match self.config.motion.mode {
            DetectionMode::Coarse => self
                .triangulator
                .joint_candidate(&self.cameras, detections)
                .into_iter()
                .collect(),
            DetectionMode::MultiBlob => {
                let raw = self.triangulator.pairwise_candidates(&self.cameras, detections);
                merge_close_points(&raw, self.config.clustering.merge_distance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn rig() -> Vec<CameraModel> {
        let yaw = (5.0f64 / 20.0).atan();
        vec![
            CameraModel::from_euler(
                Point3::new(-5.0, 0.0, 0.0),
                Vector3::new(0.0, -yaw, 0.0),
                60f64.to_radians(),
                64,
                48,
            )
            .unwrap(),
            CameraModel::from_euler(
                Point3::new(5.0, 0.0, 0.0),
                Vector3::new(0.0, yaw, 0.0),
                60f64.to_radians(),
                64,
                48,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_needs_two_cameras() {
        let mut cameras = rig();
        cameras.truncate(1);
        assert!(matches!(Pipeline::new(cameras, Config::default()), Err(Error::Config(_))));
    }

    #[test]
    fn test_priming_frame_is_empty() {
        let pipeline = Pipeline::new(rig(), Config::default()).unwrap();
        let mut state = pipeline.new_state();

        let frames = vec![Some(GrayImage::new(64, 48)), Some(GrayImage::new(64, 48))];
        let result = pipeline.step(&mut state, &frames);

        assert_eq!(result.frame_index, 0);
        assert!(result.is_empty());
        assert_eq!(state.frame_index(), 1);
    }

    #[test]
    fn test_missing_frame_keeps_previous_buffer() {
        let pipeline = Pipeline::new(rig(), Config::default()).unwrap();
        let mut state = pipeline.new_state();

        let primed = GrayImage::from_pixel(64, 48, image::Luma([7]));
        pipeline.step(&mut state, &vec![Some(primed.clone()), Some(primed.clone())]);
        pipeline.step(&mut state, &vec![Some(GrayImage::new(64, 48)), None]);

        assert_eq!(state.detectors()[1].previous_frame(), Some(&primed));
        assert_ne!(state.detectors()[0].previous_frame(), Some(&primed));
    }

    #[test]
    fn test_mis_sized_frame_is_treated_as_missing() {
        let pipeline = Pipeline::new(rig(), Config::default()).unwrap();
        let mut state = pipeline.new_state();

        let result = pipeline.step(&mut state, &vec![Some(GrayImage::new(32, 32)), Some(GrayImage::new(64, 48))]);
        assert!(result.is_empty());
        assert!(state.detectors()[0].previous_frame().is_none());
        assert!(state.detectors()[1].previous_frame().is_some());
    }

    #[test]
    fn test_frame_result_json_shape() {
        let mut positions = BTreeMap::new();
        positions.insert(0, Point3::new(1.0, 2.0, -20.0));
        let result = FrameResult {
            frame_index: 3,
            positions,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"frame_index":3,"positions":{"0":[1.0,2.0,-20.0]}}"#);
    }
}
