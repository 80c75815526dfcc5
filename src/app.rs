//! Main application module wiring configuration, frame sources and the pipeline.

use crate::{
    config::Config,
    error::Result,
    pipeline::{FrameResult, Pipeline, PipelineState, RunSummary},
    source::{FrameSource, ImageSequenceSource},
};
use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Main application struct
pub struct TrackerApp {
    pipeline: Pipeline,
    state: PipelineState,
    sources: Vec<Box<dyn FrameSource>>,
    max_frames: Option<u64>,
}

impl TrackerApp {
    /// Create an application from a configuration and one source per camera
    pub fn new(config: Config, sources: Vec<Box<dyn FrameSource>>) -> Result<Self> {
        info!("Initializing multi-camera tracker");
        let pipeline = Pipeline::from_config(config)?;
        let state = pipeline.new_state();

        Ok(Self {
            pipeline,
            state,
            sources,
            max_frames: None,
        })
    }

    /// Create an application reading one image directory per camera
    pub fn from_directories(config: Config, directories: &[PathBuf]) -> Result<Self> {
        let sources = directories
            .iter()
            .map(|dir| ImageSequenceSource::open(dir).map(|source| Box::new(source) as Box<dyn FrameSource>))
            .collect::<Result<Vec<_>>>()?;
        Self::new(config, sources)
    }

    /// Stop after `max_frames` frame sets
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Run until a source is exhausted, writing one JSON line per frame
    pub fn run<W: Write>(&mut self, writer: &mut W) -> Result<RunSummary> {
        info!("Starting tracking loop over {} cameras", self.sources.len());
        let start_time = Instant::now();

        let summary = self.pipeline.run_limited(&mut self.state, &mut self.sources, self.max_frames, |result| {
            log_frame(result);
            write_json_line(&mut *writer, result)
        })?;
        writer.flush()?;

        let elapsed = start_time.elapsed().as_secs_f64();
        #[allow(clippy::cast_precision_loss)]
        let fps = if elapsed > 0.0 {
            summary.frames_processed as f64 / elapsed
        } else {
            0.0
        };
        info!(
            "Processed {} frames ({:.1} fps), {} tracks created, {} live",
            summary.frames_processed,
            fps,
            summary.tracks_created,
            self.state.tracks().len()
        );
        Ok(summary)
    }

    /// Pipeline state after the run
    #[must_use]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }
}

fn log_frame(result: &FrameResult) {
    if result.is_empty() {
        debug!("Frame {}: no tracks", result.frame_index);
        return;
    }
    for (id, position) in &result.positions {
        debug!(
            "Frame {}: track {} at ({:.2}, {:.2}, {:.2})",
            result.frame_index, id, position.x, position.y, position.z
        );
    }
}

/// Serialize one result as a single JSON line
pub fn write_json_line<W: Write>(writer: &mut W, result: &FrameResult) -> Result<()> {
    serde_json::to_writer(&mut *writer, result)?;
    writer.write_all(b"\n")?;
    Ok(())
}
