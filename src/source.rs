//! Frame sources feeding the pipeline, one per camera.

use crate::{Error, Result};
use image::GrayImage;
use log::{debug, info};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Image extensions picked up from a frame directory
const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// A stream of grayscale frames from one camera
pub trait FrameSource {
    /// Next frame, or `Ok(None)` at end of stream
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be read. The stream stays usable
    /// and the following call moves on to the next frame.
    fn next_frame(&mut self) -> Result<Option<GrayImage>>;

    /// Human readable name for logging
    fn name(&self) -> String;
}

/// Reads a directory of image files in lexicographic order
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    directory: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceSource {
    /// Open a frame directory
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be listed and
    /// `Error::InvalidInput` if it holds no image files.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&directory)? {
            let path = entry?.path();
            if path.is_file() && has_frame_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(Error::InvalidInput(format!(
                "No image files found in {}",
                directory.display()
            )));
        }

        info!("Opened {} with {} frames", directory.display(), files.len());
        Ok(Self {
            directory,
            files,
            position: 0,
        })
    }

    /// Number of frames not yet read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.files.len() - self.position
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        debug!("Reading {}", path.display());
        let frame = image::open(path)?.into_luma8();
        Ok(Some(frame))
    }

    fn name(&self) -> String {
        self.directory.display().to_string()
    }
}

/// In-memory frame source
#[derive(Debug, Clone, Default)]
pub struct VecFrameSource {
    frames: VecDeque<GrayImage>,
}

impl VecFrameSource {
    /// Create a source that yields `frames` in order
    #[must_use]
    pub fn new(frames: Vec<GrayImage>) -> Self {
        Self { frames: frames.into() }
    }

    /// Queue another frame
    pub fn push(&mut self, frame: GrayImage) {
        self.frames.push_back(frame);
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> Result<Option<GrayImage>> {
        Ok(self.frames.pop_front())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
