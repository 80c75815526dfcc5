//! Motion detection by frame differencing.
//!
//! Each camera keeps its previous grayscale frame. A new frame is compared
//! pixel-wise against it, the absolute difference is thresholded into a binary
//! mask and the mask is split into 8-connected regions. Regions not larger than the
//! minimum area are discarded; the survivors become 2D detections.

use crate::config::MotionConfig;
use image::{GrayImage, Luma};
use imageproc::{
    map::{map_colors, map_colors2},
    region_labelling::{connected_components, Connectivity},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How changed regions turn into detections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// One detection per camera: the region with the largest summed change
    Coarse,
    /// One detection per region above the minimum area
    #[default]
    MultiBlob,
}

/// A 2D motion detection in one camera
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Index of the originating camera
    pub camera: usize,
    /// Horizontal pixel coordinate
    pub u: f64,
    /// Vertical pixel coordinate
    pub v: f64,
    /// Region size in pixels
    pub area: u32,
    /// Sum of absolute intensity differences over the region
    pub change: u64,
}

/// Statistics of one connected changed region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Number of pixels
    pub area: u32,
    /// Left edge of the inclusive bounding box
    pub min_x: u32,
    /// Top edge of the inclusive bounding box
    pub min_y: u32,
    /// Right edge of the inclusive bounding box
    pub max_x: u32,
    /// Bottom edge of the inclusive bounding box
    pub max_y: u32,
    /// Summed absolute difference
    pub change: u64,
    sum_x: u64,
    sum_y: u64,
}

impl Region {
    fn seed(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            change: 0,
            sum_x: 0,
            sum_y: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32, change: u8) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.change += u64::from(change);
        self.sum_x += u64::from(x);
        self.sum_y += u64::from(y);
    }

    /// Centre of the bounding box
    #[must_use]
    pub fn bbox_center(&self) -> (f64, f64) {
        (
            (f64::from(self.min_x) + f64::from(self.max_x)) / 2.0,
            (f64::from(self.min_y) + f64::from(self.max_y)) / 2.0,
        )
    }

    /// Mean pixel position
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Pixel sums stay far below 2^52
    pub fn centroid(&self) -> (f64, f64) {
        let n = f64::from(self.area.max(1));
        (self.sum_x as f64 / n, self.sum_y as f64 / n)
    }
}

/// Per-camera motion detector holding the previous frame
#[derive(Debug, Clone)]
pub struct MotionDetector {
    camera: usize,
    threshold: u8,
    min_area: u32,
    mode: DetectionMode,
    previous: Option<GrayImage>,
}

impl MotionDetector {
    /// Create a new motion detector
    #[must_use]
    pub fn new(camera: usize, threshold: u8, min_area: u32, mode: DetectionMode) -> Self {
        Self {
            camera,
            threshold,
            min_area,
            mode,
            previous: None,
        }
    }

    /// Create a detector from configuration
    #[must_use]
    pub fn from_config(camera: usize, config: &MotionConfig) -> Self {
        Self::new(camera, config.threshold, config.min_blob_area, config.mode)
    }

    /// Feed a new frame and return the detections it produces
    ///
    /// The frame replaces the stored previous frame whatever the outcome.
    pub fn detect(&mut self, frame: &GrayImage) -> Vec<Detection> {
        let previous = self.previous.replace(frame.clone());

        let Some(previous) = previous else {
            debug!("Camera {}: primed previous frame", self.camera);
            return Vec::new();
        };

        if previous.dimensions() != frame.dimensions() {
            warn!(
                "Camera {}: frame size changed from {:?} to {:?}, re-priming",
                self.camera,
                previous.dimensions(),
                frame.dimensions()
            );
            return Vec::new();
        }

        let (diff, mask) = difference_mask(&previous, frame, self.threshold);
        let regions = extract_regions(&diff, &mask, self.min_area);

        let detections: Vec<Detection> = match self.mode {
            DetectionMode::MultiBlob => regions
                .iter()
                .map(|region| {
                    let (u, v) = region.bbox_center();
                    self.detection(region, u, v)
                })
                .collect(),
            DetectionMode::Coarse => strongest_region(&regions)
                .map(|region| {
                    let (u, v) = region.centroid();
                    self.detection(region, u, v)
                })
                .into_iter()
                .collect(),
        };

        debug!(
            "Camera {}: {} regions, {} detections",
            self.camera,
            regions.len(),
            detections.len()
        );
        detections
    }

    fn detection(&self, region: &Region, u: f64, v: f64) -> Detection {
        Detection {
            camera: self.camera,
            u,
            v,
            area: region.area,
            change: region.change,
        }
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// The frame the next call to `detect` will be compared against
    #[must_use]
    pub fn previous_frame(&self) -> Option<&GrayImage> {
        self.previous.as_ref()
    }

    /// Camera index this detector serves
    #[must_use]
    pub fn camera(&self) -> usize {
        self.camera
    }

    /// Active detection mode
    #[must_use]
    pub fn mode(&self) -> DetectionMode {
        self.mode
    }
}

/// Absolute difference image and its binary mask (`diff > threshold` → 255)
///
/// Both frames must have the same dimensions.
#[must_use]
pub fn difference_mask(previous: &GrayImage, current: &GrayImage, threshold: u8) -> (GrayImage, GrayImage) {
    let diff: GrayImage = map_colors2(previous, current, |p: Luma<u8>, q: Luma<u8>| {
        Luma([p[0].abs_diff(q[0])])
    });
    let mask: GrayImage = map_colors(&diff, |p: Luma<u8>| {
        if p[0] > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    (diff, mask)
}

/// Label 8-connected regions of `mask` and keep those larger than `min_area` pixels
///
/// Regions are returned in raster order of their first pixel.
#[must_use]
pub fn extract_regions(diff: &GrayImage, mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    let mut slots: HashMap<u32, usize> = HashMap::new();
    let mut regions: Vec<Region> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let slot = *slots.entry(label).or_insert_with(|| {
            regions.push(Region::seed(x, y));
            regions.len() - 1
        });
        regions[slot].add(x, y, diff.get_pixel(x, y)[0]);
    }

    regions.retain(|region| region.area > min_area);
    regions
}

/// Region with the largest summed change; the earliest wins ties
#[must_use]
pub fn strongest_region(regions: &[Region]) -> Option<&Region> {
    regions.iter().fold(None, |best, region| match best {
        Some(b) if b.change >= region.change => Some(b),
        _ => Some(region),
    })
}
