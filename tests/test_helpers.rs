//! Helper functions and utilities for tests
#![allow(dead_code)]

use image::{GrayImage, Luma};
use multicam_tracker::{camera::focal_from_fov, CameraModel, Result};
use nalgebra::{Matrix3, Point3, Vector3};

/// Frame size used by the synthetic rigs
pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

/// Where the stereo rig's optical axes cross
pub fn stereo_target() -> Point3<f64> {
    Point3::new(0.0, 0.0, -20.0)
}

/// Camera at `position` whose optical axis passes through `target`, `+y` up
pub fn camera_facing(position: Point3<f64>, target: Point3<f64>, width: u32, height: u32) -> Result<CameraModel> {
    let z_axis = (position - target).normalize();
    let x_axis = Vector3::y().cross(&z_axis).normalize();
    let y_axis = z_axis.cross(&x_axis);
    let rotation = Matrix3::from_columns(&[x_axis, y_axis, z_axis]);
    CameraModel::new(position, rotation, focal_from_fov(width, 60f64.to_radians())?, width, height)
}

/// Two cameras at `(±5, 0, 0)` looking at `(0, 0, -20)` with a 60° field of view
pub fn stereo_rig() -> Vec<CameraModel> {
    let yaw = (5.0f64 / 20.0).atan();
    vec![
        CameraModel::from_euler(
            Point3::new(-5.0, 0.0, 0.0),
            Vector3::new(0.0, -yaw, 0.0),
            60f64.to_radians(),
            WIDTH,
            HEIGHT,
        )
        .unwrap(),
        CameraModel::from_euler(
            Point3::new(5.0, 0.0, 0.0),
            Vector3::new(0.0, yaw, 0.0),
            60f64.to_radians(),
            WIDTH,
            HEIGHT,
        )
        .unwrap(),
    ]
}

/// Uniform frame
pub fn blank_frame(value: u8) -> GrayImage {
    GrayImage::from_pixel(WIDTH, HEIGHT, Luma([value]))
}

/// Black frame with a white square of side `2 * half + 1` centred on `(cx, cy)`
pub fn square_frame(cx: u32, cy: u32, half: u32) -> GrayImage {
    let mut frame = blank_frame(0);
    for y in cy - half..=cy + half {
        for x in cx - half..=cx + half {
            frame.put_pixel(x, y, Luma([255]));
        }
    }
    frame
}

/// Black priming frame followed by `count` frames alternating square and black,
/// so every frame after the first carries motion at `(cx, cy)`
pub fn flicker_sequence(count: usize, cx: u32, cy: u32) -> Vec<GrayImage> {
    let mut frames = vec![blank_frame(0)];
    for i in 0..count {
        if i % 2 == 0 {
            frames.push(square_frame(cx, cy, 10));
        } else {
            frames.push(blank_frame(0));
        }
    }
    frames
}

/// Euclidean distance between two points
pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    nalgebra::distance(a, b)
}
