use std::io::Cursor;

use image::GrayImage;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::{RecordingStream, TimeCell};

use crate::correspondence::CorrespondenceSet;
use crate::error::{OdometryError, Result};
use crate::features::FeatureSet;
use crate::trajectory::TrajectoryProjector;

fn rerun_err<E: std::fmt::Display>(e: E) -> OdometryError {
    OdometryError::Visualization(e.to_string())
}

pub fn log_image_as_compressed<P>(
    recording: &RecordingStream,
    topic: &str,
    img: &image::ImageBuffer<P, Vec<u8>>,
) -> Result<()>
where
    P: image::PixelWithColorType<Subpixel = u8>,
{
    let mut bytes: Vec<u8> = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    recording
        .log(
            format!("{}/image", topic),
            &rerun::EncodedImage::from_file_contents(bytes),
        )
        .map_err(rerun_err)
}

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

pub fn set_frame_time(recording: &RecordingStream, time_ns: i64) {
    recording.set_time("stable", TimeCell::from_timestamp_nanos_since_epoch(time_ns));
}

/// Rectified frame with its keypoints.
pub fn log_frame(
    recording: &RecordingStream,
    topic: &str,
    rectified: &GrayImage,
    features: &FeatureSet,
) -> Result<()> {
    log_image_as_compressed(recording, topic, rectified)?;
    let pts: Vec<_> = features
        .keypoints()
        .iter()
        .map(|k| (k.p2d.x, k.p2d.y))
        .collect();
    recording
        .log(
            format!("{}/image/keypoints", topic),
            &rerun::Points2D::new(rerun_shift(&pts))
                .with_colors([(128u8, 128u8, 128u8, 255u8)])
                .with_radii([rerun::Radius::new_ui_points(2.0)]),
        )
        .map_err(rerun_err)
}

/// Inlier tracks drawn from the previous to the current location.
pub fn log_tracks(recording: &RecordingStream, topic: &str, correspondences: &CorrespondenceSet) -> Result<()> {
    let (strips, colors): (Vec<_>, Vec<_>) = correspondences
        .iter()
        .enumerate()
        .map(|(i, (s, d))| {
            (
                rerun_shift(&[(s.x, s.y), (d.x, d.y)]),
                id_to_color(i),
            )
        })
        .unzip();
    recording
        .log(
            format!("{}/image/tracks", topic),
            &rerun::LineStrips2D::new(strips).with_colors(colors),
        )
        .map_err(rerun_err)
}

/// Accumulated positions as a 3d line plus the top-down canvas.
pub fn log_trajectory(
    recording: &RecordingStream,
    positions: &[[f64; 3]],
    projector: &TrajectoryProjector,
) -> Result<()> {
    let pts: Vec<[f32; 3]> = positions
        .iter()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();
    if pts.len() >= 2 {
        let [r, g, b] = projector.config().color;
        recording
            .log(
                "world/trajectory",
                &rerun::LineStrips3D::new([pts.clone()]).with_colors([(r, g, b, 255u8)]),
            )
            .map_err(rerun_err)?;
    }
    if let Some(last) = pts.last() {
        recording
            .log(
                "world/camera",
                &rerun::Points3D::new([*last]).with_radii([rerun::Radius::new_ui_points(5.0)]),
            )
            .map_err(rerun_err)?;
    }
    log_image_as_compressed(recording, "trace", projector.render())
}
