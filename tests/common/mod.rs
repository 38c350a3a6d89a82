#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use image::{DynamicImage, GrayImage};
use mono_visual_odometry::camera_model::PoseIntrinsics;
use mono_visual_odometry::features::{FeatureDetector, FeatureSet, Keypoint};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub const DESCRIPTOR_LEN: usize = 128;

/// Unit-length random descriptor, fixed per point id.
pub fn descriptor(id: usize) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(1000 + id as u64);
    let d: Vec<f32> = (0..DESCRIPTOR_LEN).map(|_| rng.random_range(-1.0f32..1.0)).collect();
    let norm = d.iter().map(|v| v * v).sum::<f32>().sqrt();
    d.into_iter().map(|v| v / norm).collect()
}

/// World points on a gently tilted wall about ten units ahead, with small
/// bumps so the structure is not exactly planar.
pub fn world_points(n: usize, seed: u64) -> Vec<na::Point3<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let x = rng.random_range(-4.0..8.0);
            let y = rng.random_range(-1.8..1.8);
            let z = 10.0 + 0.2 * x + rng.random_range(-0.5..0.5);
            na::Point3::new(x, y, z)
        })
        .collect()
}

/// Projects the points seen from a camera at `center` (axis aligned) into a
/// `width` x `height` image; points outside are dropped.
pub fn observe(
    points: &[na::Point3<f64>],
    center: na::Vector3<f64>,
    intrinsics: &PoseIntrinsics,
    width: u32,
    height: u32,
) -> FeatureSet {
    points
        .iter()
        .enumerate()
        .filter_map(|(id, p)| {
            let c = p.coords - center;
            if c.z <= 0.0 {
                return None;
            }
            let u = intrinsics.focal * c.x / c.z + intrinsics.principal_point.0;
            let v = intrinsics.focal * c.y / c.z + intrinsics.principal_point.1;
            if u < 0.0 || v < 0.0 || u >= width as f64 || v >= height as f64 {
                return None;
            }
            Some((Keypoint::new(u as f32, v as f32), descriptor(id)))
        })
        .collect()
}

/// Hands out prepared feature sets in order, then empty sets.
pub struct ScriptedDetector {
    frames: RefCell<VecDeque<FeatureSet>>,
}

impl ScriptedDetector {
    pub fn new(frames: Vec<FeatureSet>) -> ScriptedDetector {
        ScriptedDetector {
            frames: RefCell::new(frames.into()),
        }
    }
}

impl FeatureDetector for ScriptedDetector {
    fn detect(&self, _image: &GrayImage) -> FeatureSet {
        self.frames.borrow_mut().pop_front().unwrap_or_default()
    }
}

pub fn blank_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::new_rgb8(width, height)
}

pub fn noise_image(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut img = GrayImage::new(width, height);
    for p in img.pixels_mut() {
        p.0[0] = rng.random_range(0..=255u8);
    }
    img
}
