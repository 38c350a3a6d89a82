use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FeatureDetector, FeatureSet, Keypoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Keep at most this many corners, strongest first.
    pub max_corners: usize,
    /// Corners weaker than `quality_level * strongest` are dropped.
    pub quality_level: f32,
    /// Absolute response floor; a flat image never yields corners.
    pub min_response: f32,
    pub harris_k: f32,
    /// Half size of the structure tensor window.
    pub block_radius: u32,
    /// Half size of the square intensity patch used as descriptor.
    pub patch_radius: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_corners: 1000,
            quality_level: 0.01,
            min_response: 1.0,
            harris_k: 0.04,
            block_radius: 1,
            patch_radius: 5,
        }
    }
}

/// Harris corners with mean-subtracted, L2-normalized patch descriptors.
#[derive(Debug, Clone, Default)]
pub struct CornerDetector {
    config: DetectorConfig,
}

impl CornerDetector {
    pub fn new(config: DetectorConfig) -> CornerDetector {
        CornerDetector { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn descriptor_len(&self) -> usize {
        let side = 2 * self.config.patch_radius as usize + 1;
        side * side
    }

    fn border(&self) -> u32 {
        self.config.patch_radius.max(self.config.block_radius + 1) + 1
    }

    fn harris_response(&self, image: &GrayImage) -> Vec<f32> {
        let w = image.width() as usize;
        let h = image.height() as usize;
        let (gx, gy) = sobel(image);
        let r = self.config.block_radius as usize;
        let k = self.config.harris_k;
        let mut responses = vec![0.0f32; w * h];
        if w <= 2 * (r + 1) || h <= 2 * (r + 1) {
            return responses;
        }
        responses
            .par_chunks_mut(w)
            .enumerate()
            .skip(r + 1)
            .take(h - 2 * (r + 1))
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate().take(w - r - 1).skip(r + 1) {
                    let mut i_xx = 0.0f32;
                    let mut i_yy = 0.0f32;
                    let mut i_xy = 0.0f32;
                    for yy in y - r..=y + r {
                        for xx in x - r..=x + r {
                            let idx = yy * w + xx;
                            i_xx += gx[idx] * gx[idx];
                            i_yy += gy[idx] * gy[idx];
                            i_xy += gx[idx] * gy[idx];
                        }
                    }
                    let det = i_xx * i_yy - i_xy * i_xy;
                    let trace = i_xx + i_yy;
                    *out = det - k * trace * trace;
                }
            });
        responses
    }

    fn describe(&self, image: &GrayImage, x: u32, y: u32) -> Option<Vec<f32>> {
        let r = self.config.patch_radius;
        let mut patch = Vec::with_capacity(self.descriptor_len());
        for yy in y - r..=y + r {
            for xx in x - r..=x + r {
                patch.push(image.get_pixel(xx, yy)[0] as f32);
            }
        }
        let mean = patch.iter().sum::<f32>() / patch.len() as f32;
        patch.iter_mut().for_each(|v| *v -= mean);
        let norm = patch.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < 1e-3 {
            return None;
        }
        patch.iter_mut().for_each(|v| *v /= norm);
        Some(patch)
    }
}

impl FeatureDetector for CornerDetector {
    fn detect(&self, image: &GrayImage) -> FeatureSet {
        let w = image.width();
        let h = image.height();
        let border = self.border();
        if w <= 2 * border || h <= 2 * border {
            return FeatureSet::new();
        }
        let responses = self.harris_response(image);
        let strongest = responses.iter().cloned().fold(0.0f32, f32::max);
        let threshold = (strongest * self.config.quality_level).max(self.config.min_response);
        if strongest < threshold {
            log::trace!("no corner above {}", threshold);
            return FeatureSet::new();
        }

        let at = |x: u32, y: u32| responses[(y * w + x) as usize];
        let mut corners: Vec<(u32, u32, f32)> = (border..h - border)
            .flat_map(|y| (border..w - border).map(move |x| (x, y)))
            .filter_map(|(x, y)| {
                let response = at(x, y);
                if response < threshold {
                    return None;
                }
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let n = at((x as i32 + dx) as u32, (y as i32 + dy) as u32);
                        // ties go to the first pixel in raster order
                        if n > response || (n == response && (dy < 0 || (dy == 0 && dx < 0))) {
                            return None;
                        }
                    }
                }
                Some((x, y, response))
            })
            .collect();
        corners.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.1, a.0).cmp(&(b.1, b.0)))
        });
        corners.truncate(self.config.max_corners);

        let features: FeatureSet = corners
            .into_iter()
            .filter_map(|(x, y, response)| {
                self.describe(image, x, y).map(|d| {
                    (
                        Keypoint::new(x as f32, y as f32).with_response(response),
                        d,
                    )
                })
            })
            .collect();
        log::trace!("detected {} corners", features.len());
        features
    }
}

/// Horizontal and vertical 3x3 Sobel responses, row-major.
fn sobel(image: &GrayImage) -> (Vec<f32>, Vec<f32>) {
    let to_f32 = |g: image::ImageBuffer<image::Luma<i16>, Vec<i16>>| -> Vec<f32> {
        g.into_raw().into_iter().map(f32::from).collect()
    };
    (
        to_f32(imageproc::gradients::horizontal_sobel(image)),
        to_f32(imageproc::gradients::vertical_sobel(image)),
    )
}
