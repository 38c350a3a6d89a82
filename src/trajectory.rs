//! Top-down trajectory trace on a fixed-scale raster canvas.

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Pixels per translation unit.
    pub scale: f64,
    /// Pixel offset added to both axes after scaling.
    pub shift: i32,
    pub canvas_size: u32,
    /// RGB.
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            scale: 4.0,
            shift: 290,
            canvas_size: 600,
            color: [26, 255, 22],
            thickness: 2,
        }
    }
}

/// Append-only polyline of the first two translation coordinates.
///
/// The pen starts at the projection of the origin. Each
/// [`TrajectoryProjector::update`] draws one segment from the last plotted
/// point and moves the pen. The canvas is never cleared.
#[derive(Debug, Clone)]
pub struct TrajectoryProjector {
    config: TrajectoryConfig,
    canvas: RgbImage,
    last: (i32, i32),
    segments: usize,
}

impl Default for TrajectoryProjector {
    fn default() -> Self {
        TrajectoryProjector::new(TrajectoryConfig::default())
    }
}

impl TrajectoryProjector {
    pub fn new(config: TrajectoryConfig) -> TrajectoryProjector {
        let canvas = RgbImage::new(config.canvas_size, config.canvas_size);
        let last = (config.shift, config.shift);
        TrajectoryProjector {
            config,
            canvas,
            last,
            segments: 0,
        }
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Canvas pixel of a world position. Scaled coordinates are truncated
    /// toward zero before the shift is added.
    pub fn to_pixel(&self, x: f64, y: f64) -> (i32, i32) {
        let px = (x * self.config.scale) as i32;
        let py = (y * self.config.scale) as i32;
        (px.saturating_add(self.config.shift), py.saturating_add(self.config.shift))
    }

    pub fn update(&mut self, x: f64, y: f64) {
        let next = self.to_pixel(x, y);
        draw_thick_line(
            &mut self.canvas,
            self.last,
            next,
            self.config.thickness,
            Rgb(self.config.color),
        );
        log::trace!("trajectory segment {:?} -> {:?}", self.last, next);
        self.last = next;
        self.segments += 1;
    }

    pub fn render(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn last_point(&self) -> (i32, i32) {
        self.last
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.canvas.save(path)?;
        Ok(())
    }
}

/// Liang-Barsky clip of a segment against `[lo, hi]` on both axes.
fn clip_segment(from: (i32, i32), to: (i32, i32), lo: f64, hi: f64) -> Option<((i64, i64), (i64, i64))> {
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [(-dx, x0 - lo), (dx, hi - x0), (-dy, y0 - lo), (dy, hi - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let at = |t: f64| ((x0 + t * dx).round() as i64, (y0 + t * dy).round() as i64);
    Some((at(t0), at(t1)))
}

/// Line of `thickness` pixels: the clipped segment is drawn once per offset
/// inside a disc of radius `thickness / 2`.
fn draw_thick_line(canvas: &mut RgbImage, from: (i32, i32), to: (i32, i32), thickness: u32, color: Rgb<u8>) {
    let radius = (thickness / 2) as i64;
    let margin = radius as f64 + 1.0;
    let hi = canvas.width().max(canvas.height()) as f64 + margin;
    let Some(((x0, y0), (x1, y1))) = clip_segment(from, to, -margin, hi) else {
        return;
    };
    for oy in -radius..=radius {
        for ox in -radius..=radius {
            if ox * ox + oy * oy > radius * radius {
                continue;
            }
            draw_line_segment_mut(
                canvas,
                ((x0 + ox) as f32, (y0 + oy) as f32),
                ((x1 + ox) as f32, (y1 + oy) as f32),
                color,
            );
        }
    }
}
