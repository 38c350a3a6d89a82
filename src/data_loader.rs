use std::path::{Path, PathBuf};

use glob::glob;
use image::{DynamicImage, ImageReader};

use crate::error::Result;

/// Spacing of synthesized timestamps when file names carry none.
const SYNTHETIC_PERIOD_NS: i64 = 100_000_000;

/// One decoded frame of a stream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub time_ns: i64,
    pub image: DynamicImage,
}

/// Delivers frames one at a time, in order.
pub trait FrameSource {
    /// `None` once the stream is exhausted. A frame that fails to load is
    /// reported as an error without ending the stream.
    fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// Parses the timestamp from a file path.
///
/// Assumes the filename (without extension) is a timestamp in nanoseconds.
pub fn path_to_timestamp(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg"] {
            if p.as_os_str().to_string_lossy().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

/// Sorted `.png`/`.jpg` files below a folder, read lazily.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequence {
    /// Collects images under `root_folder` (recursively), skipping the first
    /// `start_idx` and then keeping every `step`-th file.
    pub fn new<P: AsRef<Path>>(root_folder: P, start_idx: usize, step: usize) -> Result<ImageSequence> {
        let pattern = format!("{}/**/*", root_folder.as_ref().display());
        let mut sorted_path: Vec<PathBuf> = glob(&pattern)?.filter_map(img_filter).collect();
        sorted_path.sort();
        let paths: Vec<PathBuf> = sorted_path
            .into_iter()
            .skip(start_idx)
            .step_by(step.max(1))
            .collect();
        log::debug!("{} images under {}", paths.len(), root_folder.as_ref().display());
        Ok(ImageSequence { paths, cursor: 0 })
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> ImageSequence {
        ImageSequence { paths, cursor: 0 }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Timestamp of the `index`-th frame: the file stem in nanoseconds, or
    /// `index * 100 ms` when the stem is not a number.
    pub fn timestamp(&self, index: usize) -> i64 {
        self.paths
            .get(index)
            .and_then(|p| path_to_timestamp(p))
            .unwrap_or(index as i64 * SYNTHETIC_PERIOD_NS)
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Option<Result<Frame>> {
        let index = self.cursor;
        let path = self.paths.get(index)?;
        self.cursor += 1;
        log::trace!("loading {}", path.display());
        let image = match ImageReader::open(path) {
            Ok(reader) => reader.decode(),
            Err(e) => return Some(Err(e.into())),
        };
        Some(image.map_err(Into::into).map(|image| Frame {
            index,
            time_ns: self.timestamp(index),
            image,
        }))
    }
}
