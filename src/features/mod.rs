//! Keypoints, descriptors and the two collaborator seams of the front end:
//! detection ([`FeatureDetector`]) and nearest-neighbour lookup
//! ([`DescriptorMatcher`]).

pub mod detector;
pub mod matcher;

pub use detector::CornerDetector;
pub use matcher::BruteForceMatcher;

use image::GrayImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub p2d: glam::Vec2,
    pub response: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Keypoint {
        Keypoint {
            p2d: glam::Vec2::new(x, y),
            response: 0.0,
        }
    }

    pub fn with_response(mut self, response: f32) -> Keypoint {
        self.response = response;
        self
    }
}

/// Keypoints of one frame with their index-aligned descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Vec<f32>>,
}

impl FeatureSet {
    pub fn new() -> FeatureSet {
        FeatureSet::default()
    }

    pub fn push(&mut self, keypoint: Keypoint, descriptor: Vec<f32>) {
        self.keypoints.push(keypoint);
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Vec<f32>] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, &[f32])> {
        self.keypoints
            .iter()
            .zip(self.descriptors.iter().map(|d| d.as_slice()))
    }
}

impl FromIterator<(Keypoint, Vec<f32>)> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = (Keypoint, Vec<f32>)>>(iter: I) -> Self {
        let (keypoints, descriptors) = iter.into_iter().unzip();
        FeatureSet {
            keypoints,
            descriptors,
        }
    }
}

/// Turns a grayscale image into a [`FeatureSet`].
///
/// Must be deterministic for a given image, with a fixed descriptor length.
pub trait FeatureDetector {
    fn detect(&self, image: &GrayImage) -> FeatureSet;
}

/// One neighbour found by a [`DescriptorMatcher`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbour {
    pub train_idx: usize,
    pub distance: f32,
}

/// Two-nearest-neighbour descriptor search.
pub trait DescriptorMatcher {
    /// For every query descriptor, its closest and second closest train
    /// descriptor (ascending distance), or `None` when `train` holds fewer
    /// than two descriptors.
    fn knn2(&self, query: &FeatureSet, train: &FeatureSet) -> Vec<Option<[Neighbour; 2]>>;
}
