//! Ratio-tested, homography-filtered matches between two feature sets.

use log::{debug, trace};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::features::{DescriptorMatcher, FeatureSet};
use crate::geometry::PointPair;
use crate::geometry::homography::find_homography;
use crate::geometry::ransac::RansacConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Lowe ratio: keep when `d1 < ratio * d2`.
    pub ratio: f32,
    /// Candidate counts at or below this give [`MatchOutcome::NoMatch`].
    pub min_matches: usize,
    /// Homography reprojection threshold in pixels.
    pub homography_threshold: f64,
    pub homography_iterations: usize,
    pub homography_confidence: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            ratio: 0.8,
            min_matches: 10,
            homography_threshold: 5.0,
            homography_iterations: 2000,
            homography_confidence: 0.995,
        }
    }
}

/// Index-aligned point pairs, source (previous frame) to destination
/// (current frame).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceSet {
    source: Vec<glam::Vec2>,
    destination: Vec<glam::Vec2>,
    homography: Option<na::Matrix3<f64>>,
}

impl CorrespondenceSet {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (glam::Vec2, glam::Vec2)>) -> CorrespondenceSet {
        let (source, destination) = pairs.into_iter().unzip();
        CorrespondenceSet {
            source,
            destination,
            homography: None,
        }
    }

    pub fn with_homography(mut self, homography: na::Matrix3<f64>) -> CorrespondenceSet {
        self.homography = Some(homography);
        self
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn source(&self) -> &[glam::Vec2] {
        &self.source
    }

    pub fn destination(&self) -> &[glam::Vec2] {
        &self.destination
    }

    pub fn iter(&self) -> impl Iterator<Item = (&glam::Vec2, &glam::Vec2)> {
        self.source.iter().zip(&self.destination)
    }

    /// The sieve homography, kept for diagnostics only.
    pub fn homography(&self) -> Option<&na::Matrix3<f64>> {
        self.homography.as_ref()
    }

    pub fn to_point_pairs(&self) -> Vec<PointPair> {
        self.iter()
            .map(|(s, d)| {
                (
                    na::Point2::new(s.x as f64, s.y as f64),
                    na::Point2::new(d.x as f64, d.y as f64),
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        correspondences: CorrespondenceSet,
        /// Ratio-test survivors before the homography sieve.
        candidates: usize,
    },
    NoMatch {
        candidates: usize,
    },
}

impl MatchOutcome {
    pub fn candidates(&self) -> usize {
        match self {
            MatchOutcome::Matched { candidates, .. } | MatchOutcome::NoMatch { candidates } => *candidates,
        }
    }

    pub fn correspondences(&self) -> Option<&CorrespondenceSet> {
        match self {
            MatchOutcome::Matched {
                correspondences, ..
            } => Some(correspondences),
            MatchOutcome::NoMatch { .. } => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

pub struct CorrespondenceFinder<M> {
    matcher: M,
    config: MatcherConfig,
    seed: u64,
}

impl<M: DescriptorMatcher> CorrespondenceFinder<M> {
    pub fn new(matcher: M, config: MatcherConfig) -> CorrespondenceFinder<M> {
        CorrespondenceFinder {
            matcher,
            config,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> CorrespondenceFinder<M> {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Ratio-test survivors from `a` (query) into `b` (train).
    pub fn ratio_test(&self, a: &FeatureSet, b: &FeatureSet) -> Vec<(glam::Vec2, glam::Vec2)> {
        let ratio = self.config.ratio;
        self.matcher
            .knn2(a, b)
            .into_iter()
            .enumerate()
            .filter_map(|(query_idx, nn)| {
                let [best, second] = nn?;
                (best.distance < ratio * second.distance).then(|| {
                    (
                        a.keypoints()[query_idx].p2d,
                        b.keypoints()[best.train_idx].p2d,
                    )
                })
            })
            .collect()
    }

    pub fn find(&self, a: &FeatureSet, b: &FeatureSet) -> MatchOutcome {
        let good = self.ratio_test(a, b);
        let candidates = good.len();
        if candidates <= self.config.min_matches {
            debug!(
                "not enough matches: {}/{}",
                candidates, self.config.min_matches
            );
            return MatchOutcome::NoMatch { candidates };
        }

        let pairs: Vec<PointPair> = good
            .iter()
            .map(|(s, d)| {
                (
                    na::Point2::new(s.x as f64, s.y as f64),
                    na::Point2::new(d.x as f64, d.y as f64),
                )
            })
            .collect();
        let ransac = RansacConfig {
            threshold: self.config.homography_threshold,
            max_iterations: self.config.homography_iterations,
            confidence: self.config.homography_confidence,
            seed: self.seed,
        };
        let result = find_homography(&pairs, &ransac);
        let Some(homography) = result.model else {
            debug!("homography sieve rejected all {} candidates", candidates);
            return MatchOutcome::NoMatch { candidates };
        };
        let correspondences = CorrespondenceSet::from_pairs(
            good.into_iter()
                .zip(&result.inliers)
                .filter_map(|(pair, &inlier)| inlier.then_some(pair)),
        )
        .with_homography(homography);
        trace!(
            "{} candidates, {} homography inliers",
            candidates,
            correspondences.len()
        );
        MatchOutcome::Matched {
            correspondences,
            candidates,
        }
    }
}
