//! Relative camera motion between two frames from their correspondences.

use log::{debug, trace};
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::camera_model::PoseIntrinsics;
use crate::correspondence::CorrespondenceSet;
use crate::error::{OdometryError, Result};
use crate::geometry::PointPair;
use crate::geometry::epipolar::{find_essential, fundamental_8point, mean_sampson_distance};
use crate::geometry::pose::recover_pose;
use crate::geometry::ransac::RansacConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub essential_probability: f64,
    /// Sampson distance threshold in pixels.
    pub essential_threshold: f64,
    pub essential_iterations: usize,
    /// Triangulated points farther than this (in baseline units) do not vote
    /// in the cheirality test.
    pub cheirality_max_depth: f64,
    /// Fit the diagnostic fundamental matrix and log its residual.
    pub fundamental_diagnostic: bool,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            essential_probability: 0.999,
            essential_threshold: 3.0,
            essential_iterations: 1000,
            cheirality_max_depth: 50.0,
            fundamental_diagnostic: true,
        }
    }
}

/// Motion from the previous camera to the current one:
/// `x_cur = rotation * x_prev + translation`. Translation is a direction only.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativePose {
    pub rotation: na::Rotation3<f64>,
    pub translation: na::Unit<na::Vector3<f64>>,
    pub essential_inliers: usize,
    pub points_in_front: usize,
}

impl RelativePose {
    pub fn translation_vector(&self) -> na::Vector3<f64> {
        self.translation.into_inner()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelativePoseEstimator {
    config: PoseConfig,
    seed: u64,
}

impl RelativePoseEstimator {
    pub fn new(config: PoseConfig) -> RelativePoseEstimator {
        RelativePoseEstimator { config, seed: 0 }
    }

    pub fn with_seed(mut self, seed: u64) -> RelativePoseEstimator {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &PoseConfig {
        &self.config
    }

    /// Mean Sampson distance in pixels of an 8-point fundamental matrix, or
    /// `None` for fewer than eight or degenerate pairs.
    pub fn fundamental_residual(&self, correspondences: &CorrespondenceSet) -> Option<f64> {
        let pixel_pairs = correspondences.to_point_pairs();
        let (p1, p2): (Vec<_>, Vec<_>) = pixel_pairs.iter().cloned().unzip();
        let f = fundamental_8point(&p1, &p2)?;
        Some(mean_sampson_distance(&f, &pixel_pairs))
    }

    pub fn estimate(
        &self,
        correspondences: &CorrespondenceSet,
        intrinsics: &PoseIntrinsics,
    ) -> Result<RelativePose> {
        if self.config.fundamental_diagnostic {
            match self.fundamental_residual(correspondences) {
                Some(residual) => debug!("fundamental matrix mean sampson error {:.4} px", residual),
                None => debug!("fundamental matrix not available"),
            }
        }

        let pairs: Vec<PointPair> = correspondences
            .iter()
            .map(|(s, d)| (intrinsics.normalize(s), intrinsics.normalize(d)))
            .collect();
        let ransac = RansacConfig {
            threshold: self.config.essential_threshold / intrinsics.focal,
            max_iterations: self.config.essential_iterations,
            confidence: self.config.essential_probability,
            seed: self.seed,
        };
        let essential = find_essential(&pairs, &ransac);
        let Some(e) = essential.model else {
            return Err(OdometryError::Geometry(format!(
                "no essential matrix from {} correspondences",
                pairs.len()
            )));
        };
        trace!("essential matrix: {} / {} inliers", essential.num_inliers, pairs.len());

        let pose = recover_pose(&e, &pairs, &essential.inliers, self.config.cheirality_max_depth)
            .ok_or_else(|| OdometryError::Geometry("no pose passes the cheirality test".to_string()))?;
        debug!(
            "relative pose: angle {:.4} rad, t {:?}, {} points in front",
            pose.rotation.angle(),
            pose.translation.as_slice(),
            pose.num_in_front
        );
        Ok(RelativePose {
            rotation: pose.rotation,
            translation: pose.translation,
            essential_inliers: essential.num_inliers,
            points_in_front: pose.num_in_front,
        })
    }
}
