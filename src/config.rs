use serde::{Deserialize, Serialize};

use crate::camera_model::CameraIntrinsics;
use crate::correspondence::MatcherConfig;
use crate::features::detector::DetectorConfig;
use crate::pose_estimator::PoseConfig;
use crate::trajectory::TrajectoryConfig;

/// All tunables of the pipeline. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdometryConfig {
    pub camera: CameraIntrinsics,
    pub detector: DetectorConfig,
    pub matcher: MatcherConfig,
    pub pose: PoseConfig,
    pub trajectory: TrajectoryConfig,
    /// Re-project the accumulated rotation onto SO(3) every N pose updates.
    /// Off when `None`.
    pub reorthonormalize_every: Option<usize>,
    /// Seed of every RANSAC run.
    pub seed: u64,
}

impl OdometryConfig {
    pub fn with_reorthonormalization(mut self, every: usize) -> OdometryConfig {
        self.reorthonormalize_every = Some(every);
        self
    }
}
