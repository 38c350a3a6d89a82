//! Frame-to-frame odometry: the per-frame state machine and the context it
//! owns between frames.

pub mod pose;
pub mod report;
pub mod state;

pub use pose::AccumulatedPose;
pub use report::{FrameReport, MatchSummary, TimingStats};
pub use state::FrameState;

use std::time::Instant;

use image::{DynamicImage, GrayImage};
use log::{debug, info, warn};

use crate::camera_model::{CameraModel, to_gray};
use crate::config::OdometryConfig;
use crate::correspondence::{CorrespondenceFinder, CorrespondenceSet};
use crate::error::{OdometryError, Result};
use crate::features::{BruteForceMatcher, CornerDetector, DescriptorMatcher, FeatureDetector, FeatureSet};
use crate::pose_estimator::{RelativePose, RelativePoseEstimator};
use crate::trajectory::TrajectoryProjector;
use report::elapsed_ms;

/// Everything that survives from one frame to the next.
#[derive(Debug, Clone)]
pub struct OdometryContext {
    pub state: FrameState,
    /// Features of the last accepted frame.
    pub previous: Option<FeatureSet>,
    pub pose: Option<AccumulatedPose>,
    pub trace: TrajectoryProjector,
    /// Inlier correspondences of the last matched frame.
    pub last_correspondences: Option<CorrespondenceSet>,
    /// Rectified image of the last frame.
    pub last_rectified: Option<GrayImage>,
    pub frames_processed: usize,
    pub pose_updates: usize,
}

impl OdometryContext {
    pub fn new(trace: TrajectoryProjector) -> OdometryContext {
        OdometryContext {
            state: FrameState::AwaitingFirstFrame,
            previous: None,
            pose: None,
            trace,
            last_correspondences: None,
            last_rectified: None,
            frames_processed: 0,
            pose_updates: 0,
        }
    }
}

/// Monocular visual odometry over a stream of frames.
///
/// Frames go through [`VisualOdometry::process_frame`] one at a time; the
/// `&mut self` receiver serializes them.
pub struct VisualOdometry<D, M> {
    camera: CameraModel,
    detector: D,
    finder: CorrespondenceFinder<M>,
    estimator: RelativePoseEstimator,
    reorthonormalize_every: Option<usize>,
    context: OdometryContext,
}

impl VisualOdometry<CornerDetector, BruteForceMatcher> {
    /// Odometry with the built-in corner detector and brute-force matcher.
    pub fn from_config(config: &OdometryConfig) -> Result<Self> {
        VisualOdometry::new(
            config,
            CornerDetector::new(config.detector.clone()),
            BruteForceMatcher::new(),
        )
    }
}

impl<D: FeatureDetector, M: DescriptorMatcher> VisualOdometry<D, M> {
    pub fn new(config: &OdometryConfig, detector: D, matcher: M) -> Result<Self> {
        let camera = CameraModel::new(config.camera.clone())?;
        Ok(VisualOdometry {
            camera,
            detector,
            finder: CorrespondenceFinder::new(matcher, config.matcher.clone()).with_seed(config.seed),
            estimator: RelativePoseEstimator::new(config.pose.clone()).with_seed(config.seed),
            reorthonormalize_every: config.reorthonormalize_every.filter(|&n| n > 0),
            context: OdometryContext::new(TrajectoryProjector::new(config.trajectory.clone())),
        })
    }

    pub fn state(&self) -> FrameState {
        self.context.state
    }

    /// Accumulated pose, `None` until tracking starts.
    pub fn pose(&self) -> Option<&AccumulatedPose> {
        self.context.pose.as_ref()
    }

    pub fn trace(&self) -> &TrajectoryProjector {
        &self.context.trace
    }

    pub fn frames_processed(&self) -> usize {
        self.context.frames_processed
    }

    pub fn previous_features(&self) -> Option<&FeatureSet> {
        self.context.previous.as_ref()
    }

    pub fn last_correspondences(&self) -> Option<&CorrespondenceSet> {
        self.context.last_correspondences.as_ref()
    }

    pub fn last_rectified(&self) -> Option<&GrayImage> {
        self.context.last_rectified.as_ref()
    }

    pub fn context(&self) -> &OdometryContext {
        &self.context
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    fn validate(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(OdometryError::EmptyFrame);
        }
        if !self.camera.expects(width, height) {
            let c = self.camera.intrinsics();
            return Err(OdometryError::MalformedInput {
                expected: (c.width, c.height),
                got: (width, height),
            });
        }
        Ok(())
    }

    /// Runs one color (or gray) frame through the pipeline.
    ///
    /// A frame of the wrong size is rejected before anything is touched.
    pub fn process_frame(&mut self, frame: &DynamicImage) -> Result<FrameReport> {
        self.validate(frame.width(), frame.height())?;
        self.process_gray(&to_gray(frame))
    }

    pub fn process_gray(&mut self, gray: &GrayImage) -> Result<FrameReport> {
        self.validate(gray.width(), gray.height())?;
        let start = Instant::now();
        let mut timing = TimingStats::default();
        let frame_index = self.context.frames_processed;

        let t = Instant::now();
        let rectified = self.camera.rectify(gray);
        timing.rectify_ms = elapsed_ms(t);

        let t = Instant::now();
        let features = self.detector.detect(&rectified);
        timing.detect_ms = elapsed_ms(t);
        debug!("frame {}: {} keypoints", frame_index, features.len());

        let mut matches = MatchSummary::default();
        let mut pose_updated = false;
        match (self.context.state, self.context.previous.as_ref()) {
            (FrameState::AwaitingFirstFrame, _) | (_, None) => {
                info!("frame {}: reference frame stored", frame_index);
                self.context.state = FrameState::AwaitingSecondFrame;
            }
            (_, Some(previous)) => {
                let t = Instant::now();
                let outcome = self.finder.find(previous, &features);
                timing.match_ms = elapsed_ms(t);
                matches.candidates = outcome.candidates();

                if let Some(correspondences) = outcome.correspondences() {
                    matches.matched = true;
                    matches.inliers = correspondences.len();
                    let t = Instant::now();
                    match self.estimator.estimate(correspondences, &self.camera.pose_intrinsics()) {
                        Ok(relative) => {
                            matches.essential_inliers = relative.essential_inliers;
                            self.integrate(&relative);
                            pose_updated = true;
                        }
                        Err(e) => warn!("frame {}: pose update skipped, {}", frame_index, e),
                    }
                    timing.pose_ms = elapsed_ms(t);
                } else {
                    warn!(
                        "frame {}: not enough matches ({} candidates), pose update skipped",
                        frame_index, matches.candidates
                    );
                }
                self.context.last_correspondences = outcome.correspondences().cloned();
            }
        }

        let num_keypoints = features.len();
        self.context.previous = Some(features);
        self.context.last_rectified = Some(rectified);
        self.context.frames_processed += 1;
        timing.total_ms = elapsed_ms(start);

        Ok(FrameReport {
            frame_index,
            state: self.context.state,
            num_keypoints,
            matches,
            pose_updated,
            translation: self
                .context
                .pose
                .as_ref()
                .map(|p| [p.translation.x, p.translation.y, p.translation.z]),
            timing,
        })
    }

    fn integrate(&mut self, relative: &RelativePose) {
        match self.context.pose.as_mut() {
            Some(pose) => pose.compose(relative),
            None => {
                info!("tracking started");
                self.context.state = FrameState::Tracking;
                self.context.pose = Some(AccumulatedPose::from_relative(relative));
            }
        }
        self.context.pose_updates += 1;
        let updates = self.context.pose_updates;
        if let Some(pose) = self.context.pose.as_mut() {
            if self.reorthonormalize_every.is_some_and(|every| updates % every == 0) {
                pose.reorthonormalize();
            }
            let (x, y) = pose.planar();
            self.context.trace.update(x, y);
        }
    }
}
