//! Per-frame summaries handed back by [`super::VisualOdometry::process_frame`].

use serde::Serialize;

use super::FrameState;

/// What happened to one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame_index: usize,
    pub state: FrameState,
    pub num_keypoints: usize,
    pub matches: MatchSummary,
    /// True when the accumulated pose changed on this frame.
    pub pose_updated: bool,
    /// Accumulated translation after this frame, `None` before tracking.
    pub translation: Option<[f64; 3]>,
    pub timing: TimingStats,
}

/// Correspondence counts; all zero on the first frame.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MatchSummary {
    pub candidates: usize,
    pub inliers: usize,
    pub essential_inliers: usize,
    pub matched: bool,
}

/// Timing breakdown for a frame, in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TimingStats {
    pub total_ms: f64,
    pub rectify_ms: f64,
    pub detect_ms: f64,
    pub match_ms: f64,
    pub pose_ms: f64,
}

pub(crate) fn elapsed_ms(since: std::time::Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1e3
}
