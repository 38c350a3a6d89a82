use thiserror::Error;

/// Errors surfaced by the odometry pipeline and its I/O helpers.
///
/// A frame with too few correspondences is *not* an error, see
/// [`crate::correspondence::MatchOutcome::NoMatch`].
#[derive(Debug, Error)]
pub enum OdometryError {
    /// Frame resolution does not match the calibration resolution.
    #[error("frame is {got:?} but the camera was calibrated for {expected:?}")]
    MalformedInput {
        expected: (u32, u32),
        got: (u32, u32),
    },
    /// Frame has zero width or height.
    #[error("empty frame")]
    EmptyFrame,
    /// A geometric solver produced no usable model.
    #[error("degenerate geometry: {0}")]
    Geometry(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
    #[error("rerun: {0}")]
    Visualization(String),
}

pub type Result<T> = std::result::Result<T, OdometryError>;
