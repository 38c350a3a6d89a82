use serde::Serialize;

/// Phase of the per-frame state machine. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FrameState {
    /// Nothing seen yet.
    #[default]
    AwaitingFirstFrame,
    /// Reference features stored, no pose yet.
    AwaitingSecondFrame,
    /// Accumulated pose initialized and updated per frame.
    Tracking,
}

impl FrameState {
    pub fn has_pose(&self) -> bool {
        matches!(self, FrameState::Tracking)
    }
}

impl std::fmt::Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FrameState::AwaitingFirstFrame => "awaiting first frame",
            FrameState::AwaitingSecondFrame => "awaiting second frame",
            FrameState::Tracking => "tracking",
        };
        f.write_str(name)
    }
}
