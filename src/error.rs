use crate::kernel::segment::{PhaseType, SegmentId};
use crate::kernel::time::TimePoint;
use thiserror::Error;

/// A command was refused locally; nothing was sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("select at least one segment to delete")]
    EmptySelection,

    #[error("merge needs at least two segments, {selected} selected")]
    MergeTooFew { selected: usize },

    #[error("merge needs segments of one type, found {first} and {second}")]
    MergeMixedTypes { first: PhaseType, second: PhaseType },

    #[error("segments {first} and {second} are not contiguous")]
    MergeNotContiguous { first: SegmentId, second: SegmentId },

    #[error("split needs exactly one selected segment, {selected} selected")]
    SplitNeedsSingle { selected: usize },

    #[error("split time {split_time} is outside segment {segment_id} ({start}..{end})")]
    SplitOutOfRange {
        segment_id: SegmentId,
        split_time: TimePoint,
        start: TimePoint,
        end: TimePoint,
    },

    #[error("splitting segment {segment_id} at {split_time} leaves no room for a second half")]
    SplitLeavesNoRemainder { segment_id: SegmentId, split_time: TimePoint },

    #[error("segment {0} is not on the timeline")]
    UnknownSegment(SegmentId),

    #[error("apnea threshold must be a positive number, got {0}")]
    InvalidThreshold(f64),
}

/// A request reached (or tried to reach) the server and did not apply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("{0}")]
    Server(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SyncError {
    /// Text shown to the analyst. Server messages pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Server(msg) => msg.clone(),
            other => format!("The request failed and nothing was changed ({other}). Please retry."),
        }
    }

    pub fn cause(&self) -> FailureCause {
        match self {
            SyncError::Transport(_) | SyncError::Malformed(_) => FailureCause::Transport,
            SyncError::Timeout(_) => FailureCause::Timeout,
            SyncError::Status(_) | SyncError::Server(_) => FailureCause::Server,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureCause {
    Precondition,
    Transport,
    Timeout,
    Server,
}
