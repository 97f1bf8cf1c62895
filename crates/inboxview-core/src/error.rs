use thiserror::Error;

/// Protocol violations. None of these are fatal: the offending operation is
/// skipped and the error is logged by whoever drives the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    #[error("session started twice")]
    SessionAlreadyActive,
    #[error("session ended without start")]
    NoActiveSession,
    #[error("impression already started for row {row}")]
    ImpressionAlreadyStarted { row: usize },
    #[error("could not find start time for row {row}")]
    ImpressionNotStarted { row: usize },
    #[error("row {row} out of bounds for snapshot of {len} items")]
    RowOutOfBounds { row: usize, len: usize },
    #[error("began updates with no diff pending")]
    NoPendingUpdate,
    #[error("ended updates without beginning them")]
    UpdateNotStarted,
}
