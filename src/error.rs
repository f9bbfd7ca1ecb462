//! Error taxonomy for the scheduling core.

use thiserror::Error;

/// Errors surfaced by the scheduling core.
///
/// Most feasibility problems (uncovered slots, degraded coverage, rejected
/// pins) are not modeled as errors at all — they become notes and
/// `debugInfo` entries on the [`crate::dto::SolveResponse`]. This enum is
/// reserved for conditions that stop a component outright.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("malformed time value {value:?}: {reason}")]
    TimeParse { value: String, reason: &'static str },

    #[error("manual pin for clinician {clinician_id} on {row_id}@{date} conflicts with a hard constraint: {reason}")]
    InfeasiblePin {
        clinician_id: String,
        row_id: String,
        date: String,
        reason: String,
    },

    #[error("a solve is already in flight for user {user_key}")]
    ConflictingSolve { user_key: String },

    #[error("CP backend returned an unexpected status: {status}")]
    Backend { status: String },

    #[error("invalid state snapshot: {0}")]
    InvalidState(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
