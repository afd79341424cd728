//! Error types for sleeptimer-core.
//!
//! Two failure families exist: remote calls against the timer backend can
//! fail, and direct numeric time entry can carry out-of-range components.
//! Neither is fatal to the engine -- remote failures are logged and rolled
//! back at the call site, validation failures are clamped away before they
//! reach stored state.

use thiserror::Error;

/// A remote operation against the timer backend failed.
///
/// The engine catches these at the point of call, reverts any optimistic
/// local change, logs, and continues. They never escape to the caller of a
/// coordinator operation.
#[derive(Error, Debug)]
pub enum RemoteCallError {
    /// The backend could not be reached at all.
    #[error("backend unreachable during '{op}': {message}")]
    Unreachable { op: &'static str, message: String },

    /// The backend received the call but refused it.
    #[error("backend rejected '{op}': {message}")]
    Rejected { op: &'static str, message: String },
}

/// A value failed range validation.
///
/// Only produced by strict constructors; the direct-entry editing path uses
/// the clamping constructors instead and cannot fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("hour {0} out of range (expected 0-23)")]
    HourOutOfRange(u8),

    #[error("minute {0} out of range (expected 0-59)")]
    MinuteOutOfRange(u8),

    #[error("alarm slot {0} out of range (expected 1-3)")]
    SlotOutOfRange(u8),
}
