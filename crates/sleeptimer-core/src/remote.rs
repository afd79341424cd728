//! Typed facade over the remote timer backend.
//!
//! One async operation per backend capability; method names are stable for
//! backend compatibility. The transport (IPC, HTTP, in-process) lives
//! outside this crate -- the engine only sees this trait and treats every
//! failure as a log-and-continue [`RemoteCallError`].

use crate::error::RemoteCallError;
use crate::model::{AlarmSlotId, DailyAlarms, IntervalWindow};

/// Remote operation surface of the timer backend.
///
/// Backends are stateless between calls from the engine's point of view;
/// all durable state lives on the backend of record. The `load_*` trio is
/// used only at initialization -- ongoing updates arrive as push events,
/// never by polling.
pub trait TimerBackend {
    /// Begin a countdown. Callers must gate on `seconds_remaining == 0`;
    /// behavior while a countdown is already active is undefined.
    async fn start_timer(&self, seconds: u32) -> Result<(), RemoteCallError>;

    /// Stop the active countdown. No-op if none is active.
    async fn cancel_timer(&self) -> Result<(), RemoteCallError>;

    /// Persist the subtle-mode flag backend-side.
    async fn set_subtle_mode(&self, subtle: bool) -> Result<(), RemoteCallError>;

    /// One-shot pull of the recent-duration list (seconds, most recent
    /// first, at most five entries).
    async fn load_recents(&self) -> Result<Vec<u32>, RemoteCallError>;

    /// One-shot pull of the current countdown position. Zero means idle.
    async fn load_remaining_seconds(&self) -> Result<u32, RemoteCallError>;

    /// One-shot pull of the persisted subtle-mode flag.
    async fn load_subtle_mode(&self) -> Result<bool, RemoteCallError>;

    /// Persist one daily alarm slot. The enabled flag is backend-managed
    /// and not settable through this call.
    async fn set_daily_alarm(
        &self,
        slot: AlarmSlotId,
        hour: u8,
        minute: u8,
    ) -> Result<(), RemoteCallError>;

    async fn get_daily_alarms(&self) -> Result<DailyAlarms, RemoteCallError>;

    /// Persist both edges of the interval window.
    async fn set_interval_timer(
        &self,
        start_hour: u8,
        start_minute: u8,
        end_hour: u8,
        end_minute: u8,
    ) -> Result<(), RemoteCallError>;

    async fn get_interval_timer(&self) -> Result<IntervalWindow, RemoteCallError>;

    async fn toggle_interval_timer(&self, enabled: bool) -> Result<(), RemoteCallError>;
}
