//! # Sleeptimer Core Library
//!
//! Coordination engine for a countdown/alarm facility backed by a remote
//! timer service: a one-shot countdown, three daily fixed-time alarms, a
//! recurring interval reminder window, and the graduated completion
//! escalation that offers a shrinking grace window before an automatic
//! device suspend.
//!
//! ## Architecture
//!
//! - **Push in, calls out**: backend push events fan into the view state
//!   through [`EventBus`]; user intent fans out through the [`TimerBackend`]
//!   facade. The backend of record owns all durable state.
//! - **Optimistic with rollback**: alarm and interval edits apply locally
//!   first and revert to the pre-apply snapshot when the persisting call
//!   fails, so displayed state never drifts from backend truth.
//! - **Single-threaded, event-driven**: suspension points are the remote
//!   calls and the escalation machine's cancellable stage timers; nothing
//!   needs locking.
//!
//! ## Key components
//!
//! - [`Coordinator`]: guarded command path and reconciled view state
//! - [`EscalationMachine`]: cancellable, time-staged completion flow
//! - [`EventBus`]: typed subscription registry for backend push events
//! - [`TimeOfDay`]: minute-of-day arithmetic with wrap and clamp policies

// Boundary-trait futures are not Send; the engine is single-threaded.
#![allow(async_fn_in_trait)]

pub mod coordinator;
pub mod error;
pub mod escalation;
pub mod events;
pub mod model;
pub mod remote;
pub mod time_of_day;

pub use coordinator::{AdjustTarget, Coordinator, ViewState, MAX_TIMER_MINUTES, MIN_TIMER_MINUTES};
pub use error::{RemoteCallError, ValidationError};
pub use escalation::{
    EscalationMachine, EscalationPrompt, EscalationState, EscalationSurface, Resolution,
    SuspendAction,
};
pub use events::{EventBus, EventKind, PushEvent, Subscription};
pub use model::{
    AlarmSlot, AlarmSlotId, DailyAlarms, IntervalWindow, WindowEdge, MAX_RECENT_TIMERS,
};
pub use remote::TimerBackend;
pub use time_of_day::{TimeOfDay, MINUTES_PER_DAY};
