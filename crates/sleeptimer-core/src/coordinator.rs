//! Reconciliation of local view state with the timer backend.
//!
//! The backend owns the countdown, the persisted alarms, the interval
//! window, subtle mode, and the recent-duration list; this side is a
//! read-through cache fed by push events plus the guarded command path that
//! fans user intent back out. Local mutations made ahead of a remote call
//! (optimistic apply) are rolled back to the pre-apply snapshot if the call
//! fails, so displayed state never drifts permanently from backend truth.
//!
//! ## Usage
//!
//! ```ignore
//! let coordinator = Coordinator::new(backend);
//! let subs = coordinator.attach(&bus); // hold until teardown
//! coordinator.initialize().await;
//! coordinator.start_countdown().await;
//! ```

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::events::{EventBus, EventKind, PushEvent, Subscription};
use crate::model::{AlarmSlotId, DailyAlarms, IntervalWindow, WindowEdge, MAX_RECENT_TIMERS};
use crate::remote::TimerBackend;
use crate::time_of_day::TimeOfDay;

/// The pre-start countdown length never goes below this many minutes.
pub const MIN_TIMER_MINUTES: u32 = 5;

/// The pre-start countdown length is capped at a full day.
pub const MAX_TIMER_MINUTES: u32 = 24 * 60;

/// Subtle mode cannot be changed inside the final half minute of a
/// countdown.
const SUBTLE_LOCK_SECONDS: u32 = 30;

/// Which value the relative `+`/`-` buttons currently target.
///
/// Local UI state with no backend counterpart; selecting the same target
/// twice clears the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustTarget {
    Alarm(AlarmSlotId),
    Interval(WindowEdge),
}

/// The reconciled view of backend state plus local-only configuration.
#[derive(Debug, Clone)]
pub struct ViewState {
    seconds_remaining: u32,
    subtle_mode: bool,
    timer_minutes: u32,
    alarms: DailyAlarms,
    interval: IntervalWindow,
    recents: Vec<u32>,
    selection: Option<AdjustTarget>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            seconds_remaining: 0,
            subtle_mode: false,
            timer_minutes: MIN_TIMER_MINUTES,
            alarms: DailyAlarms::default(),
            interval: IntervalWindow::default(),
            recents: Vec::new(),
            selection: None,
        }
    }
}

impl ViewState {
    // ── Reducers (wired to push events) ──────────────────────────────

    pub fn on_seconds_updated(&mut self, seconds: u32) {
        self.seconds_remaining = seconds;
    }

    /// Wholesale replacement; the list is never merged.
    pub fn on_recents_refreshed(&mut self, mut recents: Vec<u32>) {
        recents.truncate(MAX_RECENT_TIMERS);
        self.recents = recents;
    }

    pub fn on_subtle_mode_changed(&mut self, subtle: bool) {
        self.subtle_mode = subtle;
    }

    // ── Guards ───────────────────────────────────────────────────────

    pub fn can_start(&self) -> bool {
        self.seconds_remaining == 0
    }

    pub fn can_cancel(&self) -> bool {
        self.seconds_remaining > 0
    }

    pub fn subtle_mode_locked(&self) -> bool {
        self.seconds_remaining > 0 && self.seconds_remaining < SUBTLE_LOCK_SECONDS
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn subtle_mode(&self) -> bool {
        self.subtle_mode
    }

    pub fn timer_minutes(&self) -> u32 {
        self.timer_minutes
    }

    pub fn alarms(&self) -> &DailyAlarms {
        &self.alarms
    }

    pub fn interval(&self) -> &IntervalWindow {
        &self.interval
    }

    pub fn recents(&self) -> &[u32] {
        &self.recents
    }

    pub fn selection(&self) -> Option<AdjustTarget> {
        self.selection
    }

    fn toggle_selection(&mut self, target: AdjustTarget) {
        self.selection = if self.selection == Some(target) {
            None
        } else {
            Some(target)
        };
    }
}

/// Handle through which user intent reaches the backend.
///
/// Cheap to clone; clones share the same view state and backend. State is
/// only borrowed between suspension points, never across one, so push-event
/// handlers can run while a remote call is in flight.
pub struct Coordinator<B> {
    state: Rc<RefCell<ViewState>>,
    backend: Rc<B>,
}

impl<B> Clone for Coordinator<B> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B: TimerBackend> Coordinator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            state: Rc::new(RefCell::new(ViewState::default())),
            backend: Rc::new(backend),
        }
    }

    pub fn view(&self) -> Ref<'_, ViewState> {
        self.state.borrow()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Subscribe the view-state reducers to the bus.
    ///
    /// The returned subscriptions are the teardown capability; the owning
    /// context must hold them and drop them when it goes away.
    pub fn attach(&self, bus: &EventBus) -> Vec<Subscription> {
        let seconds = {
            let state = Rc::clone(&self.state);
            bus.subscribe(EventKind::SecondsUpdated, move |event| {
                if let PushEvent::SecondsUpdated { seconds } = event {
                    state.borrow_mut().on_seconds_updated(*seconds);
                }
            })
        };
        let recents = {
            let state = Rc::clone(&self.state);
            bus.subscribe(EventKind::RefreshRecents, move |event| {
                if let PushEvent::RefreshRecents { recents } = event {
                    state.borrow_mut().on_recents_refreshed(recents.clone());
                }
            })
        };
        let subtle = {
            let state = Rc::clone(&self.state);
            bus.subscribe(EventKind::SubtleMode, move |event| {
                if let PushEvent::SubtleMode { subtle } = event {
                    state.borrow_mut().on_subtle_mode_changed(*subtle);
                }
            })
        };
        vec![seconds, recents, subtle]
    }

    /// One-shot pull of backend state, used once at startup. Ongoing
    /// updates arrive by push. Pulls that fail leave the defaults in place.
    pub async fn initialize(&self) {
        match self.backend.load_recents().await {
            Ok(recents) => self.state.borrow_mut().on_recents_refreshed(recents),
            Err(err) => log::warn!("load_recents failed: {err}"),
        }
        match self.backend.load_remaining_seconds().await {
            Ok(seconds) => self.state.borrow_mut().on_seconds_updated(seconds),
            Err(err) => log::warn!("load_remaining_seconds failed: {err}"),
        }
        match self.backend.load_subtle_mode().await {
            Ok(subtle) => self.state.borrow_mut().on_subtle_mode_changed(subtle),
            Err(err) => log::warn!("load_subtle_mode failed: {err}"),
        }
        match self.backend.get_daily_alarms().await {
            Ok(alarms) => self.state.borrow_mut().alarms = alarms,
            Err(err) => log::warn!("get_daily_alarms failed, keeping defaults: {err}"),
        }
        match self.backend.get_interval_timer().await {
            Ok(window) => self.state.borrow_mut().interval = window,
            Err(err) => log::warn!("get_interval_timer failed, keeping defaults: {err}"),
        }
    }

    // ── Countdown commands ───────────────────────────────────────────

    /// Start a countdown of the locally configured length. Rejected while
    /// a countdown is active; `seconds_remaining` only moves by push.
    pub async fn start_countdown(&self) {
        let seconds = {
            let state = self.state.borrow();
            if !state.can_start() {
                log::debug!("start_countdown ignored: countdown already active");
                return;
            }
            state.timer_minutes.saturating_mul(60)
        };
        if let Err(err) = self.backend.start_timer(seconds).await {
            log::warn!("start_timer failed: {err}");
        }
    }

    /// Restart one of the recent durations. Same gate as `start_countdown`.
    pub async fn restart_recent(&self, seconds: u32) {
        if !self.state.borrow().can_start() {
            log::debug!("restart_recent ignored: countdown already active");
            return;
        }
        if let Err(err) = self.backend.start_timer(seconds).await {
            log::warn!("start_timer failed: {err}");
        }
    }

    pub async fn cancel_countdown(&self) {
        if !self.state.borrow().can_cancel() {
            log::debug!("cancel_countdown ignored: no countdown active");
            return;
        }
        if let Err(err) = self.backend.cancel_timer().await {
            log::warn!("cancel_timer failed: {err}");
        }
    }

    /// Persist the subtle-mode flag. Refused (value unchanged) inside the
    /// final half minute of a countdown. The cached flag moves only when
    /// the backend pushes the change back.
    pub async fn set_subtle_mode(&self, enabled: bool) {
        if self.state.borrow().subtle_mode_locked() {
            log::debug!("set_subtle_mode ignored: countdown about to complete");
            return;
        }
        if let Err(err) = self.backend.set_subtle_mode(enabled).await {
            log::warn!("set_subtle_mode failed: {err}");
        }
    }

    // ── Local pre-start configuration ────────────────────────────────

    /// Adjust the configured countdown length. Purely local; never touches
    /// `seconds_remaining`.
    pub fn adjust_timer_minutes(&self, delta_minutes: i32) {
        let mut state = self.state.borrow_mut();
        let adjusted = state.timer_minutes as i64 + delta_minutes as i64;
        state.timer_minutes =
            adjusted.clamp(MIN_TIMER_MINUTES as i64, MAX_TIMER_MINUTES as i64) as u32;
    }

    /// Toggle which target the relative adjustment buttons act on.
    pub fn select_target(&self, target: AdjustTarget) {
        self.state.borrow_mut().toggle_selection(target);
    }

    /// Route a relative adjustment to the current selection, or to the
    /// local countdown length when nothing is selected.
    pub async fn adjust_selected(&self, delta_minutes: i32) {
        let selection = self.state.borrow().selection;
        match selection {
            None => self.adjust_timer_minutes(delta_minutes),
            Some(AdjustTarget::Alarm(slot)) => self.adjust_alarm(slot, delta_minutes).await,
            Some(AdjustTarget::Interval(edge)) => self.adjust_interval(edge, delta_minutes).await,
        }
    }

    // ── Alarm and interval persistence ───────────────────────────────

    /// Shift one alarm slot by a signed number of minutes, wrapping across
    /// midnight. Applied optimistically, reverted if the persist fails.
    pub async fn adjust_alarm(&self, slot: AlarmSlotId, delta_minutes: i32) {
        let previous = self.state.borrow().alarms.get(slot).time;
        self.save_alarm_time(slot, previous, previous.adjust(delta_minutes))
            .await;
    }

    /// Direct numeric entry for one alarm slot; out-of-range components are
    /// clamped, not wrapped.
    pub async fn enter_alarm_time(&self, slot: AlarmSlotId, hour: i32, minute: i32) {
        let previous = self.state.borrow().alarms.get(slot).time;
        self.save_alarm_time(slot, previous, TimeOfDay::normalize(hour, minute))
            .await;
    }

    async fn save_alarm_time(&self, slot: AlarmSlotId, previous: TimeOfDay, updated: TimeOfDay) {
        self.state.borrow_mut().alarms.get_mut(slot).time = updated;
        if let Err(err) = self
            .backend
            .set_daily_alarm(slot, updated.hour(), updated.minute())
            .await
        {
            log::warn!(
                "set_daily_alarm failed, reverting slot {} to {previous}: {err}",
                slot.as_u8()
            );
            self.state.borrow_mut().alarms.get_mut(slot).time = previous;
        }
    }

    /// Shift one edge of the interval window, wrapping across midnight.
    /// Edges are independent; an overnight window (start after end) is
    /// legal and never corrected.
    pub async fn adjust_interval(&self, edge: WindowEdge, delta_minutes: i32) {
        let previous = self.state.borrow().interval;
        let updated = previous.edge(edge).adjust(delta_minutes);
        self.save_interval_edge(edge, previous, updated).await;
    }

    /// Direct numeric entry for one window edge; clamps instead of
    /// wrapping.
    pub async fn enter_interval_edge(&self, edge: WindowEdge, hour: i32, minute: i32) {
        let previous = self.state.borrow().interval;
        self.save_interval_edge(edge, previous, TimeOfDay::normalize(hour, minute))
            .await;
    }

    async fn save_interval_edge(
        &self,
        edge: WindowEdge,
        previous: IntervalWindow,
        updated: TimeOfDay,
    ) {
        let window = {
            let mut state = self.state.borrow_mut();
            *state.interval.edge_mut(edge) = updated;
            state.interval
        };
        if let Err(err) = self
            .backend
            .set_interval_timer(
                window.start.hour(),
                window.start.minute(),
                window.end.hour(),
                window.end.minute(),
            )
            .await
        {
            log::warn!("set_interval_timer failed, reverting window: {err}");
            self.state.borrow_mut().interval = previous;
        }
    }

    /// Enable or disable the interval window, optimistically.
    pub async fn set_interval_enabled(&self, enabled: bool) {
        let previous = {
            let mut state = self.state.borrow_mut();
            let previous = state.interval.enabled;
            state.interval.enabled = enabled;
            previous
        };
        if let Err(err) = self.backend.toggle_interval_timer(enabled).await {
            log::warn!("toggle_interval_timer failed, reverting: {err}");
            self.state.borrow_mut().interval.enabled = previous;
        }
    }
}
