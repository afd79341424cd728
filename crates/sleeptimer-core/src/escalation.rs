//! Completion escalation state machine.
//!
//! A non-subtle completion opens a confirmation surface whose secondary
//! action counts down from "(3s)" and only becomes a usable "Ignore" after
//! three staged relabelings at +1, +2 and +3 seconds from trigger. The
//! primary action suspends the device at any stage. A subtle completion
//! collapses the whole flow into a single toast.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Escalating(0..=3) -> Resolved(Suspended | Dismissed)
//! Idle -> Resolved(Toasted)            (subtle completion)
//! ```
//!
//! Stage transitions are spawned as cancellable tasks on the current
//! thread's `LocalSet`; trigger paths must run inside `LocalSet::run_until`.
//! Resolving a session cancels every outstanding stage timer synchronously,
//! and a timer that fires anyway (scheduled before resolution, run after)
//! is rejected by the session epoch guard, so a resolved session can never
//! be resurrected.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::error::RemoteCallError;
use crate::events::{EventBus, EventKind, PushEvent, Subscription};

/// Stage-transition offsets from trigger time.
const STAGE_OFFSETS_MS: [u64; 3] = [1000, 2000, 3000];

/// The stage at which the dismiss action becomes usable.
const FINAL_STAGE: u8 = 3;

const CONFIRM_LABEL: &str = "Suspend Now";
const PROMPT_DESCRIPTION: &str =
    "Your timer has finished. You can either suspend now, or ignore the alert.";

fn dismiss_label(stage: u8) -> &'static str {
    match stage {
        0 => "(3s)",
        1 => "(2s)",
        2 => "(1s)",
        _ => "Ignore",
    }
}

/// How an escalation session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Suspended,
    Dismissed,
    Toasted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationState {
    Idle,
    Escalating { stage: u8 },
    Resolved(Resolution),
}

/// Everything the presentation layer needs to render the confirmation
/// surface at one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPrompt {
    /// Completion message from the backend, e.g. "Your session has ended!".
    pub title: String,
    pub description: &'static str,
    pub confirm_label: &'static str,
    pub dismiss_label: &'static str,
    pub dismiss_enabled: bool,
    pub triggered_at: DateTime<Utc>,
}

/// Presentation boundary. Implementations render somewhere; the machine
/// only dictates when and with what content.
pub trait EscalationSurface {
    /// Audio cue; invoked exactly once per completion, at trigger time.
    fn play_cue(&mut self);
    fn show_toast(&mut self, message: &str);
    fn show_prompt(&mut self, prompt: &EscalationPrompt);
    fn update_prompt(&mut self, prompt: &EscalationPrompt);
    fn close_prompt(&mut self);
}

/// The external device-suspend action. Failures are logged, never retried.
pub trait SuspendAction {
    async fn suspend(&self) -> Result<(), RemoteCallError>;
}

/// One active escalation session. Holds one cancel token per pending stage
/// timer, so each is individually cancellable and all can be revoked at
/// resolution.
struct Session {
    epoch: u64,
    message: String,
    triggered_at: DateTime<Utc>,
    stage_tokens: Vec<CancellationToken>,
}

impl Session {
    /// Revoke every outstanding stage timer. Synchronous; once this
    /// returns, no timer of this session will mutate state.
    fn cancel_pending(&self) {
        for token in &self.stage_tokens {
            token.cancel();
        }
    }

    fn prompt(&self, stage: u8) -> EscalationPrompt {
        EscalationPrompt {
            title: self.message.clone(),
            description: PROMPT_DESCRIPTION,
            confirm_label: CONFIRM_LABEL,
            dismiss_label: dismiss_label(stage),
            dismiss_enabled: stage >= FINAL_STAGE,
            triggered_at: self.triggered_at,
        }
    }
}

struct Inner<S> {
    surface: S,
    state: EscalationState,
    session: Option<Session>,
    next_epoch: u64,
}

/// Cancellable, time-staged completion flow. Cheap to clone; clones share
/// one machine.
pub struct EscalationMachine<S, A> {
    inner: Rc<RefCell<Inner<S>>>,
    suspender: Rc<A>,
}

impl<S, A> Clone for EscalationMachine<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            suspender: Rc::clone(&self.suspender),
        }
    }
}

impl<S, A> EscalationMachine<S, A>
where
    S: EscalationSurface + 'static,
    A: SuspendAction + 'static,
{
    pub fn new(surface: S, suspender: A) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                surface,
                state: EscalationState::Idle,
                session: None,
                next_epoch: 0,
            })),
            suspender: Rc::new(suspender),
        }
    }

    pub fn state(&self) -> EscalationState {
        self.inner.borrow().state
    }

    /// Subscribe the machine to completion events.
    pub fn attach(&self, bus: &EventBus) -> Subscription {
        let machine = self.clone();
        bus.subscribe(EventKind::TimerEvent, move |event| {
            if let PushEvent::TimerEvent { message, subtle } = event {
                machine.on_completion(message, *subtle);
            }
        })
    }

    /// Handle a completion event.
    ///
    /// Under normal operation at most one completion is in flight (the
    /// countdown is single-shot), but a daily alarm can in principle fire
    /// during an active session's grace window; the prior session's timers
    /// are force-cancelled before the new one opens.
    pub fn on_completion(&self, message: &str, subtle: bool) {
        let mut inner = self.inner.borrow_mut();

        if let Some(prior) = inner.session.take() {
            log::warn!("completion while a session is active; cancelling the prior session");
            prior.cancel_pending();
            // The prior session's prompt is still showing; release it so it
            // cannot outlive the session that owned its controls.
            inner.surface.close_prompt();
        }

        inner.surface.play_cue();

        if subtle {
            inner.surface.show_toast(message);
            inner.state = EscalationState::Resolved(Resolution::Toasted);
            return;
        }

        let epoch = inner.next_epoch;
        inner.next_epoch += 1;
        let mut session = Session {
            epoch,
            message: message.to_owned(),
            triggered_at: Utc::now(),
            stage_tokens: Vec::with_capacity(STAGE_OFFSETS_MS.len()),
        };

        inner.state = EscalationState::Escalating { stage: 0 };
        let opening = session.prompt(0);
        inner.surface.show_prompt(&opening);

        for (index, offset_ms) in STAGE_OFFSETS_MS.iter().enumerate() {
            let stage = index as u8 + 1;
            let token = CancellationToken::new();
            session.stage_tokens.push(token.clone());
            let weak = Rc::downgrade(&self.inner);
            let delay = Duration::from_millis(*offset_ms);
            tokio::task::spawn_local(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = sleep(delay) => advance_stage(&weak, epoch, stage),
                }
            });
        }

        inner.session = Some(session);
    }

    /// Primary action: suspend the device. Valid at any stage; cancels all
    /// pending stage timers before yielding to the suspend call.
    pub async fn suspend_now(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            let Some(session) = inner.session.take() else {
                log::debug!("suspend_now ignored: no active session");
                return;
            };
            session.cancel_pending();
            inner.state = EscalationState::Resolved(Resolution::Suspended);
        }
        if let Err(err) = self.suspender.suspend().await {
            log::error!("suspend request failed: {err}");
        }
        self.inner.borrow_mut().surface.close_prompt();
    }

    /// Secondary action. Disabled until the final stage; resolves the
    /// session without suspending.
    pub fn dismiss(&self) {
        let mut inner = self.inner.borrow_mut();
        let EscalationState::Escalating { stage } = inner.state else {
            log::debug!("dismiss ignored: no active session");
            return;
        };
        if stage < FINAL_STAGE {
            log::debug!("dismiss ignored: not yet enabled at stage {stage}");
            return;
        }
        let Some(session) = inner.session.take() else {
            return;
        };
        // No stage timers should remain at the final stage; cancelling is
        // harmless either way.
        session.cancel_pending();
        inner.state = EscalationState::Resolved(Resolution::Dismissed);
        inner.surface.close_prompt();
    }
}

/// Stage-timer body. The epoch and state checks are the stale-session
/// guard: a timer scheduled by a session that has since resolved or been
/// replaced must not mutate anything.
fn advance_stage<S: EscalationSurface>(inner: &Weak<RefCell<Inner<S>>>, epoch: u64, stage: u8) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut inner = inner.borrow_mut();
    let Some(session) = inner.session.as_ref() else {
        return;
    };
    if session.epoch != epoch {
        return;
    }
    if !matches!(inner.state, EscalationState::Escalating { .. }) {
        return;
    }
    let prompt = session.prompt(stage);
    inner.state = EscalationState::Escalating { stage };
    inner.surface.update_prompt(&prompt);
}
