//! End-to-end flow: backend push events through the bus into the view
//! state and the escalation machine.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::task::LocalSet;
use tokio::time::{sleep, Duration};

use sleeptimer_core::{
    Coordinator, DailyAlarms, EscalationMachine, EscalationPrompt, EscalationState,
    EscalationSurface, EventBus, IntervalWindow, PushEvent, RemoteCallError, Resolution,
    SuspendAction, TimerBackend,
};

#[derive(Default)]
struct NullBackend;

impl TimerBackend for NullBackend {
    async fn start_timer(&self, _seconds: u32) -> Result<(), RemoteCallError> {
        Ok(())
    }
    async fn cancel_timer(&self) -> Result<(), RemoteCallError> {
        Ok(())
    }
    async fn set_subtle_mode(&self, _subtle: bool) -> Result<(), RemoteCallError> {
        Ok(())
    }
    async fn load_recents(&self) -> Result<Vec<u32>, RemoteCallError> {
        Ok(Vec::new())
    }
    async fn load_remaining_seconds(&self) -> Result<u32, RemoteCallError> {
        Ok(0)
    }
    async fn load_subtle_mode(&self) -> Result<bool, RemoteCallError> {
        Ok(false)
    }
    async fn set_daily_alarm(
        &self,
        _slot: sleeptimer_core::AlarmSlotId,
        _hour: u8,
        _minute: u8,
    ) -> Result<(), RemoteCallError> {
        Ok(())
    }
    async fn get_daily_alarms(&self) -> Result<DailyAlarms, RemoteCallError> {
        Ok(DailyAlarms::default())
    }
    async fn set_interval_timer(
        &self,
        _start_hour: u8,
        _start_minute: u8,
        _end_hour: u8,
        _end_minute: u8,
    ) -> Result<(), RemoteCallError> {
        Ok(())
    }
    async fn get_interval_timer(&self) -> Result<IntervalWindow, RemoteCallError> {
        Ok(IntervalWindow::default())
    }
    async fn toggle_interval_timer(&self, _enabled: bool) -> Result<(), RemoteCallError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingSurface {
    prompts: Rc<RefCell<Vec<String>>>,
    toasts: Rc<RefCell<Vec<String>>>,
}

impl EscalationSurface for RecordingSurface {
    fn play_cue(&mut self) {}
    fn show_toast(&mut self, message: &str) {
        self.toasts.borrow_mut().push(message.into());
    }
    fn show_prompt(&mut self, prompt: &EscalationPrompt) {
        self.prompts.borrow_mut().push(prompt.dismiss_label.into());
    }
    fn update_prompt(&mut self, prompt: &EscalationPrompt) {
        self.prompts.borrow_mut().push(prompt.dismiss_label.into());
    }
    fn close_prompt(&mut self) {}
}

#[derive(Clone, Default)]
struct RecordingSuspend {
    requests: Rc<RefCell<u32>>,
}

impl SuspendAction for RecordingSuspend {
    async fn suspend(&self) -> Result<(), RemoteCallError> {
        *self.requests.borrow_mut() += 1;
        Ok(())
    }
}

/// A countdown normally ends as `seconds_updated(0)` followed by the
/// completion event; the completion drives escalation while the view state
/// settles at zero.
#[tokio::test(start_paused = true)]
async fn countdown_completion_runs_the_full_escalation() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let bus = EventBus::new();
            let coordinator = Coordinator::new(NullBackend);
            let surface = RecordingSurface::default();
            let suspend = RecordingSuspend::default();
            let machine = EscalationMachine::new(surface.clone(), suspend.clone());

            let _coordinator_subs = coordinator.attach(&bus);
            let _machine_sub = machine.attach(&bus);

            bus.publish(&PushEvent::SecondsUpdated { seconds: 3 });
            bus.publish(&PushEvent::SecondsUpdated { seconds: 0 });
            bus.publish(&PushEvent::TimerEvent {
                message: "Your session has ended!".into(),
                subtle: false,
            });

            assert_eq!(coordinator.view().seconds_remaining(), 0);
            assert_eq!(machine.state(), EscalationState::Escalating { stage: 0 });

            sleep(Duration::from_millis(3100)).await;
            assert_eq!(machine.state(), EscalationState::Escalating { stage: 3 });
            assert_eq!(
                *surface.prompts.borrow(),
                vec!["(3s)", "(2s)", "(1s)", "Ignore"]
            );

            machine.dismiss();
            assert_eq!(
                machine.state(),
                EscalationState::Resolved(Resolution::Dismissed)
            );
            assert_eq!(*suspend.requests.borrow(), 0);
        })
        .await;
}

/// The completion event is authoritative even if the backend never pushed a
/// zero beforehand; the machine must not consult the cached countdown.
#[tokio::test(start_paused = true)]
async fn completion_is_authoritative_regardless_of_last_seen_seconds() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let bus = EventBus::new();
            let coordinator = Coordinator::new(NullBackend);
            let surface = RecordingSurface::default();
            let machine = EscalationMachine::new(surface.clone(), RecordingSuspend::default());

            let _coordinator_subs = coordinator.attach(&bus);
            let _machine_sub = machine.attach(&bus);

            bus.publish(&PushEvent::SecondsUpdated { seconds: 45 });
            bus.publish(&PushEvent::TimerEvent {
                message: "Your timer has expired!".into(),
                subtle: true,
            });

            assert_eq!(coordinator.view().seconds_remaining(), 45);
            assert_eq!(
                machine.state(),
                EscalationState::Resolved(Resolution::Toasted)
            );
            assert_eq!(
                *surface.toasts.borrow(),
                vec!["Your timer has expired!".to_string()]
            );
        })
        .await;
}
