//! Loop lifecycle states and the pure transition table.
//!
//! Transitions are decided here without side effects; the scheduler applies entry effects and
//! then runs the tick body for whatever state the tick landed in.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoopState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Pausing,
    Paused,
    Resuming,
}

impl LoopState {
    pub const fn name(self) -> &'static str {
        match self {
            LoopState::Stopped => "Stopped",
            LoopState::Starting => "Starting",
            LoopState::Running => "Running",
            LoopState::Stopping => "Stopping",
            LoopState::Pausing => "Pausing",
            LoopState::Paused => "Paused",
            LoopState::Resuming => "Resuming",
        }
    }

    /// Transient states only exist between a control call and the next tick.
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            LoopState::Starting | LoopState::Stopping | LoopState::Pausing | LoopState::Resuming
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopEvent {
    Start,
    Stop,
    Pause,
    Resume,
    Tick,
}

impl LoopEvent {
    pub const fn action_name(self) -> &'static str {
        match self {
            LoopEvent::Start => "start",
            LoopEvent::Stop => "stop",
            LoopEvent::Pause => "pause",
            LoopEvent::Resume => "resume",
            LoopEvent::Tick => "tick",
        }
    }
}

/// Returns the next state, or `None` when the event does not apply in `state`.
///
/// `Stop` is also accepted while a start or resume is still waiting for its first tick, so a
/// stop issued before any tick fires still winds the loop down.
pub const fn transition(state: LoopState, event: LoopEvent) -> Option<LoopState> {
    match (state, event) {
        (LoopState::Stopped, LoopEvent::Start) => Some(LoopState::Starting),
        (LoopState::Running | LoopState::Starting | LoopState::Resuming, LoopEvent::Stop) => {
            Some(LoopState::Stopping)
        }
        (LoopState::Running, LoopEvent::Pause) => Some(LoopState::Pausing),
        (LoopState::Paused, LoopEvent::Resume) => Some(LoopState::Resuming),
        (LoopState::Starting | LoopState::Resuming, LoopEvent::Tick) => Some(LoopState::Running),
        (LoopState::Stopping, LoopEvent::Tick) => Some(LoopState::Stopped),
        (LoopState::Pausing, LoopEvent::Tick) => Some(LoopState::Paused),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickBody {
    Run,
    Paused,
    Idle,
}

impl TickBody {
    pub const fn for_state(state: LoopState) -> Self {
        match state {
            LoopState::Running => TickBody::Run,
            LoopState::Paused => TickBody::Paused,
            _ => TickBody::Idle,
        }
    }
}
