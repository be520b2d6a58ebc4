use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use engine::{
    ActionStates, Body, InputAction, LoopCallbacks, LoopCommand, LoopState, PauseConfig,
    SurfaceSet, TickDelta, WorldFrame,
};
use tracing::{debug, info};

use super::control::InputUpdate;
use super::level::LevelConfig;

pub(crate) const DEFAULT_PAUSE_INTERVAL: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionConfig {
    pub(crate) pause_interval: Duration,
    /// `None` plays until game over or quit.
    pub(crate) run_limit: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pause_interval: DEFAULT_PAUSE_INTERVAL,
            run_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionStep {
    Continue,
    Stop,
    Pause,
    Resume,
}

/// Why the last run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    Quit,
    GameOver,
    TimeUp,
}

/// One body on one level, steered by queued input actions.
#[derive(Debug)]
pub(crate) struct GameSession {
    body: Body,
    surfaces: SurfaceSet,
    frame: WorldFrame,
    actions: ActionStates,
    input: Option<Receiver<InputUpdate>>,
    config: SessionConfig,
    elapsed_seconds: f64,
    ticks: u64,
    quit_requested: bool,
    end: Option<SessionEnd>,
}

impl GameSession {
    pub(crate) fn new(level: &LevelConfig, config: SessionConfig) -> Self {
        Self {
            body: Body::new(level.body),
            surfaces: SurfaceSet::new(level.surfaces.iter().copied()),
            frame: level.frame(),
            actions: ActionStates::default(),
            input: None,
            config,
            elapsed_seconds: 0.0,
            ticks: 0,
            quit_requested: false,
            end: None,
        }
    }

    pub(crate) fn with_input(mut self, input: Receiver<InputUpdate>) -> Self {
        self.input = Some(input);
        self
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks
    }

    pub(crate) fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub(crate) fn pause_interval(&self) -> Duration {
        self.config.pause_interval
    }

    pub(crate) fn end(&self) -> Option<SessionEnd> {
        self.end
    }

    /// Only a run that ran out of time with the body still alive may be played again.
    pub(crate) fn can_restart(&self) -> bool {
        self.end == Some(SessionEnd::TimeUp) && !self.body.is_dead()
    }

    /// Clears the run clock and any held actions; the body keeps its place and health.
    pub(crate) fn begin_run(&mut self) {
        self.elapsed_seconds = 0.0;
        self.quit_requested = false;
        self.end = None;
        self.actions.release_all();
    }

    /// Drains queued input while no loop is ticking and reports a quit press.
    pub(crate) fn take_quit_press(&mut self) -> bool {
        self.drain_input();
        self.actions.take_pressed(InputAction::Quit)
    }

    pub(crate) fn apply_input(&mut self, update: InputUpdate) {
        self.actions.set(update.action, update.is_down);
    }

    pub(crate) fn tick(&mut self, delta: TickDelta) -> SessionStep {
        self.drain_input();
        self.ticks += 1;

        if self.actions.take_pressed(InputAction::Quit) {
            self.quit_requested = true;
        }
        if self.quit_requested {
            info!(ticks = self.ticks, "quit_requested");
            self.end = Some(SessionEnd::Quit);
            return SessionStep::Stop;
        }
        if self.actions.take_pressed(InputAction::Pause) {
            return SessionStep::Pause;
        }

        self.steer();
        if let Some(landing) =
            self.body
                .update(delta.seconds as f32, &mut self.surfaces, &self.frame)
        {
            let top = self
                .surfaces
                .get(landing.surface_index)
                .map(|surface| surface.top(&self.frame));
            if landing.damage > 0 {
                info!(
                    surface = landing.surface_index,
                    top = ?top,
                    damage = landing.damage,
                    health = self.body.health(),
                    "hazard_landing"
                );
            } else {
                debug!(surface = landing.surface_index, top = ?top, "body_landed");
            }
        }

        let position = self.body.position();
        debug!(
            x = position.x,
            y = position.y,
            health = self.body.health(),
            jumps = self.body.jump_count(),
            "body_state"
        );

        if self.body.is_dead() {
            info!(ticks = self.ticks, "game_over");
            self.end = Some(SessionEnd::GameOver);
            return SessionStep::Stop;
        }

        self.elapsed_seconds += delta.seconds;
        if let Some(limit) = self.config.run_limit {
            if self.elapsed_seconds >= limit.as_secs_f64() {
                info!(elapsed_seconds = self.elapsed_seconds, "run_time_elapsed");
                self.end = Some(SessionEnd::TimeUp);
                return SessionStep::Stop;
            }
        }
        SessionStep::Continue
    }

    /// While paused the body is frozen; only a second pause press or a quit wakes the loop.
    pub(crate) fn paused_tick(&mut self) -> SessionStep {
        self.drain_input();

        if self.actions.take_pressed(InputAction::Quit) {
            self.quit_requested = true;
            return SessionStep::Resume;
        }
        if self.actions.take_pressed(InputAction::Pause) {
            return SessionStep::Resume;
        }
        SessionStep::Continue
    }

    fn steer(&mut self) {
        match (
            self.actions.is_down(InputAction::MoveLeft),
            self.actions.is_down(InputAction::MoveRight),
        ) {
            (true, false) => self.body.move_left(),
            (false, true) => self.body.move_right(),
            _ => self.body.stop_moving(),
        }

        if self.actions.take_pressed(InputAction::Jump) && !self.body.jump() {
            debug!(jumps = self.body.jump_count(), "jump_rejected");
        }
    }

    fn drain_input(&mut self) {
        let Some(input) = self.input.as_ref() else {
            return;
        };
        let updates: Vec<InputUpdate> = input.try_iter().collect();
        for update in updates {
            self.apply_input(update);
        }
    }
}

pub(crate) fn loop_callbacks(session: &Rc<RefCell<GameSession>>) -> LoopCallbacks {
    let running = Rc::clone(session);
    let starting = Rc::clone(session);
    LoopCallbacks::new()
        .on_run(move |delta| {
            let step = running.borrow_mut().tick(delta);
            command_for(&running, step)
        })
        .on_start(move |state| {
            starting.borrow_mut().begin_run();
            info!(state = %state, "loop_state_changed");
        })
        .on_stop(|state| {
            if state == LoopState::Stopped {
                info!(state = %state, "loop_state_changed");
            }
        })
        .on_pause(|state| {
            if state == LoopState::Paused {
                info!(state = %state, "loop_state_changed");
            }
        })
        .on_resume(|state| info!(state = %state, "loop_state_changed"))
}

fn command_for(session: &Rc<RefCell<GameSession>>, step: SessionStep) -> LoopCommand {
    match step {
        SessionStep::Continue => LoopCommand::Continue,
        SessionStep::Stop => LoopCommand::Stop,
        SessionStep::Resume => LoopCommand::Resume,
        SessionStep::Pause => {
            let interval = session.borrow().pause_interval();
            let paused = Rc::clone(session);
            LoopCommand::Pause(PauseConfig::new().with_interval(interval).with_on_tick(
                move |_| {
                    let step = paused.borrow_mut().paused_tick();
                    command_for(&paused, step)
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
