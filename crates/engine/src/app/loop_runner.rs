use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use super::clock::{Clock, MonotonicClock};
use super::log::{LogLevel, LogSink, LoopLogger};
use super::loop_state::{transition, LoopEvent, LoopState, TickBody};
use super::metrics::{LoopRunSummary, MetricsAccumulator, MetricsHandle};
use super::probe::{PrecisionProbe, ProbeError};
use super::timer::TickTimer;

pub const DEFAULT_TARGET_FPS: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_fps: f64,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoopError {
    #[error("loop not ready; initialize must complete before the loop can start")]
    NotCalibrated,
    #[error("loop cannot run without an on_run callback")]
    MissingRunCallback,
    #[error("unable to {action}, current state: {state}")]
    InvalidTransition {
        action: &'static str,
        state: LoopState,
    },
    #[error("timer calibration failed: {0}")]
    Calibration(#[from] ProbeError),
}

impl LoopError {
    /// Wrong-state calls are routine (double key presses); everything else is a caller bug.
    pub fn level(&self) -> LogLevel {
        match self {
            LoopError::InvalidTransition { .. } => LogLevel::Warn,
            LoopError::NotCalibrated
            | LoopError::MissingRunCallback
            | LoopError::Calibration(_) => LogLevel::Error,
        }
    }
}

/// Time handed to a tick consumer, in both units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickDelta {
    pub millis: f64,
    pub seconds: f64,
}

impl TickDelta {
    pub fn from_duration(duration: Duration) -> Self {
        let millis = duration_ms(duration);
        Self {
            millis,
            seconds: millis / 1000.0,
        }
    }
}

pub type TickCallback = Box<dyn FnMut(TickDelta) -> LoopCommand>;
pub type StateCallback = Box<dyn FnMut(LoopState)>;

/// What a tick consumer wants the loop to do once the current tick finishes.
pub enum LoopCommand {
    Continue,
    Stop,
    Pause(PauseConfig),
    Resume,
}

impl fmt::Debug for LoopCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopCommand::Continue => f.write_str("Continue"),
            LoopCommand::Stop => f.write_str("Stop"),
            LoopCommand::Pause(config) => f.debug_tuple("Pause").field(config).finish(),
            LoopCommand::Resume => f.write_str("Resume"),
        }
    }
}

#[derive(Default)]
pub struct PauseConfig {
    interval: Option<Duration>,
    on_tick: Option<TickCallback>,
}

impl PauseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_on_tick(
        mut self,
        on_tick: impl FnMut(TickDelta) -> LoopCommand + 'static,
    ) -> Self {
        self.on_tick = Some(Box::new(on_tick));
        self
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl fmt::Debug for PauseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseConfig")
            .field("interval", &self.interval)
            .field("on_tick", &self.on_tick.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct LoopCallbacks {
    on_run: Option<TickCallback>,
    on_start: Option<StateCallback>,
    on_stop: Option<StateCallback>,
    on_pause: Option<StateCallback>,
    on_resume: Option<StateCallback>,
}

impl LoopCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_run(mut self, callback: impl FnMut(TickDelta) -> LoopCommand + 'static) -> Self {
        self.on_run = Some(Box::new(callback));
        self
    }

    pub fn on_start(mut self, callback: impl FnMut(LoopState) + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    pub fn on_stop(mut self, callback: impl FnMut(LoopState) + 'static) -> Self {
        self.on_stop = Some(Box::new(callback));
        self
    }

    pub fn on_pause(mut self, callback: impl FnMut(LoopState) + 'static) -> Self {
        self.on_pause = Some(Box::new(callback));
        self
    }

    pub fn on_resume(mut self, callback: impl FnMut(LoopState) + 'static) -> Self {
        self.on_resume = Some(Box::new(callback));
        self
    }

    fn state_callback(&mut self, state: LoopState) -> Option<&mut StateCallback> {
        match state {
            LoopState::Starting => self.on_start.as_mut(),
            LoopState::Stopping | LoopState::Stopped => self.on_stop.as_mut(),
            LoopState::Pausing | LoopState::Paused => self.on_pause.as_mut(),
            LoopState::Resuming => self.on_resume.as_mut(),
            LoopState::Running => None,
        }
    }
}

impl fmt::Debug for LoopCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopCallbacks")
            .field("on_run", &self.on_run.is_some())
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .field("on_pause", &self.on_pause.is_some())
            .field("on_resume", &self.on_resume.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum ControlRequest {
    Stop,
    Pause { interval: Option<Duration> },
    Resume,
    ResumeOrStart,
}

/// Cross-thread control for a loop owned by another thread.
///
/// Requests are queued and applied by the owning thread at the start of its next poll, so the
/// state machine itself never needs a lock.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    sender: Sender<ControlRequest>,
}

impl LoopHandle {
    /// Returns false once the loop has been dropped.
    pub fn stop(&self) -> bool {
        self.sender.send(ControlRequest::Stop).is_ok()
    }

    pub fn pause(&self, interval: Option<Duration>) -> bool {
        self.sender.send(ControlRequest::Pause { interval }).is_ok()
    }

    pub fn resume(&self) -> bool {
        self.sender.send(ControlRequest::Resume).is_ok()
    }

    /// Resumes a paused loop, or starts a stopped one again.
    pub fn resume_or_start(&self) -> bool {
        self.sender.send(ControlRequest::ResumeOrStart).is_ok()
    }
}

/// Fixed-cadence tick scheduler.
///
/// Single owner, single thread: every tick is one explicit re-arm of a one-shot timer made at
/// the end of the previous tick. Drive it with [`LoopScheduler::poll`] from a host loop, or
/// hand the thread over with [`LoopScheduler::run_until_stopped`].
pub struct LoopScheduler<C: Clock = MonotonicClock> {
    clock: C,
    callbacks: LoopCallbacks,
    logger: LoopLogger,
    probe: PrecisionProbe,
    target_fps: f64,
    nominal_interval: Duration,
    minimum_precision: Option<Duration>,
    compensating: bool,
    state: LoopState,
    timer: TickTimer,
    tick_count: u64,
    run_started_at: Duration,
    last_tick_at: Duration,
    pause: Option<PauseConfig>,
    metrics: MetricsAccumulator,
    metrics_handle: MetricsHandle,
    last_run_summary: Option<LoopRunSummary>,
    control_tx: Sender<ControlRequest>,
    control_rx: Receiver<ControlRequest>,
}

impl LoopScheduler<MonotonicClock> {
    pub fn new(callbacks: LoopCallbacks, config: LoopConfig) -> Self {
        Self::with_clock(callbacks, config, MonotonicClock::new())
    }
}

impl<C: Clock> LoopScheduler<C> {
    pub fn with_clock(callbacks: LoopCallbacks, config: LoopConfig, clock: C) -> Self {
        let target_fps = if is_valid_target_fps(config.target_fps) {
            config.target_fps
        } else {
            DEFAULT_TARGET_FPS
        };
        let (control_tx, control_rx) = mpsc::channel();

        Self {
            clock,
            callbacks,
            logger: LoopLogger::default(),
            probe: PrecisionProbe::new(),
            target_fps,
            nominal_interval: nominal_interval_for(target_fps),
            minimum_precision: None,
            compensating: false,
            state: LoopState::Stopped,
            timer: TickTimer::new(),
            tick_count: 0,
            run_started_at: Duration::ZERO,
            last_tick_at: Duration::ZERO,
            pause: None,
            metrics: MetricsAccumulator::new(non_zero_or(
                config.metrics_log_interval,
                Duration::from_secs(1),
            )),
            metrics_handle: MetricsHandle::default(),
            last_run_summary: None,
            control_tx,
            control_rx,
        }
    }

    pub fn with_probe(mut self, probe: PrecisionProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    /// `None` until [`LoopScheduler::initialize`] has measured the host timer.
    pub fn minimum_precision(&self) -> Option<Duration> {
        self.minimum_precision
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// NaN, infinite, zero and negative rates are ignored.
    pub fn set_target_fps(&mut self, target_fps: f64) {
        if !is_valid_target_fps(target_fps) {
            return;
        }
        self.target_fps = target_fps;
        self.nominal_interval = nominal_interval_for(target_fps);
        if let Some(precision) = self.minimum_precision {
            self.compensating = precision > self.nominal_interval;
        }
    }

    pub fn nominal_interval(&self) -> Duration {
        self.nominal_interval
    }

    pub fn compensating(&self) -> bool {
        self.compensating
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn last_run_summary(&self) -> Option<LoopRunSummary> {
        self.last_run_summary
    }

    pub fn metrics_handle(&self) -> MetricsHandle {
        self.metrics_handle.clone()
    }

    pub fn control_handle(&self) -> LoopHandle {
        LoopHandle {
            sender: self.control_tx.clone(),
        }
    }

    pub fn set_logger(&mut self, sink: impl FnMut(LogLevel, &str) + 'static) {
        let sink: LogSink = Box::new(sink);
        self.logger.set_sink(sink);
    }

    pub fn next_tick_due(&self) -> Option<Duration> {
        self.timer.next_due()
    }

    pub fn initialize(&mut self, on_ready: impl FnOnce()) -> Result<(), LoopError> {
        let mut measured = None;
        if let Err(err) = self
            .probe
            .measure(&self.clock, |elapsed| measured = Some(elapsed))
        {
            return Err(self.report(LoopError::from(err)));
        }

        if let Some(precision) = measured {
            self.minimum_precision = Some(precision);
            self.compensating = precision > self.nominal_interval;
            debug!(
                minimum_precision_ms = duration_ms(precision),
                nominal_interval_ms = duration_ms(self.nominal_interval),
                compensating = self.compensating,
                "loop_calibrated"
            );
        }

        on_ready();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.minimum_precision.is_none() {
            return Err(self.report(LoopError::NotCalibrated));
        }
        if self.callbacks.on_run.is_none() {
            return Err(self.report(LoopError::MissingRunCallback));
        }
        self.apply(LoopEvent::Start)
    }

    pub fn stop(&mut self) -> Result<(), LoopError> {
        self.apply(LoopEvent::Stop)
    }

    pub fn pause(&mut self, config: PauseConfig) -> Result<(), LoopError> {
        let next = self.checked_transition(LoopEvent::Pause)?;
        self.pause = Some(config);
        self.enter(next);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), LoopError> {
        self.apply(LoopEvent::Resume)
    }

    /// Fires the pending tick if it is due. Returns whether a tick ran.
    pub fn poll(&mut self) -> bool {
        self.drain_control_requests();

        let now = self.clock.now();
        if self.timer.take_due(now).is_none() {
            return false;
        }
        self.dispatch_tick(now);
        true
    }

    /// Blocks on the clock until the loop reaches a state that schedules nothing further.
    pub fn run_until_stopped(&mut self) {
        loop {
            self.drain_control_requests();
            let Some(due) = self.timer.next_due() else {
                break;
            };
            let now = self.clock.now();
            if due > now {
                self.clock.sleep(due - now);
            }
            self.poll();
        }
    }

    /// Blocks the calling thread until a [`LoopHandle`] request arrives or `timeout` passes,
    /// then applies it along with anything queued behind it. Returns whether a request arrived.
    ///
    /// Waits on wall time, not on the loop clock: it is meant for idle hosts between runs.
    pub fn wait_for_request(&mut self, timeout: Duration) -> bool {
        match self.control_rx.recv_timeout(timeout) {
            Ok(request) => {
                self.apply_request(request);
                self.drain_control_requests();
                true
            }
            Err(_) => false,
        }
    }

    fn apply(&mut self, event: LoopEvent) -> Result<(), LoopError> {
        let next = self.checked_transition(event)?;
        self.enter(next);
        Ok(())
    }

    fn checked_transition(&mut self, event: LoopEvent) -> Result<LoopState, LoopError> {
        transition(self.state, event).ok_or_else(|| {
            self.report(LoopError::InvalidTransition {
                action: event.action_name(),
                state: self.state,
            })
        })
    }

    fn report(&mut self, err: LoopError) -> LoopError {
        let level = err.level();
        let title = match level {
            LogLevel::Warn => "Warning",
            _ => "Error",
        };
        self.logger.log(level, title, &err);
        err
    }

    fn drain_control_requests(&mut self) {
        let requests: Vec<ControlRequest> = self.control_rx.try_iter().collect();
        for request in requests {
            self.apply_request(request);
        }
    }

    fn apply_request(&mut self, request: ControlRequest) {
        // Wrong-state requests are already logged by the control methods.
        let _ = match request {
            ControlRequest::Stop => self.stop(),
            ControlRequest::Pause { interval } => self.pause(PauseConfig {
                interval,
                on_tick: None,
            }),
            ControlRequest::Resume => self.resume(),
            ControlRequest::ResumeOrStart if self.state == LoopState::Stopped => self.start(),
            ControlRequest::ResumeOrStart => self.resume(),
        };
    }

    fn dispatch_tick(&mut self, now: Duration) {
        if let Some(next) = transition(self.state, LoopEvent::Tick) {
            self.enter(next);
        }

        match TickBody::for_state(self.state) {
            TickBody::Run => self.run_tick(now),
            TickBody::Paused => self.paused_tick(now),
            TickBody::Idle => {}
        }
    }

    fn run_tick(&mut self, now: Duration) {
        let elapsed = self.mark_tick(now);
        let delta = if self.compensating {
            elapsed
        } else {
            self.nominal_interval
        };

        let command = match self.callbacks.on_run.as_mut() {
            Some(on_run) => on_run(TickDelta::from_duration(delta)),
            None => LoopCommand::Continue,
        };
        self.tick_count = self.tick_count.saturating_add(1);
        self.metrics.record_tick(elapsed);
        if let Some(snapshot) = self.metrics.maybe_snapshot(now) {
            self.metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                ticks = self.tick_count,
                "loop_metrics"
            );
        }

        let delay = self.reschedule_delay(elapsed);
        self.timer.arm(self.clock.now(), delay);
        self.apply_command(command);
    }

    /// Paused ticks always re-arm at the pause interval; only the delta follows the
    /// compensation rule.
    fn paused_tick(&mut self, now: Duration) {
        let elapsed = self.mark_tick(now);
        let interval = self.pause_interval();
        let delta = if self.compensating { elapsed } else { interval };

        let command = match self.pause.as_mut().and_then(|pause| pause.on_tick.as_mut()) {
            Some(on_tick) => on_tick(TickDelta::from_duration(delta)),
            None => LoopCommand::Continue,
        };

        self.timer.arm(self.clock.now(), interval);
        self.apply_command(command);
    }

    fn mark_tick(&mut self, now: Duration) -> Duration {
        let elapsed = now.saturating_sub(self.last_tick_at);
        self.last_tick_at = now;
        self.logger
            .log(LogLevel::Debug, "actual_loop_delay_ms", duration_ms(elapsed));
        elapsed
    }

    fn pause_interval(&self) -> Duration {
        self.pause
            .as_ref()
            .and_then(PauseConfig::interval)
            .unwrap_or(self.nominal_interval)
    }

    /// Under-precision hosts re-arm after what actually elapsed, never below what the host
    /// timer can resolve.
    fn reschedule_delay(&self, elapsed: Duration) -> Duration {
        if self.compensating {
            elapsed.max(self.minimum_precision.unwrap_or(Duration::ZERO))
        } else {
            self.nominal_interval
        }
    }

    fn apply_command(&mut self, command: LoopCommand) {
        // Wrong-state commands are already logged by the control methods.
        let _ = match command {
            LoopCommand::Continue => Ok(()),
            LoopCommand::Stop => self.stop(),
            LoopCommand::Pause(config) => self.pause(config),
            LoopCommand::Resume => self.resume(),
        };
    }

    fn enter(&mut self, state: LoopState) {
        self.state = state;
        if let Some(callback) = self.callbacks.state_callback(state) {
            callback(state);
        }

        match state {
            LoopState::Starting => self.on_starting(),
            LoopState::Stopping => self.on_stopping(),
            LoopState::Stopped => self.on_stopped(),
            LoopState::Resuming => self.on_resuming(),
            LoopState::Running | LoopState::Pausing | LoopState::Paused => {}
        }
    }

    fn on_starting(&mut self) {
        if self.compensating {
            self.logger.log(
                LogLevel::Warn,
                "Warning",
                "minimum timer precision is coarser than the target loop interval; \
using actual elapsed time",
            );
        }
        let precision_ms = self.minimum_precision.map(duration_ms).unwrap_or(-1.0);
        self.logger
            .log(LogLevel::Info, "minimum_precision_ms", precision_ms);
        self.logger
            .log(LogLevel::Info, "compensating", self.compensating);
        self.logger.log(LogLevel::Info, "target_fps", self.target_fps);
        self.logger.log(
            LogLevel::Info,
            "target_loop_delay_ms",
            duration_ms(self.nominal_interval),
        );

        let now = self.clock.now();
        self.tick_count = 0;
        self.run_started_at = now;
        self.last_tick_at = now;
        self.last_run_summary = None;
        self.metrics.reset(now);
        self.timer.arm(now, Duration::ZERO);
    }

    fn on_stopping(&mut self) {
        // The in-flight tick is dropped; a fresh zero-delay tick only settles the stop.
        self.timer.cancel();
        self.timer.arm(self.clock.now(), Duration::ZERO);
    }

    fn on_stopped(&mut self) {
        self.timer.cancel();
        self.pause = None;

        let now = self.clock.now();
        let summary = LoopRunSummary::new(self.tick_count, now.saturating_sub(self.run_started_at));
        self.logger
            .log(LogLevel::Info, "total_updates", summary.total_ticks);
        self.logger
            .log(LogLevel::Info, "average_fps", summary.average_tps);
        self.logger.log(
            LogLevel::Info,
            "fin",
            format!("{} ms", duration_ms(summary.elapsed)),
        );
        self.last_run_summary = Some(summary);
    }

    fn on_resuming(&mut self) {
        let now = self.clock.now();
        self.last_tick_at = now;
        self.timer.arm(now, Duration::ZERO);
    }
}

impl<C: Clock> fmt::Debug for LoopScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopScheduler")
            .field("state", &self.state)
            .field("target_fps", &self.target_fps)
            .field("nominal_interval", &self.nominal_interval)
            .field("minimum_precision", &self.minimum_precision)
            .field("compensating", &self.compensating)
            .field("tick_count", &self.tick_count)
            .field("pending", &self.timer.pending())
            .finish()
    }
}

pub fn nominal_interval_for(target_fps: f64) -> Duration {
    Duration::from_millis((1000.0 / target_fps).ceil() as u64)
}

fn is_valid_target_fps(target_fps: f64) -> bool {
    target_fps.is_finite() && target_fps > 0.0
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
