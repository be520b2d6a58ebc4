mod clock;
mod input;
mod log;
mod loop_runner;
mod loop_state;
mod metrics;
mod probe;
mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock, MANUAL_CLOCK_DEFAULT_RESOLUTION};
pub use input::{ActionStates, InputAction};
pub use log::{without_debug, LogLevel, LogSink};
pub use loop_runner::{
    nominal_interval_for, LoopCallbacks, LoopCommand, LoopConfig, LoopError, LoopHandle,
    LoopScheduler, PauseConfig, StateCallback, TickCallback, TickDelta, DEFAULT_TARGET_FPS,
};
pub use loop_state::{transition, LoopEvent, LoopState, TickBody};
pub use metrics::{LoopMetricsSnapshot, LoopRunSummary, MetricsHandle};
pub use probe::{PrecisionProbe, ProbeError, MAX_PROBE_SAMPLES};
pub use timer::{ScheduledTick, TickHandle, TickTimer};
