pub mod app;
pub mod physics;

pub use app::{
    nominal_interval_for, transition, without_debug, ActionStates, Clock, InputAction,
    LogLevel, LogSink, LoopCallbacks, LoopCommand, LoopConfig, LoopError, LoopEvent, LoopHandle,
    LoopMetricsSnapshot, LoopRunSummary, LoopScheduler, LoopState, ManualClock, MetricsHandle,
    MonotonicClock, PauseConfig, PrecisionProbe, ProbeError, ScheduledTick, StateCallback,
    TickBody, TickCallback, TickDelta, TickHandle, TickTimer, DEFAULT_TARGET_FPS,
    MANUAL_CLOCK_DEFAULT_RESOLUTION, MAX_PROBE_SAMPLES,
};
pub use physics::{
    Anchor, Body, BodyConfig, Contact, LandingReport, Surface, SurfaceDef, SurfaceSet, Vector2,
    WorldFrame, DEFAULT_BOARD_WIDTH, DEFAULT_SURFACE_HEIGHT, MAX_HEALTH, MAX_JUMPS,
    RESTING_TOLERANCE,
};
