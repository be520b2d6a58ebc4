use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

pub const MANUAL_CLOCK_DEFAULT_RESOLUTION: Duration = Duration::from_millis(1);

/// Monotonic time source plus the host's minimal timer primitive.
///
/// `now` is measured from the clock's own origin, so two clocks are never comparable.
pub trait Clock {
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        Instant::now().saturating_duration_since(self.origin)
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Shared hand-driven clock. Clones observe the same time.
///
/// `sleep` never advances by less than the configured resolution, which is how a coarse
/// host timer is simulated.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    resolution: Duration,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::with_resolution(MANUAL_CLOCK_DEFAULT_RESOLUTION)
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(resolution: Duration) -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            resolution,
        }
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get().saturating_add(duration));
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.max(self.resolution));
    }
}
