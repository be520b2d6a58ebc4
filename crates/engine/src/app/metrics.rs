use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    pub tick_time_ms: f32,
}

/// Read side for hosts that want live tick rates without touching the scheduler.
#[derive(Clone, Debug)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl Default for MetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(LoopMetricsSnapshot::default())),
        }
    }
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

/// Totals for one start-to-stop run, paused time included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRunSummary {
    pub total_ticks: u64,
    pub elapsed: Duration,
    pub average_tps: f64,
}

impl LoopRunSummary {
    pub fn new(total_ticks: u64, elapsed: Duration) -> Self {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let average_tps = if total_ticks == 0 || elapsed_ms <= 0.0 {
            0.0
        } else {
            1000.0 / (elapsed_ms / total_ticks as f64)
        };

        Self {
            total_ticks,
            elapsed,
            average_tps,
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Duration,
    interval: Duration,
    ticks: u32,
    tick_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval_start: Duration::ZERO,
            interval,
            ticks: 0,
            tick_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn reset(&mut self, now: Duration) {
        self.interval_start = now;
        self.ticks = 0;
        self.tick_time_sum = Duration::ZERO;
    }

    pub(crate) fn record_tick(&mut self, tick_dt: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.tick_time_sum = self.tick_time_sum.saturating_add(tick_dt);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Duration) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_sub(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let tick_time_ms = if self.ticks == 0 {
            0.0
        } else {
            (self.tick_time_sum.as_secs_f32() / self.ticks as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / elapsed_seconds,
            tick_time_ms,
        };

        self.reset(now);

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<LoopMetricsSnapshot>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn snapshot_computes_expected_values() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.reset(Duration::from_secs(5));

        for _ in 0..4 {
            accumulator.record_tick(Duration::from_millis(17));
        }

        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(6))
            .expect("snapshot should be emitted");

        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.tick_time_ms - 17.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_tick(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn run_summary_average_rate() {
        let summary = LoopRunSummary::new(120, Duration::from_secs(2));
        assert!((summary.average_tps - 60.0).abs() < 1e-9);
    }

    #[test]
    fn run_summary_without_ticks_reports_zero_rate() {
        let summary = LoopRunSummary::new(0, Duration::from_millis(3));
        assert_eq!(summary.average_tps, 0.0);
    }

    #[test]
    fn snapshot_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.tps, 0.0);
        assert_eq!(snapshot.tick_time_ms, 0.0);
    }

    #[test]
    fn publish_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let expected = LoopMetricsSnapshot {
            tps: 58.5,
            tick_time_ms: 17.1,
        };
        handle.publish(expected);

        assert_eq!(handle.snapshot(), expected);
    }
}
