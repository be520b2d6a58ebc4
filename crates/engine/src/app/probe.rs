use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use super::clock::Clock;

pub const MAX_PROBE_SAMPLES: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("clock did not advance after {samples} minimal-interval sleeps")]
    ClockNotAdvancing { samples: u32 },
}

/// One-shot estimate of the finest timer granularity the host can deliver.
///
/// Takes a single sample: the first non-zero elapsed time after repeatedly asking the clock
/// for a zero-length sleep. Treat the result as a lower bound, not an average.
#[derive(Debug, Clone, Copy)]
pub struct PrecisionProbe {
    max_samples: u32,
}

impl Default for PrecisionProbe {
    fn default() -> Self {
        Self {
            max_samples: MAX_PROBE_SAMPLES,
        }
    }
}

impl PrecisionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_samples(max_samples: u32) -> Self {
        Self {
            max_samples: max_samples.max(1),
        }
    }

    pub fn measure<C, F>(&self, clock: &C, on_measured: F) -> Result<(), ProbeError>
    where
        C: Clock + ?Sized,
        F: FnOnce(Duration),
    {
        let start = clock.now();
        for sample in 1..=self.max_samples {
            clock.sleep(Duration::ZERO);
            let elapsed = clock.now().saturating_sub(start);
            if !elapsed.is_zero() {
                debug!(
                    samples = sample,
                    precision_ms = elapsed.as_secs_f64() * 1000.0,
                    "precision_probe_done"
                );
                on_measured(elapsed);
                return Ok(());
            }
        }

        Err(ProbeError::ClockNotAdvancing {
            samples: self.max_samples,
        })
    }
}
