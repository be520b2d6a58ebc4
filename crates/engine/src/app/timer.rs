use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTick {
    pub handle: TickHandle,
    pub due: Duration,
}

/// One-shot tick slot. Re-arming replaces whatever was pending, so at most one tick is ever
/// outstanding and a cancelled tick can never fire.
#[derive(Debug, Default)]
pub struct TickTimer {
    pending: Option<ScheduledTick>,
    next_handle: u64,
}

impl TickTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now: Duration, delay: Duration) -> TickHandle {
        let handle = TickHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.pending = Some(ScheduledTick {
            handle,
            due: now.saturating_add(delay),
        });
        handle
    }

    pub fn cancel(&mut self) -> Option<TickHandle> {
        self.pending.take().map(|tick| tick.handle)
    }

    pub fn pending(&self) -> Option<ScheduledTick> {
        self.pending
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.pending.map(|tick| tick.due)
    }

    /// Pops the pending tick if its deadline has passed.
    pub fn take_due(&mut self, now: Duration) -> Option<TickHandle> {
        match self.pending {
            Some(tick) if tick.due <= now => {
                self.pending = None;
                Some(tick.handle)
            }
            _ => None,
        }
    }
}
