// TiltKey — Event Flags
//
// The only state shared between the monitor and the validator.  Bits persist
// until a matching wait consumes them; setting an already-set bit is a no-op.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bitflags::bitflags;

bitflags! {
    /// Orientation events published by the monitor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlags: u32 {
        /// Device entered FLAT (face up).
        const FLAT   = 1 << 1;
        /// Device left a non-intermediate orientation.
        const CHANGE = 1 << 2;
        /// Device entered RIGHT.
        const RIGHT  = 1 << 3;
        /// Device entered UP.
        const UP     = 1 << 5;
    }
}

/// How long a flag wait may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Forever,
    Millis(u32),
}

/// A bounded wait expired without any requested bit becoming set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out waiting for {0:?}")]
pub struct WaitTimeout(pub EventFlags);

/// Consumer side of the event channel.
pub trait EventSource {
    /// Block until any bit of `mask` is set, then clear and return the matched
    /// bits.  A timeout consumes nothing.
    fn wait_any(&self, mask: EventFlags, timeout: Timeout) -> Result<EventFlags, WaitTimeout>;
}

impl<T: EventSource + ?Sized> EventSource for &T {
    fn wait_any(&self, mask: EventFlags, timeout: Timeout) -> Result<EventFlags, WaitTimeout> {
        (**self).wait_any(mask, timeout)
    }
}

impl<T: EventSource + ?Sized> EventSource for std::sync::Arc<T> {
    fn wait_any(&self, mask: EventFlags, timeout: Timeout) -> Result<EventFlags, WaitTimeout> {
        (**self).wait_any(mask, timeout)
    }
}

/// Mutex-guarded bitmask with a condition variable for waiters.
#[derive(Debug)]
pub struct EventFlagSet {
    bits: Mutex<EventFlags>,
    changed: Condvar,
}

impl EventFlagSet {
    pub fn new() -> Self {
        Self {
            bits: Mutex::new(EventFlags::empty()),
            changed: Condvar::new(),
        }
    }

    /// OR `flags` into the set and wake any waiter.
    pub fn set(&self, flags: EventFlags) {
        let mut bits = self.lock();
        bits.insert(flags);
        drop(bits);
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, EventFlags> {
        // The guarded value is a plain bitmask and is never left half-written.
        self.bits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_matching(bits: &mut EventFlags, mask: EventFlags) -> Option<EventFlags> {
        let matched = *bits & mask;
        if matched.is_empty() {
            None
        } else {
            bits.remove(matched);
            Some(matched)
        }
    }
}

impl Default for EventFlagSet {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EventFlagSet {
    fn wait_any(&self, mask: EventFlags, timeout: Timeout) -> Result<EventFlags, WaitTimeout> {
        let deadline = match timeout {
            Timeout::Forever => None,
            Timeout::Millis(ms) => Some(Instant::now() + Duration::from_millis(u64::from(ms))),
        };

        let mut bits = self.lock();
        loop {
            if let Some(matched) = Self::take_matching(&mut bits, mask) {
                return Ok(matched);
            }

            bits = match deadline {
                None => self
                    .changed
                    .wait(bits)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(WaitTimeout(mask));
                    }
                    self.changed
                        .wait_timeout(bits, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}
