use core::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

/// Gates a repeating diagnostic so it is emitted at most once per interval.
///
/// Events arriving while the gate is closed are counted, and the count is handed back the next
/// time the gate opens so the message can report how many were folded into it.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    last_emitted: Option<Instant>,
    suppressed: u64,
}

impl RateLimiter {
    /// Create a limiter that opens at most once per `interval`.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(State {
                last_emitted: None,
                suppressed: 0,
            }),
        }
    }

    /// Record an event at the current time.
    ///
    /// Returns `Some(suppressed)` if the caller should emit its message, where `suppressed` is the
    /// number of events swallowed since the last emission.
    pub fn check(&self) -> Option<u64> {
        self.check_at(Instant::now())
    }

    /// Record an event at `now`, see [`RateLimiter::check`].
    pub fn check_at(&self, now: Instant) -> Option<u64> {
        let mut state = self.state.lock();

        let open = match state.last_emitted {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };

        if open {
            state.last_emitted = Some(now);
            Some(core::mem::take(&mut state.suppressed))
        } else {
            state.suppressed += 1;
            None
        }
    }

    /// The minimum time between two emissions.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
