//! Tick sources for the session timers.
//!
//! A clock reports how many whole one-second ticks have passed since it
//! was last polled. The session driver applies that many ticks, so the
//! elapsed and rest timers advance cooperatively on a single thread.

use std::time::{Duration, Instant};

/// Source of one-second ticks
pub trait Clock {
    /// Number of ticks elapsed since the previous call
    fn poll_ticks(&mut self) -> u32;
}

/// Wall-clock ticks; fractional seconds carry over between polls
#[derive(Debug)]
pub struct SystemClock {
    last: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn poll_ticks(&mut self) -> u32 {
        let elapsed = self.last.elapsed();
        let ticks = elapsed.as_secs();
        // keep the sub-second remainder for the next poll
        self.last += Duration::from_secs(ticks);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

/// Synthetic clock advanced explicitly, for tests and scripted runs
#[derive(Debug, Default)]
pub struct ManualClock {
    pending: u32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `seconds` ticks for the next poll
    pub fn advance(&mut self, seconds: u32) {
        self.pending = self.pending.saturating_add(seconds);
    }
}

impl Clock for ManualClock {
    fn poll_ticks(&mut self) -> u32 {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_drains_pending() {
        let mut clock = ManualClock::new();
        assert_eq!(clock.poll_ticks(), 0);

        clock.advance(3);
        clock.advance(2);
        assert_eq!(clock.poll_ticks(), 5);
        assert_eq!(clock.poll_ticks(), 0);
    }

    #[test]
    fn test_system_clock_no_ticks_immediately() {
        let mut clock = SystemClock::new();
        assert_eq!(clock.poll_ticks(), 0);
    }
}
