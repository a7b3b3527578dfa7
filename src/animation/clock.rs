//! Time sources.
//!
//! The controller never reads the OS clock directly; it samples an
//! injected [`Clock`] once per update pass and freezes that reading so
//! every animation serviced in the pass sees the same instant.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic source of seconds.
pub trait Clock {
  /// Current time in seconds. Must never go backwards.
  fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`].
pub struct MonotonicClock {
  epoch: Instant,
}

impl MonotonicClock {
  pub fn new() -> MonotonicClock {
    MonotonicClock {
      epoch: Instant::now(),
    }
  }
}

impl Default for MonotonicClock {
  fn default() -> Self {
    MonotonicClock::new()
  }
}

impl Clock for MonotonicClock {
  fn now(&self) -> f64 {
    self.epoch.elapsed().as_secs_f64()
  }
}

/// Hand-cranked clock for tests and deterministic replay.
///
/// Cloning shares the underlying time cell, so a copy handed to the
/// controller can still be advanced from the test body.
#[derive(Clone, Default)]
pub struct ManualClock {
  now: Rc<Cell<f64>>,
}

impl ManualClock {
  pub fn new() -> ManualClock {
    ManualClock::default()
  }

  /// Moves time forward by `seconds`.
  pub fn advance(&self, seconds: f64) {
    assert!(seconds >= 0.0, "clock cannot go backwards");
    self.now.set(self.now.get() + seconds);
  }

  /// Jumps to an absolute time, which must not be in the past.
  pub fn set(&self, seconds: f64) {
    assert!(seconds >= self.now.get(), "clock cannot go backwards");
    self.now.set(seconds);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> f64 {
    self.now.get()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn manual_clock_shares_state_across_clones() {
    let clock = ManualClock::new();
    let other = clock.clone();
    clock.advance(1.5);
    assert_eq!(other.now(), 1.5);
    other.set(2.0);
    assert_eq!(clock.now(), 2.0);
  }

  #[test]
  fn monotonic_clock_moves_forward() {
    let clock = MonotonicClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
  }
}
