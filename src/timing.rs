//! Timing function evaluation.
//!
//! Pure numeric routines shared by transitions and keyframe animations:
//! cubic-bezier root solving and step functions. Stateless; callers hand
//! in a normalized time and get an eased progress value back. Bezier
//! output is not guaranteed to stay inside `[0, 1]` for overshooting
//! curves, so consumers that need clamping do it themselves.

const NEWTON_METHOD_ITERATIONS: u32 = 8;

/// A CSS timing function in computed form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingFunction {
  /// Identity easing.
  Linear,
  /// `cubic-bezier(x1, y1, x2, y2)` with the two interior control points.
  CubicBezier(f64, f64, f64, f64),
  /// `steps(n, <position>)`; `jump_at_start` is true for `steps(n, start)`.
  Steps {
    /// Number of equal-length intervals.
    steps: u32,
    /// Whether the step change happens at the start of each interval.
    jump_at_start: bool,
  },
}

impl TimingFunction {
  /// The `ease` keyword.
  pub const EASE: TimingFunction = TimingFunction::CubicBezier(0.25, 0.1, 0.25, 1.0);
  /// The `ease-in` keyword.
  pub const EASE_IN: TimingFunction = TimingFunction::CubicBezier(0.42, 0.0, 1.0, 1.0);
  /// The `ease-out` keyword.
  pub const EASE_OUT: TimingFunction = TimingFunction::CubicBezier(0.0, 0.0, 0.58, 1.0);
  /// The `ease-in-out` keyword.
  pub const EASE_IN_OUT: TimingFunction = TimingFunction::CubicBezier(0.42, 0.0, 0.58, 1.0);

  /// Evaluates the timing function at normalized time `t`.
  ///
  /// `duration` is the total duration of the animation interval in
  /// seconds and controls bezier root-solving precision: long animations
  /// get proportionally finer epsilon. Out-of-range `t` is tolerated and
  /// clamped before solving.
  pub fn evaluate(&self, t: f64, duration: f64) -> f64 {
    match *self {
      TimingFunction::Linear => t,
      TimingFunction::CubicBezier(x1, y1, x2, y2) => {
        let t = t.clamp(0.0, 1.0);
        Bezier::new(x1, y1, x2, y2).solve(t, solve_epsilon(duration))
      }
      TimingFunction::Steps {
        steps,
        jump_at_start,
      } => {
        let t = t.clamp(0.0, 1.0);
        solve_steps(steps, jump_at_start, t)
      }
    }
  }
}

impl Default for TimingFunction {
  fn default() -> Self {
    TimingFunction::EASE
  }
}

/// Epsilon for bezier root solving, derived from the animation duration
/// so longer animations solve to proportionally finer precision.
pub fn solve_epsilon(duration: f64) -> f64 {
  if duration > 0.0 {
    1.0 / (200.0 * duration)
  } else {
    1.0 / 200.0
  }
}

fn solve_steps(steps: u32, jump_at_start: bool, t: f64) -> f64 {
  let steps = steps.max(1) as f64;
  if jump_at_start {
    ((steps * t).floor() + 1.0).min(steps) / steps
  } else {
    (steps * t).floor() / steps
  }
}

/// A unit cubic bezier curve anchored at (0, 0) and (1, 1).
///
/// X is time, Y is progress. Coefficients are precomputed from the two
/// interior control points; solving runs Newton's method and falls back
/// to bisection when the derivative flattens out.
#[derive(Debug, Clone, Copy)]
pub struct Bezier {
  ax: f64,
  bx: f64,
  cx: f64,
  ay: f64,
  by: f64,
  cy: f64,
}

impl Bezier {
  /// Builds the curve from the two interior control points.
  pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Bezier {
    let cx = 3.0 * x1;
    let bx = 3.0 * (x2 - x1) - cx;
    let cy = 3.0 * y1;
    let by = 3.0 * (y2 - y1) - cy;
    Bezier {
      ax: 1.0 - cx - bx,
      bx,
      cx,
      ay: 1.0 - cy - by,
      by,
      cy,
    }
  }

  fn sample_x(&self, t: f64) -> f64 {
    ((self.ax * t + self.bx) * t + self.cx) * t
  }

  fn sample_y(&self, t: f64) -> f64 {
    ((self.ay * t + self.by) * t + self.cy) * t
  }

  fn sample_derivative_x(&self, t: f64) -> f64 {
    (3.0 * self.ax * t + 2.0 * self.bx) * t + self.cx
  }

  fn solve_x(&self, x: f64, epsilon: f64) -> f64 {
    // Fast path: Newton's method.
    let mut t = x;
    for _ in 0..NEWTON_METHOD_ITERATIONS {
      let x2 = self.sample_x(t);
      if (x2 - x).abs() < epsilon {
        return t;
      }
      let dx = self.sample_derivative_x(t);
      if dx.abs() < 1e-6 {
        break;
      }
      t -= (x2 - x) / dx;
    }

    // Slow path: bisection.
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    let mut t = x;
    if t < lo {
      return lo;
    }
    if t > hi {
      return hi;
    }
    while lo < hi {
      let x2 = self.sample_x(t);
      if (x2 - x).abs() < epsilon {
        return t;
      }
      if x > x2 {
        lo = t;
      } else {
        hi = t;
      }
      t = (hi - lo) / 2.0 + lo;
    }
    t
  }

  /// Solves the curve for a given `x` with precision `epsilon`.
  pub fn solve(&self, x: f64, epsilon: f64) -> f64 {
    self.sample_y(self.solve_x(x, epsilon))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn linear_is_identity() {
    for &t in &[0.0, 0.25, 0.5, 0.75, 1.0] {
      assert_eq!(TimingFunction::Linear.evaluate(t, 1.0), t);
    }
  }

  #[test]
  fn bezier_hits_endpoints() {
    let tf = TimingFunction::EASE_IN_OUT;
    assert!(tf.evaluate(0.0, 1.0).abs() < 1e-6);
    assert!((tf.evaluate(1.0, 1.0) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn ease_is_fast_in_the_middle() {
    let mid = TimingFunction::EASE.evaluate(0.5, 1.0);
    assert!(mid > 0.5 && mid < 0.95, "got {mid}");
  }

  #[test]
  fn symmetric_curve_is_symmetric() {
    let tf = TimingFunction::EASE_IN_OUT;
    let a = tf.evaluate(0.25, 1.0);
    let b = tf.evaluate(0.75, 1.0);
    assert!((a + b - 1.0).abs() < 1e-3, "a={a} b={b}");
  }

  #[test]
  fn longer_durations_solve_tighter() {
    // The identity-shaped bezier should converge to linear as epsilon
    // shrinks with duration.
    let tf = TimingFunction::CubicBezier(0.0, 0.0, 1.0, 1.0);
    let coarse = (tf.evaluate(0.3, 0.01) - 0.3).abs();
    let fine = (tf.evaluate(0.3, 100.0) - 0.3).abs();
    assert!(fine <= coarse + 1e-9);
    assert!(fine < 1e-4);
  }

  #[test]
  fn steps_end_floor() {
    let tf = TimingFunction::Steps {
      steps: 4,
      jump_at_start: false,
    };
    assert_eq!(tf.evaluate(0.0, 1.0), 0.0);
    assert_eq!(tf.evaluate(0.24, 1.0), 0.0);
    assert_eq!(tf.evaluate(0.5, 1.0), 0.5);
    assert_eq!(tf.evaluate(0.99, 1.0), 0.75);
    assert_eq!(tf.evaluate(1.0, 1.0), 1.0);
  }

  #[test]
  fn steps_start_jumps_immediately() {
    let tf = TimingFunction::Steps {
      steps: 4,
      jump_at_start: true,
    };
    assert_eq!(tf.evaluate(0.0, 1.0), 0.25);
    assert_eq!(tf.evaluate(0.26, 1.0), 0.5);
    assert_eq!(tf.evaluate(1.0, 1.0), 1.0);
  }

  #[test]
  fn out_of_range_input_is_clamped() {
    let tf = TimingFunction::EASE;
    assert_eq!(tf.evaluate(-0.5, 1.0), tf.evaluate(0.0, 1.0));
    assert_eq!(tf.evaluate(1.5, 1.0), tf.evaluate(1.0, 1.0));
  }
}
