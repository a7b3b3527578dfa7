//! Error types for fastmotion
//!
//! Errors only exist at the public API boundary (test hooks, keyframe
//! registration lookups). The engine itself has no recoverable failure
//! paths: degenerate animation descriptors are policy-filtered when
//! composites refresh, and internal invariant violations are programmer
//! errors guarded by assertions.
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use crate::animation::TargetId;
use thiserror::Error;

/// Result type alias for fastmotion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for fastmotion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
  /// No composite animation exists for the target.
  #[error("target {0:?} has no running animations")]
  TargetNotAnimating(TargetId),

  /// No keyframe animation with the given name is running on the target.
  #[error("no keyframe animation named {0:?} is running")]
  UnknownAnimation(String),

  /// No transition for the given property is running on the target.
  #[error("no transition for property {0:?} is running")]
  UnknownTransition(&'static str),

  /// A freeze time outside the animation's active interval.
  #[error("cannot freeze at {time}s: outside the active duration")]
  InvalidFreezeTime {
    /// The requested freeze time in seconds.
    time: f64,
  },

  /// A keyframe set referenced by name was never registered.
  #[error("keyframe set {0:?} is not registered")]
  UnknownKeyframeSet(String),
}
