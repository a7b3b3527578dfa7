//! Deferred animation events.
//!
//! Instances never deliver events while an update pass is running;
//! they queue them on the controller, which hands the batch to the
//! embedder after the pass so event handlers observe a consistent
//! style world.

use crate::animation::TargetId;

/// The DOM event an animation wants dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEventKind {
  /// `animationstart`
  AnimationStart,
  /// `animationiteration`
  AnimationIteration,
  /// `animationend`
  AnimationEnd,
  /// `transitionend`
  TransitionEnd,
}

/// One queued event.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEvent {
  pub target: TargetId,
  pub kind: AnimationEventKind,
  /// The `animation-name`, or the transitioned property's CSS name.
  pub name: String,
  /// Seconds of animation time at the event, excluding delay.
  pub elapsed_time: f64,
}
