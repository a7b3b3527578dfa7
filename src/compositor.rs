//! Compositor integration.
//!
//! Accelerated animations (opacity, transform) can run on a compositor
//! thread or process. The engine talks to it through a narrow outbound
//! trait; the inbound half is the embedder routing the compositor's
//! "animation started at T" notification back into
//! `AnimationController::received_start_time_response`.

use crate::animation::TargetId;
use crate::blend::PropertyId;

/// Outbound interface to an accelerated-animation backend.
///
/// All calls are fire-and-forget except [`start_animation`], whose
/// return value tells the caller whether a start-time notification will
/// arrive asynchronously (true) or whether the engine should use its
/// own update timestamp as the start time (false).
pub trait CompositorBackend {
  /// Asks the compositor to run the animation on `property` of `target`,
  /// beginning `time_offset` seconds into the animation.
  ///
  /// Returns true when the compositor accepted the animation and will
  /// report the actual start time later.
  fn start_animation(&mut self, target: TargetId, property: PropertyId, time_offset: f64) -> bool;

  /// Freezes an accelerated animation at `time_offset` seconds in.
  fn pause_animation(&mut self, target: TargetId, property: PropertyId, time_offset: f64);

  /// Removes an accelerated animation from the compositor.
  fn end_animation(&mut self, target: TargetId, property: PropertyId);
}

/// Backend for embedders without a compositor. Never accepts an
/// animation, so everything runs in software and start times come from
/// the update clock synchronously.
#[derive(Debug, Default)]
pub struct NullCompositor;

impl CompositorBackend for NullCompositor {
  fn start_animation(&mut self, _target: TargetId, _property: PropertyId, _time_offset: f64) -> bool {
    false
  }

  fn pause_animation(&mut self, _target: TargetId, _property: PropertyId, _time_offset: f64) {}

  fn end_animation(&mut self, _target: TargetId, _property: PropertyId) {}
}
