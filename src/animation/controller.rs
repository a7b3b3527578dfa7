//! The document-scope animation controller.
//!
//! Owns the target→composite registry, the frozen per-pass clock, the
//! waiting sets of the start-time synchronization barrier, the timer
//! schedule and the deferred event/invalidation queues.
//!
//! The controller does not own an OS timer; it exposes its scheduling
//! decision as [`TimerSchedule`] data and the embedder arms a real
//! timer, calling [`AnimationController::animation_timer_fired`] when
//! it fires. Likewise events and style invalidations are queued and
//! drained by the embedder once per pass, so event handlers never
//! observe a half-updated style world.

use crate::animation::clock::{Clock, MonotonicClock};
use crate::animation::composite::CompositeAnimation;
use crate::animation::machine::{InstanceHandle, OverrideRequest};
use crate::animation::{KeyframeList, TargetId};
use crate::blend::PropertyId;
use crate::compositor::{CompositorBackend, NullCompositor};
use crate::error::{Error, Result};
use crate::events::AnimationEvent;
use crate::style::AnimatedStyle;
use log::debug;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Registered `@keyframes` sets, by name.
pub type KeyframeRegistry = FxHashMap<Arc<str>, Arc<KeyframeList>>;

/// Interval of the amortizing repeating timer, in seconds.
const REPEATING_TIMER_INTERVAL: f64 = 0.025;

/// What the embedder's timer should be doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerSchedule {
  /// No animation needs servicing.
  Inactive,
  /// Fire once this many seconds from now.
  OneShot(f64),
  /// Something needs immediate service every frame; fire repeatedly at
  /// this interval to amortize the cost.
  Repeating(f64),
}

/// Controller state shared with every machine during dispatch.
///
/// Split out from the composite registry so a composite can hand
/// `&mut ControllerShared` down to its instances while it is itself
/// mutably borrowed.
pub struct ControllerShared {
  clock: Box<dyn Clock>,
  pub compositor: Box<dyn CompositorBackend>,
  /// The frozen begin-animation-update time, when a pass is open.
  frozen_time: Option<f64>,
  waiting_for_style: Vec<InstanceHandle>,
  waiting_for_response: Vec<InstanceHandle>,
  /// Whether any current response-waiter expects an asynchronous
  /// compositor notification; while true the barrier must not release.
  waiting_for_async_notification: bool,
  events: Vec<AnimationEvent>,
  dirty_targets: Vec<TargetId>,
  override_requests: Vec<OverrideRequest>,
  suspended: bool,
}

impl ControllerShared {
  pub(crate) fn new(
    clock: Box<dyn Clock>,
    compositor: Box<dyn CompositorBackend>,
  ) -> ControllerShared {
    ControllerShared {
      clock,
      compositor,
      frozen_time: None,
      waiting_for_style: Vec::new(),
      waiting_for_response: Vec::new(),
      waiting_for_async_notification: false,
      events: Vec::new(),
      dirty_targets: Vec::new(),
      override_requests: Vec::new(),
      suspended: false,
    }
  }

  /// The frozen logical time of the current update pass. The first
  /// caller of a pass pays for the clock read; everyone else in the
  /// same pass observes the identical value, which is what gives every
  /// animation started in one pass the same start time.
  pub fn begin_animation_update_time(&mut self) -> f64 {
    if self.frozen_time.is_none() {
      self.frozen_time = Some(self.clock.now());
    }
    self.frozen_time.unwrap()
  }

  fn invalidate_frozen_time(&mut self) {
    self.frozen_time = None;
  }

  pub fn is_suspended(&self) -> bool {
    self.suspended
  }

  /// Asks for a fresh style pass on `target`.
  pub fn mark_dirty(&mut self, target: TargetId) {
    if !self.dirty_targets.contains(&target) {
      self.dirty_targets.push(target);
    }
  }

  pub fn queue_event(&mut self, event: AnimationEvent) {
    self.events.push(event);
  }

  pub fn push_override_request(&mut self, request: OverrideRequest) {
    self.override_requests.push(request);
  }

  pub fn take_override_requests(&mut self) -> Vec<OverrideRequest> {
    std::mem::take(&mut self.override_requests)
  }

  pub fn add_animation_waiting_for_style(&mut self, handle: InstanceHandle) {
    if !self.waiting_for_style.contains(&handle) {
      self.waiting_for_style.push(handle);
    }
  }

  pub fn remove_animation_waiting_for_style(&mut self, handle: &InstanceHandle) {
    self.waiting_for_style.retain(|h| h != handle);
  }

  pub fn add_animation_waiting_for_start_response(
    &mut self,
    handle: InstanceHandle,
    will_get_response: bool,
  ) {
    if will_get_response {
      self.waiting_for_async_notification = true;
    }
    if !self.waiting_for_response.contains(&handle) {
      self.waiting_for_response.push(handle);
    }
  }

  pub fn remove_animation_waiting_for_start_response(&mut self, handle: &InstanceHandle) {
    self.waiting_for_response.retain(|h| h != handle);
    if self.waiting_for_response.is_empty() {
      self.waiting_for_async_notification = false;
    }
  }

  fn purge_target(&mut self, target: TargetId) {
    self.waiting_for_style.retain(|(t, _)| *t != target);
    self.waiting_for_response.retain(|(t, _)| *t != target);
    if self.waiting_for_response.is_empty() {
      self.waiting_for_async_notification = false;
    }
    self.dirty_targets.retain(|t| *t != target);
  }
}

/// The per-document animation controller.
pub struct AnimationController {
  shared: ControllerShared,
  composites: FxHashMap<TargetId, CompositeAnimation>,
  registry: KeyframeRegistry,
  timer: TimerSchedule,
}

impl AnimationController {
  /// A controller on the wall clock with no compositor.
  pub fn new() -> AnimationController {
    AnimationController::with_collaborators(
      Box::new(MonotonicClock::new()),
      Box::new(NullCompositor),
    )
  }

  /// A controller with explicit collaborators (tests inject a manual
  /// clock and a recording compositor here).
  pub fn with_collaborators(
    clock: Box<dyn Clock>,
    compositor: Box<dyn CompositorBackend>,
  ) -> AnimationController {
    AnimationController {
      shared: ControllerShared::new(clock, compositor),
      composites: FxHashMap::default(),
      registry: KeyframeRegistry::default(),
      timer: TimerSchedule::Inactive,
    }
  }

  /// Registers a `@keyframes` set. Later registrations under the same
  /// name replace earlier ones; running instances keep the list they
  /// started with.
  pub fn register_keyframes(&mut self, keyframes: KeyframeList) {
    self
      .registry
      .insert(keyframes.name().clone(), Arc::new(keyframes));
  }

  pub fn keyframes(&self, name: &str) -> Result<&Arc<KeyframeList>> {
    self
      .registry
      .get(name)
      .ok_or_else(|| Error::UnknownKeyframeSet(name.to_string()))
  }

  /// Opens an update pass explicitly. Optional: the first clock read of
  /// a pass opens one implicitly.
  pub fn begin_animation_update(&mut self) {
    self.shared.begin_animation_update_time();
  }

  /// The style-update entry point: blends `current` toward
  /// `target_style` for `target`, creating/refreshing instances as the
  /// declared descriptor lists dictate, and returns the style to
  /// render this pass.
  pub fn update(
    &mut self,
    target: TargetId,
    current: &AnimatedStyle,
    target_style: &AnimatedStyle,
  ) -> AnimatedStyle {
    let now = self.shared.begin_animation_update_time();
    let suspended = self.shared.is_suspended();
    let composite = self
      .composites
      .entry(target)
      .or_insert_with(|| CompositeAnimation::new(target, suspended));
    let blended = composite.animate(&mut self.shared, now, current, target_style, &self.registry);
    // A refresh can leave nothing behind (every instance finished or no
    // declaration survived); drop the entry so the registry does not
    // grow with every target ever animated. Suspended composites are
    // kept: the suspension scope must outlive its instances.
    if composite.is_empty() && !composite.suspended() {
      self.composites.remove(&target);
    }
    self.update_animation_timer();
    blended
  }

  /// Closes the current update pass: delivers style-available wakeups,
  /// releases the start-time barrier if no asynchronous notification is
  /// outstanding, reschedules the timer and unfreezes the clock.
  ///
  /// Queued events and dirty targets survive the pass; drain them with
  /// [`take_events`](Self::take_events) and
  /// [`take_dirty_targets`](Self::take_dirty_targets).
  pub fn end_animation_update(&mut self) {
    self.style_available();
    if !self.shared.waiting_for_async_notification {
      let time = self.shared.begin_animation_update_time();
      self.release_start_time_waiters(time);
    }
    self.update_animation_timer();
    self.shared.invalidate_frozen_time();
  }

  /// The compositor's "animation started at `time`" notification. All
  /// waiters of the pass are released with this one timestamp, which is
  /// the synchronization guarantee: heterogeneous instances that
  /// requested a start in the same pass end up with identical start
  /// times.
  pub fn received_start_time_response(&mut self, time: f64) {
    self.shared.waiting_for_async_notification = false;
    self.release_start_time_waiters(time);
    self.update_animation_timer();
    self.shared.invalidate_frozen_time();
  }

  /// The embedder's timer callback. Invalidates the frozen clock,
  /// services every machine at the fresh time, and reschedules.
  pub fn animation_timer_fired(&mut self) {
    self.shared.invalidate_frozen_time();
    let now = self.shared.begin_animation_update_time();
    debug!("animation timer fired at {now:.3}");
    for composite in self.composites.values_mut() {
      composite.fire_timers(&mut self.shared, now);
    }
    self.update_animation_timer();
    self.shared.invalidate_frozen_time();
  }

  /// Recomputes the timer schedule from the minimum time-to-service
  /// over all composites, marking targets dirty when they need service
  /// this instant.
  pub fn update_animation_timer(&mut self) {
    let now = self.shared.begin_animation_update_time();
    let mut min = -1.0f64;
    for composite in self.composites.values() {
      let t = composite.time_to_next_service(now);
      if t >= 0.0 && (min < 0.0 || t < min) {
        min = t;
      }
      if t == 0.0 {
        self.shared.mark_dirty(composite.target());
      }
    }

    let next = if min < 0.0 {
      TimerSchedule::Inactive
    } else if min == 0.0 {
      TimerSchedule::Repeating(REPEATING_TIMER_INTERVAL)
    } else {
      TimerSchedule::OneShot(min)
    };
    if next != self.timer {
      debug!("timer schedule {:?} -> {:?}", self.timer, next);
      self.timer = next;
    }
  }

  /// The current timer decision for the embedder.
  pub fn timer_schedule(&self) -> TimerSchedule {
    self.timer
  }

  /// Queued lifecycle events, in dispatch order.
  pub fn take_events(&mut self) -> Vec<AnimationEvent> {
    std::mem::take(&mut self.shared.events)
  }

  /// Targets needing a fresh style pass.
  pub fn take_dirty_targets(&mut self) -> Vec<TargetId> {
    std::mem::take(&mut self.shared.dirty_targets)
  }

  fn style_available(&mut self) {
    let waiting = std::mem::take(&mut self.shared.waiting_for_style);
    if waiting.is_empty() {
      return;
    }
    let now = self.shared.begin_animation_update_time();
    for (target, key) in waiting {
      if let Some(composite) = self.composites.get_mut(&target) {
        composite.style_available(&mut self.shared, now, &key);
      }
    }
  }

  fn release_start_time_waiters(&mut self, time: f64) {
    let waiting = std::mem::take(&mut self.shared.waiting_for_response);
    if waiting.is_empty() {
      return;
    }
    let now = self.shared.begin_animation_update_time();
    debug!("releasing {} start-time waiter(s) at {time:.3}", waiting.len());
    for (target, key) in waiting {
      if let Some(composite) = self.composites.get_mut(&target) {
        composite.start_time_response(&mut self.shared, now, &key, time);
      }
    }
  }

  /// Pauses every animation in the document. Time does not appear to
  /// elapse while suspended.
  pub fn suspend_animations(&mut self) {
    if self.shared.suspended {
      return;
    }
    debug!("suspending animations");
    self.shared.invalidate_frozen_time();
    let now = self.shared.begin_animation_update_time();
    self.shared.suspended = true;
    for composite in self.composites.values_mut() {
      composite.suspend(&mut self.shared, now);
    }
    self.update_animation_timer();
  }

  pub fn resume_animations(&mut self) {
    if !self.shared.suspended {
      return;
    }
    debug!("resuming animations");
    self.shared.invalidate_frozen_time();
    let now = self.shared.begin_animation_update_time();
    self.shared.suspended = false;
    for composite in self.composites.values_mut() {
      composite.resume(&mut self.shared, now);
    }
    self.update_animation_timer();
  }

  /// Pauses the composites of one subtree scope, leaving the rest of
  /// the document running. The embedder supplies the scope's targets
  /// (it owns the tree; the controller only knows opaque ids).
  pub fn suspend_animations_for_targets<I: IntoIterator<Item = TargetId>>(&mut self, scope: I) {
    self.shared.invalidate_frozen_time();
    let now = self.shared.begin_animation_update_time();
    for target in scope {
      if let Some(composite) = self.composites.get_mut(&target) {
        composite.suspend(&mut self.shared, now);
      }
    }
    self.update_animation_timer();
  }

  pub fn resume_animations_for_targets<I: IntoIterator<Item = TargetId>>(&mut self, scope: I) {
    self.shared.invalidate_frozen_time();
    let now = self.shared.begin_animation_update_time();
    for target in scope {
      if let Some(composite) = self.composites.get_mut(&target) {
        composite.resume(&mut self.shared, now);
      }
    }
    self.update_animation_timer();
  }

  pub fn number_of_active_animations(&self) -> usize {
    self
      .composites
      .values()
      .map(|c| c.number_of_active_animations())
      .sum()
  }

  /// Active-instance count restricted to a subtree scope, mirroring
  /// [`suspend_animations_for_targets`](Self::suspend_animations_for_targets).
  pub fn number_of_active_animations_for_targets<I: IntoIterator<Item = TargetId>>(
    &self,
    scope: I,
  ) -> usize {
    scope
      .into_iter()
      .filter_map(|target| self.composites.get(&target))
      .map(|c| c.number_of_active_animations())
      .sum()
  }

  /// Test/tooling hook: freezes the named keyframe animation on
  /// `target` exactly `time` seconds after its requested start.
  pub fn pause_animation_at_time(
    &mut self,
    target: TargetId,
    name: &str,
    time: f64,
  ) -> Result<()> {
    let now = self.shared.begin_animation_update_time();
    let composite = self
      .composites
      .get_mut(&target)
      .ok_or(Error::TargetNotAnimating(target))?;
    composite.pause_animation_at_time(&mut self.shared, now, name, time)?;
    self.update_animation_timer();
    Ok(())
  }

  /// Test/tooling hook: freezes the transition on `property`.
  pub fn pause_transition_at_time(
    &mut self,
    target: TargetId,
    property: PropertyId,
    time: f64,
  ) -> Result<()> {
    let now = self.shared.begin_animation_update_time();
    let composite = self
      .composites
      .get_mut(&target)
      .ok_or(Error::TargetNotAnimating(target))?;
    composite.pause_transition_at_time(&mut self.shared, now, property, time)?;
    self.update_animation_timer();
    Ok(())
  }

  /// Tears down everything animating `target` (the target was
  /// destroyed or lost all its declarations). Waiting sets are purged
  /// so no released waiter dispatches into freed state.
  pub fn clear_animations(&mut self, target: TargetId) {
    if let Some(mut composite) = self.composites.remove(&target) {
      let now = self.shared.begin_animation_update_time();
      composite.detach(&mut self.shared, now);
    }
    self.shared.purge_target(target);
    self.update_animation_timer();
  }

  /// Whether the transition on `property` of `target` is currently
  /// overridden by a keyframe animation.
  pub fn transition_is_overridden(&self, target: TargetId, property: PropertyId) -> Result<bool> {
    let composite = self
      .composites
      .get(&target)
      .ok_or(Error::TargetNotAnimating(target))?;
    composite
      .transition_overridden(property)
      .ok_or(Error::UnknownTransition(property.name()))
  }

  /// Whether the transition on `property` of `target` currently runs
  /// on the compositor.
  pub fn transition_is_accelerated(&self, target: TargetId, property: PropertyId) -> Result<bool> {
    let composite = self
      .composites
      .get(&target)
      .ok_or(Error::TargetNotAnimating(target))?;
    composite
      .transition_accelerated(property)
      .ok_or(Error::UnknownTransition(property.name()))
  }
}

impl Default for AnimationController {
  fn default() -> Self {
    AnimationController::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::animation::clock::ManualClock;
  use crate::animation::AnimationDescriptor;
  use crate::blend::TransitionProperty;
  use crate::style::values::Length;

  fn controller(clock: &ManualClock) -> AnimationController {
    AnimationController::with_collaborators(Box::new(clock.clone()), Box::new(NullCompositor))
  }

  fn styles_for_width_transition(duration: f64) -> (AnimatedStyle, AnimatedStyle) {
    let from = AnimatedStyle::default();
    let mut to = AnimatedStyle {
      width: Length::px(100.0),
      ..AnimatedStyle::default()
    };
    to.transitions = vec![Arc::new(AnimationDescriptor::transition(
      TransitionProperty::Id(PropertyId::Width),
      duration,
      0.0,
    ))];
    (from, to)
  }

  #[test]
  fn idle_controller_timer_is_inactive() {
    let clock = ManualClock::new();
    let mut ctrl = controller(&clock);
    ctrl.update_animation_timer();
    assert_eq!(ctrl.timer_schedule(), TimerSchedule::Inactive);
  }

  #[test]
  fn running_transition_arms_the_repeating_timer() {
    let clock = ManualClock::new();
    let mut ctrl = controller(&clock);
    let (from, to) = styles_for_width_transition(1.0);
    let target = TargetId(1);
    ctrl.update(target, &from, &to);
    ctrl.end_animation_update();
    // Software transition needs per-frame service.
    assert_eq!(
      ctrl.timer_schedule(),
      TimerSchedule::Repeating(REPEATING_TIMER_INTERVAL)
    );
  }

  #[test]
  fn delayed_transition_arms_a_one_shot() {
    let clock = ManualClock::new();
    let mut ctrl = controller(&clock);
    let from = AnimatedStyle::default();
    let mut to = AnimatedStyle {
      width: Length::px(100.0),
      ..AnimatedStyle::default()
    };
    to.transitions = vec![Arc::new(AnimationDescriptor::transition(
      TransitionProperty::Id(PropertyId::Width),
      1.0,
      2.0,
    ))];
    ctrl.update(TargetId(1), &from, &to);
    ctrl.end_animation_update();
    match ctrl.timer_schedule() {
      TimerSchedule::OneShot(t) => assert!((t - 2.0).abs() < 1e-9, "got {t}"),
      other => panic!("expected one-shot, got {other:?}"),
    }
  }

  #[test]
  fn clearing_a_target_purges_waiters_and_stops_the_timer() {
    let clock = ManualClock::new();
    let mut ctrl = controller(&clock);
    let (from, to) = styles_for_width_transition(1.0);
    let target = TargetId(7);
    ctrl.update(target, &from, &to);
    ctrl.clear_animations(target);
    ctrl.end_animation_update();
    assert_eq!(ctrl.timer_schedule(), TimerSchedule::Inactive);
    assert_eq!(ctrl.number_of_active_animations(), 0);
    assert!(matches!(
      ctrl.transition_is_overridden(target, PropertyId::Width),
      Err(Error::TargetNotAnimating(_))
    ));
  }

  #[test]
  fn unknown_keyframes_lookup_errors() {
    let clock = ManualClock::new();
    let ctrl = controller(&clock);
    assert!(matches!(
      ctrl.keyframes("missing"),
      Err(Error::UnknownKeyframeSet(_))
    ));
  }
}
