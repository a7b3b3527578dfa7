//! Implicit (transition) animations.
//!
//! One instance per (target, property): a from/to style pair advanced
//! by the shared state machine. Transitions are the low-priority kind;
//! a keyframe animation on the same property marks them overridden,
//! which withdraws accelerated execution while the software clock keeps
//! tracking time underneath.

use crate::animation::machine::{
  AnimState, AnimationContext, AnimationInput, InstanceCallbacks, InstanceKey, Machine,
};
use crate::animation::AnimationDescriptor;
use crate::blend::{blend_property, wrapper, BlendContext, PropertyId};
use crate::events::{AnimationEvent, AnimationEventKind};
use crate::style::transform::transform_lists_match;
use crate::style::AnimatedStyle;
use std::sync::Arc;

pub struct ImplicitAnimation {
  machine: Machine,
  data: TransitionData,
}

struct TransitionData {
  property: PropertyId,
  overridden: bool,
  /// Refresh-sweep mark: instances still inactive after a pass over
  /// the declared transitions are torn down.
  active: bool,
  from_style: Arc<AnimatedStyle>,
  to_style: Arc<AnimatedStyle>,
  /// Transform-list shape validated for this from/to pair.
  transform_lists_match: bool,
}

impl InstanceCallbacks for TransitionData {
  fn key(&self) -> InstanceKey {
    InstanceKey::Transition(self.property)
  }

  fn overridden(&self) -> bool {
    self.overridden
  }

  fn on_start(&mut self, _ctx: &mut AnimationContext, _elapsed: f64) {}

  fn on_iteration(&mut self, _ctx: &mut AnimationContext, _elapsed: f64) {}

  fn on_end(&mut self, ctx: &mut AnimationContext, elapsed: f64) {
    ctx.shared.queue_event(AnimationEvent {
      target: ctx.target,
      kind: AnimationEventKind::TransitionEnd,
      name: self.property.name().to_string(),
      elapsed_time: elapsed,
    });
  }

  fn start_accelerated(&mut self, ctx: &mut AnimationContext, time_offset: f64) -> bool {
    if self.overridden || !self.property.is_accelerated() {
      return false;
    }
    ctx
      .shared
      .compositor
      .start_animation(ctx.target, self.property, time_offset)
  }

  fn pause_accelerated(&mut self, ctx: &mut AnimationContext, time_offset: f64) {
    ctx
      .shared
      .compositor
      .pause_animation(ctx.target, self.property, time_offset);
  }

  fn end_accelerated(&mut self, ctx: &mut AnimationContext) {
    ctx.shared.compositor.end_animation(ctx.target, self.property);
  }

  fn override_animations(&mut self, _ctx: &mut AnimationContext) {}

  fn resume_overridden_animations(&mut self, _ctx: &mut AnimationContext) {}
}

impl ImplicitAnimation {
  /// Builds a transition from the captured `from` snapshot to the new
  /// `to` target. The descriptor must be a transition descriptor.
  pub fn new(
    descriptor: Arc<AnimationDescriptor>,
    property: PropertyId,
    from_style: Arc<AnimatedStyle>,
    to_style: Arc<AnimatedStyle>,
  ) -> ImplicitAnimation {
    debug_assert!(descriptor.is_transition());
    let lists_match = transform_lists_match(&from_style.transform, &to_style.transform);
    ImplicitAnimation {
      machine: Machine::new(descriptor),
      data: TransitionData {
        property,
        overridden: false,
        active: true,
        from_style,
        to_style,
        transform_lists_match: lists_match,
      },
    }
  }

  pub fn overridden(&self) -> bool {
    self.data.overridden
  }

  pub fn machine(&self) -> &Machine {
    &self.machine
  }

  pub fn active(&self) -> bool {
    self.data.active
  }

  pub fn mark_inactive(&mut self) {
    self.data.active = false;
  }

  pub fn mark_active(&mut self) {
    self.data.active = true;
  }

  /// Whether the stored target value still matches `style`'s value for
  /// the animated property. A mismatch means the declaration moved and
  /// the transition must be rebuilt.
  pub fn target_value_matches(&self, style: &AnimatedStyle) -> bool {
    wrapper(self.data.property).equals(&self.data.to_style, style)
  }

  /// Flips the overridden flag and tells the machine, so accelerated
  /// execution is withdrawn (or re-issued) to match.
  pub fn set_overridden(&mut self, ctx: &mut AnimationContext, overridden: bool) {
    if self.data.overridden == overridden {
      return;
    }
    self.data.overridden = overridden;
    let input = if overridden {
      AnimationInput::PauseOverride
    } else {
      AnimationInput::ResumeOverride
    };
    self.machine.update(&mut self.data, ctx, input);
  }

  pub fn update(&mut self, ctx: &mut AnimationContext, input: AnimationInput) {
    self.machine.update(&mut self.data, ctx, input);
  }

  pub fn fire_timers(&mut self, ctx: &mut AnimationContext) {
    self.machine.fire_timers(&mut self.data, ctx);
  }

  /// One service step: kick off a still-new instance, then deliver any
  /// due timer inputs.
  pub fn service(&mut self, ctx: &mut AnimationContext) {
    if self.machine.state() == AnimState::New && !ctx.shared.is_suspended() {
      self.update(ctx, AnimationInput::StartAnimation);
    }
    self.fire_timers(ctx);
  }

  pub fn freeze_at_time(&mut self, ctx: &mut AnimationContext, time: f64) {
    self.machine.freeze_at_time(&mut self.data, ctx, time);
  }

  /// Blends this transition's property into `dst` at the machine's
  /// current progress. Finished-and-cleared transitions contribute
  /// nothing.
  pub fn animate(&self, now: f64, dst: &mut AnimatedStyle) {
    if self.machine.post_active() {
      return;
    }
    self.capture_current_value(now, dst);
  }

  /// Captures the current interpolated value into `dst` without regard
  /// to lifecycle state. Used when an accelerated transition is torn
  /// down mid-flight so its replacement starts from what is on screen,
  /// not from the stale declared value.
  pub fn capture_current_value(&self, now: f64, dst: &mut AnimatedStyle) {
    let tf = self.machine.descriptor().timing_function;
    let progress = self.machine.progress(now, 1.0, 0.0, Some(&tf));
    let ctx = BlendContext {
      transform_lists_match: self.data.transform_lists_match,
    };
    blend_property(
      self.data.property,
      &self.data.from_style,
      &self.data.to_style,
      dst,
      progress,
      &ctx,
    );
  }

  /// Seconds to next software service; accelerated transitions only
  /// need servicing at their lifecycle boundaries.
  pub fn time_to_next_service(&self, now: f64) -> f64 {
    let t = self.machine.time_to_next_service(now);
    if t != 0.0 || self.machine.pre_active() {
      return t;
    }
    if self.machine.is_accelerated() && self.data.property.is_accelerated() {
      let (t, _) = self.machine.get_time_to_next_event(now);
      return t;
    }
    0.0
  }
}
