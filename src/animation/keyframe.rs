//! Keyframe animations.
//!
//! One instance per (target, animation-name). Each serviced frame maps
//! the machine's fractional time onto a from/to keyframe pair per
//! property, then blends that interval with the *from* keyframe's
//! timing function. Keyframe animations are the high-priority kind:
//! while running (or filling forwards) they override transitions on
//! every property the set animates.

use crate::animation::machine::{
  AnimState, AnimationContext, AnimationInput, InstanceCallbacks, InstanceKey, Machine,
  OverrideRequest,
};
use crate::animation::{AnimationDescriptor, AnimationPlayState, Keyframe, KeyframeList};
use crate::blend::{blend_property, BlendContext, PropertyId};
use crate::events::{AnimationEvent, AnimationEventKind};
use crate::style::transform::transform_lists_match;
use crate::style::AnimatedStyle;
use crate::timing::TimingFunction;
use std::sync::Arc;

pub struct KeyframeAnimation {
  machine: Machine,
  data: KeyframeData,
}

struct KeyframeData {
  name: Arc<str>,
  keyframes: Arc<KeyframeList>,
  /// Refresh-sweep mark, cleared at the start of a keyframe refresh.
  present: bool,
  /// The target's style with no keyframe animation applied; implicit
  /// 0%/100% keyframes are synthesized from it.
  unanimated_style: Arc<AnimatedStyle>,
  /// Transform-list shape validated across every keyframe of the set.
  transform_lists_valid: bool,
}

impl KeyframeData {
  fn push_override(&self, ctx: &mut AnimationContext, assert_override: bool) {
    if self.keyframes.properties().is_empty() {
      return;
    }
    ctx.shared.push_override_request(OverrideRequest {
      target: ctx.target,
      properties: self.keyframes.properties().to_vec(),
      assert_override,
    });
  }

  fn queue(&self, ctx: &mut AnimationContext, kind: AnimationEventKind, elapsed: f64) {
    ctx.shared.queue_event(AnimationEvent {
      target: ctx.target,
      kind,
      name: self.name.to_string(),
      elapsed_time: elapsed,
    });
  }

  fn all_properties_accelerated(&self) -> bool {
    let props = self.keyframes.properties();
    !props.is_empty() && props.iter().all(|p| p.is_accelerated())
  }
}

impl InstanceCallbacks for KeyframeData {
  fn key(&self) -> InstanceKey {
    InstanceKey::Animation(self.name.clone())
  }

  fn on_start(&mut self, ctx: &mut AnimationContext, elapsed: f64) {
    self.queue(ctx, AnimationEventKind::AnimationStart, elapsed);
  }

  fn on_iteration(&mut self, ctx: &mut AnimationContext, elapsed: f64) {
    self.queue(ctx, AnimationEventKind::AnimationIteration, elapsed);
  }

  fn on_end(&mut self, ctx: &mut AnimationContext, elapsed: f64) {
    self.queue(ctx, AnimationEventKind::AnimationEnd, elapsed);
  }

  fn start_accelerated(&mut self, ctx: &mut AnimationContext, time_offset: f64) -> bool {
    if !self.all_properties_accelerated() {
      return false;
    }
    let mut expect_response = false;
    for &property in self.keyframes.properties() {
      expect_response |= ctx
        .shared
        .compositor
        .start_animation(ctx.target, property, time_offset);
    }
    expect_response
  }

  fn pause_accelerated(&mut self, ctx: &mut AnimationContext, time_offset: f64) {
    for &property in self.keyframes.properties() {
      ctx
        .shared
        .compositor
        .pause_animation(ctx.target, property, time_offset);
    }
  }

  fn end_accelerated(&mut self, ctx: &mut AnimationContext) {
    for &property in self.keyframes.properties() {
      ctx.shared.compositor.end_animation(ctx.target, property);
    }
  }

  fn override_animations(&mut self, ctx: &mut AnimationContext) {
    self.push_override(ctx, true);
  }

  fn resume_overridden_animations(&mut self, ctx: &mut AnimationContext) {
    self.push_override(ctx, false);
  }
}

/// A synthesized or real keyframe endpoint for one interval.
struct IntervalEndpoint<'a> {
  offset: f64,
  style: &'a AnimatedStyle,
  timing_function: Option<&'a TimingFunction>,
}

impl KeyframeAnimation {
  pub fn new(
    descriptor: Arc<AnimationDescriptor>,
    keyframes: Arc<KeyframeList>,
    unanimated_style: Arc<AnimatedStyle>,
  ) -> KeyframeAnimation {
    debug_assert!(!descriptor.is_transition());
    let transform_lists_valid = validate_transform_lists(&keyframes, &unanimated_style);
    KeyframeAnimation {
      machine: Machine::new(descriptor),
      data: KeyframeData {
        name: keyframes.name().clone(),
        keyframes,
        present: true,
        unanimated_style,
        transform_lists_valid,
      },
    }
  }

  pub fn present(&self) -> bool {
    self.data.present
  }

  pub fn mark_not_present(&mut self) {
    self.data.present = false;
  }

  pub fn mark_present(&mut self) {
    self.data.present = true;
  }

  pub fn machine(&self) -> &Machine {
    &self.machine
  }

  pub fn animates(&self, property: PropertyId) -> bool {
    self.data.keyframes.animates(property)
  }

  /// The target's style with this animation removed, used as the
  /// transition "from" end when a transition starts under a running
  /// keyframe animation.
  pub fn unanimated_style(&self) -> &Arc<AnimatedStyle> {
    &self.data.unanimated_style
  }

  pub fn set_descriptor(&mut self, descriptor: Arc<AnimationDescriptor>) {
    self.machine.set_descriptor(descriptor);
  }

  pub fn update(&mut self, ctx: &mut AnimationContext, input: AnimationInput) {
    self.machine.update(&mut self.data, ctx, input);
  }

  pub fn fire_timers(&mut self, ctx: &mut AnimationContext) {
    self.machine.fire_timers(&mut self.data, ctx);
  }

  /// One service step: kick off (or park) a still-new instance per its
  /// declared play state, then deliver any due timer inputs.
  pub fn service(&mut self, ctx: &mut AnimationContext) {
    if self.machine.state() == AnimState::New && !ctx.shared.is_suspended() {
      let input = match self.machine.descriptor().play_state {
        AnimationPlayState::Running => AnimationInput::StartAnimation,
        AnimationPlayState::Paused => AnimationInput::PlayStatePaused,
      };
      self.update(ctx, input);
    }
    self.fire_timers(ctx);
  }

  /// Releases any transitions this animation was overriding; called
  /// right before the instance is torn down.
  pub fn release_overrides(&mut self, ctx: &mut AnimationContext) {
    self.data.resume_overridden_animations(ctx);
  }

  pub fn freeze_at_time(&mut self, ctx: &mut AnimationContext, time: f64) {
    self.machine.freeze_at_time(&mut self.data, ctx, time);
  }

  pub fn update_play_state(&mut self, ctx: &mut AnimationContext) {
    let play_state = self.machine.descriptor().play_state;
    self
      .machine
      .update_play_state(&mut self.data, ctx, play_state);
  }

  /// Blends every property the keyframe set animates into `dst`.
  pub fn animate(&self, now: f64, dst: &mut AnimatedStyle) {
    if self.machine.post_active() {
      return;
    }
    if self.machine.pre_active() && !self.machine.descriptor().fill_mode.fills_backwards() {
      // Still in the delay with no backwards fill: contribute nothing.
      return;
    }
    let fractional = self.machine.progress(now, 1.0, 0.0, None);
    let blend_ctx = BlendContext {
      transform_lists_match: self.data.transform_lists_valid,
    };
    for &property in self.data.keyframes.properties() {
      let (from, to, progress) = self.fetch_interval_endpoints(now, property, fractional);
      blend_property(property, from, to, dst, progress, &blend_ctx);
    }
  }

  /// Resolves `fractional` into a from/to style pair for `property`
  /// and the eased progress within that interval.
  ///
  /// Keyframes that do not specify the property are skipped; missing
  /// 0%/100% endpoints are synthesized from the unanimated style. The
  /// interval eases with the timing function of its *from* keyframe,
  /// falling back to the descriptor's.
  fn fetch_interval_endpoints(
    &self,
    now: f64,
    property: PropertyId,
    fractional: f64,
  ) -> (&AnimatedStyle, &AnimatedStyle, f64) {
    let mut prev: Option<&Keyframe> = None;
    let mut next: Option<&Keyframe> = None;
    for kf in self.data.keyframes.keyframes() {
      if !kf.animates(property) {
        continue;
      }
      if kf.offset <= fractional {
        prev = Some(kf);
      } else {
        next = Some(kf);
        break;
      }
    }

    let from = match prev {
      Some(kf) => IntervalEndpoint {
        offset: kf.offset,
        style: &kf.style,
        timing_function: kf.timing_function.as_ref(),
      },
      None => IntervalEndpoint {
        offset: 0.0,
        style: &self.data.unanimated_style,
        timing_function: None,
      },
    };
    let to = match next {
      Some(kf) => IntervalEndpoint {
        offset: kf.offset,
        style: &kf.style,
        timing_function: None,
      },
      None => IntervalEndpoint {
        offset: 1.0,
        style: &self.data.unanimated_style,
        timing_function: None,
      },
    };

    let span = to.offset - from.offset;
    if span <= 0.0 {
      // Sitting exactly on (or past) a final keyframe.
      return (from.style, from.style, 1.0);
    }
    let scale = 1.0 / span;
    let tf = from
      .timing_function
      .copied()
      .unwrap_or(self.machine.descriptor().timing_function);
    let progress = self.machine.progress(now, scale, from.offset, Some(&tf));
    (from.style, to.style, progress)
  }

  /// Seconds to next software service; fully accelerated sets only
  /// need servicing at lifecycle boundaries.
  pub fn time_to_next_service(&self, now: f64) -> f64 {
    let t = self.machine.time_to_next_service(now);
    if t != 0.0 || self.machine.pre_active() {
      return t;
    }
    if self.machine.is_accelerated() && self.data.all_properties_accelerated() {
      let (t, _) = self.machine.get_time_to_next_event(now);
      return t;
    }
    0.0
  }
}

/// A keyframe set blends transforms per-function only when every
/// keyframe that specifies `transform` (plus the unanimated endpoints)
/// agrees on list shape.
fn validate_transform_lists(keyframes: &KeyframeList, unanimated: &AnimatedStyle) -> bool {
  if !keyframes.animates(PropertyId::Transform) {
    return true;
  }
  let mut reference: &[_] = &unanimated.transform;
  for kf in keyframes.keyframes() {
    if !kf.animates(PropertyId::Transform) {
      continue;
    }
    if !transform_lists_match(reference, &kf.style.transform) {
      return false;
    }
    if reference.is_empty() {
      reference = &kf.style.transform;
    }
  }
  true
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::style::transform::TransformOperation;
  use crate::style::values::Length;

  fn style_with_width(px: f64) -> AnimatedStyle {
    AnimatedStyle {
      width: Length::px(px),
      ..AnimatedStyle::default()
    }
  }

  fn simple_animation(keyframes: Vec<Keyframe>) -> KeyframeAnimation {
    let mut descriptor = AnimationDescriptor::keyframes("grow", 1.0);
    descriptor.timing_function = TimingFunction::Linear;
    KeyframeAnimation::new(
      Arc::new(descriptor),
      Arc::new(KeyframeList::new("grow", keyframes)),
      Arc::new(style_with_width(50.0)),
    )
  }

  fn force_running(anim: &mut KeyframeAnimation) {
    // Unit-level shortcut: integration tests drive the real lifecycle.
    anim.machine.force_running_at(0.0);
  }

  #[test]
  fn implicit_endpoints_come_from_unanimated_style() {
    // Only a 50% keyframe: 0% and 100% are the unanimated width of 50.
    let mut anim = simple_animation(vec![Keyframe::new(
      0.5,
      vec![PropertyId::Width],
      style_with_width(150.0),
    )]);
    force_running(&mut anim);

    let mut dst = style_with_width(50.0);
    anim.animate(0.25, &mut dst);
    assert_eq!(dst.width, Length::px(100.0));

    let mut dst = style_with_width(50.0);
    anim.animate(0.75, &mut dst);
    assert_eq!(dst.width, Length::px(100.0));
  }

  #[test]
  fn keyframes_missing_a_property_are_skipped() {
    // Width is specified at 0% and 100%, opacity only at 100%; the
    // width interval search must not stop at the opacity-only frame.
    let start = Keyframe::new(0.0, vec![PropertyId::Width], style_with_width(0.0));
    let mid = Keyframe::new(0.5, vec![PropertyId::Opacity], AnimatedStyle::default());
    let end = Keyframe::new(1.0, vec![PropertyId::Width], style_with_width(100.0));
    let mut anim = simple_animation(vec![start, mid, end]);
    force_running(&mut anim);

    let mut dst = AnimatedStyle::default();
    anim.animate(0.5, &mut dst);
    assert_eq!(dst.width, Length::px(50.0));
  }

  #[test]
  fn per_keyframe_timing_function_applies_to_its_interval() {
    let mut start = Keyframe::new(0.0, vec![PropertyId::Width], style_with_width(0.0));
    start.timing_function = Some(TimingFunction::Steps {
      steps: 1,
      jump_at_start: false,
    });
    let end = Keyframe::new(1.0, vec![PropertyId::Width], style_with_width(100.0));
    let mut anim = simple_animation(vec![start, end]);
    force_running(&mut anim);

    // steps(1, end) holds the start value until the interval closes.
    let mut dst = AnimatedStyle::default();
    anim.animate(0.9, &mut dst);
    assert_eq!(dst.width, Length::px(0.0));
    let mut dst = AnimatedStyle::default();
    anim.animate(1.0, &mut dst);
    assert_eq!(dst.width, Length::px(100.0));
  }

  #[test]
  fn mismatched_keyframe_transforms_invalidate_the_whole_set() {
    let mut a = style_with_width(0.0);
    a.transform = vec![TransformOperation::Rotate(0.0)];
    let mut b = style_with_width(0.0);
    b.transform = vec![TransformOperation::Scale(2.0, 2.0)];
    let list = KeyframeList::new(
      "spin",
      vec![
        Keyframe::new(0.0, vec![PropertyId::Transform], a),
        Keyframe::new(1.0, vec![PropertyId::Transform], b),
      ],
    );
    assert!(!validate_transform_lists(&list, &AnimatedStyle::default()));
  }

  #[test]
  fn empty_transform_lists_are_wildcards_in_validation() {
    let mut b = style_with_width(0.0);
    b.transform = vec![TransformOperation::Rotate(90.0)];
    let list = KeyframeList::new(
      "spin",
      vec![
        Keyframe::new(0.0, vec![PropertyId::Transform], style_with_width(0.0)),
        Keyframe::new(1.0, vec![PropertyId::Transform], b),
      ],
    );
    assert!(validate_transform_lists(&list, &AnimatedStyle::default()));
  }
}
