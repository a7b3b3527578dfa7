//! Per-target animation composition.
//!
//! A `CompositeAnimation` owns every instance animating one target:
//! transitions in a property-ordered map (deterministic blend order)
//! and keyframe animations in a name map plus an explicit
//! declaration-order list. Each style update refreshes both sets
//! against the declared descriptor lists, services the state machines,
//! and produces the blended style: transitions first, then keyframe
//! animations in declaration order, so later-declared keyframe
//! animations win shared properties.

use crate::animation::controller::{ControllerShared, KeyframeRegistry};
use crate::animation::keyframe::KeyframeAnimation;
use crate::animation::machine::{AnimationContext, AnimationInput, InstanceKey};
use crate::animation::transition::ImplicitAnimation;
use crate::animation::{AnimationDescriptor, AnimationPlayState, TargetId};
use crate::blend::{all_transitionable, wrapper, PropertyId, TransitionProperty};
use crate::error::{Error, Result};
use crate::style::AnimatedStyle;
use log::debug;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct CompositeAnimation {
  target: TargetId,
  transitions: BTreeMap<PropertyId, ImplicitAnimation>,
  keyframe_animations: FxHashMap<Arc<str>, KeyframeAnimation>,
  /// Names in declaration order; rebuilt on every keyframe refresh.
  keyframe_order: Vec<Arc<str>>,
  /// The declared animation list from the previous pass, for the
  /// nothing-changed fast path.
  prev_animations: Vec<Arc<AnimationDescriptor>>,
  suspended: bool,
}

/// Whether a transition keyed `transition_property` owns `property`,
/// accounting for shorthands on either side.
fn transition_covers(transition_property: PropertyId, property: PropertyId) -> bool {
  if transition_property == property {
    return true;
  }
  if let Some(longhands) = transition_property.shorthand_longhands() {
    if longhands.contains(&property) {
      return true;
    }
  }
  if let Some(longhands) = property.shorthand_longhands() {
    if longhands.contains(&transition_property) {
      return true;
    }
  }
  false
}

impl CompositeAnimation {
  /// A composite created while the document is suspended starts
  /// suspended, so a later resume actually reaches its instances.
  pub fn new(target: TargetId, suspended: bool) -> CompositeAnimation {
    CompositeAnimation {
      target,
      transitions: BTreeMap::new(),
      keyframe_animations: FxHashMap::default(),
      keyframe_order: Vec::new(),
      prev_animations: Vec::new(),
      suspended,
    }
  }

  pub fn target(&self) -> TargetId {
    self.target
  }

  pub fn is_empty(&self) -> bool {
    self.transitions.is_empty() && self.keyframe_animations.is_empty()
  }

  pub fn suspended(&self) -> bool {
    self.suspended
  }

  // The context borrows only `shared`, never `self`, so instance maps
  // stay mutable while one is alive.
  fn ctx_fields<'a>(
    &self,
    shared: &'a mut ControllerShared,
    now: f64,
  ) -> AnimationContext<'a> {
    AnimationContext {
      target: self.target,
      now,
      shared,
    }
  }

  /// The main entry point: refreshes both instance sets against the
  /// declared lists, services every machine, and returns the blended
  /// style for this pass.
  pub fn animate(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    current: &AnimatedStyle,
    target_style: &AnimatedStyle,
    registry: &KeyframeRegistry,
  ) -> AnimatedStyle {
    self.update_transitions(shared, now, current, target_style);
    self.update_keyframe_animations(shared, now, current, target_style, registry);

    let mut blended = target_style.clone();

    {
      let mut ctx = self.ctx_fields(shared, now);
      for transition in self.transitions.values_mut() {
        transition.service(&mut ctx);
      }
      for name in &self.keyframe_order {
        if let Some(animation) = self.keyframe_animations.get_mut(name) {
          animation.service(&mut ctx);
        }
      }
    }
    self.apply_override_requests(shared, now);

    for transition in self.transitions.values() {
      transition.animate(now, &mut blended);
    }
    for name in &self.keyframe_order {
      if let Some(animation) = self.keyframe_animations.get(name) {
        animation.animate(now, &mut blended);
      }
    }
    blended
  }

  /// The transition-refresh sweep.
  fn update_transitions(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    current: &AnimatedStyle,
    target_style: &AnimatedStyle,
  ) {
    if self.transitions.is_empty() && target_style.transitions.is_empty() {
      return;
    }

    for transition in self.transitions.values_mut() {
      transition.mark_inactive();
    }

    for descriptor in &target_style.transitions {
      let Some(declared) = descriptor.transition_property() else {
        continue;
      };
      match declared {
        TransitionProperty::None => {}
        TransitionProperty::Id(property) => {
          self.consider_transition(shared, now, property, descriptor, current, target_style);
        }
        TransitionProperty::All => {
          for &property in all_transitionable() {
            self.consider_transition(shared, now, property, descriptor, current, target_style);
          }
        }
      }
    }

    // Remove transitions that are still inactive (no declaration wants
    // them) or have delivered their end event.
    let stale: Vec<PropertyId> = self
      .transitions
      .iter()
      .filter(|(_, t)| !t.active() || t.machine().post_active())
      .map(|(&p, _)| p)
      .collect();
    for property in stale {
      if let Some(mut transition) = self.transitions.remove(&property) {
        let mut ctx = self.ctx_fields(shared, now);
        transition.update(&mut ctx, AnimationInput::EndAnimation);
        debug!("target {:?}: removed transition on {}", self.target, property.name());
      }
    }
  }

  fn consider_transition(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    property: PropertyId,
    descriptor: &Arc<AnimationDescriptor>,
    current: &AnimatedStyle,
    target_style: &AnimatedStyle,
  ) {
    // A keyframe animation owning the property supplies the "from" end:
    // the transition must run underneath it from the value the target
    // would have without the keyframe animation.
    let from_style: Arc<AnimatedStyle> = match self.keyframe_animation_for(property) {
      Some(animation) => animation.unanimated_style().clone(),
      None => Arc::new(current.clone()),
    };

    // A mid-flight accelerated transition being replaced must not snap
    // back: capture its on-screen value as the new "from".
    let mut captured_from: Option<Arc<AnimatedStyle>> = None;

    if let Some(existing) = self.transitions.get_mut(&property) {
      if existing.target_value_matches(target_style) {
        existing.mark_active();
        return;
      }
      if existing.machine().is_accelerated() {
        let mut snapshot = (*from_style).clone();
        existing.capture_current_value(now, &mut snapshot);
        captured_from = Some(Arc::new(snapshot));
      }
      let mut ctx = self.ctx_fields(shared, now);
      if let Some(mut old) = self.transitions.remove(&property) {
        old.update(&mut ctx, AnimationInput::EndAnimation);
      }
      debug!(
        "target {:?}: transition target for {} moved, rebuilding",
        self.target,
        property.name()
      );
    }

    let from_style = captured_from.unwrap_or(from_style);
    let values_equal = wrapper(property).equals(&from_style, target_style);
    if values_equal || !descriptor.is_active_descriptor() || shared.is_suspended() || self.suspended
    {
      return;
    }

    debug!(
      "target {:?}: starting transition on {}",
      self.target,
      property.name()
    );
    let transition = ImplicitAnimation::new(
      descriptor.clone(),
      property,
      from_style,
      Arc::new(target_style.clone()),
    );
    self.transitions.insert(property, transition);
  }

  fn keyframe_animation_for(&self, property: PropertyId) -> Option<&KeyframeAnimation> {
    self
      .keyframe_order
      .iter()
      .rev()
      .filter_map(|name| self.keyframe_animations.get(name))
      .find(|animation| animation.animates(property))
  }

  /// The keyframe-refresh sweep.
  fn update_keyframe_animations(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    current: &AnimatedStyle,
    target_style: &AnimatedStyle,
    registry: &KeyframeRegistry,
  ) {
    if self.prev_animations == target_style.animations {
      // Nothing declared changed; just toss finished animations.
      self.purge_finished_keyframe_animations(shared, now);
      return;
    }

    for animation in self.keyframe_animations.values_mut() {
      animation.mark_not_present();
    }

    let mut order: Vec<Arc<str>> = Vec::new();
    for descriptor in &target_style.animations {
      let Some(name) = descriptor.name() else {
        continue;
      };
      if !descriptor.is_active_descriptor() {
        continue;
      }
      if let Some(existing) = self.keyframe_animations.get_mut(name) {
        existing.mark_present();
        let restart = !existing
          .machine()
          .descriptor()
          .matches_ignoring_play_state(descriptor);
        existing.set_descriptor(descriptor.clone());
        let mut ctx = AnimationContext {
          target: self.target,
          now,
          shared,
        };
        if restart {
          // The declaration changed its timing, not just its play
          // state: the run starts over from this pass.
          existing.update(&mut ctx, AnimationInput::RestartAnimation);
          if self.suspended {
            existing.update(&mut ctx, AnimationInput::PlayStatePaused);
          }
        } else {
          existing.update_play_state(&mut ctx);
        }
        order.push(name.clone());
        continue;
      }
      let Some(keyframes) = registry.get(name) else {
        // Unknown @keyframes name: declaration is inert, same as CSS.
        continue;
      };
      debug!("target {:?}: starting keyframe animation {:?}", self.target, name);
      let mut animation =
        KeyframeAnimation::new(descriptor.clone(), keyframes.clone(), Arc::new(current.clone()));
      if shared.is_suspended() || self.suspended {
        // Born into a suspended scope: park before the first tick.
        let mut ctx = AnimationContext {
          target: self.target,
          now,
          shared,
        };
        animation.update(&mut ctx, AnimationInput::PlayStatePaused);
      }
      order.push(name.clone());
      self.keyframe_animations.insert(name.clone(), animation);
    }

    let stale: Vec<Arc<str>> = self
      .keyframe_animations
      .iter()
      .filter(|(_, a)| !a.present())
      .map(|(name, _)| name.clone())
      .collect();
    for name in stale {
      self.remove_keyframe_animation(shared, now, &name);
    }

    self.keyframe_order = order;
    self.prev_animations = target_style.animations.clone();
    self.apply_override_requests(shared, now);
  }

  fn purge_finished_keyframe_animations(&mut self, shared: &mut ControllerShared, now: f64) {
    let finished: Vec<Arc<str>> = self
      .keyframe_animations
      .iter()
      .filter(|(_, a)| a.machine().post_active())
      .map(|(name, _)| name.clone())
      .collect();
    for name in finished {
      self.remove_keyframe_animation(shared, now, &name);
      self.keyframe_order.retain(|n| n != &name);
    }
  }

  fn remove_keyframe_animation(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    name: &Arc<str>,
  ) {
    if let Some(mut animation) = self.keyframe_animations.remove(name) {
      let mut ctx = self.ctx_fields(shared, now);
      animation.release_overrides(&mut ctx);
      animation.update(&mut ctx, AnimationInput::EndAnimation);
      debug!("target {:?}: removed keyframe animation {:?}", self.target, name);
    }
    self.apply_override_requests(shared, now);
  }

  /// Drains override requests queued by keyframe machines and flips the
  /// overridden flag on every transition they cover.
  pub fn apply_override_requests(&mut self, shared: &mut ControllerShared, now: f64) {
    loop {
      let requests = shared.take_override_requests();
      if requests.is_empty() {
        return;
      }
      for request in requests {
        debug_assert_eq!(request.target, self.target);
        for (&transition_property, transition) in self.transitions.iter_mut() {
          let covered = request
            .properties
            .iter()
            .any(|&p| transition_covers(transition_property, p));
          if covered {
            let mut ctx = AnimationContext {
              target: self.target,
              now,
              shared,
            };
            transition.set_overridden(&mut ctx, request.assert_override);
          }
        }
      }
    }
  }

  /// Routes a `StyleAvailable` wakeup to the named instance.
  pub fn style_available(&mut self, shared: &mut ControllerShared, now: f64, key: &InstanceKey) {
    {
      let mut ctx = self.ctx_fields(shared, now);
      match key {
        InstanceKey::Transition(property) => {
          if let Some(transition) = self.transitions.get_mut(property) {
            transition.update(&mut ctx, AnimationInput::StyleAvailable);
          }
        }
        InstanceKey::Animation(name) => {
          if let Some(animation) = self.keyframe_animations.get_mut(name) {
            animation.update(&mut ctx, AnimationInput::StyleAvailable);
          }
        }
      }
    }
    self.apply_override_requests(shared, now);
  }

  /// Routes a resolved start time to the named instance.
  pub fn start_time_response(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    key: &InstanceKey,
    time: f64,
  ) {
    {
      let mut ctx = self.ctx_fields(shared, now);
      match key {
        InstanceKey::Transition(property) => {
          if let Some(transition) = self.transitions.get_mut(property) {
            transition.update(&mut ctx, AnimationInput::StartTimeSet(time));
          }
        }
        InstanceKey::Animation(name) => {
          if let Some(animation) = self.keyframe_animations.get_mut(name) {
            animation.update(&mut ctx, AnimationInput::StartTimeSet(time));
          }
        }
      }
    }
    self.apply_override_requests(shared, now);
  }

  /// Fires due timers on every instance (the controller's tick path).
  pub fn fire_timers(&mut self, shared: &mut ControllerShared, now: f64) {
    {
      let mut ctx = self.ctx_fields(shared, now);
      for transition in self.transitions.values_mut() {
        transition.fire_timers(&mut ctx);
      }
      for animation in self.keyframe_animations.values_mut() {
        animation.fire_timers(&mut ctx);
      }
    }
    self.apply_override_requests(shared, now);
  }

  /// Minimum time to next software service over all instances.
  /// -1 = none, 0 = now.
  pub fn time_to_next_service(&self, now: f64) -> f64 {
    let mut min = -1.0f64;
    let times = self
      .transitions
      .values()
      .map(|t| t.time_to_next_service(now))
      .chain(
        self
          .keyframe_animations
          .values()
          .map(|a| a.time_to_next_service(now)),
      );
    for t in times {
      if t >= 0.0 && (min < 0.0 || t < min) {
        min = t;
      }
    }
    min
  }

  pub fn number_of_active_animations(&self) -> usize {
    self
      .transitions
      .values()
      .filter(|t| t.machine().running())
      .count()
      + self
        .keyframe_animations
        .values()
        .filter(|a| a.machine().running())
        .count()
  }

  /// Pauses every instance (document or subtree suspend).
  pub fn suspend(&mut self, shared: &mut ControllerShared, now: f64) {
    if self.suspended {
      return;
    }
    self.suspended = true;
    let mut ctx = self.ctx_fields(shared, now);
    for transition in self.transitions.values_mut() {
      transition.update(&mut ctx, AnimationInput::PlayStatePaused);
    }
    for animation in self.keyframe_animations.values_mut() {
      animation.update(&mut ctx, AnimationInput::PlayStatePaused);
    }
  }

  /// Resumes every instance whose own declaration does not keep it
  /// paused.
  pub fn resume(&mut self, shared: &mut ControllerShared, now: f64) {
    if !self.suspended {
      return;
    }
    self.suspended = false;
    let mut ctx = self.ctx_fields(shared, now);
    for transition in self.transitions.values_mut() {
      transition.update(&mut ctx, AnimationInput::PlayStateRunning);
    }
    for animation in self.keyframe_animations.values_mut() {
      if animation.machine().descriptor().play_state == AnimationPlayState::Running {
        animation.update(&mut ctx, AnimationInput::PlayStateRunning);
      }
    }
  }

  /// Freezes the named keyframe animation `time` seconds in.
  pub fn pause_animation_at_time(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    name: &str,
    time: f64,
  ) -> Result<()> {
    let Some(animation) = self.keyframe_animations.get_mut(name) else {
      return Err(Error::UnknownAnimation(name.to_string()));
    };
    if time < 0.0 {
      return Err(Error::InvalidFreezeTime { time });
    }
    {
      let mut ctx = AnimationContext {
        target: self.target,
        now,
        shared,
      };
      animation.freeze_at_time(&mut ctx, time);
    }
    self.apply_override_requests(shared, now);
    Ok(())
  }

  /// Freezes the transition on `property` `time` seconds in.
  pub fn pause_transition_at_time(
    &mut self,
    shared: &mut ControllerShared,
    now: f64,
    property: PropertyId,
    time: f64,
  ) -> Result<()> {
    let Some(transition) = self.transitions.get_mut(&property) else {
      return Err(Error::UnknownTransition(property.name()));
    };
    if time < 0.0 {
      return Err(Error::InvalidFreezeTime { time });
    }
    let mut ctx = AnimationContext {
      target: self.target,
      now,
      shared,
    };
    transition.freeze_at_time(&mut ctx, time);
    Ok(())
  }

  /// Tears everything down, purging the controller waiting sets.
  pub fn detach(&mut self, shared: &mut ControllerShared, now: f64) {
    let mut ctx = self.ctx_fields(shared, now);
    for transition in self.transitions.values_mut() {
      transition.update(&mut ctx, AnimationInput::EndAnimation);
    }
    for animation in self.keyframe_animations.values_mut() {
      animation.update(&mut ctx, AnimationInput::EndAnimation);
    }
    self.transitions.clear();
    self.keyframe_animations.clear();
    self.keyframe_order.clear();
    shared.take_override_requests();
  }

  /// Whether the transition on `property` reports itself overridden.
  pub fn transition_overridden(&self, property: PropertyId) -> Option<bool> {
    self.transitions.get(&property).map(|t| t.overridden())
  }

  /// Whether the transition on `property` currently runs accelerated.
  pub fn transition_accelerated(&self, property: PropertyId) -> Option<bool> {
    self
      .transitions
      .get(&property)
      .map(|t| t.machine().is_accelerated())
  }
}
