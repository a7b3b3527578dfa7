//! Shared fixtures: style builders and a recording compositor backend.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use fastmotion::{
  AnimatedStyle, AnimationController, AnimationDescriptor, CompositorBackend, Keyframe,
  KeyframeList, Length, ManualClock, NullCompositor, PropertyId, TargetId, TimingFunction,
  TransitionProperty,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum CompositorCall {
  Start(TargetId, PropertyId, f64),
  Pause(TargetId, PropertyId, f64),
  End(TargetId, PropertyId),
}

/// Records every backend call; cloning shares the log. An `accepting`
/// backend promises an asynchronous start-time notification like a real
/// compositor thread would; a `rejecting` one declines everything so
/// animations run in software, but still records the attempts.
#[derive(Clone, Default)]
pub struct RecordingCompositor {
  accept: bool,
  calls: Rc<RefCell<Vec<CompositorCall>>>,
}

impl RecordingCompositor {
  pub fn accepting() -> RecordingCompositor {
    RecordingCompositor {
      accept: true,
      calls: Rc::default(),
    }
  }

  pub fn rejecting() -> RecordingCompositor {
    RecordingCompositor::default()
  }

  pub fn calls(&self) -> Vec<CompositorCall> {
    self.calls.borrow().clone()
  }
}

impl CompositorBackend for RecordingCompositor {
  fn start_animation(&mut self, target: TargetId, property: PropertyId, time_offset: f64) -> bool {
    self
      .calls
      .borrow_mut()
      .push(CompositorCall::Start(target, property, time_offset));
    self.accept
  }

  fn pause_animation(&mut self, target: TargetId, property: PropertyId, time_offset: f64) {
    self
      .calls
      .borrow_mut()
      .push(CompositorCall::Pause(target, property, time_offset));
  }

  fn end_animation(&mut self, target: TargetId, property: PropertyId) {
    self
      .calls
      .borrow_mut()
      .push(CompositorCall::End(target, property));
  }
}

fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

pub fn software_controller(clock: &ManualClock) -> AnimationController {
  init_logging();
  AnimationController::with_collaborators(Box::new(clock.clone()), Box::new(NullCompositor))
}

pub fn recording_controller(
  clock: &ManualClock,
  compositor: &RecordingCompositor,
) -> AnimationController {
  init_logging();
  AnimationController::with_collaborators(Box::new(clock.clone()), Box::new(compositor.clone()))
}

pub fn width_style(px: f64) -> AnimatedStyle {
  AnimatedStyle {
    width: Length::px(px),
    ..AnimatedStyle::default()
  }
}

pub fn linear_transition(
  property: PropertyId,
  duration: f64,
  delay: f64,
) -> Arc<AnimationDescriptor> {
  let mut descriptor =
    AnimationDescriptor::transition(TransitionProperty::Id(property), duration, delay);
  descriptor.timing_function = TimingFunction::Linear;
  Arc::new(descriptor)
}

pub fn linear_keyframes_descriptor(name: &str, duration: f64) -> AnimationDescriptor {
  let mut descriptor = AnimationDescriptor::keyframes(name, duration);
  descriptor.timing_function = TimingFunction::Linear;
  descriptor
}

/// A two-frame width set: `from_px` at 0%, `to_px` at 100%.
pub fn width_keyframes(name: &str, from_px: f64, to_px: f64) -> KeyframeList {
  KeyframeList::new(
    name,
    vec![
      Keyframe::new(0.0, vec![PropertyId::Width], width_style(from_px)),
      Keyframe::new(1.0, vec![PropertyId::Width], width_style(to_px)),
    ],
  )
}

pub fn assert_width(style: &AnimatedStyle, expected: f64) {
  let got = style.width.px;
  assert!(
    (got - expected).abs() < 1e-6,
    "width: got {got}, expected {expected}"
  );
}

pub fn assert_opacity(style: &AnimatedStyle, expected: f64) {
  let got = style.opacity;
  assert!(
    (got - expected).abs() < 1e-6,
    "opacity: got {got}, expected {expected}"
  );
}
