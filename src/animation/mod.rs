//! Animation and transition timing.
//!
//! Declarative descriptors (`animation-*` / `transition-*` computed
//! values), keyframe sets, the per-instance state machine and the
//! per-document controller that drives it all.

pub mod clock;
pub mod composite;
pub mod controller;
pub mod keyframe;
pub mod machine;
pub mod transition;

use crate::blend::{PropertyId, TransitionProperty};
use crate::style::AnimatedStyle;
use crate::timing::TimingFunction;
use std::sync::Arc;

/// Opaque identifier of an animated element.
///
/// The engine never sees DOM nodes; the embedder keys everything by
/// this id and owns the mapping back to its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// `animation-direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
  #[default]
  Normal,
  Alternate,
  Reverse,
  AlternateReverse,
}

/// `animation-fill-mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
  #[default]
  None,
  Forwards,
  Backwards,
  Both,
}

impl FillMode {
  pub fn fills_forwards(self) -> bool {
    matches!(self, FillMode::Forwards | FillMode::Both)
  }

  pub fn fills_backwards(self) -> bool {
    matches!(self, FillMode::Backwards | FillMode::Both)
  }
}

/// `animation-play-state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationPlayState {
  #[default]
  Running,
  Paused,
}

/// What a descriptor animates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationTrigger {
  /// A transition over one computed property (or `all` / `none`).
  Transition(TransitionProperty),
  /// A keyframe animation, by `animation-name`.
  Keyframes(Arc<str>),
}

/// One computed `animation-*` or `transition-*` declaration.
///
/// Immutable once built; styles and instances share it by `Arc`, and a
/// style recalculation produces a fresh descriptor rather than mutating
/// one mid-flight.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDescriptor {
  /// Seconds per iteration.
  pub duration: f64,
  /// Seconds before the first iteration. Negative values start the
  /// animation partway through.
  pub delay: f64,
  /// `f64::INFINITY` for `animation-iteration-count: infinite`.
  /// Transitions always use 1.
  pub iteration_count: f64,
  pub direction: Direction,
  pub fill_mode: FillMode,
  pub play_state: AnimationPlayState,
  pub timing_function: TimingFunction,
  pub trigger: AnimationTrigger,
}

impl AnimationDescriptor {
  /// A transition descriptor with defaults for the animation-only knobs.
  pub fn transition(property: TransitionProperty, duration: f64, delay: f64) -> Self {
    AnimationDescriptor {
      duration,
      delay,
      iteration_count: 1.0,
      direction: Direction::Normal,
      fill_mode: FillMode::None,
      play_state: AnimationPlayState::Running,
      timing_function: TimingFunction::default(),
      trigger: AnimationTrigger::Transition(property),
    }
  }

  /// A keyframe-animation descriptor with defaults.
  pub fn keyframes(name: impl Into<Arc<str>>, duration: f64) -> Self {
    AnimationDescriptor {
      duration,
      delay: 0.0,
      iteration_count: 1.0,
      direction: Direction::Normal,
      fill_mode: FillMode::None,
      play_state: AnimationPlayState::Running,
      timing_function: TimingFunction::default(),
      trigger: AnimationTrigger::Keyframes(name.into()),
    }
  }

  pub fn is_transition(&self) -> bool {
    matches!(self.trigger, AnimationTrigger::Transition(_))
  }

  /// The keyframe set name, if this is a keyframe animation.
  pub fn name(&self) -> Option<&Arc<str>> {
    match &self.trigger {
      AnimationTrigger::Keyframes(name) => Some(name),
      AnimationTrigger::Transition(_) => None,
    }
  }

  pub fn transition_property(&self) -> Option<TransitionProperty> {
    match self.trigger {
      AnimationTrigger::Transition(p) => Some(p),
      AnimationTrigger::Keyframes(_) => None,
    }
  }

  /// Whether this descriptor can produce a running instance.
  ///
  /// Degenerate descriptors are skipped at refresh time: nothing to run
  /// when the active interval is empty or the iteration count is zero,
  /// and the `none` animation name is reserved.
  pub fn is_active_descriptor(&self) -> bool {
    if self.duration <= 0.0 && self.delay <= 0.0 {
      return false;
    }
    if self.iteration_count == 0.0 {
      return false;
    }
    match &self.trigger {
      AnimationTrigger::Keyframes(name) => !name.is_empty() && &**name != "none",
      AnimationTrigger::Transition(p) => *p != TransitionProperty::None,
    }
  }

  /// Whether `other` declares the same animation apart from its play
  /// state. A mismatch means a running instance must restart under the
  /// new timing rather than continue.
  pub fn matches_ignoring_play_state(&self, other: &AnimationDescriptor) -> bool {
    self.duration == other.duration
      && self.delay == other.delay
      && self.iteration_count == other.iteration_count
      && self.direction == other.direction
      && self.fill_mode == other.fill_mode
      && self.timing_function == other.timing_function
      && self.trigger == other.trigger
  }

  /// Duration of the whole active interval, excluding the delay.
  pub fn total_duration(&self) -> f64 {
    if self.iteration_count.is_infinite() {
      f64::INFINITY
    } else {
      self.duration * self.iteration_count
    }
  }
}

/// One keyframe of a registered set.
#[derive(Debug, Clone)]
pub struct Keyframe {
  /// Position in `[0, 1]`.
  pub offset: f64,
  /// The properties this keyframe specifies. Properties animated by the
  /// set but absent here fall through to the neighbouring keyframes.
  pub properties: Vec<PropertyId>,
  pub style: Arc<AnimatedStyle>,
  /// Per-keyframe `animation-timing-function`; the interval starting at
  /// this keyframe uses it instead of the descriptor's.
  pub timing_function: Option<TimingFunction>,
}

impl Keyframe {
  pub fn new(offset: f64, properties: Vec<PropertyId>, style: AnimatedStyle) -> Keyframe {
    Keyframe {
      offset,
      properties,
      style: Arc::new(style),
      timing_function: None,
    }
  }

  pub fn animates(&self, property: PropertyId) -> bool {
    self.properties.contains(&property)
  }
}

/// A named, offset-ordered keyframe set (`@keyframes`).
#[derive(Debug, Clone)]
pub struct KeyframeList {
  name: Arc<str>,
  keyframes: Vec<Keyframe>,
  properties: Vec<PropertyId>,
}

impl KeyframeList {
  /// Builds a set, sorting by offset and collecting the union of
  /// animated properties. Keyframes whose offset falls outside `[0, 1]`
  /// (or is not a number) are dropped, like invalid `@keyframes`
  /// selectors.
  pub fn new(name: impl Into<Arc<str>>, mut keyframes: Vec<Keyframe>) -> KeyframeList {
    keyframes.retain(|kf| kf.offset.is_finite() && (0.0..=1.0).contains(&kf.offset));
    keyframes.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    let mut properties: Vec<PropertyId> = Vec::new();
    for kf in &keyframes {
      for &p in &kf.properties {
        if !properties.contains(&p) {
          properties.push(p);
        }
      }
    }
    KeyframeList {
      name: name.into(),
      keyframes,
      properties,
    }
  }

  pub fn name(&self) -> &Arc<str> {
    &self.name
  }

  /// Keyframes in ascending offset order.
  pub fn keyframes(&self) -> &[Keyframe] {
    &self.keyframes
  }

  /// Union of properties animated by any keyframe.
  pub fn properties(&self) -> &[PropertyId] {
    &self.properties
  }

  pub fn animates(&self, property: PropertyId) -> bool {
    self.properties.contains(&property)
  }
}
