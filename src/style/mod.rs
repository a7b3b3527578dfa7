//! Computed-style snapshots exchanged with the style system.
//!
//! The engine never reads the cascade; it receives [`AnimatedStyle`]
//! snapshots, blends between them, and hands blended snapshots back.
//! The snapshot also carries the declaration-derived `transition-*` and
//! `animation-*` descriptor lists, since composite refresh diffs those
//! against the running set.

pub mod transform;
pub mod values;

use crate::animation::AnimationDescriptor;
use crate::style::transform::TransformList;
use crate::style::values::{Length, Rgba, Shadow, Visibility};
use std::sync::Arc;

/// A snapshot of the animatable slice of a computed style.
///
/// Plain field bag with value semantics: cloning one is cheap enough to
/// do once per target per update pass, and `PartialEq` is what the
/// transition-refresh diff runs on. The property set is the
/// representative one the blending contract needs, not the full CSS
/// catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedStyle {
  pub opacity: f64,
  pub color: Rgba,
  /// `None` means no background color was set.
  pub background_color: Option<Rgba>,
  pub width: Length,
  pub height: Length,
  pub left: Length,
  pub top: Length,
  pub margin_top: Length,
  pub margin_right: Length,
  pub margin_bottom: Length,
  pub margin_left: Length,
  pub transform: TransformList,
  pub box_shadow: Vec<Shadow>,
  pub text_shadow: Vec<Shadow>,
  pub visibility: Visibility,

  /// Declared `transition-*` descriptors, in declaration order.
  pub transitions: Vec<Arc<AnimationDescriptor>>,
  /// Declared `animation-*` descriptors, in declaration order.
  pub animations: Vec<Arc<AnimationDescriptor>>,
}

impl Default for AnimatedStyle {
  fn default() -> AnimatedStyle {
    AnimatedStyle {
      opacity: 1.0,
      color: Rgba::BLACK,
      background_color: None,
      width: Length::default(),
      height: Length::default(),
      left: Length::default(),
      top: Length::default(),
      margin_top: Length::default(),
      margin_right: Length::default(),
      margin_bottom: Length::default(),
      margin_left: Length::default(),
      transform: Vec::new(),
      box_shadow: Vec::new(),
      text_shadow: Vec::new(),
      visibility: Visibility::Visible,
      transitions: Vec::new(),
      animations: Vec::new(),
    }
  }
}

impl AnimatedStyle {
  /// True when the animatable fields match, ignoring the declared
  /// descriptor lists. Transition refresh uses this to decide whether a
  /// target style change actually moves any animated value.
  pub fn animatable_fields_equal(&self, other: &AnimatedStyle) -> bool {
    self.opacity == other.opacity
      && self.color == other.color
      && self.background_color == other.background_color
      && self.width == other.width
      && self.height == other.height
      && self.left == other.left
      && self.top == other.top
      && self.margin_top == other.margin_top
      && self.margin_right == other.margin_right
      && self.margin_bottom == other.margin_bottom
      && self.margin_left == other.margin_left
      && self.transform == other.transform
      && self.box_shadow == other.box_shadow
      && self.text_shadow == other.text_shadow
      && self.visibility == other.visibility
  }
}
