//! The property blender.
//!
//! Every animatable property is addressed through an explicit wrapper
//! record rather than virtual dispatch: a `PropertyWrapper` pairs the
//! property id with fn pointers for equality and blending over
//! [`AnimatedStyle`] snapshots, plus a flag for compositor eligibility.
//! Shorthands (currently `margin`) get wrappers that fan out over their
//! longhands, so a shorthand transition is one instance blending four
//! fields.

use crate::style::transform::{blend_transform_lists, transform_lists_match};
use crate::style::values::{
  blend_color, blend_optional_color, blend_shadow_list, blend_visibility, lerp, Length,
};
use crate::style::AnimatedStyle;

/// Identifier of an animatable property.
///
/// `Ord` follows declaration here and gives transitions their
/// deterministic blending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyId {
  Opacity,
  Color,
  BackgroundColor,
  Width,
  Height,
  Left,
  Top,
  MarginTop,
  MarginRight,
  MarginBottom,
  MarginLeft,
  /// Shorthand over the four margin longhands.
  Margin,
  Transform,
  BoxShadow,
  TextShadow,
  Visibility,
}

impl PropertyId {
  /// CSS name of the property.
  pub fn name(self) -> &'static str {
    wrapper(self).name
  }

  /// Whether the property can run on the compositor.
  pub fn is_accelerated(self) -> bool {
    wrapper(self).accelerated
  }

  /// Longhands a shorthand expands to, or `None` for longhands.
  pub fn shorthand_longhands(self) -> Option<&'static [PropertyId]> {
    match self {
      PropertyId::Margin => Some(&[
        PropertyId::MarginTop,
        PropertyId::MarginRight,
        PropertyId::MarginBottom,
        PropertyId::MarginLeft,
      ]),
      _ => None,
    }
  }
}

/// The computed value of `transition-property`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionProperty {
  /// Transition every animatable longhand.
  All,
  /// Transition nothing.
  None,
  /// Transition one property (possibly a shorthand).
  Id(PropertyId),
}

/// Every longhand wrapper, in blending order. `transition-property: all`
/// fans out over this list; shorthands are excluded so their longhands
/// are not animated twice.
pub fn all_transitionable() -> &'static [PropertyId] {
  &[
    PropertyId::Opacity,
    PropertyId::Color,
    PropertyId::BackgroundColor,
    PropertyId::Width,
    PropertyId::Height,
    PropertyId::Left,
    PropertyId::Top,
    PropertyId::MarginTop,
    PropertyId::MarginRight,
    PropertyId::MarginBottom,
    PropertyId::MarginLeft,
    PropertyId::Transform,
    PropertyId::BoxShadow,
    PropertyId::TextShadow,
    PropertyId::Visibility,
  ]
}

/// Caller-supplied context for a blend call.
///
/// `transform_lists_match` is validated over the whole animation (for
/// keyframe sets: every keyframe pair) before blending starts; when
/// false the transform wrapper takes the matrix-decomposition path even
/// for pairs that would match in isolation.
#[derive(Debug, Clone, Copy)]
pub struct BlendContext {
  pub transform_lists_match: bool,
}

impl Default for BlendContext {
  fn default() -> Self {
    BlendContext {
      transform_lists_match: true,
    }
  }
}

/// One entry of the wrapper table.
pub struct PropertyWrapper {
  pub property: PropertyId,
  pub name: &'static str,
  /// True when the property runs on the compositor (opacity, transform).
  pub accelerated: bool,
  equal: fn(&AnimatedStyle, &AnimatedStyle) -> bool,
  blend: fn(&AnimatedStyle, &AnimatedStyle, &mut AnimatedStyle, f64, &BlendContext),
}

impl PropertyWrapper {
  /// Whether the property's value matches in both snapshots.
  pub fn equals(&self, a: &AnimatedStyle, b: &AnimatedStyle) -> bool {
    (self.equal)(a, b)
  }

  /// Writes the blend of `from` and `to` at `progress` into `dst`.
  pub fn blend(
    &self,
    from: &AnimatedStyle,
    to: &AnimatedStyle,
    dst: &mut AnimatedStyle,
    progress: f64,
    ctx: &BlendContext,
  ) {
    (self.blend)(from, to, dst, progress, ctx);
  }
}

/// Looks up the wrapper for a property.
pub fn wrapper(property: PropertyId) -> &'static PropertyWrapper {
  // The table is ordered by PropertyId declaration order.
  let w = &property_wrappers()[property as usize];
  debug_assert_eq!(w.property, property);
  w
}

/// Convenience: blends one property between two snapshots into `dst`.
pub fn blend_property(
  property: PropertyId,
  from: &AnimatedStyle,
  to: &AnimatedStyle,
  dst: &mut AnimatedStyle,
  progress: f64,
  ctx: &BlendContext,
) {
  wrapper(property).blend(from, to, dst, progress, ctx);
}

macro_rules! field_wrapper {
  ($prop:expr, $name:literal, $field:ident, $blend:expr) => {
    PropertyWrapper {
      property: $prop,
      name: $name,
      accelerated: false,
      equal: |a, b| a.$field == b.$field,
      blend: |from, to, dst, progress, _ctx| {
        dst.$field = $blend(from.$field, to.$field, progress);
      },
    }
  };
}

fn property_wrappers() -> &'static [PropertyWrapper] {
  static WRAPPERS: &[PropertyWrapper] = &[
    PropertyWrapper {
      property: PropertyId::Opacity,
      name: "opacity",
      accelerated: true,
      equal: |a, b| a.opacity == b.opacity,
      blend: |from, to, dst, progress, _ctx| {
        dst.opacity = lerp(from.opacity, to.opacity, progress).clamp(0.0, 1.0);
      },
    },
    field_wrapper!(PropertyId::Color, "color", color, |f, t, p| blend_color(
      f, t, p
    )),
    PropertyWrapper {
      property: PropertyId::BackgroundColor,
      name: "background-color",
      accelerated: false,
      equal: |a, b| a.background_color == b.background_color,
      blend: |from, to, dst, progress, _ctx| {
        dst.background_color =
          blend_optional_color(from.background_color, to.background_color, progress);
      },
    },
    field_wrapper!(PropertyId::Width, "width", width, Length::blend),
    field_wrapper!(PropertyId::Height, "height", height, Length::blend),
    field_wrapper!(PropertyId::Left, "left", left, Length::blend),
    field_wrapper!(PropertyId::Top, "top", top, Length::blend),
    field_wrapper!(PropertyId::MarginTop, "margin-top", margin_top, Length::blend),
    field_wrapper!(
      PropertyId::MarginRight,
      "margin-right",
      margin_right,
      Length::blend
    ),
    field_wrapper!(
      PropertyId::MarginBottom,
      "margin-bottom",
      margin_bottom,
      Length::blend
    ),
    field_wrapper!(
      PropertyId::MarginLeft,
      "margin-left",
      margin_left,
      Length::blend
    ),
    PropertyWrapper {
      property: PropertyId::Margin,
      name: "margin",
      accelerated: false,
      equal: |a, b| {
        PropertyId::Margin
          .shorthand_longhands()
          .unwrap()
          .iter()
          .all(|&p| wrapper(p).equals(a, b))
      },
      blend: |from, to, dst, progress, ctx| {
        for &p in PropertyId::Margin.shorthand_longhands().unwrap() {
          wrapper(p).blend(from, to, dst, progress, ctx);
        }
      },
    },
    PropertyWrapper {
      property: PropertyId::Transform,
      name: "transform",
      accelerated: true,
      equal: |a, b| a.transform == b.transform,
      blend: |from, to, dst, progress, ctx| {
        dst.transform = blend_transform_lists(
          &from.transform,
          &to.transform,
          progress,
          ctx.transform_lists_match && transform_lists_match(&from.transform, &to.transform),
        );
      },
    },
    PropertyWrapper {
      property: PropertyId::BoxShadow,
      name: "box-shadow",
      accelerated: false,
      equal: |a, b| a.box_shadow == b.box_shadow,
      blend: |from, to, dst, progress, _ctx| {
        dst.box_shadow = blend_shadow_list(&from.box_shadow, &to.box_shadow, progress);
      },
    },
    PropertyWrapper {
      property: PropertyId::TextShadow,
      name: "text-shadow",
      accelerated: false,
      equal: |a, b| a.text_shadow == b.text_shadow,
      blend: |from, to, dst, progress, _ctx| {
        dst.text_shadow = blend_shadow_list(&from.text_shadow, &to.text_shadow, progress);
      },
    },
    PropertyWrapper {
      property: PropertyId::Visibility,
      name: "visibility",
      accelerated: false,
      equal: |a, b| a.visibility == b.visibility,
      blend: |from, to, dst, progress, _ctx| {
        dst.visibility = blend_visibility(from.visibility, to.visibility, progress);
      },
    },
  ];
  WRAPPERS
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::style::values::Rgba;

  #[test]
  fn table_order_matches_property_ids() {
    for (i, w) in property_wrappers().iter().enumerate() {
      assert_eq!(w.property as usize, i, "{}", w.name);
    }
  }

  #[test]
  fn identity_blend_leaves_style_unchanged() {
    let mut style = AnimatedStyle::default();
    style.opacity = 0.4;
    style.width = Length::px(120.0);
    style.background_color = Some(Rgba::opaque(9, 9, 9));
    let ctx = BlendContext::default();
    for &p in all_transitionable() {
      let mut dst = style.clone();
      blend_property(p, &style, &style, &mut dst, 0.37, &ctx);
      assert!(dst.animatable_fields_equal(&style), "{}", p.name());
    }
  }

  #[test]
  fn margin_shorthand_fans_out() {
    let from = AnimatedStyle::default();
    let mut to = AnimatedStyle::default();
    to.margin_top = Length::px(10.0);
    to.margin_left = Length::px(20.0);

    assert!(!wrapper(PropertyId::Margin).equals(&from, &to));

    let mut dst = from.clone();
    blend_property(
      PropertyId::Margin,
      &from,
      &to,
      &mut dst,
      0.5,
      &BlendContext::default(),
    );
    assert_eq!(dst.margin_top, Length::px(5.0));
    assert_eq!(dst.margin_left, Length::px(10.0));
    assert_eq!(dst.margin_bottom, Length::px(0.0));
  }

  #[test]
  fn margin_equal_requires_all_longhands() {
    let a = AnimatedStyle::default();
    let mut b = AnimatedStyle::default();
    assert!(wrapper(PropertyId::Margin).equals(&a, &b));
    b.margin_bottom = Length::px(1.0);
    assert!(!wrapper(PropertyId::Margin).equals(&a, &b));
  }

  #[test]
  fn accelerated_flags() {
    assert!(PropertyId::Opacity.is_accelerated());
    assert!(PropertyId::Transform.is_accelerated());
    assert!(!PropertyId::Width.is_accelerated());
    assert!(!PropertyId::Margin.is_accelerated());
  }

  #[test]
  fn opacity_blend_clamps() {
    let mut from = AnimatedStyle::default();
    from.opacity = 0.0;
    let mut to = AnimatedStyle::default();
    to.opacity = 1.0;
    let mut dst = AnimatedStyle::default();
    // Overshooting bezier output can push progress past 1.
    blend_property(
      PropertyId::Opacity,
      &from,
      &to,
      &mut dst,
      1.2,
      &BlendContext::default(),
    );
    assert_eq!(dst.opacity, 1.0);
  }
}
