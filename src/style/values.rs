//! Animatable value primitives.
//!
//! Scalar building blocks used by the property blender: pixel lengths,
//! RGBA colors with premultiplied-alpha interpolation, shadows and
//! visibility. These are computed-value forms; unit resolution happens
//! upstream in the style system.

/// A computed length in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
  /// The value in pixels.
  pub px: f64,
}

impl Length {
  /// Creates a pixel length.
  pub fn px(px: f64) -> Length {
    Length { px }
  }

  /// Linear interpolation between two lengths.
  pub fn blend(from: Length, to: Length, progress: f64) -> Length {
    Length::px(lerp(from.px, to.px, progress))
  }
}

/// Linear interpolation between two scalars.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
  a + (b - a) * t
}

/// An RGBA color with non-premultiplied 0-255 channels and 0-1 alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: f32,
}

impl Rgba {
  pub const TRANSPARENT: Rgba = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 0.0,
  };
  pub const BLACK: Rgba = Rgba {
    r: 0,
    g: 0,
    b: 0,
    a: 1.0,
  };

  /// Creates a color from channels.
  pub fn new(r: u8, g: u8, b: u8, a: f32) -> Rgba {
    Rgba { r, g, b, a }
  }

  /// Creates an opaque color.
  pub fn opaque(r: u8, g: u8, b: u8) -> Rgba {
    Rgba { r, g, b, a: 1.0 }
  }
}

/// Blends two colors in premultiplied-alpha space.
///
/// Zero-alpha endpoints are special-cased before premultiplying so a
/// fade from transparent does not drag the color channels through black.
pub fn blend_color(from: Rgba, to: Rgba, progress: f64) -> Rgba {
  let (fr, fg, fb, fa) = premultiply_guarded(from);
  let (tr, tg, tb, ta) = premultiply_guarded(to);
  let r = lerp(fr, tr, progress);
  let g = lerp(fg, tg, progress);
  let b = lerp(fb, tb, progress);
  let a = lerp(fa, ta, progress);
  unpremultiply(r, g, b, a)
}

/// Blends optional colors, preserving "unset" semantics.
///
/// When the destination end is unset and progress has reached 1, the
/// result stays unset rather than becoming a blended value. Unset
/// endpoints otherwise blend as fully transparent.
pub fn blend_optional_color(from: Option<Rgba>, to: Option<Rgba>, progress: f64) -> Option<Rgba> {
  if progress >= 1.0 && to.is_none() {
    return None;
  }
  if from.is_none() && to.is_none() {
    return None;
  }
  let from = from.unwrap_or(Rgba::TRANSPARENT);
  let to = to.unwrap_or(Rgba::TRANSPARENT);
  Some(blend_color(from, to, progress))
}

// Zero alpha short-circuits to all-zero rather than multiplying the
// channels through, so a fully transparent endpoint contributes no hue
// and the division in unpremultiply restores the partner's channels.
fn premultiply_guarded(c: Rgba) -> (f64, f64, f64, f64) {
  if c.a <= 0.0 {
    (0.0, 0.0, 0.0, 0.0)
  } else {
    let a = c.a as f64;
    (c.r as f64 * a, c.g as f64 * a, c.b as f64 * a, a)
  }
}

fn unpremultiply(r: f64, g: f64, b: f64, a: f64) -> Rgba {
  if a <= 0.0 {
    return Rgba::TRANSPARENT;
  }
  let clamp = |v: f64| (v / a).round().clamp(0.0, 255.0) as u8;
  Rgba {
    r: clamp(r),
    g: clamp(g),
    b: clamp(b),
    a: a.clamp(0.0, 1.0) as f32,
  }
}

/// Shadow placement relative to the box edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowStyle {
  Outset,
  Inset,
}

/// One entry of a `box-shadow` / `text-shadow` list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
  pub offset_x: Length,
  pub offset_y: Length,
  pub blur: Length,
  pub spread: Length,
  pub color: Rgba,
  pub style: ShadowStyle,
}

impl Shadow {
  /// A zero-extent transparent shadow used to pad the shorter list when
  /// blending lists of different lengths. Matches the inset/outset style
  /// of its counterpart so the pair stays blendable.
  pub fn transparent(style: ShadowStyle) -> Shadow {
    Shadow {
      offset_x: Length::default(),
      offset_y: Length::default(),
      blur: Length::default(),
      spread: Length::default(),
      color: Rgba::TRANSPARENT,
      style,
    }
  }

  /// Component-wise blend of two shadows.
  pub fn blend(from: &Shadow, to: &Shadow, progress: f64) -> Shadow {
    Shadow {
      offset_x: Length::blend(from.offset_x, to.offset_x, progress),
      offset_y: Length::blend(from.offset_y, to.offset_y, progress),
      blur: Length::blend(from.blur, to.blur, progress),
      spread: Length::blend(from.spread, to.spread, progress),
      color: blend_color(from.color, to.color, progress),
      style: to.style,
    }
  }
}

/// Blends two shadow lists element-wise.
///
/// The shorter list is extended with transparent zero shadows whose
/// inset/outset style matches the longer list's entry at that slot.
pub fn blend_shadow_list(from: &[Shadow], to: &[Shadow], progress: f64) -> Vec<Shadow> {
  let len = from.len().max(to.len());
  let mut out = Vec::with_capacity(len);
  for i in 0..len {
    let (f, t) = match (from.get(i), to.get(i)) {
      (Some(f), Some(t)) => (*f, *t),
      (Some(f), None) => (*f, Shadow::transparent(f.style)),
      (None, Some(t)) => (Shadow::transparent(t.style), *t),
      (None, None) => unreachable!(),
    };
    out.push(Shadow::blend(&f, &t, progress));
  }
  out
}

/// Computed `visibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
  #[default]
  Visible,
  Hidden,
  Collapse,
}

/// Interpolates visibility through a synthetic 0/1 numeric channel.
///
/// The object stays visible for any nonzero blended value and snaps to
/// the invisible endpoint only exactly at 0.
pub fn blend_visibility(from: Visibility, to: Visibility, progress: f64) -> Visibility {
  if from != Visibility::Visible && to != Visibility::Visible {
    return to;
  }
  let from_val = if from == Visibility::Visible { 1.0 } else { 0.0 };
  let to_val = if to == Visibility::Visible { 1.0 } else { 0.0 };
  if from_val == to_val {
    return to;
  }
  let result = lerp(from_val, to_val, progress);
  if result > 0.0 {
    Visibility::Visible
  } else if to != Visibility::Visible {
    to
  } else {
    from
  }
}
