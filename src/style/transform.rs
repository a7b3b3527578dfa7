//! Transform lists and matrix interpolation.
//!
//! A computed `transform` is an ordered list of primitive operations.
//! When two lists have the same shape (same length, same operation kind
//! in every slot) they blend per-function and per-operand; otherwise
//! both endpoints are flattened to 4x4 matrices and interpolated through
//! matrix decomposition (translate/scale/skew/quaternion), which keeps
//! rotations on the short arc instead of shearing through a raw
//! component-wise lerp.

use crate::style::values::{lerp, Length};
use std::mem::discriminant;

/// One primitive transform function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOperation {
  /// `translate(x, y)`
  Translate(Length, Length),
  /// `scale(sx, sy)`
  Scale(f64, f64),
  /// `rotate(deg)`
  Rotate(f64),
  /// `skew(ax_deg, ay_deg)`
  Skew(f64, f64),
  /// `matrix3d(...)`, column-major.
  Matrix(Matrix4),
}

impl TransformOperation {
  fn to_matrix(self) -> Matrix4 {
    match self {
      TransformOperation::Translate(x, y) => Matrix4::translate(x.px, y.px, 0.0),
      TransformOperation::Scale(sx, sy) => Matrix4::scale(sx, sy, 1.0),
      TransformOperation::Rotate(deg) => Matrix4::rotate_z(deg.to_radians()),
      TransformOperation::Skew(ax, ay) => Matrix4::skew(ax.to_radians(), ay.to_radians()),
      TransformOperation::Matrix(m) => m,
    }
  }

  fn blend(from: &TransformOperation, to: &TransformOperation, t: f64) -> TransformOperation {
    use TransformOperation::*;
    match (from, to) {
      (Translate(ax, ay), Translate(bx, by)) => {
        Translate(Length::blend(*ax, *bx, t), Length::blend(*ay, *by, t))
      }
      (Scale(axs, ays), Scale(bxs, bys)) => Scale(lerp(*axs, *bxs, t), lerp(*ays, *bys, t)),
      (Rotate(a), Rotate(b)) => Rotate(lerp(*a, *b, t)),
      (Skew(axs, ays), Skew(bxs, bys)) => Skew(lerp(*axs, *bxs, t), lerp(*ays, *bys, t)),
      (Matrix(a), Matrix(b)) => Matrix(Matrix4::blend_decomposed(a, b, t)),
      // Mismatched slots never reach here; list matching is validated first.
      _ => unreachable!("blending mismatched transform operations"),
    }
  }
}

/// An ordered transform function list.
pub type TransformList = Vec<TransformOperation>;

/// Whether two lists blend per-function.
///
/// Lists match when they have the same length and the same operation
/// kind in every slot. An empty list acts as a wildcard: it matches any
/// list (and blends against the identity of each function in the other).
pub fn transform_lists_match(a: &[TransformOperation], b: &[TransformOperation]) -> bool {
  if a.is_empty() || b.is_empty() {
    return true;
  }
  a.len() == b.len()
    && a
      .iter()
      .zip(b.iter())
      .all(|(x, y)| discriminant(x) == discriminant(y))
}

fn identity_of(op: &TransformOperation) -> TransformOperation {
  match op {
    TransformOperation::Translate(..) => {
      TransformOperation::Translate(Length::default(), Length::default())
    }
    TransformOperation::Scale(..) => TransformOperation::Scale(1.0, 1.0),
    TransformOperation::Rotate(..) => TransformOperation::Rotate(0.0),
    TransformOperation::Skew(..) => TransformOperation::Skew(0.0, 0.0),
    TransformOperation::Matrix(..) => TransformOperation::Matrix(Matrix4::identity()),
  }
}

/// Blends two transform lists.
///
/// `lists_match` is the interval-wide validation computed by the caller
/// (for keyframe sets it must hold across every keyframe, not just the
/// two endpoints). When false, both sides are flattened and interpolated
/// through decomposition.
pub fn blend_transform_lists(
  from: &[TransformOperation],
  to: &[TransformOperation],
  progress: f64,
  lists_match: bool,
) -> TransformList {
  if lists_match && transform_lists_match(from, to) {
    let len = from.len().max(to.len());
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
      let (f, t) = match (from.get(i), to.get(i)) {
        (Some(f), Some(t)) => (*f, *t),
        (Some(f), None) => (*f, identity_of(f)),
        (None, Some(t)) => (identity_of(t), *t),
        (None, None) => unreachable!(),
      };
      out.push(TransformOperation::blend(&f, &t, progress));
    }
    out
  } else {
    let fm = compose_list(from);
    let tm = compose_list(to);
    vec![TransformOperation::Matrix(Matrix4::blend_decomposed(
      &fm, &tm, progress,
    ))]
  }
}

/// Flattens a list to a single matrix.
pub fn compose_list(list: &[TransformOperation]) -> Matrix4 {
  let mut m = Matrix4::identity();
  for op in list {
    m = m.multiply(&op.to_matrix());
  }
  m
}

/// A 4x4 column-major transform matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4 {
  /// Elements in column-major order: `m[col * 4 + row]`.
  pub m: [f64; 16],
}

impl Matrix4 {
  pub fn identity() -> Matrix4 {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    Matrix4 { m }
  }

  pub fn translate(x: f64, y: f64, z: f64) -> Matrix4 {
    let mut out = Matrix4::identity();
    out.m[12] = x;
    out.m[13] = y;
    out.m[14] = z;
    out
  }

  pub fn scale(x: f64, y: f64, z: f64) -> Matrix4 {
    let mut out = Matrix4::identity();
    out.m[0] = x;
    out.m[5] = y;
    out.m[10] = z;
    out
  }

  pub fn rotate_z(radians: f64) -> Matrix4 {
    let (s, c) = radians.sin_cos();
    let mut out = Matrix4::identity();
    out.m[0] = c;
    out.m[1] = s;
    out.m[4] = -s;
    out.m[5] = c;
    out
  }

  pub fn skew(ax_radians: f64, ay_radians: f64) -> Matrix4 {
    let mut out = Matrix4::identity();
    out.m[4] = ax_radians.tan();
    out.m[1] = ay_radians.tan();
    out
  }

  /// `self * other`, applying `other` first.
  pub fn multiply(&self, other: &Matrix4) -> Matrix4 {
    let a = &self.m;
    let b = &other.m;
    let mut out = [0.0; 16];
    for col in 0..4 {
      for row in 0..4 {
        let mut sum = 0.0;
        for k in 0..4 {
          sum += a[k * 4 + row] * b[col * 4 + k];
        }
        out[col * 4 + row] = sum;
      }
    }
    Matrix4 { m: out }
  }

  /// Decomposition-based interpolation between two matrices.
  ///
  /// Falls back to a straight component lerp if either matrix fails to
  /// decompose (singular linear part).
  pub fn blend_decomposed(from: &Matrix4, to: &Matrix4, t: f64) -> Matrix4 {
    match (from.decompose(), to.decompose()) {
      (Some(a), Some(b)) => Decomposed::interpolate(&a, &b, t).recompose(),
      _ => {
        let mut m = [0.0; 16];
        for i in 0..16 {
          m[i] = lerp(from.m[i], to.m[i], t);
        }
        Matrix4 { m }
      }
    }
  }

  fn decompose(&self) -> Option<Decomposed> {
    let m = &self.m;
    if m[15] == 0.0 {
      return None;
    }

    let translate = [m[12], m[13], m[14]];

    // Columns of the upper 3x3.
    let mut rows = [
      [m[0], m[1], m[2]],
      [m[4], m[5], m[6]],
      [m[8], m[9], m[10]],
    ];

    let mut scale = [0.0f64; 3];
    let mut skew = [0.0f64; 3]; // xy, xz, yz

    scale[0] = norm(&rows[0]);
    if scale[0] == 0.0 {
      return None;
    }
    rows[0] = div(&rows[0], scale[0]);

    skew[0] = dot(&rows[0], &rows[1]);
    rows[1] = sub(&rows[1], &mul(&rows[0], skew[0]));
    scale[1] = norm(&rows[1]);
    if scale[1] == 0.0 {
      return None;
    }
    rows[1] = div(&rows[1], scale[1]);
    skew[0] /= scale[1];

    skew[1] = dot(&rows[0], &rows[2]);
    rows[2] = sub(&rows[2], &mul(&rows[0], skew[1]));
    skew[2] = dot(&rows[1], &rows[2]);
    rows[2] = sub(&rows[2], &mul(&rows[1], skew[2]));
    scale[2] = norm(&rows[2]);
    if scale[2] == 0.0 {
      return None;
    }
    rows[2] = div(&rows[2], scale[2]);
    skew[1] /= scale[2];
    skew[2] /= scale[2];

    // Flip if the coordinate system was inverted.
    if dot(&rows[0], &cross(&rows[1], &rows[2])) < 0.0 {
      for i in 0..3 {
        scale[i] = -scale[i];
        rows[i] = mul(&rows[i], -1.0);
      }
    }

    // Rotation matrix to quaternion.
    let trace = rows[0][0] + rows[1][1] + rows[2][2];
    let mut quat = [0.0f64; 4]; // x, y, z, w
    if trace > 0.0 {
      let s = 0.5 / (trace + 1.0).sqrt();
      quat[3] = 0.25 / s;
      quat[0] = (rows[1][2] - rows[2][1]) * s;
      quat[1] = (rows[2][0] - rows[0][2]) * s;
      quat[2] = (rows[0][1] - rows[1][0]) * s;
    } else if rows[0][0] > rows[1][1] && rows[0][0] > rows[2][2] {
      let s = 2.0 * (1.0 + rows[0][0] - rows[1][1] - rows[2][2]).sqrt();
      quat[0] = 0.25 * s;
      quat[1] = (rows[1][0] + rows[0][1]) / s;
      quat[2] = (rows[2][0] + rows[0][2]) / s;
      quat[3] = (rows[1][2] - rows[2][1]) / s;
    } else if rows[1][1] > rows[2][2] {
      let s = 2.0 * (1.0 + rows[1][1] - rows[0][0] - rows[2][2]).sqrt();
      quat[0] = (rows[1][0] + rows[0][1]) / s;
      quat[1] = 0.25 * s;
      quat[2] = (rows[2][1] + rows[1][2]) / s;
      quat[3] = (rows[2][0] - rows[0][2]) / s;
    } else {
      let s = 2.0 * (1.0 + rows[2][2] - rows[0][0] - rows[1][1]).sqrt();
      quat[0] = (rows[2][0] + rows[0][2]) / s;
      quat[1] = (rows[2][1] + rows[1][2]) / s;
      quat[2] = 0.25 * s;
      quat[3] = (rows[0][1] - rows[1][0]) / s;
    }

    Some(Decomposed {
      translate,
      scale,
      skew,
      quaternion: quat,
    })
  }
}

/// The factored form of an affine matrix.
#[derive(Debug, Clone, Copy)]
struct Decomposed {
  translate: [f64; 3],
  scale: [f64; 3],
  skew: [f64; 3],
  quaternion: [f64; 4],
}

impl Decomposed {
  fn interpolate(a: &Decomposed, b: &Decomposed, t: f64) -> Decomposed {
    Decomposed {
      translate: lerp3(&a.translate, &b.translate, t),
      scale: lerp3(&a.scale, &b.scale, t),
      skew: lerp3(&a.skew, &b.skew, t),
      quaternion: slerp(&a.quaternion, &b.quaternion, t),
    }
  }

  fn recompose(&self) -> Matrix4 {
    let [x, y, z, w] = self.quaternion;
    let mut rot = Matrix4::identity();
    rot.m[0] = 1.0 - 2.0 * (y * y + z * z);
    rot.m[1] = 2.0 * (x * y + z * w);
    rot.m[2] = 2.0 * (x * z - y * w);
    rot.m[4] = 2.0 * (x * y - z * w);
    rot.m[5] = 1.0 - 2.0 * (x * x + z * z);
    rot.m[6] = 2.0 * (y * z + x * w);
    rot.m[8] = 2.0 * (x * z + y * w);
    rot.m[9] = 2.0 * (y * z - x * w);
    rot.m[10] = 1.0 - 2.0 * (x * x + y * y);

    let mut out = Matrix4::translate(self.translate[0], self.translate[1], self.translate[2])
      .multiply(&rot);

    // Skew: yz, then xz, then xy.
    if self.skew[2] != 0.0 {
      let mut tmp = Matrix4::identity();
      tmp.m[9] = self.skew[2];
      out = out.multiply(&tmp);
    }
    if self.skew[1] != 0.0 {
      let mut tmp = Matrix4::identity();
      tmp.m[8] = self.skew[1];
      out = out.multiply(&tmp);
    }
    if self.skew[0] != 0.0 {
      let mut tmp = Matrix4::identity();
      tmp.m[4] = self.skew[0];
      out = out.multiply(&tmp);
    }

    out.multiply(&Matrix4::scale(self.scale[0], self.scale[1], self.scale[2]))
  }
}

fn lerp3(a: &[f64; 3], b: &[f64; 3], t: f64) -> [f64; 3] {
  [
    lerp(a[0], b[0], t),
    lerp(a[1], b[1], t),
    lerp(a[2], b[2], t),
  ]
}

fn slerp(a: &[f64; 4], b: &[f64; 4], t: f64) -> [f64; 4] {
  let mut b = *b;
  let mut cos_half = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];
  // Take the short arc.
  if cos_half < 0.0 {
    for v in b.iter_mut() {
      *v = -*v;
    }
    cos_half = -cos_half;
  }
  if cos_half > 0.9995 {
    // Nearly parallel: lerp and renormalize.
    let mut out = [0.0; 4];
    for i in 0..4 {
      out[i] = lerp(a[i], b[i], t);
    }
    let n = (out[0] * out[0] + out[1] * out[1] + out[2] * out[2] + out[3] * out[3]).sqrt();
    for v in out.iter_mut() {
      *v /= n;
    }
    return out;
  }
  let half = cos_half.clamp(-1.0, 1.0).acos();
  let sin_half = half.sin();
  let ratio_a = ((1.0 - t) * half).sin() / sin_half;
  let ratio_b = (t * half).sin() / sin_half;
  let mut out = [0.0; 4];
  for i in 0..4 {
    out[i] = a[i] * ratio_a + b[i] * ratio_b;
  }
  out
}

fn norm(v: &[f64; 3]) -> f64 {
  dot(v, v).sqrt()
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
  a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
  [
    a[1] * b[2] - a[2] * b[1],
    a[2] * b[0] - a[0] * b[2],
    a[0] * b[1] - a[1] * b[0],
  ]
}

fn mul(v: &[f64; 3], s: f64) -> [f64; 3] {
  [v[0] * s, v[1] * s, v[2] * s]
}

fn div(v: &[f64; 3], s: f64) -> [f64; 3] {
  [v[0] / s, v[1] / s, v[2] / s]
}

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
  [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
