//! Human-readable payload format
//!
//! Rotations are rendered `(x, y, z, w)` and positions `(x, y, z)`, every
//! component with the same fixed number of decimals. Receivers strip the
//! parentheses and split on commas, so the precision is free to change.

use crate::error::{Error, Result};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Default number of decimals per component
pub const DEFAULT_PRECISION: usize = 5;

/// Text renderer for rotation and position payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFormat {
    precision: usize,
}

impl TextFormat {
    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    /// Render a rotation as `(x, y, z, w)`
    pub fn quaternion(&self, q: &UnitQuaternion<f32>) -> String {
        let p = self.precision;
        format!(
            "({:.p$}, {:.p$}, {:.p$}, {:.p$})",
            q.i,
            q.j,
            q.k,
            q.w,
            p = p
        )
    }

    /// Render a position as `(x, y, z)`
    pub fn vector(&self, v: &Vector3<f32>) -> String {
        let p = self.precision;
        format!("({:.p$}, {:.p$}, {:.p$})", v.x, v.y, v.z, p = p)
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION)
    }
}

fn parse_components<const N: usize>(text: &str) -> Result<[f32; N]> {
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    let mut out = [0.0f32; N];
    let mut count = 0;

    for part in inner.split(',') {
        if count == N {
            return Err(Error::InvalidPayload(format!(
                "expected {} components in {:?}",
                N, text
            )));
        }
        out[count] = part
            .trim()
            .parse::<f32>()
            .map_err(|e| Error::InvalidPayload(format!("{:?}: {}", text, e)))?;
        count += 1;
    }

    if count != N {
        return Err(Error::InvalidPayload(format!(
            "expected {} components in {:?}, got {}",
            N, text, count
        )));
    }
    Ok(out)
}

/// Parse `(x, y, z, w)` into a normalized rotation
///
/// Rendered payloads are rounded, so the parsed value is renormalized.
pub fn parse_quaternion(text: &str) -> Result<UnitQuaternion<f32>> {
    let [x, y, z, w] = parse_components::<4>(text)?;
    let raw = Quaternion::new(w, x, y, z);
    if raw.norm() == 0.0 || !raw.norm().is_finite() {
        return Err(Error::InvalidPayload(format!(
            "degenerate rotation {:?}",
            text
        )));
    }
    Ok(UnitQuaternion::from_quaternion(raw))
}

/// Parse `(x, y, z)` into a position
pub fn parse_vector(text: &str) -> Result<Vector3<f32>> {
    let [x, y, z] = parse_components::<3>(text)?;
    Ok(Vector3::new(x, y, z))
}
