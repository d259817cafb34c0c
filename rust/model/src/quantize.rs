// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Position quantization and normal oct-encoding
//!
//! Positions are stored as signed 16-bit offsets from a local origin. The
//! decode step per axis is chosen so that every value inside the source
//! AABB round-trips with an error of at most half a step. Normals are
//! packed to two signed bytes with octahedral encoding.

use crate::math::Aabb;
use nalgebra::Point3;

/// Largest quantized magnitude per axis
const QUANT_RANGE: f64 = 32767.0;

/// Decode record for a quantized coordinate range
///
/// `world = origin + q * step` per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationRange {
    /// Local origin (AABB center)
    pub origin: [f64; 3],
    /// Decode step per axis
    pub step: [f64; 3],
}

impl Default for QuantizationRange {
    fn default() -> Self {
        Self::unit()
    }
}

impl QuantizationRange {
    /// Build a decode record covering the given bounds
    ///
    /// A collapsed axis gets a unit step so quantization degenerates to
    /// the origin value exactly.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let center = aabb.center();
        let extent = aabb.extent();
        let mut step = [1.0f64; 3];
        for axis in 0..3 {
            let half = extent[axis] / 2.0;
            if half > 0.0 {
                step[axis] = half / QUANT_RANGE;
            }
        }
        Self {
            origin: [center.x, center.y, center.z],
            step,
        }
    }

    /// Identity-like record for models with nothing to quantize
    pub fn unit() -> Self {
        Self {
            origin: [0.0; 3],
            step: [1.0; 3],
        }
    }

    /// Quantize one coordinate
    #[inline]
    pub fn quantize(&self, value: f64, axis: usize) -> i16 {
        let q = ((value - self.origin[axis]) / self.step[axis]).round();
        q.clamp(-QUANT_RANGE, QUANT_RANGE) as i16
    }

    /// Decode one coordinate
    #[inline]
    pub fn dequantize(&self, q: i16, axis: usize) -> f64 {
        self.origin[axis] + q as f64 * self.step[axis]
    }

    /// Quantize an interleaved xyz position buffer
    pub fn quantize_positions(&self, positions: &[f64]) -> Vec<i16> {
        let mut out = Vec::with_capacity(positions.len());
        for chunk in positions.chunks_exact(3) {
            out.push(self.quantize(chunk[0], 0));
            out.push(self.quantize(chunk[1], 1));
            out.push(self.quantize(chunk[2], 2));
        }
        out
    }

    /// Decode an interleaved quantized buffer back to f64 positions
    pub fn dequantize_positions(&self, quantized: &[i16]) -> Vec<f64> {
        let mut out = Vec::with_capacity(quantized.len());
        for chunk in quantized.chunks_exact(3) {
            out.push(self.dequantize(chunk[0], 0));
            out.push(self.dequantize(chunk[1], 1));
            out.push(self.dequantize(chunk[2], 2));
        }
        out
    }

    /// Decode a quantized position as a point
    pub fn dequantize_point(&self, q: [i16; 3]) -> Point3<f64> {
        Point3::new(
            self.dequantize(q[0], 0),
            self.dequantize(q[1], 1),
            self.dequantize(q[2], 2),
        )
    }
}

/// Pack a unit normal into two signed bytes (octahedral encoding)
pub fn oct_encode_normal(normal: [f32; 3]) -> [i8; 2] {
    let [x, y, z] = normal;
    let l1 = x.abs() + y.abs() + z.abs();
    if l1 == 0.0 {
        return [0, 0];
    }
    let mut u = x / l1;
    let mut v = y / l1;
    if z < 0.0 {
        let (ou, ov) = (u, v);
        u = (1.0 - ov.abs()) * sign_not_zero(ou);
        v = (1.0 - ou.abs()) * sign_not_zero(ov);
    }
    [
        (u * 127.0).round().clamp(-127.0, 127.0) as i8,
        (v * 127.0).round().clamp(-127.0, 127.0) as i8,
    ]
}

/// Unpack an octahedral-encoded normal to a unit vector
pub fn oct_decode_normal(encoded: [i8; 2]) -> [f32; 3] {
    let mut x = encoded[0] as f32 / 127.0;
    let mut y = encoded[1] as f32 / 127.0;
    let z = 1.0 - x.abs() - y.abs();
    if z < 0.0 {
        let (ox, oy) = (x, y);
        x = (1.0 - oy.abs()) * sign_not_zero(ox);
        y = (1.0 - ox.abs()) * sign_not_zero(oy);
    }
    let len = (x * x + y * y + z * z).sqrt();
    if len == 0.0 {
        return [0.0, 0.0, 0.0];
    }
    [x / len, y / len, z / len]
}

#[inline]
fn sign_not_zero(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}
