// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes and transform helpers
//!
//! All bounds are tracked in f64 to avoid Float32 precision loss with
//! large (georeferenced) coordinates before quantization.

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis-aligned bounding box in f64 precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Point3<f64>,
    /// Maximum corner
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a collapsed box that expands to the first point added
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Create a box from explicit corners
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create a box from `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub fn from_array(values: [f64; 6]) -> Self {
        Self {
            min: Point3::new(values[0], values[1], values[2]),
            max: Point3::new(values[3], values[4], values[5]),
        }
    }

    /// Flatten to `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    /// Check that at least one point has been added
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Expand to include a point
    #[inline]
    pub fn expand_point(&mut self, p: &Point3<f64>) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand to include another box
    #[inline]
    pub fn expand(&mut self, other: &Aabb) {
        if other.is_valid() {
            self.expand_point(&other.min);
            self.expand_point(&other.max);
        }
    }

    /// Center of the box
    #[inline]
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Per-axis extent (max - min)
    #[inline]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Length of the diagonal
    #[inline]
    pub fn diagonal(&self) -> f64 {
        self.extent().norm()
    }

    /// Index of the longest axis (0 = X, 1 = Y, 2 = Z)
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// Bounds of this box after an affine transform
    ///
    /// Transforms the eight corners and re-collects them; the result
    /// contains every transformed point of the original box.
    pub fn transformed(&self, m: &Matrix4<f64>) -> Aabb {
        let mut out = Aabb::empty();
        for corner in 0..8u8 {
            let p = Point3::new(
                if corner & 1 != 0 { self.max.x } else { self.min.x },
                if corner & 2 != 0 { self.max.y } else { self.min.y },
                if corner & 4 != 0 { self.max.z } else { self.min.z },
            );
            out.expand_point(&m.transform_point(&p));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Rotation that converts Z-up coordinates to Y-up: (x, y, z) -> (x, z, -y)
///
/// Applied to mesh transforms when a source format (CityJSON, LAS) models
/// the vertical axis as Z.
pub fn rotate_x_90() -> Matrix4<f64> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_invalid() {
        let aabb = Aabb::empty();
        assert!(!aabb.is_valid());
    }

    #[test]
    fn test_expand_and_center() {
        let mut aabb = Aabb::empty();
        aabb.expand_point(&Point3::new(100.0, 200.0, 50.0));
        aabb.expand_point(&Point3::new(150.0, 250.0, 75.0));

        assert!(aabb.is_valid());
        assert_eq!(aabb.min.x, 100.0);
        assert_eq!(aabb.max.y, 250.0);
        assert_eq!(aabb.center(), Point3::new(125.0, 225.0, 62.5));
    }

    #[test]
    fn test_diagonal() {
        let aabb = Aabb::new(Point3::origin(), Point3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(aabb.diagonal(), 5.0);
    }

    #[test]
    fn test_longest_axis() {
        let aabb = Aabb::new(Point3::origin(), Point3::new(1.0, 5.0, 2.0));
        assert_eq!(aabb.longest_axis(), 1);
    }

    #[test]
    fn test_transformed_translation() {
        let aabb = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let m = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        let moved = aabb.transformed(&m);
        assert_relative_eq!(moved.min.x, 10.0);
        assert_relative_eq!(moved.max.x, 11.0);
    }

    #[test]
    fn test_rotate_x_90_maps_z_up_to_y_up() {
        let m = rotate_x_90();
        let p = m.transform_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 3.0);
        assert_relative_eq!(p.z, -2.0);
    }
}
