// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry buffers and id types
//!
//! Geometries are immutable once created. Two geometries are content-equal
//! when their primitive type and all buffers match byte for byte; content
//! equality drives deduplication during finalize.

use crate::error::{Error, Result};
use crate::math::Aabb;
use nalgebra::Point3;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Stable geometry id, assigned in insertion order
    GeometryId
);
id_type!(
    /// Mesh id, assigned in insertion order
    MeshId
);
id_type!(
    /// Entity id, assigned in insertion order
    EntityId
);
id_type!(
    /// Material id, assigned in insertion order
    MaterialId
);
id_type!(
    /// Texture id, assigned in insertion order
    TextureId
);
id_type!(
    /// Texture set id, assigned in insertion order
    TextureSetId
);

/// Primitive topology of a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// Triangle list (surfaces)
    Triangles,
    /// Line list (wireframes, curve soups)
    Lines,
    /// Point list (point clouds)
    Points,
}

/// Vertex and index buffers for one geometry
///
/// Positions are mandatory; normals, UVs, colors and indices are optional.
/// Positions are kept in f64 until quantization so large coordinates do not
/// lose precision.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffers {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Vertex normals (nx, ny, nz), same length as positions
    pub normals: Option<Vec<f32>>,
    /// Texture coordinates (u, v), two per vertex
    pub uvs: Option<Vec<f32>>,
    /// Per-vertex colors (r, g, b, a), four bytes per vertex
    pub colors: Option<Vec<u8>>,
    /// Primitive indices into the vertex list
    pub indices: Option<Vec<u32>>,
}

impl GeometryBuffers {
    /// Create buffers holding only positions
    pub fn with_positions(positions: Vec<f64>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// Attach an index buffer
    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Attach a normal buffer
    pub fn normals(mut self, normals: Vec<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Attach a UV buffer
    pub fn uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach a per-vertex color buffer
    pub fn colors(mut self, colors: Vec<u8>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Number of vertices
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of index elements (0 when non-indexed)
    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, |i| i.len())
    }

    /// Check buffer lengths and index ranges for the given primitive type
    pub fn validate(&self, primitive: PrimitiveType) -> Result<()> {
        if self.positions.is_empty() {
            return Err(Error::InvalidGeometry("empty position buffer".into()));
        }
        if self.positions.len() % 3 != 0 {
            return Err(Error::InvalidGeometry(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        let vertex_count = self.vertex_count();

        if let Some(normals) = &self.normals {
            if normals.len() != self.positions.len() {
                return Err(Error::InvalidGeometry(format!(
                    "normal buffer length {} does not match {} vertices",
                    normals.len(),
                    vertex_count
                )));
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertex_count * 2 {
                return Err(Error::InvalidGeometry(format!(
                    "uv buffer length {} does not match {} vertices",
                    uvs.len(),
                    vertex_count
                )));
            }
        }
        if let Some(colors) = &self.colors {
            if colors.len() != vertex_count * 4 {
                return Err(Error::InvalidGeometry(format!(
                    "color buffer length {} does not match {} vertices",
                    colors.len(),
                    vertex_count
                )));
            }
        }

        match &self.indices {
            Some(indices) => {
                if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                    return Err(Error::InvalidGeometry(format!(
                        "index {} out of range for {} vertices",
                        bad, vertex_count
                    )));
                }
                let stride = match primitive {
                    PrimitiveType::Triangles => 3,
                    PrimitiveType::Lines => 2,
                    PrimitiveType::Points => 1,
                };
                if indices.len() % stride != 0 {
                    return Err(Error::InvalidGeometry(format!(
                        "index buffer length {} is not a multiple of {}",
                        indices.len(),
                        stride
                    )));
                }
            }
            None => {
                // Non-indexed: vertices are consumed sequentially
                let stride = match primitive {
                    PrimitiveType::Triangles => 3,
                    PrimitiveType::Lines => 2,
                    PrimitiveType::Points => 1,
                };
                if vertex_count % stride != 0 {
                    return Err(Error::InvalidGeometry(format!(
                        "{} vertices cannot form whole primitives without indices",
                        vertex_count
                    )));
                }
            }
        }

        Ok(())
    }

    /// Bounds of the position buffer in local coordinates
    pub fn local_aabb(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for chunk in self.positions.chunks_exact(3) {
            aabb.expand_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
        }
        aabb
    }
}

/// Immutable geometry owned by the scene model
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Stable id assigned at insertion
    pub id: GeometryId,
    /// Primitive topology
    pub primitive: PrimitiveType,
    /// Vertex and index buffers
    pub buffers: GeometryBuffers,
}

impl Geometry {
    /// Number of primitives (triangles, segments or points)
    pub fn primitive_count(&self) -> usize {
        let elements = if self.buffers.index_count() > 0 {
            self.buffers.index_count()
        } else {
            self.buffers.vertex_count()
        };
        match self.primitive {
            PrimitiveType::Triangles => elements / 3,
            PrimitiveType::Lines => elements / 2,
            PrimitiveType::Points => elements,
        }
    }

    /// Number of triangles (0 for non-triangle primitives)
    pub fn triangle_count(&self) -> usize {
        match self.primitive {
            PrimitiveType::Triangles => self.primitive_count(),
            _ => 0,
        }
    }

    /// 64-bit hash over the primitive type and all buffer contents
    ///
    /// Collisions are resolved with [`Geometry::content_eq`]; the hash only
    /// buckets candidates.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        std::mem::discriminant(&self.primitive).hash(&mut hasher);
        for p in &self.buffers.positions {
            p.to_bits().hash(&mut hasher);
        }
        hash_opt_f32(&mut hasher, &self.buffers.normals);
        hash_opt_f32(&mut hasher, &self.buffers.uvs);
        self.buffers.colors.hash(&mut hasher);
        self.buffers.indices.hash(&mut hasher);
        hasher.finish()
    }

    /// Byte equality over the primitive type and all buffers
    pub fn content_eq(&self, other: &Geometry) -> bool {
        self.primitive == other.primitive
            && bits_eq_f64(&self.buffers.positions, &other.buffers.positions)
            && opt_bits_eq_f32(&self.buffers.normals, &other.buffers.normals)
            && opt_bits_eq_f32(&self.buffers.uvs, &other.buffers.uvs)
            && self.buffers.colors == other.buffers.colors
            && self.buffers.indices == other.buffers.indices
    }
}

fn hash_opt_f32<H: Hasher>(hasher: &mut H, buffer: &Option<Vec<f32>>) {
    match buffer {
        Some(values) => {
            true.hash(hasher);
            for v in values {
                v.to_bits().hash(hasher);
            }
        }
        None => false.hash(hasher),
    }
}

fn bits_eq_f64(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn opt_bits_eq_f32(a: &Option<Vec<f32>>, b: &Option<Vec<f32>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }
        _ => false,
    }
}
