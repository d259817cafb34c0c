// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # XKT-Lite Scene Model
//!
//! Format-agnostic in-memory scene model for XKT conversion.
//!
//! Every source-format parser builds into the same mutable [`SceneModel`]
//! through its creation methods (geometries, meshes, entities, materials,
//! textures, metadata). A single call to [`SceneModel::finalize`] then
//! produces an immutable [`FinalizedModel`]:
//!
//! - entities without metadata get synthesized meta objects
//! - byte-identical geometry buffers are collapsed to one stored copy
//! - entities are partitioned into spatial tiles bounded by a configurable
//!   diagonal
//! - vertex positions are quantized to 16-bit integers relative to each
//!   tile's local origin
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xkt_lite_model::{GeometryBuffers, MeshParams, ModelConfig, PrimitiveType, SceneModel};
//!
//! let mut model = SceneModel::new(ModelConfig::default())?;
//! let geometry = model.create_geometry(
//!     PrimitiveType::Triangles,
//!     GeometryBuffers::with_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
//!         .indices(vec![0, 1, 2]),
//! )?;
//! let mesh = model.create_mesh(MeshParams::new(geometry))?;
//! model.create_entity(&[mesh], None)?;
//!
//! let (finalized, stats) = model.finalize()?;
//! ```

pub mod error;
pub mod finalize;
pub mod geometry;
pub mod material;
pub mod math;
pub mod metadata;
pub mod quantize;
pub mod scene;
pub mod tile;

pub use error::{Error, Result};
pub use finalize::{
    FinalizeStats, FinalizedEntity, FinalizedGeometry, FinalizedMesh, FinalizedModel,
    FinalizedTile,
};
pub use geometry::{
    EntityId, Geometry, GeometryBuffers, GeometryId, MaterialId, MeshId, PrimitiveType, TextureId,
    TextureSetId,
};
pub use material::{
    Material, MaterialParams, Texture, TextureFilter, TextureMediaType, TextureParams, TextureSet,
    TextureSetParams, TextureWrap,
};
pub use math::{rotate_x_90, Aabb};
pub use metadata::{MetaObject, Property, PropertySet, PropertyValue};
pub use quantize::{oct_decode_normal, oct_encode_normal, QuantizationRange};
pub use scene::{Entity, Mesh, MeshParams, ModelConfig, SceneModel};
