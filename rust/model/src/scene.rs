// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutable scene model builder
//!
//! Format parsers populate a [`SceneModel`] through the `create_*` methods,
//! then the converter calls [`SceneModel::finalize`] exactly once. The model
//! moves through `Open -> Finalizing -> Finalized`; every creation method
//! fails with [`Error::ModelFinalized`] once finalize has run.

use crate::error::{Error, Result};
use crate::finalize::{self, FinalizeStats, FinalizedModel};
use crate::geometry::{
    EntityId, Geometry, GeometryBuffers, GeometryId, MaterialId, MeshId, PrimitiveType, TextureId,
    TextureSetId,
};
use crate::material::{Material, MaterialParams, Texture, TextureParams, TextureSet, TextureSetParams};
use crate::math::Aabb;
use crate::metadata::{MetaObject, PropertySet};
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Tuning options fixed at model creation
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Upper bound on a tile's AABB diagonal, in world units
    pub min_tile_size: f64,
    /// Collapse byte-identical geometries to one stored copy
    ///
    /// When disabled, every mesh gets its own expanded copy even if the
    /// buffers are identical. Larger output, but avoids
    /// many-small-instances-of-one-geometry pathologies in the renderer.
    pub reuse_geometries: bool,
    /// Rotate all positions 90 degrees about X (Z-up sources)
    pub rotate_x: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_tile_size: 500.0,
            reuse_geometries: true,
            rotate_x: false,
        }
    }
}

impl ModelConfig {
    /// Reject non-finite or non-positive tile thresholds
    pub fn validate(&self) -> Result<()> {
        if !self.min_tile_size.is_finite() || self.min_tile_size <= 0.0 {
            return Err(Error::InvalidTileSize(self.min_tile_size));
        }
        Ok(())
    }
}

/// Parameters for creating a mesh
#[derive(Debug, Clone)]
pub struct MeshParams {
    pub geometry: GeometryId,
    pub material: Option<MaterialId>,
    /// Local-to-world transform
    pub transform: Matrix4<f64>,
    /// RGB color override
    pub color: [f32; 3],
    pub opacity: f32,
}

impl MeshParams {
    pub fn new(geometry: GeometryId) -> Self {
        Self {
            geometry,
            material: None,
            transform: Matrix4::identity(),
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
        }
    }

    pub fn material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn transform(mut self, transform: Matrix4<f64>) -> Self {
        self.transform = transform;
        self
    }

    pub fn color(mut self, color: [f32; 3], opacity: f32) -> Self {
        self.color = color;
        self.opacity = opacity;
        self
    }
}

/// Instantiation of a geometry in world space
#[derive(Debug, Clone)]
pub struct Mesh {
    pub id: MeshId,
    pub geometry: GeometryId,
    pub material: Option<MaterialId>,
    pub transform: Matrix4<f64>,
    pub color: [f32; 3],
    pub opacity: f32,
}

/// Drawable object: an ordered set of meshes plus optional metadata link
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub meshes: SmallVec<[MeshId; 4]>,
    /// Meta object id this entity is described by
    pub meta_object: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Open,
    Finalizing,
    Finalized,
}

/// Mutable canonical scene model
///
/// Owns all geometries, meshes, entities, materials, textures and metadata.
/// Meshes and entities reference geometry/material tables by id, never by
/// copy.
pub struct SceneModel {
    pub(crate) config: ModelConfig,
    state: Lifecycle,
    pub(crate) geometries: Vec<Geometry>,
    pub(crate) meshes: Vec<Mesh>,
    mesh_assigned: Vec<bool>,
    pub(crate) entities: Vec<Entity>,
    pub(crate) materials: Vec<Material>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) texture_sets: Vec<TextureSet>,
    pub(crate) meta_objects: Vec<MetaObject>,
    pub(crate) meta_object_index: FxHashMap<String, usize>,
    pub(crate) property_sets: Vec<PropertySet>,
    property_set_index: FxHashMap<String, usize>,
    pub(crate) aabb_hint: Option<Aabb>,
}

impl SceneModel {
    /// Create an open model
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Lifecycle::Open,
            geometries: Vec::new(),
            meshes: Vec::new(),
            mesh_assigned: Vec::new(),
            entities: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            texture_sets: Vec::new(),
            meta_objects: Vec::new(),
            meta_object_index: FxHashMap::default(),
            property_sets: Vec::new(),
            property_set_index: FxHashMap::default(),
            aabb_hint: None,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            Lifecycle::Open => Ok(()),
            _ => Err(Error::ModelFinalized),
        }
    }

    /// Add a geometry; buffers are validated against the primitive type
    pub fn create_geometry(
        &mut self,
        primitive: PrimitiveType,
        buffers: GeometryBuffers,
    ) -> Result<GeometryId> {
        self.ensure_open()?;
        buffers.validate(primitive)?;
        let id = GeometryId(self.geometries.len() as u32);
        self.geometries.push(Geometry {
            id,
            primitive,
            buffers,
        });
        Ok(id)
    }

    /// Add a material
    pub fn create_material(&mut self, params: MaterialParams) -> Result<MaterialId> {
        self.ensure_open()?;
        if let Some(set) = params.texture_set {
            if set.0 as usize >= self.texture_sets.len() {
                return Err(Error::UnknownReference(format!("texture set {}", set)));
            }
        }
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Material {
            id,
            color: params.color,
            metallic: params.metallic,
            roughness: params.roughness,
            texture_set: params.texture_set,
        });
        Ok(id)
    }

    /// Add a texture holding encoded image bytes
    pub fn create_texture(&mut self, params: TextureParams) -> Result<TextureId> {
        self.ensure_open()?;
        if params.data.is_empty() {
            return Err(Error::InvalidGeometry("empty texture data".into()));
        }
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(Texture {
            id,
            media_type: params.media_type,
            min_filter: params.min_filter,
            mag_filter: params.mag_filter,
            wrap_s: params.wrap_s,
            wrap_t: params.wrap_t,
            data: params.data,
        });
        Ok(id)
    }

    /// Add a texture set; all referenced textures must exist
    pub fn create_texture_set(&mut self, params: TextureSetParams) -> Result<TextureSetId> {
        self.ensure_open()?;
        for texture in [
            params.color,
            params.metallic_roughness,
            params.normals,
            params.emissive,
            params.occlusion,
        ]
        .into_iter()
        .flatten()
        {
            if texture.0 as usize >= self.textures.len() {
                return Err(Error::UnknownReference(format!("texture {}", texture)));
            }
        }
        let id = TextureSetId(self.texture_sets.len() as u32);
        self.texture_sets.push(TextureSet {
            id,
            color: params.color,
            metallic_roughness: params.metallic_roughness,
            normals: params.normals,
            emissive: params.emissive,
            occlusion: params.occlusion,
        });
        Ok(id)
    }

    /// Add a mesh referencing an existing geometry and material
    pub fn create_mesh(&mut self, params: MeshParams) -> Result<MeshId> {
        self.ensure_open()?;
        if params.geometry.0 as usize >= self.geometries.len() {
            return Err(Error::UnknownReference(format!(
                "geometry {}",
                params.geometry
            )));
        }
        if let Some(material) = params.material {
            if material.0 as usize >= self.materials.len() {
                return Err(Error::UnknownReference(format!("material {}", material)));
            }
        }
        let id = MeshId(self.meshes.len() as u32);
        self.meshes.push(Mesh {
            id,
            geometry: params.geometry,
            material: params.material,
            transform: params.transform,
            color: params.color,
            opacity: params.opacity,
        });
        self.mesh_assigned.push(false);
        Ok(id)
    }

    /// Add an entity owning the given meshes
    ///
    /// Each mesh belongs to at most one entity. An entity created with no
    /// meshes is kept until finalize, which drops it with a warning.
    pub fn create_entity(
        &mut self,
        meshes: &[MeshId],
        meta_object: Option<&str>,
    ) -> Result<EntityId> {
        self.ensure_open()?;
        for &mesh in meshes {
            if mesh.0 as usize >= self.meshes.len() {
                return Err(Error::UnknownReference(format!("mesh {}", mesh)));
            }
            if self.mesh_assigned[mesh.0 as usize] {
                return Err(Error::MeshAlreadyUsed(mesh));
            }
        }
        for &mesh in meshes {
            self.mesh_assigned[mesh.0 as usize] = true;
        }
        let id = EntityId(self.entities.len() as u32);
        self.entities.push(Entity {
            id,
            meshes: SmallVec::from_slice(meshes),
            meta_object: meta_object.map(str::to_owned),
        });
        Ok(id)
    }

    /// Add a meta object; the first object registered under an id wins
    pub fn create_meta_object(&mut self, meta_object: MetaObject) -> Result<()> {
        self.ensure_open()?;
        if self.meta_object_index.contains_key(&meta_object.id) {
            tracing::warn!(id = %meta_object.id, "duplicate meta object id ignored");
            return Ok(());
        }
        self.meta_object_index
            .insert(meta_object.id.clone(), self.meta_objects.len());
        self.meta_objects.push(meta_object);
        Ok(())
    }

    /// Add a property set; the first set registered under an id wins
    pub fn create_property_set(&mut self, property_set: PropertySet) -> Result<()> {
        self.ensure_open()?;
        if self.property_set_index.contains_key(&property_set.id) {
            tracing::warn!(id = %property_set.id, "duplicate property set id ignored");
            return Ok(());
        }
        self.property_set_index
            .insert(property_set.id.clone(), self.property_sets.len());
        self.property_sets.push(property_set);
        Ok(())
    }

    /// Supply a precomputed world AABB (pre-split batch conversions)
    ///
    /// Overrides the AABB finalize would otherwise compute from the meshes.
    pub fn set_model_aabb(&mut self, aabb: Aabb) -> Result<()> {
        self.ensure_open()?;
        self.aabb_hint = Some(aabb);
        Ok(())
    }

    /// Number of entities created so far
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Tuning options this model was created with
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Finalize the model: dedup, tile, quantize
    ///
    /// Runs exactly once; afterwards every creation method fails with
    /// [`Error::ModelFinalized`]. Returns the immutable model together with
    /// the statistics delta for this stage.
    pub fn finalize(&mut self) -> Result<(FinalizedModel, FinalizeStats)> {
        self.ensure_open()?;
        self.state = Lifecycle::Finalizing;
        let result = finalize::run(self);
        self.state = Lifecycle::Finalized;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_buffers() -> GeometryBuffers {
        GeometryBuffers::with_positions(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .indices(vec![0, 1, 2])
    }

    #[test]
    fn test_create_geometry_assigns_sequential_ids() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let a = model
            .create_geometry(PrimitiveType::Triangles, triangle_buffers())
            .unwrap();
        let b = model
            .create_geometry(PrimitiveType::Triangles, triangle_buffers())
            .unwrap();
        assert_eq!(a, GeometryId(0));
        assert_eq!(b, GeometryId(1));
    }

    #[test]
    fn test_create_mesh_unknown_geometry() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let result = model.create_mesh(MeshParams::new(GeometryId(7)));
        assert!(matches!(result, Err(Error::UnknownReference(_))));
    }

    #[test]
    fn test_create_entity_unknown_mesh() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let result = model.create_entity(&[MeshId(0)], None);
        assert!(matches!(result, Err(Error::UnknownReference(_))));
    }

    #[test]
    fn test_mesh_cannot_join_two_entities() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let geometry = model
            .create_geometry(PrimitiveType::Triangles, triangle_buffers())
            .unwrap();
        let mesh = model.create_mesh(MeshParams::new(geometry)).unwrap();
        model.create_entity(&[mesh], None).unwrap();
        let result = model.create_entity(&[mesh], None);
        assert!(matches!(result, Err(Error::MeshAlreadyUsed(_))));
    }

    #[test]
    fn test_invalid_tile_size_rejected() {
        let config = ModelConfig {
            min_tile_size: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            SceneModel::new(config),
            Err(Error::InvalidTileSize(_))
        ));
    }

    #[test]
    fn test_mutation_fails_after_finalize() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let geometry = model
            .create_geometry(PrimitiveType::Triangles, triangle_buffers())
            .unwrap();
        let mesh = model.create_mesh(MeshParams::new(geometry)).unwrap();
        model.create_entity(&[mesh], None).unwrap();
        model.finalize().unwrap();

        let result = model.create_geometry(PrimitiveType::Triangles, triangle_buffers());
        assert!(matches!(result, Err(Error::ModelFinalized)));
        assert!(matches!(model.finalize(), Err(Error::ModelFinalized)));
    }

    #[test]
    fn test_duplicate_meta_object_keeps_first() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        model
            .create_meta_object(MetaObject {
                id: "a".into(),
                object_type: "IfcWall".into(),
                name: "first".into(),
                parent: None,
                property_set_ids: vec![],
            })
            .unwrap();
        model
            .create_meta_object(MetaObject {
                id: "a".into(),
                object_type: "IfcWall".into(),
                name: "second".into(),
                parent: None,
                property_set_ids: vec![],
            })
            .unwrap();
        assert_eq!(model.meta_objects.len(), 1);
        assert_eq!(model.meta_objects[0].name, "first");
    }
}
