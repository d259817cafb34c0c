// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Finalization engine
//!
//! Turns an open scene model into an immutable, tiled, quantized
//! [`FinalizedModel`]:
//!
//! 1. synthesize default meta objects for entities without metadata
//! 2. drop entities with no meshes
//! 3. collapse byte-identical geometries (unless geometry reuse is off)
//! 4. optionally rotate everything 90 degrees about X
//! 5. partition entities into tiles bounded by `min_tile_size`
//! 6. quantize positions to i16 against each tile's local origin
//!
//! Geometries used by exactly one mesh are baked into world space and
//! quantized against their tile. Geometries shared by several meshes keep
//! local coordinates, are quantized once against the union of all shared
//! geometry bounds, and their mesh matrices are re-expressed relative to
//! the owning tile's origin.

use crate::error::{Error, Result};
use crate::geometry::{Geometry, GeometryId, MaterialId, PrimitiveType};
use crate::material::{Material, Texture, TextureSet};
use crate::math::{rotate_x_90, Aabb};
use crate::metadata::{MetaObject, PropertySet};
use crate::quantize::{oct_encode_normal, QuantizationRange};
use crate::scene::SceneModel;
use crate::tile::{partition, union_aabb, EntityBounds};
use nalgebra::{Matrix4, Point3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};

/// Geometry after quantization
#[derive(Debug, Clone)]
pub struct FinalizedGeometry {
    pub primitive: PrimitiveType,
    /// Decoded against the model-level reused range instead of the tile
    pub reused: bool,
    /// Quantized positions, three i16 per vertex
    pub positions: Vec<i16>,
    /// Primitive indices (empty when non-indexed)
    pub indices: Vec<u32>,
    /// Octahedral-encoded normals, two i8 per vertex (empty when absent)
    pub normals: Vec<i8>,
    /// Texture coordinates, two f32 per vertex (empty when absent)
    pub uvs: Vec<f32>,
    /// RGBA vertex colors, four u8 per vertex (empty when absent)
    pub colors: Vec<u8>,
}

impl FinalizedGeometry {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles (0 for non-triangle primitives)
    pub fn triangle_count(&self) -> usize {
        if self.primitive != PrimitiveType::Triangles {
            return 0;
        }
        if self.indices.is_empty() {
            self.vertex_count() / 3
        } else {
            self.indices.len() / 3
        }
    }
}

/// Mesh after finalization
#[derive(Debug, Clone)]
pub struct FinalizedMesh {
    /// Index into [`FinalizedModel::geometries`]
    pub geometry: u32,
    pub material: Option<MaterialId>,
    /// Transform with translation relative to the tile origin;
    /// `None` when the geometry was baked into world space
    pub transform: Option<Matrix4<f64>>,
    pub color: [f32; 3],
    pub opacity: f32,
}

/// Entity after finalization
#[derive(Debug, Clone)]
pub struct FinalizedEntity {
    /// Meta object id this entity is selectable under
    pub object_id: String,
    pub meshes: Vec<FinalizedMesh>,
}

/// Spatial tile with its local decode record
#[derive(Debug, Clone)]
pub struct FinalizedTile {
    pub aabb: Aabb,
    pub decode: QuantizationRange,
    pub entities: Vec<FinalizedEntity>,
}

/// Immutable finalized model, ready for serialization
#[derive(Debug, Clone)]
pub struct FinalizedModel {
    pub tiles: Vec<FinalizedTile>,
    pub geometries: Vec<FinalizedGeometry>,
    /// Decode record for geometries flagged as reused
    pub reused_decode: QuantizationRange,
    pub materials: Vec<Material>,
    pub texture_sets: Vec<TextureSet>,
    pub textures: Vec<Texture>,
    pub meta_objects: Vec<MetaObject>,
    pub property_sets: Vec<PropertySet>,
    /// Authoritative world extent
    pub aabb: Aabb,
}

/// Statistics delta produced by finalize
///
/// Triangle/vertex/normal/UV totals are counted per mesh instance, so they
/// are independent of whether geometry reuse collapsed the storage.
#[derive(Debug, Clone, Default)]
pub struct FinalizeStats {
    pub num_objects: usize,
    pub num_meshes: usize,
    pub num_geometries: usize,
    pub num_reused_geometries: usize,
    pub num_triangles: usize,
    pub num_vertices: usize,
    pub num_normals: usize,
    pub num_uvs: usize,
    pub num_tiles: usize,
    pub num_meta_objects: usize,
    pub num_default_meta_objects: usize,
    pub num_property_sets: usize,
    pub aabb: [f64; 6],
    pub min_tile_size: f64,
}

pub(crate) fn run(scene: &mut SceneModel) -> Result<(FinalizedModel, FinalizeStats)> {
    let config = scene.config.clone();
    let geometries = std::mem::take(&mut scene.geometries);
    let mut meshes = std::mem::take(&mut scene.meshes);
    let entities = std::mem::take(&mut scene.entities);
    let materials = std::mem::take(&mut scene.materials);
    let textures = std::mem::take(&mut scene.textures);
    let texture_sets = std::mem::take(&mut scene.texture_sets);
    let mut meta_objects = std::mem::take(&mut scene.meta_objects);
    let mut meta_object_index = std::mem::take(&mut scene.meta_object_index);
    let property_sets = std::mem::take(&mut scene.property_sets);
    let mut aabb_hint = scene.aabb_hint.take();

    // Entities with no meshes cannot be drawn
    let entities: Vec<_> = entities
        .into_iter()
        .filter(|entity| {
            if entity.meshes.is_empty() {
                tracing::warn!(entity = %entity.id, "dropping entity with no meshes");
                false
            } else {
                true
            }
        })
        .collect();
    if entities.is_empty() {
        return Err(Error::EmptyModel);
    }

    // Default meta objects for entities without (resolvable) metadata
    let mut num_default_meta_objects = 0usize;
    let mut object_ids = Vec::with_capacity(entities.len());
    for entity in &entities {
        let id = entity
            .meta_object
            .clone()
            .unwrap_or_else(|| entity.id.to_string());
        if !meta_object_index.contains_key(&id) {
            meta_object_index.insert(id.clone(), meta_objects.len());
            meta_objects.push(MetaObject {
                id: id.clone(),
                object_type: "default".into(),
                name: id.clone(),
                parent: None,
                property_set_ids: Vec::new(),
            });
            num_default_meta_objects += 1;
        }
        object_ids.push(id);
    }

    sanitize_meta_tree(&mut meta_objects, &meta_object_index);

    // Geometry usage over surviving entities
    let mut usage = vec![0u32; geometries.len()];
    for entity in &entities {
        for &mesh_id in &entity.meshes {
            usage[meshes[mesh_id.0 as usize].geometry.0 as usize] += 1;
        }
    }

    for (index, geometry) in geometries.iter().enumerate() {
        if usage[index] > 0 {
            check_degenerate(geometry)?;
        }
    }

    // Collapse byte-identical geometries
    if config.reuse_geometries {
        let mut remap: Vec<GeometryId> = geometries.iter().map(|g| g.id).collect();
        let mut buckets: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
        let mut collapsed = 0usize;
        for index in 0..geometries.len() {
            if usage[index] == 0 {
                continue;
            }
            let hash = geometries[index].content_hash();
            let candidates = buckets.entry(hash).or_default();
            match candidates
                .iter()
                .copied()
                .find(|&c| geometries[c].content_eq(&geometries[index]))
            {
                Some(canonical) => {
                    remap[index] = GeometryId(canonical as u32);
                    collapsed += 1;
                }
                None => candidates.push(index),
            }
        }
        if collapsed > 0 {
            tracing::debug!(collapsed, "collapsed duplicate geometries");
            for mesh in &mut meshes {
                mesh.geometry = remap[mesh.geometry.0 as usize];
            }
            usage = vec![0u32; geometries.len()];
            for entity in &entities {
                for &mesh_id in &entity.meshes {
                    usage[meshes[mesh_id.0 as usize].geometry.0 as usize] += 1;
                }
            }
        }
    }

    // Z-up sources get rotated before bounding and tiling
    if config.rotate_x {
        let rotation = rotate_x_90();
        for mesh in &mut meshes {
            mesh.transform = rotation * mesh.transform;
        }
        aabb_hint = aabb_hint.map(|hint| hint.transformed(&rotation));
    }

    // Geometries shared between meshes keep local coordinates; the rest
    // are baked per instance
    let reused: Vec<bool> = usage
        .iter()
        .map(|&count| config.reuse_geometries && count > 1)
        .collect();

    let local_aabbs: Vec<Option<Aabb>> = geometries
        .iter()
        .enumerate()
        .map(|(index, geometry)| (usage[index] > 0).then(|| geometry.buffers.local_aabb()))
        .collect();

    // World bounds per entity and the global extent
    let mut global_aabb = Aabb::empty();
    let mut entries = Vec::with_capacity(entities.len());
    for (index, entity) in entities.iter().enumerate() {
        let mut aabb = Aabb::empty();
        for &mesh_id in &entity.meshes {
            let mesh = &meshes[mesh_id.0 as usize];
            let local = local_aabbs[mesh.geometry.0 as usize]
                .expect("referenced geometry has bounds");
            aabb.expand(&local.transformed(&mesh.transform));
        }
        global_aabb.expand(&aabb);
        entries.push(EntityBounds {
            index,
            entity_id: entity.id,
            aabb,
            center: aabb.center(),
        });
    }
    let model_aabb = aabb_hint.unwrap_or(global_aabb);

    // Shared geometries are quantized once, against their union bounds
    let mut reused_aabb = Aabb::empty();
    for (index, geometry_aabb) in local_aabbs.iter().enumerate() {
        if reused[index] {
            if let Some(aabb) = geometry_aabb {
                reused_aabb.expand(aabb);
            }
        }
    }
    let reused_decode = if reused_aabb.is_valid() {
        QuantizationRange::from_aabb(&reused_aabb)
    } else {
        QuantizationRange::unit()
    };

    let mut finalized_geometries: Vec<FinalizedGeometry> = Vec::new();
    let mut reused_slots: FxHashMap<usize, u32> = FxHashMap::default();
    for (index, geometry) in geometries.iter().enumerate() {
        if reused[index] {
            reused_slots.insert(index, finalized_geometries.len() as u32);
            finalized_geometries.push(quantize_local(geometry, &reused_decode));
        }
    }
    let num_reused_geometries = reused_slots.len();

    // Tile and quantize
    let leaves = partition(entries, config.min_tile_size);
    let mut stats = FinalizeStats {
        num_objects: entities.len(),
        num_meta_objects: meta_objects.len(),
        num_default_meta_objects,
        num_property_sets: property_sets.len(),
        num_reused_geometries,
        aabb: model_aabb.to_array(),
        min_tile_size: config.min_tile_size,
        ..Default::default()
    };

    let mut tiles = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let tile_aabb = union_aabb(&leaf);
        let decode = QuantizationRange::from_aabb(&tile_aabb);
        let mut tile_entities = Vec::with_capacity(leaf.len());
        for entry in &leaf {
            let entity = &entities[entry.index];
            let mut tile_meshes = Vec::with_capacity(entity.meshes.len());
            for &mesh_id in &entity.meshes {
                let mesh = &meshes[mesh_id.0 as usize];
                let geometry_index = mesh.geometry.0 as usize;
                let geometry = &geometries[geometry_index];

                stats.num_meshes += 1;
                stats.num_triangles += geometry.triangle_count();
                let vertex_count = geometry.buffers.vertex_count();
                stats.num_vertices += vertex_count;
                if geometry.buffers.normals.is_some() {
                    stats.num_normals += vertex_count;
                }
                if geometry.buffers.uvs.is_some() {
                    stats.num_uvs += vertex_count;
                }

                let (slot, transform) = if reused[geometry_index] {
                    let mut relative = mesh.transform;
                    relative[(0, 3)] -= decode.origin[0];
                    relative[(1, 3)] -= decode.origin[1];
                    relative[(2, 3)] -= decode.origin[2];
                    (reused_slots[&geometry_index], Some(relative))
                } else {
                    let slot = finalized_geometries.len() as u32;
                    finalized_geometries.push(bake_world(geometry, &mesh.transform, &decode));
                    (slot, None)
                };

                tile_meshes.push(FinalizedMesh {
                    geometry: slot,
                    material: mesh.material,
                    transform,
                    color: mesh.color,
                    opacity: mesh.opacity,
                });
            }
            tile_entities.push(FinalizedEntity {
                object_id: object_ids[entry.index].clone(),
                meshes: tile_meshes,
            });
        }
        tiles.push(FinalizedTile {
            aabb: tile_aabb,
            decode,
            entities: tile_entities,
        });
    }

    stats.num_tiles = tiles.len();
    stats.num_geometries = finalized_geometries.len();

    tracing::debug!(
        objects = stats.num_objects,
        geometries = stats.num_geometries,
        tiles = stats.num_tiles,
        triangles = stats.num_triangles,
        "finalized model"
    );

    let model = FinalizedModel {
        tiles,
        geometries: finalized_geometries,
        reused_decode,
        materials,
        texture_sets,
        textures,
        meta_objects,
        property_sets,
        aabb: model_aabb,
    };
    Ok((model, stats))
}

/// Break missing-parent links and parent cycles so the tree is a forest
fn sanitize_meta_tree(meta_objects: &mut [MetaObject], index: &FxHashMap<String, usize>) {
    for meta_object in meta_objects.iter_mut() {
        if let Some(parent) = &meta_object.parent {
            if !index.contains_key(parent) {
                tracing::warn!(id = %meta_object.id, parent = %parent, "meta object parent not found");
                meta_object.parent = None;
            }
        }
    }
    for start in 0..meta_objects.len() {
        let mut seen = FxHashSet::default();
        seen.insert(start);
        let mut current = start;
        while let Some(parent) = meta_objects[current].parent.clone() {
            let parent_index = index[&parent];
            if !seen.insert(parent_index) {
                tracing::warn!(id = %meta_objects[current].id, "breaking meta object parent cycle");
                meta_objects[current].parent = None;
                break;
            }
            current = parent_index;
        }
    }
}

fn check_degenerate(geometry: &Geometry) -> Result<()> {
    let extent = geometry.buffers.local_aabb().extent();
    let collapsed = extent.x == 0.0 && extent.y == 0.0 && extent.z == 0.0;
    match geometry.primitive {
        PrimitiveType::Triangles => {
            if geometry.primitive_count() == 0 {
                return Err(Error::DegenerateGeometry {
                    id: geometry.id,
                    reason: "no triangles".into(),
                });
            }
            if collapsed {
                return Err(Error::DegenerateGeometry {
                    id: geometry.id,
                    reason: "all vertices coincide".into(),
                });
            }
        }
        PrimitiveType::Lines => {
            if geometry.primitive_count() == 0 {
                return Err(Error::DegenerateGeometry {
                    id: geometry.id,
                    reason: "no segments".into(),
                });
            }
            if collapsed {
                return Err(Error::DegenerateGeometry {
                    id: geometry.id,
                    reason: "zero-length segments".into(),
                });
            }
        }
        PrimitiveType::Points => {}
    }
    Ok(())
}

/// Quantize a shared geometry in its local coordinates
fn quantize_local(geometry: &Geometry, decode: &QuantizationRange) -> FinalizedGeometry {
    FinalizedGeometry {
        primitive: geometry.primitive,
        reused: true,
        positions: decode.quantize_positions(&geometry.buffers.positions),
        indices: geometry.buffers.indices.clone().unwrap_or_default(),
        normals: encode_normals(geometry.buffers.normals.as_deref(), None),
        uvs: geometry.buffers.uvs.clone().unwrap_or_default(),
        colors: geometry.buffers.colors.clone().unwrap_or_default(),
    }
}

/// Bake a single-use geometry into world space and quantize it against
/// its tile
fn bake_world(
    geometry: &Geometry,
    transform: &Matrix4<f64>,
    decode: &QuantizationRange,
) -> FinalizedGeometry {
    let mut positions = Vec::with_capacity(geometry.buffers.positions.len() / 3 * 3);
    for chunk in geometry.buffers.positions.chunks_exact(3) {
        let world = transform.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
        positions.push(decode.quantize(world.x, 0));
        positions.push(decode.quantize(world.y, 1));
        positions.push(decode.quantize(world.z, 2));
    }

    FinalizedGeometry {
        primitive: geometry.primitive,
        reused: false,
        positions,
        indices: geometry.buffers.indices.clone().unwrap_or_default(),
        normals: encode_normals(geometry.buffers.normals.as_deref(), Some(transform)),
        uvs: geometry.buffers.uvs.clone().unwrap_or_default(),
        colors: geometry.buffers.colors.clone().unwrap_or_default(),
    }
}

/// Oct-encode normals, rotating them when the positions were baked
fn encode_normals(normals: Option<&[f32]>, transform: Option<&Matrix4<f64>>) -> Vec<i8> {
    let Some(normals) = normals else {
        return Vec::new();
    };
    let normal_matrix = transform.map(|m| {
        let linear = m.fixed_view::<3, 3>(0, 0).into_owned();
        linear
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or(linear)
    });

    let mut out = Vec::with_capacity(normals.len() / 3 * 2);
    for chunk in normals.chunks_exact(3) {
        let n = match &normal_matrix {
            Some(matrix) => {
                let rotated =
                    matrix * Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
                let rotated = rotated.normalize();
                [rotated.x as f32, rotated.y as f32, rotated.z as f32]
            }
            None => [chunk[0], chunk[1], chunk[2]],
        };
        let encoded = oct_encode_normal(n);
        out.push(encoded[0]);
        out.push(encoded[1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryBuffers;
    use crate::scene::{MeshParams, ModelConfig, SceneModel};
    use nalgebra::Vector3 as V3;

    fn box_positions(center: [f64; 3], half: f64) -> Vec<f64> {
        let mut positions = Vec::with_capacity(24);
        for corner in 0..8u8 {
            positions.push(center[0] + if corner & 1 != 0 { half } else { -half });
            positions.push(center[1] + if corner & 2 != 0 { half } else { -half });
            positions.push(center[2] + if corner & 4 != 0 { half } else { -half });
        }
        positions
    }

    fn box_indices() -> Vec<u32> {
        vec![
            0, 1, 3, 0, 3, 2, // -z
            4, 6, 7, 4, 7, 5, // +z
            0, 4, 5, 0, 5, 1, // -y
            2, 3, 7, 2, 7, 6, // +y
            0, 2, 6, 0, 6, 4, // -x
            1, 5, 7, 1, 7, 3, // +x
        ]
    }

    fn add_box(model: &mut SceneModel, center: [f64; 3], half: f64) {
        let geometry = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(box_positions(center, half)).indices(box_indices()),
            )
            .unwrap();
        let mesh = model.create_mesh(MeshParams::new(geometry)).unwrap();
        model.create_entity(&[mesh], None).unwrap();
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        assert!(matches!(model.finalize(), Err(Error::EmptyModel)));
    }

    #[test]
    fn test_entity_without_meshes_dropped() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        model.create_entity(&[], None).unwrap();
        assert!(matches!(model.finalize(), Err(Error::EmptyModel)));
    }

    #[test]
    fn test_default_meta_objects_synthesized() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        add_box(&mut model, [0.0, 0.0, 0.0], 1.0);
        add_box(&mut model, [5.0, 0.0, 0.0], 1.0);
        let (finalized, stats) = model.finalize().unwrap();

        assert_eq!(stats.num_default_meta_objects, 2);
        assert_eq!(finalized.meta_objects.len(), 2);
        for meta_object in &finalized.meta_objects {
            assert_eq!(meta_object.object_type, "default");
            assert_eq!(meta_object.name, meta_object.id);
        }
        let tile_object_ids: Vec<&str> = finalized.tiles[0]
            .entities
            .iter()
            .map(|e| e.object_id.as_str())
            .collect();
        assert!(tile_object_ids.contains(&"0"));
        assert!(tile_object_ids.contains(&"1"));
    }

    #[test]
    fn test_dedup_collapses_identical_buffers() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let positions = box_positions([0.0, 0.0, 0.0], 1.0);
        let a = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(positions.clone()).indices(box_indices()),
            )
            .unwrap();
        let b = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(positions).indices(box_indices()),
            )
            .unwrap();
        let mesh_a = model.create_mesh(MeshParams::new(a)).unwrap();
        let mesh_b = model
            .create_mesh(
                MeshParams::new(b)
                    .transform(Matrix4::new_translation(&V3::new(10.0, 0.0, 0.0))),
            )
            .unwrap();
        model.create_entity(&[mesh_a], None).unwrap();
        model.create_entity(&[mesh_b], None).unwrap();

        let (finalized, stats) = model.finalize().unwrap();
        // One stored geometry, flagged reused, referenced by both meshes
        assert_eq!(stats.num_geometries, 1);
        assert_eq!(stats.num_reused_geometries, 1);
        assert!(finalized.geometries[0].reused);
        assert_eq!(stats.num_triangles, 24);
        assert_eq!(stats.num_vertices, 16);
    }

    #[test]
    fn test_dedup_disabled_expands_copies() {
        let config = ModelConfig {
            reuse_geometries: false,
            ..Default::default()
        };
        let mut model = SceneModel::new(config).unwrap();
        let geometry = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(box_positions([0.0, 0.0, 0.0], 1.0))
                    .indices(box_indices()),
            )
            .unwrap();
        let mesh_a = model.create_mesh(MeshParams::new(geometry)).unwrap();
        let mesh_b = model
            .create_mesh(
                MeshParams::new(geometry)
                    .transform(Matrix4::new_translation(&V3::new(10.0, 0.0, 0.0))),
            )
            .unwrap();
        model.create_entity(&[mesh_a], None).unwrap();
        model.create_entity(&[mesh_b], None).unwrap();

        let (finalized, stats) = model.finalize().unwrap();
        // Two expanded copies, no shared geometry
        assert_eq!(stats.num_geometries, 2);
        assert_eq!(stats.num_reused_geometries, 0);
        assert!(finalized.geometries.iter().all(|g| !g.reused));
        // Instance totals match the dedup-enabled case
        assert_eq!(stats.num_triangles, 24);
        assert_eq!(stats.num_vertices, 16);
    }

    #[test]
    fn test_every_entity_in_exactly_one_tile() {
        let config = ModelConfig {
            min_tile_size: 100.0,
            ..Default::default()
        };
        let mut model = SceneModel::new(config).unwrap();
        for i in 0..6 {
            add_box(&mut model, [i as f64 * 400.0, 0.0, 0.0], 1.0);
        }
        let (finalized, stats) = model.finalize().unwrap();

        let placed: usize = finalized.tiles.iter().map(|t| t.entities.len()).sum();
        assert_eq!(placed, 6);
        assert!(stats.num_tiles > 1);

        // Union of tile bounds reproduces the model bounds
        let mut union = Aabb::empty();
        for tile in &finalized.tiles {
            union.expand(&tile.aabb);
        }
        assert_eq!(union.to_array(), finalized.aabb.to_array());

        for tile in &finalized.tiles {
            assert!(tile.entities.len() == 1 || tile.aabb.diagonal() <= 100.0);
        }
    }

    #[test]
    fn test_quantization_error_within_half_step() {
        let config = ModelConfig {
            min_tile_size: 100.0,
            ..Default::default()
        };
        let mut model = SceneModel::new(config).unwrap();
        for i in 0..4 {
            add_box(&mut model, [i as f64 * 321.7, 13.3, -7.9], 2.5);
        }
        let (finalized, _) = model.finalize().unwrap();

        for tile in &finalized.tiles {
            for entity in &tile.entities {
                // Mesh transforms were identity, so the original world
                // positions are the box corners for this entity
                let index: usize = entity.object_id.parse().unwrap();
                let original = box_positions([index as f64 * 321.7, 13.3, -7.9], 2.5);
                for mesh in &entity.meshes {
                    let geometry = &finalized.geometries[mesh.geometry as usize];
                    assert!(!geometry.reused);
                    let decoded = tile.decode.dequantize_positions(&geometry.positions);
                    assert_eq!(decoded.len(), original.len());
                    for (i, (&world, &back)) in original.iter().zip(decoded.iter()).enumerate() {
                        let step = tile.decode.step[i % 3];
                        assert!(
                            (world - back).abs() <= step / 2.0 + 1e-9,
                            "coordinate {} error {} exceeds half step {}",
                            i,
                            (world - back).abs(),
                            step / 2.0
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_degenerate_triangle_geometry_rejected() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let geometry = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(vec![1.0; 9]).indices(vec![0, 1, 2]),
            )
            .unwrap();
        let mesh = model.create_mesh(MeshParams::new(geometry)).unwrap();
        model.create_entity(&[mesh], None).unwrap();
        assert!(matches!(
            model.finalize(),
            Err(Error::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_rotate_x_swaps_bounds() {
        let config = ModelConfig {
            rotate_x: true,
            ..Default::default()
        };
        let mut model = SceneModel::new(config).unwrap();
        // Tall in Z before rotation
        let geometry = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(vec![
                    0.0, 0.0, 0.0, //
                    1.0, 0.0, 0.0, //
                    0.0, 1.0, 10.0,
                ])
                .indices(vec![0, 1, 2]),
            )
            .unwrap();
        let mesh = model.create_mesh(MeshParams::new(geometry)).unwrap();
        model.create_entity(&[mesh], None).unwrap();
        let (finalized, _) = model.finalize().unwrap();

        // Height moved to Y, depth is the negated former Y
        let aabb = finalized.aabb;
        assert!((aabb.max.y - 10.0).abs() < 1e-9);
        assert!((aabb.min.z + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_aabb_hint_overrides_computed_bounds() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        add_box(&mut model, [0.0, 0.0, 0.0], 1.0);
        model
            .set_model_aabb(Aabb::from_array([-100.0, -100.0, -100.0, 100.0, 100.0, 100.0]))
            .unwrap();
        let (finalized, stats) = model.finalize().unwrap();
        assert_eq!(finalized.aabb.min.x, -100.0);
        assert_eq!(stats.aabb[3], 100.0);
    }

    #[test]
    fn test_unresolved_meta_reference_synthesized() {
        let mut model = SceneModel::new(ModelConfig::default()).unwrap();
        let geometry = model
            .create_geometry(
                PrimitiveType::Triangles,
                GeometryBuffers::with_positions(box_positions([0.0, 0.0, 0.0], 1.0))
                    .indices(box_indices()),
            )
            .unwrap();
        let mesh = model.create_mesh(MeshParams::new(geometry)).unwrap();
        model.create_entity(&[mesh], Some("ghost")).unwrap();
        let (finalized, stats) = model.finalize().unwrap();

        assert_eq!(stats.num_default_meta_objects, 1);
        assert_eq!(finalized.meta_objects[0].id, "ghost");
        assert_eq!(finalized.tiles[0].entities[0].object_id, "ghost");
    }
}
