// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Container decoder
//!
//! Reads containers written by this crate and, best-effort, older
//! supported versions. Unknown section ids are skipped so newer writers
//! can add sections without breaking this reader; a header version above
//! [`XKT_VERSION`](crate::section::XKT_VERSION) is a hard failure.

use crate::error::{Error, Result};
use crate::section::{
    decompress, tags, ByteReader, SectionEntry, SectionType, MAGIC, MIN_XKT_VERSION, XKT_VERSION,
};
use xkt_lite_model::{
    Material, MetaObject, PrimitiveType, PropertySet, QuantizationRange, Texture, TextureId,
    TextureSet,
};

/// Mesh record decoded from a tile
#[derive(Debug, Clone)]
pub struct DecodedMesh {
    /// Index into [`DecodedScene::geometries`]
    pub geometry: u32,
    pub material: Option<u32>,
    /// Column-major matrix with tile-relative translation;
    /// `None` for baked geometry
    pub transform: Option<[f32; 16]>,
    pub color: [f32; 3],
    pub opacity: f32,
}

/// Entity record decoded from a tile
#[derive(Debug, Clone)]
pub struct DecodedEntity {
    pub object_id: String,
    pub meshes: Vec<DecodedMesh>,
}

/// Tile record with its decode transform
#[derive(Debug, Clone)]
pub struct DecodedTile {
    pub aabb: [f64; 6],
    pub decode: QuantizationRange,
    pub entities: Vec<DecodedEntity>,
}

/// Geometry buffers decoded from the container
#[derive(Debug, Clone)]
pub struct DecodedGeometry {
    pub primitive: PrimitiveType,
    pub reused: bool,
    pub positions: Vec<i16>,
    pub indices: Vec<u32>,
    pub normals: Vec<i8>,
    pub uvs: Vec<f32>,
    pub colors: Vec<u8>,
}

impl DecodedGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

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

/// Scene decoded from a container
#[derive(Debug, Clone, Default)]
pub struct DecodedScene {
    /// Header version of the source container
    pub version: u32,
    pub tiles: Vec<DecodedTile>,
    pub geometries: Vec<DecodedGeometry>,
    pub reused_decode: QuantizationRange,
    pub materials: Vec<Material>,
    pub texture_sets: Vec<TextureSet>,
    pub textures: Vec<Texture>,
    pub meta_objects: Vec<MetaObject>,
    pub property_sets: Vec<PropertySet>,
}

impl DecodedScene {
    pub fn entity_count(&self) -> usize {
        self.tiles.iter().map(|tile| tile.entities.len()).sum()
    }

    /// Total stored vertices across all geometries
    pub fn vertex_count(&self) -> usize {
        self.geometries.iter().map(DecodedGeometry::vertex_count).sum()
    }

    /// Total stored triangles across all geometries
    pub fn triangle_count(&self) -> usize {
        self.geometries
            .iter()
            .map(DecodedGeometry::triangle_count)
            .sum()
    }
}

/// Decode a container
pub fn read_model(bytes: &[u8]) -> Result<DecodedScene> {
    let mut header = ByteReader::new(u32::MAX, bytes);
    let magic = header.bytes(4).map_err(|_| Error::Truncated("header".into()))?;
    if magic != MAGIC {
        return Err(Error::InvalidMagic);
    }
    let version = header
        .u32()
        .map_err(|_| Error::Truncated("header version".into()))?;
    if !(MIN_XKT_VERSION..=XKT_VERSION).contains(&version) {
        return Err(Error::UnsupportedVersion(
            version,
            MIN_XKT_VERSION,
            XKT_VERSION,
        ));
    }
    let section_count = header
        .u32()
        .map_err(|_| Error::Truncated("section count".into()))?;

    let mut entries = Vec::with_capacity(section_count as usize);
    for _ in 0..section_count {
        let id = header.u32().map_err(|_| Error::Truncated("section table".into()))?;
        let compressed_len = header
            .u64()
            .map_err(|_| Error::Truncated("section table".into()))?;
        let uncompressed_len = header
            .u64()
            .map_err(|_| Error::Truncated("section table".into()))?;
        entries.push(SectionEntry {
            id,
            compressed_len,
            uncompressed_len,
        });
    }

    let mut scene = DecodedScene {
        version,
        ..Default::default()
    };

    for entry in &entries {
        let compressed = header
            .bytes(entry.compressed_len as usize)
            .map_err(|_| Error::Truncated(format!("payload of section {}", entry.id)))?;
        let Some(section_type) = SectionType::from_id(entry.id) else {
            tracing::debug!(section = entry.id, "skipping unknown section");
            continue;
        };
        let payload = decompress(entry.id, &compressed, entry.uncompressed_len)?;
        match section_type {
            SectionType::Tiles => decode_tiles(&mut scene, entry.id, &payload)?,
            SectionType::Geometries => decode_geometries(&mut scene, entry.id, &payload)?,
            SectionType::Materials => scene.materials = serde_json::from_slice(&payload)?,
            SectionType::TextureSets => scene.texture_sets = serde_json::from_slice(&payload)?,
            SectionType::Textures => decode_textures(&mut scene, entry.id, &payload)?,
            SectionType::MetaObjects => scene.meta_objects = serde_json::from_slice(&payload)?,
            SectionType::PropertySets => scene.property_sets = serde_json::from_slice(&payload)?,
        }
    }

    Ok(scene)
}

fn decode_tiles(scene: &mut DecodedScene, section: u32, payload: &[u8]) -> Result<()> {
    let mut r = ByteReader::new(section, payload);
    let tile_count = r.u32()?;
    let mut tiles = Vec::with_capacity(tile_count as usize);
    for _ in 0..tile_count {
        let mut aabb = [0.0f64; 6];
        for value in &mut aabb {
            *value = r.f64()?;
        }
        let mut origin = [0.0f64; 3];
        for value in &mut origin {
            *value = r.f64()?;
        }
        let mut step = [0.0f64; 3];
        for value in &mut step {
            *value = r.f64()?;
        }
        let entity_count = r.u32()?;
        let mut entities = Vec::with_capacity(entity_count as usize);
        for _ in 0..entity_count {
            let object_id = r.string()?;
            let mesh_count = r.u32()?;
            let mut meshes = Vec::with_capacity(mesh_count as usize);
            for _ in 0..mesh_count {
                let geometry = r.u32()?;
                let material_raw = r.u32()?;
                let material = (material_raw != u32::MAX).then_some(material_raw);
                let transform = if r.u8()? != 0 {
                    let mut matrix = [0.0f32; 16];
                    for value in &mut matrix {
                        *value = r.f32()?;
                    }
                    Some(matrix)
                } else {
                    None
                };
                let mut color = [0.0f32; 3];
                for channel in &mut color {
                    *channel = r.f32()?;
                }
                let opacity = r.f32()?;
                meshes.push(DecodedMesh {
                    geometry,
                    material,
                    transform,
                    color,
                    opacity,
                });
            }
            entities.push(DecodedEntity { object_id, meshes });
        }
        tiles.push(DecodedTile {
            aabb,
            decode: QuantizationRange { origin, step },
            entities,
        });
    }
    scene.tiles = tiles;
    Ok(())
}

fn decode_geometries(scene: &mut DecodedScene, section: u32, payload: &[u8]) -> Result<()> {
    let mut r = ByteReader::new(section, payload);
    let mut origin = [0.0f64; 3];
    for value in &mut origin {
        *value = r.f64()?;
    }
    let mut step = [0.0f64; 3];
    for value in &mut step {
        *value = r.f64()?;
    }
    scene.reused_decode = QuantizationRange { origin, step };

    let geometry_count = r.u32()?;
    let mut geometries = Vec::with_capacity(geometry_count as usize);
    for _ in 0..geometry_count {
        let primitive = tags::primitive_from_u8(section, r.u8()?)?;
        let flags = r.u8()?;
        let index_width = r.u8()?;
        let vertex_count = r.u32()? as usize;
        let index_count = r.u32()? as usize;

        let mut positions = Vec::with_capacity(vertex_count * 3);
        for _ in 0..vertex_count * 3 {
            positions.push(r.i16()?);
        }
        let mut indices = Vec::with_capacity(index_count);
        for _ in 0..index_count {
            let index = match index_width {
                1 => r.u8()? as u32,
                2 => r.u16()? as u32,
                4 => r.u32()?,
                other => {
                    return Err(Error::SectionCorrupt {
                        section,
                        reason: format!("invalid index width {other}"),
                    })
                }
            };
            indices.push(index);
        }
        let mut normals = Vec::new();
        if flags & 2 != 0 {
            normals.reserve(vertex_count * 2);
            for _ in 0..vertex_count * 2 {
                normals.push(r.i8()?);
            }
        }
        let mut uvs = Vec::new();
        if flags & 4 != 0 {
            uvs.reserve(vertex_count * 2);
            for _ in 0..vertex_count * 2 {
                uvs.push(r.f32()?);
            }
        }
        let colors = if flags & 8 != 0 {
            r.bytes(vertex_count * 4)?
        } else {
            Vec::new()
        };

        geometries.push(DecodedGeometry {
            primitive,
            reused: flags & 1 != 0,
            positions,
            indices,
            normals,
            uvs,
            colors,
        });
    }
    scene.geometries = geometries;
    Ok(())
}

fn decode_textures(scene: &mut DecodedScene, section: u32, payload: &[u8]) -> Result<()> {
    let mut r = ByteReader::new(section, payload);
    let texture_count = r.u32()?;
    let mut textures = Vec::with_capacity(texture_count as usize);
    for index in 0..texture_count {
        let media_type = tags::media_type_from_u8(section, r.u8()?)?;
        let min_filter = tags::filter_from_u8(section, r.u8()?)?;
        let mag_filter = tags::filter_from_u8(section, r.u8()?)?;
        let wrap_s = tags::wrap_from_u8(section, r.u8()?)?;
        let wrap_t = tags::wrap_from_u8(section, r.u8()?)?;
        let data_len = r.u64()? as usize;
        let data = r.bytes(data_len)?;
        textures.push(Texture {
            id: TextureId(index),
            media_type,
            min_filter,
            mag_filter,
            wrap_s,
            wrap_t,
            data,
        });
    }
    scene.textures = textures;
    Ok(())
}
