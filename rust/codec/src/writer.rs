// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Container encoder
//!
//! Encodes a finalized model into the versioned container. The model is
//! borrowed immutably; all aggregation happens in the returned
//! [`EncodeStats`].

use crate::error::{Error, Result};
use crate::section::{compress, tags, ByteWriter, SectionType, MAGIC, XKT_VERSION};
use xkt_lite_model::{FinalizedGeometry, FinalizedModel, FinalizedTile};

/// Statistics delta produced by one encode call
#[derive(Debug, Clone, Default)]
pub struct EncodeStats {
    /// Sum of section payload sizes before compression
    pub uncompressed_size: u64,
    /// Total container size as written
    pub compressed_size: u64,
    /// Encoded texture bytes carried in the container
    pub textures_size: u64,
    pub num_textures: usize,
    pub num_texture_sets: usize,
    /// Container version written
    pub xkt_version: u32,
}

/// Encode a finalized model into container bytes
pub fn write_model(model: &FinalizedModel) -> Result<(Vec<u8>, EncodeStats)> {
    let sections: Vec<(SectionType, Vec<u8>)> = vec![
        (SectionType::Tiles, encode_tiles(model)?),
        (SectionType::Geometries, encode_geometries(model)?),
        (SectionType::Materials, serde_json::to_vec(&model.materials)?),
        (
            SectionType::TextureSets,
            serde_json::to_vec(&model.texture_sets)?,
        ),
        (SectionType::Textures, encode_textures(model)?),
        (
            SectionType::MetaObjects,
            serde_json::to_vec(&model.meta_objects)?,
        ),
        (
            SectionType::PropertySets,
            serde_json::to_vec(&model.property_sets)?,
        ),
    ];

    let mut stats = EncodeStats {
        xkt_version: XKT_VERSION,
        num_textures: model.textures.len(),
        num_texture_sets: model.texture_sets.len(),
        textures_size: model.textures.iter().map(|t| t.data.len() as u64).sum(),
        ..Default::default()
    };

    let mut table = ByteWriter::new();
    let mut payloads = Vec::new();
    let section_count = u32::try_from(sections.len())
        .map_err(|_| Error::EncodingOverflow("section count".into()))?;

    for (section_type, payload) in &sections {
        let compressed = compress(payload)?;
        stats.uncompressed_size += payload.len() as u64;
        table.put_u32(*section_type as u32);
        table.put_u64(compressed.len() as u64);
        table.put_u64(payload.len() as u64);
        payloads.push(compressed);
    }

    let mut out = ByteWriter::new();
    out.put_bytes(&MAGIC);
    out.put_u32(XKT_VERSION);
    out.put_u32(section_count);
    out.put_bytes(&table.into_bytes());
    for payload in &payloads {
        out.put_bytes(payload);
    }

    let bytes = out.into_bytes();
    stats.compressed_size = bytes.len() as u64;
    tracing::debug!(
        version = XKT_VERSION,
        sections = sections.len(),
        uncompressed = stats.uncompressed_size,
        compressed = stats.compressed_size,
        "encoded container"
    );
    Ok((bytes, stats))
}

fn encode_tiles(model: &FinalizedModel) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.put_u32(count_u32(model.tiles.len(), "tiles")?);
    for tile in &model.tiles {
        encode_tile(&mut w, tile)?;
    }
    Ok(w.into_bytes())
}

fn encode_tile(w: &mut ByteWriter, tile: &FinalizedTile) -> Result<()> {
    for value in tile.aabb.to_array() {
        w.put_f64(value);
    }
    for axis in 0..3 {
        w.put_f64(tile.decode.origin[axis]);
    }
    for axis in 0..3 {
        w.put_f64(tile.decode.step[axis]);
    }
    w.put_u32(count_u32(tile.entities.len(), "entities in tile")?);
    for entity in &tile.entities {
        w.put_string(&entity.object_id)?;
        w.put_u32(count_u32(entity.meshes.len(), "meshes in entity")?);
        for mesh in &entity.meshes {
            w.put_u32(mesh.geometry);
            w.put_u32(mesh.material.map_or(u32::MAX, |m| m.0));
            match &mesh.transform {
                Some(matrix) => {
                    w.put_u8(1);
                    // column-major, translation already tile-relative
                    for value in matrix.iter() {
                        w.put_f32(*value as f32);
                    }
                }
                None => w.put_u8(0),
            }
            for channel in mesh.color {
                w.put_f32(channel);
            }
            w.put_f32(mesh.opacity);
        }
    }
    Ok(())
}

fn encode_geometries(model: &FinalizedModel) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    for axis in 0..3 {
        w.put_f64(model.reused_decode.origin[axis]);
    }
    for axis in 0..3 {
        w.put_f64(model.reused_decode.step[axis]);
    }
    w.put_u32(count_u32(model.geometries.len(), "geometries")?);
    for geometry in &model.geometries {
        encode_geometry(&mut w, geometry)?;
    }
    Ok(w.into_bytes())
}

const FLAG_REUSED: u8 = 1;
const FLAG_NORMALS: u8 = 2;
const FLAG_UVS: u8 = 4;
const FLAG_COLORS: u8 = 8;

fn encode_geometry(w: &mut ByteWriter, geometry: &FinalizedGeometry) -> Result<()> {
    let vertex_count = geometry.vertex_count();
    let index_count = geometry.indices.len();
    let vertex_count_u32 = count_u32(vertex_count, "vertices in geometry")?;
    let index_count_u32 = count_u32(index_count, "indices in geometry")?;

    let mut flags = 0u8;
    if geometry.reused {
        flags |= FLAG_REUSED;
    }
    if !geometry.normals.is_empty() {
        flags |= FLAG_NORMALS;
    }
    if !geometry.uvs.is_empty() {
        flags |= FLAG_UVS;
    }
    if !geometry.colors.is_empty() {
        flags |= FLAG_COLORS;
    }

    // Narrowest index width that can address every vertex
    let index_width: u8 = if index_count == 0 {
        0
    } else if vertex_count <= 1 << 8 {
        1
    } else if vertex_count <= 1 << 16 {
        2
    } else {
        4
    };

    w.put_u8(tags::primitive_to_u8(geometry.primitive));
    w.put_u8(flags);
    w.put_u8(index_width);
    w.put_u32(vertex_count_u32);
    w.put_u32(index_count_u32);

    for &q in &geometry.positions {
        w.put_i16(q);
    }
    for &index in &geometry.indices {
        match index_width {
            1 => w.put_u8(index as u8),
            2 => w.put_u16(index as u16),
            _ => w.put_u32(index),
        }
    }
    for &n in &geometry.normals {
        w.put_i8(n);
    }
    for &uv in &geometry.uvs {
        w.put_f32(uv);
    }
    w.put_bytes(&geometry.colors);
    Ok(())
}

fn encode_textures(model: &FinalizedModel) -> Result<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.put_u32(count_u32(model.textures.len(), "textures")?);
    for texture in &model.textures {
        w.put_u8(tags::media_type_to_u8(texture.media_type));
        w.put_u8(tags::filter_to_u8(texture.min_filter));
        w.put_u8(tags::filter_to_u8(texture.mag_filter));
        w.put_u8(tags::wrap_to_u8(texture.wrap_s));
        w.put_u8(tags::wrap_to_u8(texture.wrap_t));
        w.put_u64(texture.data.len() as u64);
        w.put_bytes(&texture.data);
    }
    Ok(w.into_bytes())
}

fn count_u32(count: usize, what: &str) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::EncodingOverflow(format!("{count} {what}")))
}
