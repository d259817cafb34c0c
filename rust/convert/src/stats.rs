// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion statistics
//!
//! Each pipeline stage returns its own delta ([`FinalizeStats`],
//! [`EncodeStats`]); the conversion folds them into one value here. The
//! record is observability output only and is never persisted in the
//! container.

use serde::Serialize;
use xkt_lite_codec::EncodeStats;
use xkt_lite_model::FinalizeStats;

/// Aggregated statistics for one converted file
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionStats {
    /// Source format tag ("gltf", "ifc", ...)
    pub source_format: String,
    /// Source schema version, when the metadata carries one
    pub schema_version: String,
    pub title: String,
    pub author: String,
    pub created: String,
    pub num_meta_objects: usize,
    pub num_property_sets: usize,
    pub num_triangles: usize,
    pub num_vertices: usize,
    pub num_normals: usize,
    #[serde(rename = "numUVs")]
    pub num_uvs: usize,
    pub num_textures: usize,
    pub num_texture_sets: usize,
    pub num_objects: usize,
    pub num_geometries: usize,
    pub num_tiles: usize,
    /// Source file size in bytes
    pub source_size: u64,
    /// Container size in bytes
    pub xkt_size: u64,
    /// Encoded texture bytes inside the container
    pub textures_size: u64,
    /// Container version written
    pub xkt_version: u32,
    /// source_size / xkt_size
    pub compression_ratio: f64,
    /// Wall-clock conversion time in seconds
    pub conversion_time: f64,
    /// World AABB `[min_x, min_y, min_z, max_x, max_y, max_z]`
    pub aabb: [f64; 6],
    /// Effective tile diagonal bound
    pub min_tile_size: f64,
}

impl ConversionStats {
    /// Fold in the finalize-stage delta
    pub fn apply_finalize(&mut self, delta: &FinalizeStats) {
        self.num_objects = delta.num_objects;
        self.num_geometries = delta.num_geometries;
        self.num_triangles = delta.num_triangles;
        self.num_vertices = delta.num_vertices;
        self.num_normals = delta.num_normals;
        self.num_uvs = delta.num_uvs;
        self.num_tiles = delta.num_tiles;
        self.num_meta_objects = delta.num_meta_objects;
        self.num_property_sets = delta.num_property_sets;
        self.aabb = delta.aabb;
        self.min_tile_size = delta.min_tile_size;
    }

    /// Fold in the encode-stage delta
    pub fn apply_encode(&mut self, delta: &EncodeStats) {
        self.xkt_size = delta.compressed_size;
        self.textures_size = delta.textures_size;
        self.num_textures = delta.num_textures;
        self.num_texture_sets = delta.num_texture_sets;
        self.xkt_version = delta.xkt_version;
        if delta.compressed_size > 0 {
            self.compression_ratio = self.source_size as f64 / delta.compressed_size as f64;
        }
    }
}
