// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Materials, texture sets and textures
//!
//! Shading follows the metallic-roughness model. Textures hold their
//! encoded image bytes verbatim; the converter never decodes or re-encodes
//! images.

use crate::geometry::{MaterialId, TextureId, TextureSetId};
use serde::{Deserialize, Serialize};

/// Texture minification/magnification filter hint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
    LinearMipmapLinear,
    LinearMipmapNearest,
    NearestMipmapLinear,
    NearestMipmapNearest,
}

/// Texture wrap mode hint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureWrap {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Encoding of the stored image bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureMediaType {
    Png,
    Jpeg,
    Ktx2,
}

/// Parameters for creating a texture
#[derive(Debug, Clone)]
pub struct TextureParams {
    pub media_type: TextureMediaType,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    /// Encoded image bytes (PNG/JPEG/KTX2 container, not raw pixels)
    pub data: Vec<u8>,
}

impl TextureParams {
    pub fn new(media_type: TextureMediaType, data: Vec<u8>) -> Self {
        Self {
            media_type,
            min_filter: TextureFilter::default(),
            mag_filter: TextureFilter::default(),
            wrap_s: TextureWrap::default(),
            wrap_t: TextureWrap::default(),
            data,
        }
    }
}

/// Texture owned by the scene model
#[derive(Debug, Clone)]
pub struct Texture {
    pub id: TextureId,
    pub media_type: TextureMediaType,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
    pub data: Vec<u8>,
}

/// Parameters for creating a texture set
#[derive(Debug, Clone, Default)]
pub struct TextureSetParams {
    pub color: Option<TextureId>,
    pub metallic_roughness: Option<TextureId>,
    pub normals: Option<TextureId>,
    pub emissive: Option<TextureId>,
    pub occlusion: Option<TextureId>,
}

/// Named group of texture channels shared by materials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureSet {
    pub id: TextureSetId,
    pub color: Option<TextureId>,
    pub metallic_roughness: Option<TextureId>,
    pub normals: Option<TextureId>,
    pub emissive: Option<TextureId>,
    pub occlusion: Option<TextureId>,
}

/// Parameters for creating a material
#[derive(Debug, Clone)]
pub struct MaterialParams {
    /// Base color and alpha
    pub color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub texture_set: Option<TextureSetId>,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            metallic: 0.0,
            roughness: 1.0,
            texture_set: None,
        }
    }
}

/// Metallic-roughness material
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub texture_set: Option<TextureSetId>,
}
