// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # XKT-Lite Container Codec
//!
//! Versioned binary container for finalized scene models.
//!
//! ## File Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ HEADER                                                       │
//! │  [0..4]   Magic: b"XKTL"                                     │
//! │  [4..8]   Version: u32                                       │
//! │  [8..12]  Section count: u32                                 │
//! ├──────────────────────────────────────────────────────────────┤
//! │ SECTION TABLE (24 bytes per section)                         │
//! │  id: u32, compressed_len: u64, uncompressed_len: u64         │
//! ├──────────────────────────────────────────────────────────────┤
//! │ SECTION PAYLOADS (each zlib-compressed, in table order)      │
//! │  Tiles, Geometries, Materials, TextureSets, Textures,        │
//! │  MetaObjects, PropertySets                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sections are compressed independently so a reader can skip unknown
//! ids. Structured sections (materials, texture sets, metadata, property
//! sets) are JSON; bulk geometry and tile data is packed little-endian
//! with i16 quantized positions and oct-encoded i8 normals.
//!
//! Compatibility rules: a header version above [`XKT_VERSION`] fails hard
//! with [`Error::UnsupportedVersion`]; versions down to
//! [`MIN_XKT_VERSION`] are upgraded best-effort (missing sections decode
//! to empty tables).

pub mod error;
pub mod reader;
pub mod section;
pub mod writer;

pub use error::{Error, Result};
pub use reader::{read_model, DecodedEntity, DecodedGeometry, DecodedMesh, DecodedScene, DecodedTile};
pub use section::{SectionType, MAGIC, MIN_XKT_VERSION, XKT_VERSION};
pub use writer::{write_model, EncodeStats};
