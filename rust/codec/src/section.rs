// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Container header, section table and byte-level helpers
//!
//! Every section payload is zlib-compressed independently, so a decoder
//! can skip sections it does not know and tolerate absent optional ones.

use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Magic number at the start of every container
pub const MAGIC: [u8; 4] = *b"XKTL";

/// Container version written by this crate
pub const XKT_VERSION: u32 = 10;

/// Oldest container version this crate can still read
///
/// Version 9 predates texture support; its files decode with empty
/// texture tables.
pub const MIN_XKT_VERSION: u32 = 9;

/// Identifies the payload of a section
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    /// Tiles with decode records and entity/mesh records
    Tiles = 0,
    /// Quantized geometry buffers
    Geometries = 1,
    /// Material definitions (JSON)
    Materials = 2,
    /// Texture channel groups (JSON)
    TextureSets = 3,
    /// Encoded texture images
    Textures = 4,
    /// Metadata tree (JSON)
    MetaObjects = 5,
    /// Property sets (JSON)
    PropertySets = 6,
}

impl SectionType {
    /// Decode a section id; unknown ids are legal and skipped by readers
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(SectionType::Tiles),
            1 => Some(SectionType::Geometries),
            2 => Some(SectionType::Materials),
            3 => Some(SectionType::TextureSets),
            4 => Some(SectionType::Textures),
            5 => Some(SectionType::MetaObjects),
            6 => Some(SectionType::PropertySets),
            _ => None,
        }
    }
}

/// Entry in the section table
#[derive(Debug, Clone)]
pub struct SectionEntry {
    pub id: u32,
    pub compressed_len: u64,
    pub uncompressed_len: u64,
}

/// Compress a section payload
pub fn compress(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    Ok(encoder.finish()?)
}

/// Decompress a section payload, verifying the declared length
pub fn decompress(section: u32, payload: &[u8], expected_len: u64) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(payload);
    let mut out = Vec::with_capacity(expected_len as usize);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::SectionCorrupt {
            section,
            reason: format!("inflate failed: {e}"),
        })?;
    if out.len() as u64 != expected_len {
        return Err(Error::SectionCorrupt {
            section,
            reason: format!(
                "inflated to {} bytes, section table declares {}",
                out.len(),
                expected_len
            ),
        });
    }
    Ok(out)
}

/// Wire tags for the fixed enums in binary sections
pub(crate) mod tags {
    use crate::error::{Error, Result};
    use xkt_lite_model::{PrimitiveType, TextureFilter, TextureMediaType, TextureWrap};

    pub fn primitive_to_u8(primitive: PrimitiveType) -> u8 {
        match primitive {
            PrimitiveType::Triangles => 0,
            PrimitiveType::Lines => 1,
            PrimitiveType::Points => 2,
        }
    }

    pub fn primitive_from_u8(section: u32, tag: u8) -> Result<PrimitiveType> {
        match tag {
            0 => Ok(PrimitiveType::Triangles),
            1 => Ok(PrimitiveType::Lines),
            2 => Ok(PrimitiveType::Points),
            _ => Err(Error::SectionCorrupt {
                section,
                reason: format!("unknown primitive tag {tag}"),
            }),
        }
    }

    pub fn media_type_to_u8(media_type: TextureMediaType) -> u8 {
        match media_type {
            TextureMediaType::Png => 0,
            TextureMediaType::Jpeg => 1,
            TextureMediaType::Ktx2 => 2,
        }
    }

    pub fn media_type_from_u8(section: u32, tag: u8) -> Result<TextureMediaType> {
        match tag {
            0 => Ok(TextureMediaType::Png),
            1 => Ok(TextureMediaType::Jpeg),
            2 => Ok(TextureMediaType::Ktx2),
            _ => Err(Error::SectionCorrupt {
                section,
                reason: format!("unknown texture media type {tag}"),
            }),
        }
    }

    pub fn filter_to_u8(filter: TextureFilter) -> u8 {
        match filter {
            TextureFilter::Linear => 0,
            TextureFilter::Nearest => 1,
            TextureFilter::LinearMipmapLinear => 2,
            TextureFilter::LinearMipmapNearest => 3,
            TextureFilter::NearestMipmapLinear => 4,
            TextureFilter::NearestMipmapNearest => 5,
        }
    }

    pub fn filter_from_u8(section: u32, tag: u8) -> Result<TextureFilter> {
        match tag {
            0 => Ok(TextureFilter::Linear),
            1 => Ok(TextureFilter::Nearest),
            2 => Ok(TextureFilter::LinearMipmapLinear),
            3 => Ok(TextureFilter::LinearMipmapNearest),
            4 => Ok(TextureFilter::NearestMipmapLinear),
            5 => Ok(TextureFilter::NearestMipmapNearest),
            _ => Err(Error::SectionCorrupt {
                section,
                reason: format!("unknown texture filter {tag}"),
            }),
        }
    }

    pub fn wrap_to_u8(wrap: TextureWrap) -> u8 {
        match wrap {
            TextureWrap::Repeat => 0,
            TextureWrap::ClampToEdge => 1,
            TextureWrap::MirroredRepeat => 2,
        }
    }

    pub fn wrap_from_u8(section: u32, tag: u8) -> Result<TextureWrap> {
        match tag {
            0 => Ok(TextureWrap::Repeat),
            1 => Ok(TextureWrap::ClampToEdge),
            2 => Ok(TextureWrap::MirroredRepeat),
            _ => Err(Error::SectionCorrupt {
                section,
                reason: format!("unknown texture wrap mode {tag}"),
            }),
        }
    }
}

/// Little-endian append-only byte sink for binary sections
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    #[inline]
    pub fn put_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed UTF-8 string (u16 length)
    pub fn put_string(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len())
            .map_err(|_| Error::EncodingOverflow(format!("string of {} bytes", s.len())))?;
        self.put_u16(len);
        self.put_bytes(s.as_bytes());
        Ok(())
    }
}

/// Little-endian cursor over a binary section
pub struct ByteReader<'a> {
    section: u32,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(section: u32, buf: &'a [u8]) -> Self {
        Self {
            section,
            buf,
            pos: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::SectionCorrupt {
                section: self.section,
                reason: format!(
                    "need {} bytes at offset {}, only {} remain",
                    n,
                    self.pos,
                    self.remaining()
                ),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    /// Length-prefixed UTF-8 string (u16 length)
    pub fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::SectionCorrupt {
            section: self.section,
            reason: "invalid UTF-8 in string".into(),
        })
    }
}
