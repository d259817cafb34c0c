// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser contract
//!
//! Format parsers live outside this crate. Each one receives the raw
//! source bytes plus an attachment-fetch capability and populates the
//! scene model through its builder methods only; finalize and
//! serialization stay with the pipeline.

use crate::error::ParseError;
use crate::format::SourceFormat;
use crate::request::ConvertOptions;
use std::io;
use std::path::{Path, PathBuf};
use xkt_lite_model::SceneModel;

/// Capability for fetching external resources referenced by a source
/// file (glTF buffer/image files, for instance)
pub trait AttachmentSource {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Resolves attachments relative to the source file's directory
pub struct FileAttachmentSource {
    base: PathBuf,
}

impl FileAttachmentSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory of the given source file
    pub fn for_source(source: &Path) -> Self {
        Self::new(source.parent().unwrap_or_else(|| Path::new("")))
    }
}

impl AttachmentSource for FileAttachmentSource {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.base.join(name);
        tracing::debug!(path = %path.display(), "reading attachment file");
        std::fs::read(path)
    }
}

/// Attachment source for in-memory conversions with no backing directory
pub struct NoAttachments;

impl AttachmentSource for NoAttachments {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no attachment source for {name}"),
        ))
    }
}

/// Everything a parser gets to see
pub struct ParseInput<'a> {
    /// Raw source bytes
    pub data: &'a [u8],
    /// Resolved source format
    pub format: SourceFormat,
    /// External resource fetcher
    pub attachments: &'a dyn AttachmentSource,
    /// Conversion options (type filters, normals/textures toggles)
    pub options: &'a ConvertOptions,
}

/// A source-format parser
///
/// Implementations must only call the scene model's builder methods and
/// must not finalize; a malformed source is reported as [`ParseError`]
/// and surfaced verbatim.
pub trait SourceParser {
    fn parse(&self, input: ParseInput<'_>, model: &mut SceneModel)
        -> std::result::Result<(), ParseError>;
}

/// One parser slot per source format
#[derive(Default)]
pub struct ParserRegistry {
    ifc: Option<Box<dyn SourceParser>>,
    gltf: Option<Box<dyn SourceParser>>,
    glb: Option<Box<dyn SourceParser>>,
    cityjson: Option<Box<dyn SourceParser>>,
    las: Option<Box<dyn SourceParser>>,
    laz: Option<Box<dyn SourceParser>>,
    pcd: Option<Box<dyn SourceParser>>,
    ply: Option<Box<dyn SourceParser>>,
    stl: Option<Box<dyn SourceParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser for a format, replacing any previous one
    pub fn register(mut self, format: SourceFormat, parser: Box<dyn SourceParser>) -> Self {
        let slot = match format {
            SourceFormat::Ifc => &mut self.ifc,
            SourceFormat::Gltf => &mut self.gltf,
            SourceFormat::Glb => &mut self.glb,
            SourceFormat::CityJson => &mut self.cityjson,
            SourceFormat::Las => &mut self.las,
            SourceFormat::Laz => &mut self.laz,
            SourceFormat::Pcd => &mut self.pcd,
            SourceFormat::Ply => &mut self.ply,
            SourceFormat::Stl => &mut self.stl,
        };
        *slot = Some(parser);
        self
    }

    /// Look up the parser for a format
    pub fn get(&self, format: SourceFormat) -> Option<&dyn SourceParser> {
        let slot = match format {
            SourceFormat::Ifc => &self.ifc,
            SourceFormat::Gltf => &self.gltf,
            SourceFormat::Glb => &self.glb,
            SourceFormat::CityJson => &self.cityjson,
            SourceFormat::Las => &self.las,
            SourceFormat::Laz => &self.laz,
            SourceFormat::Pcd => &self.pcd,
            SourceFormat::Ply => &self.ply,
            SourceFormat::Stl => &self.stl,
        };
        slot.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullParser;

    impl SourceParser for NullParser {
        fn parse(
            &self,
            _input: ParseInput<'_>,
            _model: &mut SceneModel,
        ) -> std::result::Result<(), ParseError> {
            Ok(())
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ParserRegistry::new().register(SourceFormat::Gltf, Box::new(NullParser));
        assert!(registry.get(SourceFormat::Gltf).is_some());
        assert!(registry.get(SourceFormat::Ifc).is_none());
    }

    #[test]
    fn test_no_attachments_errors() {
        let source = NoAttachments;
        assert!(source.fetch("texture.png").is_err());
    }
}
