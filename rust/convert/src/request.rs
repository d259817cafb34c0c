// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion requests and options

use crate::error::{Error, Result};
use crate::format::SourceFormat;
use std::path::PathBuf;

/// Options controlling a conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Only convert objects of these types
    pub include_types: Option<Vec<String>>,
    /// Never convert objects of these types
    pub exclude_types: Option<Vec<String>>,
    /// Rotate the model 90 degrees about X (Z-up sources)
    pub rotate_x: bool,
    /// Collapse byte-identical geometries to one stored copy
    pub reuse_geometries: bool,
    /// Upper bound on a tile's AABB diagonal, in world units
    pub min_tile_size: f64,
    /// Convert textures (glTF sources only)
    pub include_textures: bool,
    /// Convert normals; when off, the viewer generates face-aligned ones
    pub include_normals: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_types: None,
            exclude_types: None,
            rotate_x: false,
            reuse_geometries: true,
            min_tile_size: 500.0,
            include_textures: false,
            include_normals: false,
        }
    }
}

/// Where the encoded container goes
pub type OutputSink = Box<dyn FnMut(&[u8])>;

/// A single-file conversion request
///
/// Source is either a path or in-memory bytes with an explicit format.
/// At least one destination (path or sink) is required.
pub struct ConvertRequest {
    pub source: Option<PathBuf>,
    pub source_data: Option<Vec<u8>>,
    /// Required with `source_data`; optional override for `source`
    pub source_format: Option<SourceFormat>,
    pub meta_model_source: Option<PathBuf>,
    pub meta_model_data: Option<Vec<u8>>,
    pub output: Option<PathBuf>,
    pub output_sink: Option<OutputSink>,
    /// Precomputed world AABB for pre-split batch conversions
    pub model_aabb: Option<[f64; 6]>,
    pub options: ConvertOptions,
}

impl ConvertRequest {
    /// Convert a source file to an output file
    pub fn from_path(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
            source_data: None,
            source_format: None,
            meta_model_source: None,
            meta_model_data: None,
            output: Some(output.into()),
            output_sink: None,
            model_aabb: None,
            options: ConvertOptions::default(),
        }
    }

    /// Convert in-memory bytes, collecting the container through a sink
    pub fn from_data(data: Vec<u8>, format: SourceFormat, sink: OutputSink) -> Self {
        Self {
            source: None,
            source_data: Some(data),
            source_format: Some(format),
            meta_model_source: None,
            meta_model_data: None,
            output: None,
            output_sink: Some(sink),
            model_aabb: None,
            options: ConvertOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_meta_model_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.meta_model_source = Some(path.into());
        self
    }

    pub fn with_meta_model_data(mut self, data: Vec<u8>) -> Self {
        self.meta_model_data = Some(data);
        self
    }

    pub fn with_model_aabb(mut self, aabb: [f64; 6]) -> Self {
        self.model_aabb = Some(aabb);
        self
    }

    /// Validate the request and resolve the source format
    pub fn validate(&self) -> Result<SourceFormat> {
        if self.source.is_none() && self.source_data.is_none() {
            return Err(Error::MissingInput);
        }
        if self.source.is_none() && self.source_format.is_none() {
            return Err(Error::Input(
                "source_format is required with source_data".into(),
            ));
        }
        if self.output.is_none() && self.output_sink.is_none() {
            return Err(Error::MissingOutput);
        }
        if !self.options.min_tile_size.is_finite() || self.options.min_tile_size <= 0.0 {
            return Err(Error::Input(format!(
                "min_tile_size must be positive, got {}",
                self.options.min_tile_size
            )));
        }
        match self.source_format {
            Some(format) => Ok(format),
            // Checked above: a format tag is mandatory without a path
            None => SourceFormat::from_path(self.source.as_ref().expect("source path present")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input() {
        let request = ConvertRequest {
            source: None,
            source_data: None,
            source_format: None,
            meta_model_source: None,
            meta_model_data: None,
            output: Some("out.xkt".into()),
            output_sink: None,
            model_aabb: None,
            options: ConvertOptions::default(),
        };
        assert!(matches!(request.validate(), Err(Error::MissingInput)));
    }

    #[test]
    fn test_missing_output() {
        let mut request = ConvertRequest::from_path("model.gltf", "out.xkt");
        request.output = None;
        assert!(matches!(request.validate(), Err(Error::MissingOutput)));
    }

    #[test]
    fn test_data_without_format() {
        let request = ConvertRequest {
            source: None,
            source_data: Some(vec![1, 2, 3]),
            source_format: None,
            meta_model_source: None,
            meta_model_data: None,
            output: Some("out.xkt".into()),
            output_sink: None,
            model_aabb: None,
            options: ConvertOptions::default(),
        };
        assert!(matches!(request.validate(), Err(Error::Input(_))));
    }

    #[test]
    fn test_format_resolved_from_extension() {
        let request = ConvertRequest::from_path("model.gltf", "out.xkt");
        assert_eq!(request.validate().unwrap(), SourceFormat::Gltf);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let request = ConvertRequest::from_path("model.step", "out.xkt");
        assert!(matches!(
            request.validate(),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_invalid_tile_size_rejected() {
        let mut request = ConvertRequest::from_path("model.gltf", "out.xkt");
        request.options.min_tile_size = -5.0;
        assert!(matches!(request.validate(), Err(Error::Input(_))));
    }
}
