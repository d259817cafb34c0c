// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supported source formats
//!
//! Formats are a closed enum so that adding one is a compile-checked
//! change everywhere a format is matched (parser registry, conversion
//! dispatch), instead of a string comparison scattered over the pipeline.

use crate::error::{Error, Result};
use std::fmt;
use std::path::Path;

/// Source file format accepted by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Ifc,
    Gltf,
    Glb,
    CityJson,
    Las,
    Laz,
    Pcd,
    Ply,
    Stl,
}

impl SourceFormat {
    /// All supported formats
    pub const ALL: [SourceFormat; 9] = [
        SourceFormat::Ifc,
        SourceFormat::Gltf,
        SourceFormat::Glb,
        SourceFormat::CityJson,
        SourceFormat::Las,
        SourceFormat::Laz,
        SourceFormat::Pcd,
        SourceFormat::Ply,
        SourceFormat::Stl,
    ];

    /// Canonical lowercase tag (also the recognized file extension)
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Ifc => "ifc",
            SourceFormat::Gltf => "gltf",
            SourceFormat::Glb => "glb",
            SourceFormat::CityJson => "json",
            SourceFormat::Las => "las",
            SourceFormat::Laz => "laz",
            SourceFormat::Pcd => "pcd",
            SourceFormat::Ply => "ply",
            SourceFormat::Stl => "stl",
        }
    }

    /// Resolve a format tag or file extension
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "ifc" => Ok(SourceFormat::Ifc),
            "gltf" => Ok(SourceFormat::Gltf),
            "glb" => Ok(SourceFormat::Glb),
            "json" | "cityjson" => Ok(SourceFormat::CityJson),
            "las" => Ok(SourceFormat::Las),
            "laz" => Ok(SourceFormat::Laz),
            "pcd" => Ok(SourceFormat::Pcd),
            "ply" => Ok(SourceFormat::Ply),
            "stl" => Ok(SourceFormat::Stl),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolve from a source path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        Self::from_tag(extension)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        assert_eq!(SourceFormat::from_tag("IFC").unwrap(), SourceFormat::Ifc);
        assert_eq!(
            SourceFormat::from_tag("cityjson").unwrap(),
            SourceFormat::CityJson
        );
        assert!(matches!(
            SourceFormat::from_tag("step"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            SourceFormat::from_path(Path::new("models/house.GLB")).unwrap(),
            SourceFormat::Glb
        );
        assert!(SourceFormat::from_path(Path::new("noextension")).is_err());
    }
}
