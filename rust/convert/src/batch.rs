// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch manifest conversion
//!
//! A batch manifest lists the glTF files (and optional per-file metadata
//! files) produced by a pre-split export. The manifest is validated
//! before any file is touched; entries are then converted strictly
//! sequentially, so peak memory stays at roughly one model's footprint.
//! The first failure aborts the batch and no output manifest is written;
//! already-written containers stay on disk.

use crate::error::{Error, Result};
use crate::format::SourceFormat;
use crate::parser::ParserRegistry;
use crate::pipeline::convert;
use crate::request::{ConvertOptions, ConvertRequest};
use crate::stats::ConversionStats;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Input manifest schema
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    /// Geometry files to convert, in order
    pub gltf_out_files: Vec<PathBuf>,
    /// Per-file metadata files; must match `gltf_out_files` in length
    #[serde(default)]
    pub metadata_out_files: Option<Vec<PathBuf>>,
    /// Precomputed world AABB shared by all files
    #[serde(default)]
    pub aabb: Option<[f64; 6]>,
}

impl BatchManifest {
    /// Parse manifest JSON bytes
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| Error::Input(format!("invalid batch manifest: {e}")))
    }

    /// Fail-fast validation, before any conversion starts
    pub fn validate(&self) -> Result<()> {
        if self.gltf_out_files.is_empty() {
            return Err(Error::Input(
                "input manifest invalid: gltfOutFiles is zero length".into(),
            ));
        }
        if let Some(metadata) = &self.metadata_out_files {
            if metadata.len() != self.gltf_out_files.len() {
                return Err(Error::Input(
                    "input manifest invalid: length of gltfOutFiles and metadataOutFiles don't match"
                        .into(),
                ));
            }
        }
        Ok(())
    }
}

/// Output manifest, written after every entry converted successfully
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputManifest {
    pub input_file: String,
    pub converter_application: String,
    pub converter_application_version: String,
    pub conversion_date: String,
    pub output_dir: String,
    /// Converted container filenames, in input order
    pub xkt_files: Vec<String>,
}

/// Result of a completed batch
pub struct BatchResult {
    pub manifest: OutputManifest,
    pub stats: Vec<ConversionStats>,
}

/// Convert every entry of a batch manifest
///
/// `output_manifest_path` names the output manifest file; converted
/// containers land next to it, named after each source file's stem.
pub fn convert_batch(
    manifest_path: &Path,
    output_manifest_path: &Path,
    options: &ConvertOptions,
    parsers: &ParserRegistry,
) -> Result<BatchResult> {
    let manifest_data = std::fs::read(manifest_path).map_err(|e| {
        Error::Input(format!(
            "cannot read batch manifest {}: {e}",
            manifest_path.display()
        ))
    })?;
    let manifest = BatchManifest::from_slice(&manifest_data)?;
    manifest.validate()?;

    let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new(""));
    let output_dir = output_manifest_path
        .parent()
        .unwrap_or_else(|| Path::new(""));

    let total = manifest.gltf_out_files.len();
    tracing::info!(manifest = %manifest_path.display(), files = total, "converting batch");

    let mut xkt_files = Vec::with_capacity(total);
    let mut all_stats = Vec::with_capacity(total);

    for (index, source) in manifest.gltf_out_files.iter().enumerate() {
        let source = resolve(manifest_dir, source);
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Input(format!("invalid source filename: {}", source.display()))
            })?;
        let output_name = format!("{stem}.xkt");

        let mut request = ConvertRequest::from_path(&source, output_dir.join(&output_name))
            .with_options(options.clone());
        // Pre-split exports are glTF; still honor an explicit extension
        request.source_format = Some(
            SourceFormat::from_path(&source).unwrap_or(SourceFormat::Gltf),
        );
        if let Some(metadata_files) = &manifest.metadata_out_files {
            request.meta_model_source = Some(resolve(manifest_dir, &metadata_files[index]));
        }
        if let Some(aabb) = manifest.aabb {
            request.model_aabb = Some(aabb);
        }

        let stats = convert(&mut request, parsers)?;
        tracing::info!(
            file = %output_name,
            index = index + 1,
            total,
            "converted batch entry"
        );
        xkt_files.push(output_name);
        all_stats.push(stats);
    }

    let output_manifest = OutputManifest {
        input_file: manifest_path.display().to_string(),
        converter_application: env!("CARGO_PKG_NAME").to_string(),
        converter_application_version: format!("v{}", env!("CARGO_PKG_VERSION")),
        conversion_date: format_utc_timestamp(SystemTime::now()),
        output_dir: output_dir.display().to_string(),
        xkt_files,
    };
    let manifest_json = serde_json::to_vec(&output_manifest)
        .map_err(|e| Error::Input(format!("cannot serialize output manifest: {e}")))?;
    std::fs::write(output_manifest_path, manifest_json)?;
    tracing::info!(manifest = %output_manifest_path.display(), "wrote output manifest");

    Ok(BatchResult {
        manifest: output_manifest,
        stats: all_stats,
    })
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Format a timestamp as `DD-MM-YYYY- HH-MM-SS` (UTC)
fn format_utc_timestamp(time: SystemTime) -> String {
    let seconds = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (year, month, day) = civil_from_days((seconds / 86_400) as i64);
    let second_of_day = seconds % 86_400;
    format!(
        "{:02}-{:02}-{}- {:02}-{:02}-{:02}",
        day,
        month,
        year,
        second_of_day / 3600,
        (second_of_day % 3600) / 60,
        second_of_day % 60
    )
}

/// Days since 1970-01-01 to (year, month, day), proleptic Gregorian
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    (year + i64::from(month <= 2), month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_validate_empty_file_list() {
        let manifest = BatchManifest {
            gltf_out_files: vec![],
            metadata_out_files: None,
            aabb: None,
        };
        assert!(matches!(manifest.validate(), Err(Error::Input(_))));
    }

    #[test]
    fn test_validate_length_mismatch() {
        let manifest = BatchManifest {
            gltf_out_files: vec!["a.gltf".into(), "b.gltf".into()],
            metadata_out_files: Some(vec!["a.json".into()]),
            aabb: None,
        };
        assert!(matches!(manifest.validate(), Err(Error::Input(_))));
    }

    #[test]
    fn test_parse_manifest_json() {
        let json = r#"{
            "gltfOutFiles": ["model_1.gltf", "model_2.gltf"],
            "metadataOutFiles": ["model_1.json", "model_2.json"],
            "aabb": [0, 0, 0, 10, 10, 10]
        }"#;
        let manifest = BatchManifest::from_slice(json.as_bytes()).unwrap();
        manifest.validate().unwrap();
        assert_eq!(manifest.gltf_out_files.len(), 2);
        assert_eq!(manifest.aabb.unwrap()[3], 10.0);
    }

    #[test]
    fn test_manifest_missing_field_is_input_error() {
        assert!(matches!(
            BatchManifest::from_slice(b"{}"),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(
            format_utc_timestamp(UNIX_EPOCH),
            "01-01-1970- 00-00-00"
        );
        // 2024-02-29 12:30:45 UTC
        let leap = UNIX_EPOCH + Duration::from_secs(1_709_209_845);
        assert_eq!(format_utc_timestamp(leap), "29-02-2024- 12-30-45");
    }

    #[test]
    fn test_civil_from_days() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
    }
}
