// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-file conversion pipeline
//!
//! parse -> finalize -> encode -> write, strictly sequential and
//! run-to-completion. The scene model is owned by this function for the
//! whole conversion; nothing is shared or retried. Each stage returns
//! its statistics delta and [`convert`] folds them into one
//! [`ConversionStats`] value.

use crate::error::{Error, Result};
use crate::metamodel;
use crate::parser::{FileAttachmentSource, NoAttachments, ParseInput, ParserRegistry};
use crate::request::ConvertRequest;
use crate::stats::ConversionStats;
use std::time::Instant;
use xkt_lite_model::{Aabb, ModelConfig, SceneModel};

/// Convert one source file or buffer into a container
///
/// Fails without writing any output when validation, parsing, finalize
/// or encoding fails; an IO failure while writing can leave a partial
/// file, which the caller may clean up.
pub fn convert(request: &mut ConvertRequest, parsers: &ParserRegistry) -> Result<ConversionStats> {
    let started = Instant::now();
    let format = request.validate()?;

    let mut stats = ConversionStats {
        source_format: format.to_string(),
        ..Default::default()
    };

    let source_data = match (&request.source_data, &request.source) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => {
            tracing::info!(source = %path.display(), "reading input file");
            std::fs::read(path).map_err(|e| {
                Error::Input(format!("cannot read source file {}: {e}", path.display()))
            })?
        }
        (None, None) => return Err(Error::MissingInput),
    };
    stats.source_size = source_data.len() as u64;

    let meta_model_data = match (&request.meta_model_data, &request.meta_model_source) {
        (Some(data), _) => Some(data.clone()),
        (None, Some(path)) => {
            tracing::info!(metamodel = %path.display(), "reading input metadata file");
            Some(std::fs::read(path).map_err(|e| {
                Error::Input(format!(
                    "cannot read metamodel file {}: {e}",
                    path.display()
                ))
            })?)
        }
        (None, None) => None,
    };

    let config = ModelConfig {
        min_tile_size: request.options.min_tile_size,
        reuse_geometries: request.options.reuse_geometries,
        rotate_x: request.options.rotate_x,
    };
    if !config.reuse_geometries {
        tracing::info!("geometry reuse is disabled");
    }
    let mut model = SceneModel::new(config)?;

    if let Some(aabb) = request.model_aabb {
        model.set_model_aabb(Aabb::from_array(aabb))?;
    }

    if let Some(data) = &meta_model_data {
        let meta_model = metamodel::parse_meta_model(data)?;
        stats.schema_version = meta_model.schema.clone().unwrap_or_default();
        stats.title = meta_model
            .id
            .clone()
            .or(meta_model.project_id.clone())
            .unwrap_or_default();
        stats.author = meta_model.author.clone().unwrap_or_default();
        stats.created = meta_model.created_at.clone().unwrap_or_default();
        metamodel::apply_meta_model(&meta_model, &mut model)?;
    }

    let parser = parsers.get(format).ok_or(Error::NoParser(format))?;
    let file_attachments = request.source.as_deref().map(FileAttachmentSource::for_source);
    let no_attachments = NoAttachments;
    let input = ParseInput {
        data: &source_data,
        format,
        attachments: file_attachments
            .as_ref()
            .map(|a| a as &dyn crate::parser::AttachmentSource)
            .unwrap_or(&no_attachments),
        options: &request.options,
    };
    parser.parse(input, &mut model)?;
    tracing::info!("input file parsed OK, building container");

    let (finalized, finalize_stats) = model.finalize()?;
    stats.apply_finalize(&finalize_stats);

    let (bytes, encode_stats) = xkt_lite_codec::write_model(&finalized)?;
    stats.apply_encode(&encode_stats);

    if let Some(output) = &request.output {
        tracing::info!(output = %output.display(), "writing container file");
        std::fs::write(output, &bytes)?;
    }
    if let Some(sink) = &mut request.output_sink {
        sink(&bytes);
    }

    stats.conversion_time = started.elapsed().as_secs_f64();
    tracing::info!(
        format = %stats.source_format,
        objects = stats.num_objects,
        geometries = stats.num_geometries,
        triangles = stats.num_triangles,
        tiles = stats.num_tiles,
        xkt_size = stats.xkt_size,
        ratio = stats.compression_ratio,
        seconds = stats.conversion_time,
        "converted"
    );
    Ok(stats)
}
