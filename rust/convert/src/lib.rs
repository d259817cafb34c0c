// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # XKT-Lite Converter
//!
//! Pipeline that turns BIM/3D source files into the XKT container:
//! an external format parser populates a [`SceneModel`] through the
//! builder contract, [`convert`] finalizes it (dedup, tiling,
//! quantization) and encodes the container, and [`convert_batch`] runs
//! that pipeline sequentially over a pre-split manifest.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xkt_lite_convert::{convert, ConvertRequest, ParserRegistry, SourceFormat};
//!
//! let parsers = ParserRegistry::new()
//!     .register(SourceFormat::Gltf, Box::new(my_gltf_parser));
//! let mut request = ConvertRequest::from_path("duplex.gltf", "duplex.xkt");
//! let stats = convert(&mut request, &parsers)?;
//! println!("converted {} objects, {} triangles", stats.num_objects, stats.num_triangles);
//! ```
//!
//! Conversions are single-threaded and run to completion; batch entries
//! are processed one fully-written model at a time, failing fast on the
//! first error without writing the output manifest.

pub mod batch;
pub mod error;
pub mod format;
pub mod metamodel;
pub mod parser;
pub mod pipeline;
pub mod request;
pub mod stats;

pub use batch::{convert_batch, BatchManifest, BatchResult, OutputManifest};
pub use error::{Error, ParseError, Result};
pub use format::SourceFormat;
pub use metamodel::{apply_meta_model, parse_meta_model, MetaModelData};
pub use parser::{
    AttachmentSource, FileAttachmentSource, NoAttachments, ParseInput, ParserRegistry, SourceParser,
};
pub use pipeline::convert;
pub use request::{ConvertOptions, ConvertRequest, OutputSink};
pub use stats::ConversionStats;

// Re-exported so parser implementations depend on one crate
pub use xkt_lite_model::SceneModel;
