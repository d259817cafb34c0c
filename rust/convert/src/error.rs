// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::format::SourceFormat;
use thiserror::Error;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error surfaced verbatim from a source-format parser
#[derive(Error, Debug)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Errors that can occur during a conversion
///
/// None of these are retried; a failure aborts the current file and, in
/// batch mode, the remaining batch.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Argument expected: source or source_data")]
    MissingInput,

    #[error("Argument expected: output or output sink")]
    MissingOutput,

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("No parser registered for format: {0}")]
    NoParser(SourceFormat),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),

    #[error("Model error: {0}")]
    Model(#[from] xkt_lite_model::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] xkt_lite_codec::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
