// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding or decoding the container
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid magic number")]
    InvalidMagic,

    #[error("Unsupported container version {0} (supported: {1}..={2})")]
    UnsupportedVersion(u32, u32, u32),

    #[error("Encoding overflow: {0}")]
    EncodingOverflow(String),

    #[error("Truncated container: {0}")]
    Truncated(String),

    #[error("Corrupt section {section}: {reason}")]
    SectionCorrupt { section: u32, reason: String },

    #[error("JSON section error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
