// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::geometry::{GeometryId, MeshId};
use thiserror::Error;

/// Result type for scene model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or finalizing a scene model
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error("Mesh {0} is already assigned to an entity")]
    MeshAlreadyUsed(MeshId),

    #[error("Model has no entities")]
    EmptyModel,

    #[error("Degenerate geometry {id}: {reason}")]
    DegenerateGeometry { id: GeometryId, reason: String },

    #[error("Model is already finalized")]
    ModelFinalized,

    #[error("Invalid minimum tile size: {0}")]
    InvalidTileSize(f64),
}
