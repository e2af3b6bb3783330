// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry synthesis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while synthesizing meshes from implicit solids.
///
/// All of these are recoverable: the conversion driver skips the offending
/// face or entity and continues with the rest of the element.
#[derive(Error, Debug)]
pub enum Error {
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("topology failure: {0}")]
    Topology(String),

    #[error("polygon boolean failed: {0}")]
    BooleanEngine(String),

    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
}
