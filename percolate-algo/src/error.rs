/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use percolate_core::error::Error as CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Propagated DSU/indexing misuse (`AlreadyPresent`, `NotFound`) or an
    /// invalid-argument rejection — see [`percolate_core::error::Error`].
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The halo exchange between two adjacent slabs disagreed on the number
    /// of pore cells on the shared plane. Indicates a partitioning bug, not
    /// a property of the input data.
    #[error("halo stitch mismatch: expected {expected} labels on the shared plane, received {got}")]
    StitchMismatch { expected: usize, got: usize },

    /// The underlying message-passing backend failed or was poisoned by an
    /// earlier failure on another worker.
    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
