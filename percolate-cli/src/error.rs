/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use thiserror::Error;

/// Top-level CLI error taxonomy. `percolate_core::Error` and
/// `percolate_algo::Error` are folded in via `#[from]`; only genuinely new
/// concerns (I/O, CLI usage) get their own variant.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] percolate_core::error::Error),

    #[error(transparent)]
    Algo(#[from] percolate_algo::error::Error),

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maps an error to the process exit code promised by the run's contract:
/// usage errors are 2, I/O and transport failures are 1, and internal
/// invariant violations (DSU misuse, stitch mismatch) are also 1 since they
/// are bugs rather than user mistakes but still must not exit 0.
pub fn exit_code(err: &Error) -> i32 {
    match err {
        Error::InvalidArg(_) => 2,
        Error::Core(percolate_core::error::Error::InvalidArg(_)) => 2,
        _ => 1,
    }
}
