/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Error taxonomy shared by the core data structures.
//!
//! `AlreadyPresent` and `NotFound` indicate DSU misuse and should never be
//! observed at runtime; reaching them is a bug in a calling component, not a
//! property of the input data.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("cell {0} already has a set in this DSU")]
    AlreadyPresent(u32),

    #[error("cell {0} has no set in this DSU")]
    NotFound(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
