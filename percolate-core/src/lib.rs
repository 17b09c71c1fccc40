/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![deny(unreachable_code)]
#![deny(unreachable_patterns)]

//! Core data types for extracting percolating (flow) connected components
//! from a segmented volumetric image: 3D indexing arithmetic and the
//! disjoint-set union the labelling pass builds on.
//!
//! This crate is deliberately free of I/O and message-passing concerns; it
//! only knows about cell ids and grid shapes. The labelling, stitching, and
//! classification pipeline that consumes it lives in `percolate-algo`.

pub mod dsu;
pub mod error;
pub mod index;

pub mod prelude {
    pub use crate::dsu::{Dsu, Root};
    pub use crate::error::{Error, Result};
    pub use crate::index::{neighbour, pad, unpad, Connectivity, GridDims};
}
