/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A worker's in-memory view of its slab: the raw bytes it owns plus the
//! padded copy the labeller and stitcher operate on.

use percolate_core::error::Error as CoreError;
use percolate_core::index::{pad, GridDims};

use crate::error::{Error, Result};

/// A padded slab: `data` has shape `raw.padded()` and is wall-filled except
/// where raw pore bytes have been copied in at their padded positions.
pub struct PaddedSlab {
    pub raw: GridDims,
    pub padded: GridDims,
    pub wall: u8,
    pub pad_offset: u32,
    data: Vec<u8>,
}

impl PaddedSlab {
    /// Builds the padded slab from a worker's raw byte range.
    ///
    /// `pad_offset` is `(Nx+1)*(Ny+1)*offset_z`, the worker's starting
    /// z-plane translated into padded-space units; it is what turns a
    /// slab-local padded id into a cluster-wide unique global id.
    pub fn from_raw_bytes(raw: GridDims, raw_bytes: &[u8], wall: u8, pad_offset: u32) -> Result<Self> {
        if raw_bytes.len() as u32 != raw.len() {
            return Err(Error::Core(CoreError::InvalidArg(format!(
                "expected {} raw bytes, got {}",
                raw.len(),
                raw_bytes.len()
            ))));
        }

        let padded = raw.padded();
        let mut data = vec![wall; padded.len() as usize];
        for raw_id in 0..raw.len() {
            let pid = pad(&raw, raw_id);
            data[pid as usize] = raw_bytes[raw_id as usize];
        }

        Ok(Self {
            raw,
            padded,
            wall,
            pad_offset,
            data,
        })
    }

    #[inline(always)]
    pub fn is_wall(&self, padded_id: u32) -> bool {
        self.data[padded_id as usize] == self.wall
    }

    #[inline(always)]
    pub fn byte_at(&self, padded_id: u32) -> u8 {
        self.data[padded_id as usize]
    }
}
