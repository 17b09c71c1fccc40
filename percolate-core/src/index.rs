/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bijection between 3D coordinates and 1D cell ids, and the padded-space
//! neighbour arithmetic the labeller walks.
//!
//! Two index spaces exist for any slab: the *raw* space of shape
//! `(Nx, Ny, Nz_loc)` holding the segmented bytes as read from disk, and the
//! *padded* space of shape `(Nx+1, Ny+1, Nz_loc+1)` which adds one
//! wall-sentinel layer on the low side of every axis so that neighbour
//! lookups never need bounds checks.

use crate::error::{Error, Result};

/// The shape of a 3D grid, raw or padded — x is the fastest-varying axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDims {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
}

impl GridDims {
    pub fn new(nx: u32, ny: u32, nz: u32) -> Result<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(Error::InvalidArg(format!(
                "dimensions must be positive, got ({nx}, {ny}, {nz})"
            )));
        }
        Ok(Self { nx, ny, nz })
    }

    /// Total number of cells in this grid.
    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.nx * self.ny * self.nz
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of the padded counterpart of this (raw) grid: one extra layer
    /// on the low side of every axis.
    #[inline(always)]
    pub fn padded(&self) -> GridDims {
        GridDims {
            nx: self.nx + 1,
            ny: self.ny + 1,
            nz: self.nz + 1,
        }
    }

    /// Row-major, x-fastest flat index: `z*nx*ny + y*nx + x`.
    #[inline(always)]
    pub fn flat(&self, x: u32, y: u32, z: u32) -> u32 {
        z * self.nx * self.ny + y * self.nx + x
    }

    /// Inverse of [`GridDims::flat`].
    #[inline(always)]
    pub fn unflat(&self, id: u32) -> (u32, u32, u32) {
        let plane = self.nx * self.ny;
        let z = id / plane;
        let rem = id % plane;
        let y = rem / self.nx;
        let x = rem % self.nx;
        (x, y, z)
    }
}

/// Maps a raw-space cell id to its padded-space counterpart: `(x,y,z) -> (x+1,y+1,z+1)`.
#[inline]
pub fn pad(raw: &GridDims, id: u32) -> u32 {
    let (x, y, z) = raw.unflat(id);
    raw.padded().flat(x + 1, y + 1, z + 1)
}

/// Inverse of [`pad`]: maps a padded-space cell id back to raw space.
#[inline]
pub fn unpad(raw: &GridDims, pid: u32) -> u32 {
    let (x, y, z) = raw.padded().unflat(pid);
    raw.flat(x - 1, y - 1, z - 1)
}

/// Returns the index, in padded space, of the neighbour of `pid` at relative
/// position `k` in the 3x3x3 neighbourhood (`k` in `0..27`, row-major over
/// `{-1,0,1}^3`; `k == 13` is `pid` itself and must never be passed in).
///
/// Only `k` in `0..13` ever denotes a neighbour that precedes `pid` in raster
/// order — that is the set the labeller actually visits.
#[inline]
pub fn neighbour(padded: &GridDims, pid: u32, k: u32) -> u32 {
    debug_assert!(k < 27, "k must index the 3x3x3 neighbourhood");
    let dx = (k % 3) as i64 - 1;
    let dy = ((k / 3) % 3) as i64 - 1;
    let dz = (k / 9) as i64 - 1;
    let stride_y = padded.nx as i64;
    let stride_z = padded.nx as i64 * padded.ny as i64;
    let offset = dz * stride_z + dy * stride_y + dx;
    (pid as i64 + offset) as u32
}

/// Which of the 26 potential neighbours count as adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// 6-connected: neighbours sharing a face.
    Face,
    /// 18-connected: neighbours sharing a face or an edge.
    Edge,
    /// 26-connected: neighbours sharing a face, edge, or vertex.
    Vertex,
}

impl Connectivity {
    /// The subset of `0..13` (raster-preceding neighbours) this connectivity
    /// visits. Raster-forward neighbours are omitted on purpose: they will
    /// visit the current cell in their own loop iteration, so the union is
    /// symmetric without needing to be performed twice.
    pub fn preceding_offsets(&self) -> &'static [u32] {
        match self {
            Connectivity::Face => &[4, 10, 12],
            // The 9-element set is the correct 18-connected preceding
            // neighbourhood; a 7-element variant without {5, 9} has been seen
            // in the wild but is missing two legitimate edge neighbours.
            Connectivity::Edge => &[1, 3, 4, 5, 7, 9, 10, 11, 12],
            Connectivity::Vertex => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        }
    }
}

impl std::str::FromStr for Connectivity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "face" => Ok(Connectivity::Face),
            "edge" => Ok(Connectivity::Edge),
            "vertex" => Ok(Connectivity::Vertex),
            other => Err(Error::InvalidArg(format!(
                "unknown connectivity '{other}': expected face, edge, or vertex"
            ))),
        }
    }
}
