/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Single-pass raster-order connected-component labelling of a padded slab.

use dsi_progress_logger::{ProgressLog, ProgressLogger};
use percolate_core::dsu::Dsu;
use percolate_core::index::{neighbour, pad, Connectivity};

use crate::error::Result;
use crate::slab::PaddedSlab;

/// The result of labelling one slab: a DSU keyed on *global* padded ids
/// (slab-local padded id plus `slab.pad_offset`), and the list of pore
/// global ids in ascending raster order.
pub struct Labelling {
    pub dsu: Dsu,
    pub pore_ids: Vec<u32>,
}

/// Labels every pore cell of `slab`, unioning it with each already-visited
/// connectivity-neighbour that is also a pore.
///
/// Mirrors the two-loop structure of the reference scan: a first pass
/// collects pore global ids in raster order, a second pass builds the sets
/// and unions. Splitting the loops (rather than doing both in one pass)
/// lets the progress logger report an accurate `expected_updates` up front.
pub fn label(slab: &PaddedSlab, connectivity: Connectivity, pl: &mut impl ProgressLog) -> Result<Labelling> {
    let offsets = connectivity.preceding_offsets();

    let mut pore_ids = Vec::new();
    for raw_id in 0..slab.raw.len() {
        let pid = pad(&slab.raw, raw_id);
        if !slab.is_wall(pid) {
            pore_ids.push(pid + slab.pad_offset);
        }
    }

    pl.item_name("cell");
    pl.expected_updates(Some(pore_ids.len()));
    pl.start("labelling pore cells");

    let mut dsu = Dsu::with_capacity(pore_ids.len());
    for &global_id in &pore_ids {
        let pid = global_id - slab.pad_offset;
        dsu.make_set(global_id)?;
        for &k in offsets {
            let npid = neighbour(&slab.padded, pid, k);
            if !slab.is_wall(npid) {
                let neighbour_global = npid + slab.pad_offset;
                dsu.union(global_id, neighbour_global)?;
            }
        }
        pl.light_update();
    }
    pl.done();

    Ok(Labelling { dsu, pore_ids })
}

/// A [`ProgressLog`] that discards every update, used by unit and
/// integration tests so they do not print anything.
pub fn silent_logger() -> ProgressLogger {
    let mut pl = ProgressLogger::default();
    pl.log_interval(std::time::Duration::from_secs(u64::MAX));
    pl
}
