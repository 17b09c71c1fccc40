/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Rewrites a worker's output bytes so that every pore cell not belonging
//! to a flow component is overwritten with the wall byte.

use std::collections::HashSet;

use dsi_progress_logger::ProgressLog;
use percolate_core::index::{pad, GridDims};

use crate::error::Result;
use crate::labeller::Labelling;

/// Produces the worker's output bytes for its raw slab: a copy of
/// `raw_bytes` with every non-flow pore cell overwritten to `wall`.
///
/// Cells belonging to a flow component, and cells that were already wall,
/// are left untouched.
pub fn extract(
    raw: &GridDims,
    raw_bytes: &[u8],
    labelling: &mut Labelling,
    pad_offset: u32,
    flow: &HashSet<u32>,
    wall: u8,
    pl: &mut impl ProgressLog,
) -> Result<Vec<u8>> {
    let mut out = raw_bytes.to_vec();

    pl.item_name("cell");
    pl.expected_updates(Some(raw.len() as usize));
    pl.start("extracting flow components");

    for raw_id in 0..raw.len() {
        if out[raw_id as usize] == wall {
            pl.light_update();
            continue;
        }
        let global_id = pad(raw, raw_id) + pad_offset;
        let label = labelling.dsu.find(global_id)?.label;
        if !flow.contains(&label) {
            out[raw_id as usize] = wall;
        }
        pl.light_update();
    }
    pl.done();

    Ok(out)
}
