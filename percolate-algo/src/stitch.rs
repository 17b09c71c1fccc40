/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Halo exchange: merges adjacent workers' per-slab labellings into one
//! logical global labelling by making a worker's bottom-face labels match
//! its upstream neighbour's top-face labels.

use log::debug;
use percolate_core::index::GridDims;

use crate::error::{Error, Result};
use crate::labeller::Labelling;
use crate::transport::Transport;

/// The padded-space z-index of a slab's top and bottom planes.
fn bottom_plane_z() -> u32 {
    0
}

fn top_plane_z(padded: &GridDims) -> u32 {
    padded.nz - 1
}

/// Global ids (already offset by `pad_offset`) of every pore cell on the
/// slab's `z` plane, in ascending raster order — the order both send and
/// receive sides agree on.
fn plane_pore_ids(padded: &GridDims, pad_offset: u32, pore_ids: &[u32], z: u32) -> Vec<u32> {
    pore_ids
        .iter()
        .copied()
        .filter(|&global_id| {
            let pid = global_id - pad_offset;
            let (_, _, pz) = padded.unflat(pid);
            pz == z
        })
        .collect()
}

/// Runs the stitch protocol for one worker: sends its top-plane labels
/// downstream (unless it is the last rank), receives its upstream
/// neighbour's top-plane labels and retargets its own bottom plane to them
/// (unless it is the first rank), then barriers so every worker observes a
/// consistent global labelling before face classification begins.
pub fn stitch(
    labelling: &mut Labelling,
    padded: &GridDims,
    pad_offset: u32,
    transport: &dyn Transport,
) -> Result<()> {
    let rank = transport.rank();
    let size = transport.size();

    if rank < size - 1 {
        let top_ids = plane_pore_ids(padded, pad_offset, &labelling.pore_ids, top_plane_z(padded));
        let mut top_labels = Vec::with_capacity(top_ids.len());
        for id in &top_ids {
            top_labels.push(labelling.dsu.find(*id)?.label);
        }
        debug!(
            "rank {rank}: sending {} top-plane labels to rank {}",
            top_labels.len(),
            rank + 1
        );
        transport.send(rank + 1, rank, top_labels)?;
    }

    if rank > 0 {
        let upstream_labels = transport.recv(rank - 1, rank - 1)?;
        let bottom_ids = plane_pore_ids(padded, pad_offset, &labelling.pore_ids, bottom_plane_z());

        if bottom_ids.len() != upstream_labels.len() {
            return Err(Error::StitchMismatch {
                expected: bottom_ids.len(),
                got: upstream_labels.len(),
            });
        }

        for (id, &upstream_label) in bottom_ids.iter().zip(upstream_labels.iter()) {
            labelling.dsu.retarget(*id, upstream_label)?;
        }
        debug!("rank {rank}: retargeted {} bottom-plane labels", bottom_ids.len());
    }

    transport.barrier()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labeller::{label, silent_logger};
    use crate::slab::PaddedSlab;
    use crate::transport::ChannelTransport;
    use percolate_core::index::Connectivity;
    use std::thread;

    #[test]
    fn two_worker_uniform_slab_stitches_to_one_label() {
        // each worker owns a 2x2 slab of pores, one ghost plane shared;
        // rank 1's bottom plane is a copy of rank 0's top plane.
        let raw = GridDims::new(2, 2, 2).unwrap();
        let bytes = [0u8; 8];

        let slab0 = PaddedSlab::from_raw_bytes(raw, &bytes, 255, 0).unwrap();
        let pad_offset_1 = (raw.nx + 1) * (raw.ny + 1);
        let slab1 = PaddedSlab::from_raw_bytes(raw, &bytes, 255, pad_offset_1).unwrap();

        let fleet = ChannelTransport::fanout(2);
        let mut fleet = fleet.into_iter();
        let t0 = fleet.next().unwrap();
        let t1 = fleet.next().unwrap();

        thread::scope(|scope| {
            let h0 = scope.spawn(|| {
                let mut labelling0 = label(&slab0, Connectivity::Face, &mut silent_logger()).unwrap();
                stitch(&mut labelling0, &slab0.padded, 0, &t0).unwrap();
                labelling0
            });
            let h1 = scope.spawn(|| {
                let mut labelling1 = label(&slab1, Connectivity::Face, &mut silent_logger()).unwrap();
                stitch(&mut labelling1, &slab1.padded, pad_offset_1, &t1).unwrap();
                labelling1
            });

            let mut labelling0 = h0.join().unwrap();
            let mut labelling1 = h1.join().unwrap();

            let top_id = plane_pore_ids(&slab0.padded, 0, &labelling0.pore_ids, top_plane_z(&slab0.padded))[0];
            let top_label = labelling0.dsu.find(top_id).unwrap().label;

            let bottom_id = plane_pore_ids(&slab1.padded, pad_offset_1, &labelling1.pore_ids, 0)[0];
            let bottom_label = labelling1.dsu.find(bottom_id).unwrap().label;

            assert_eq!(top_label, bottom_label);
        });
    }
}
