/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Face classification: determines which global labels touch at least two
//! distinct external faces of the full volume, and are therefore "flow"
//! components.

use std::collections::{BTreeSet, HashMap, HashSet};

use percolate_core::index::GridDims;

use crate::error::Result;
use crate::labeller::Labelling;
use crate::transport::Transport;

/// The six faces of the full volume, numbered `2*axis + dir`: axis 0 is x,
/// axis 1 is y, axis 2 is z; `dir` 0 is the low side, 1 the high side.
pub const NUM_FACES: usize = 6;

/// Walks every padded pore cell on face `f` of this worker's slab and
/// collects the set of labels found there.
///
/// `z_range` is the worker's raw-space z-extent within the full volume
/// (`[offset_z, offset_z + nz_loc)`); only rank 0 owns the z=0 face of the
/// full volume and only the last rank owns the z=Nz-1 face. The x and y
/// faces exist on every rank (every worker spans the full x/y extent).
pub fn local_face_labels(
    labelling: &mut Labelling,
    raw: &GridDims,
    pad_offset: u32,
    offset_z: u32,
    full_nz: u32,
    face: usize,
    flow_dir: Option<u32>,
) -> Result<HashSet<u32>> {
    if let Some(axis) = flow_dir {
        if face / 2 != axis as usize {
            return Ok(HashSet::new());
        }
    }

    let axis = face / 2;
    let dir = face % 2;
    let mut labels = HashSet::new();

    for raw_id in 0..raw.len() {
        let (x, y, z) = raw.unflat(raw_id);
        let coord = [x, y, z];
        let on_face = match axis {
            0 => coord[0] == if dir == 0 { 0 } else { raw.nx - 1 },
            1 => coord[1] == if dir == 0 { 0 } else { raw.ny - 1 },
            _ => {
                let global_z = offset_z + z;
                global_z == if dir == 0 { 0 } else { full_nz - 1 }
            }
        };
        if !on_face {
            continue;
        }

        let pid = percolate_core::index::pad(raw, raw_id);
        let global_id = pid + pad_offset;
        if labelling.dsu.contains(global_id) {
            labels.insert(labelling.dsu.find(global_id)?.label);
        }
    }

    Ok(labels)
}

/// Gathers each worker's local face-label sets to rank 0, inverts them into
/// a `label -> faces touched` map there, retains labels touching ≥2 faces,
/// and broadcasts the resulting flow-label set to every worker.
pub fn classify_flow_labels(
    local_faces: &[HashSet<u32>; NUM_FACES],
    transport: &dyn Transport,
) -> Result<HashSet<u32>> {
    const ROOT: usize = 0;

    // flatten each face's set into a length-prefixed vector so it survives
    // the `Vec<u32>`-only gather/broadcast wire format.
    let mut flat = Vec::new();
    for face_set in local_faces {
        flat.push(face_set.len() as u32);
        flat.extend(face_set.iter().copied());
    }

    let gathered = transport.gather(flat, ROOT)?;

    let flow_flat = if let Some(per_rank) = gathered {
        let mut label_to_faces: HashMap<u32, BTreeSet<usize>> = HashMap::new();
        for rank_flat in per_rank {
            let mut cursor = 0usize;
            for face in 0..NUM_FACES {
                let count = rank_flat[cursor] as usize;
                cursor += 1;
                for &label in &rank_flat[cursor..cursor + count] {
                    label_to_faces.entry(label).or_default().insert(face);
                }
                cursor += count;
            }
        }

        let flow: Vec<u32> = label_to_faces
            .into_iter()
            .filter(|(_, faces)| faces.len() >= 2)
            .map(|(label, _)| label)
            .collect();
        Some(flow)
    } else {
        None
    };

    let flow = transport.broadcast(flow_flat, ROOT)?;
    Ok(flow.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;

    #[test]
    fn single_worker_label_on_two_faces_is_flow() {
        let mut faces: [HashSet<u32>; NUM_FACES] = Default::default();
        faces[0].insert(1);
        faces[3].insert(1);
        faces[2].insert(2);

        let flow = classify_flow_labels(&faces, &LocalTransport).unwrap();
        assert!(flow.contains(&1));
        assert!(!flow.contains(&2));
    }

    #[test]
    fn label_on_only_one_face_is_not_flow() {
        let mut faces: [HashSet<u32>; NUM_FACES] = Default::default();
        faces[0].insert(5);

        let flow = classify_flow_labels(&faces, &LocalTransport).unwrap();
        assert!(!flow.contains(&5));
    }
}
