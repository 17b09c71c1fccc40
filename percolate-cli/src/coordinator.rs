/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Drives the pipeline: partitions the z-axis across workers, runs each
//! worker's labeller/stitcher/face-classifier/extractor through a
//! [`Transport`], and joins the results into one [`RunReport`].
//!
//! For `workers > 1` the workers are realized as a `rayon` thread pool
//! rather than a real distributed backend — see [`percolate_algo::transport`]
//! — each owning its own slab, DSU, and I/O handles, cooperating only
//! through the in-process `Transport`. A single worker has no peer to
//! stitch against and runs inline against `LocalTransport`.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use dsi_progress_logger::ProgressLogger;
use log::{debug, info};

use percolate_algo::extract::extract;
use percolate_algo::faces::{classify_flow_labels, local_face_labels, NUM_FACES};
use percolate_algo::labeller::label;
use percolate_algo::slab::PaddedSlab;
use percolate_algo::stitch::stitch;
use percolate_algo::transport::{ChannelTransport, LocalTransport, Transport};
use percolate_core::index::GridDims;

use crate::config::PercolateConfig;
use crate::error::Result;
use crate::io::{MmapSliceReader, MmapSliceWriter, SliceReader, SliceWriter};

/// A worker's z-extent within the full volume, including its ghost plane
/// (if any) on the low-z side. See §4.4/§9 of the design notes.
#[derive(Debug, Clone, Copy)]
struct Partition {
    offset_z: u32,
    nz_loc: u32,
    /// 1 if this worker has a ghost plane on its low-z side (every rank but
    /// the first), 0 otherwise.
    ghost: u32,
}

/// Splits `full_nz` evenly across `workers`, giving every worker but the
/// first one extra ghost plane on its low-z side. Fails if `full_nz` is not
/// evenly divisible — `PercolateConfig::from_cli` already enforces this, but
/// this function is also reachable directly from tests.
fn partition_z(full_nz: u32, workers: usize) -> Result<Vec<Partition>> {
    use crate::error::Error;
    if workers == 0 || full_nz % workers as u32 != 0 {
        return Err(Error::InvalidArg(format!(
            "{workers} workers does not evenly divide Nz={full_nz}"
        )));
    }
    let local_nz = full_nz / workers as u32;
    Ok((0..workers)
        .map(|rank| {
            if rank == 0 {
                Partition {
                    offset_z: 0,
                    nz_loc: local_nz,
                    ghost: 0,
                }
            } else {
                Partition {
                    offset_z: rank as u32 * local_nz - 1,
                    nz_loc: local_nz + 1,
                    ghost: 1,
                }
            }
        })
        .collect())
}

/// Per-worker counts rolled up into the final [`RunReport`].
struct WorkerReport {
    pore_cells: u64,
    flow_cells: u64,
    flow_components: usize,
}

/// The outcome of a full run, reported back to the CLI for its final
/// human-readable summary.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub dims: GridDims,
    pub pore_cells: u64,
    pub flow_cells: u64,
    pub flow_components: usize,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{} volume: {} pore cells, {} preserved across {} flow component(s)",
            self.dims.nx, self.dims.ny, self.dims.nz, self.pore_cells, self.flow_cells, self.flow_components
        )
    }
}

fn progress_logger(interval_secs: u64) -> ProgressLogger {
    let mut pl = ProgressLogger::default();
    pl.log_interval(Duration::from_secs(interval_secs));
    pl
}

/// Runs one worker's full state-machine transition (§4.7): labels its slab,
/// stitches it against its neighbours, classifies flow labels, and writes
/// its non-ghost output region.
#[allow(clippy::too_many_arguments)]
fn run_worker(
    rank: usize,
    partition: &Partition,
    config: &PercolateConfig,
    reader: &dyn SliceReader,
    writer: &dyn SliceWriter,
    transport: &dyn Transport,
) -> Result<WorkerReport> {
    debug!("rank {rank}: Init -> Loaded");
    let plane_cells = config.dims.nx as u64 * config.dims.ny as u64;
    let byte_offset = plane_cells * partition.offset_z as u64;

    let raw = GridDims::new(config.dims.nx, config.dims.ny, partition.nz_loc)?;
    let raw_bytes = reader.read(byte_offset, raw.len() as usize)?;

    let pad_offset = (config.dims.nx + 1) * (config.dims.ny + 1) * partition.offset_z;
    let slab = PaddedSlab::from_raw_bytes(raw, &raw_bytes, config.wall, pad_offset)?;

    debug!("rank {rank}: Loaded -> Labelled");
    let mut labelling = label(&slab, config.connectivity, &mut progress_logger(config.log_interval_secs))?;

    debug!("rank {rank}: Labelled -> Stitched");
    stitch(&mut labelling, &slab.padded, pad_offset, transport)?;

    debug!("rank {rank}: Stitched -> FacesLocal");
    let mut local_faces: [HashSet<u32>; NUM_FACES] = Default::default();
    for (face, labels) in local_faces.iter_mut().enumerate() {
        *labels = local_face_labels(
            &mut labelling,
            &raw,
            pad_offset,
            partition.offset_z,
            config.dims.nz,
            face,
            config.flow_dir,
        )?;
    }

    debug!("rank {rank}: FacesLocal -> FacesGlobal");
    let flow = classify_flow_labels(&local_faces, transport)?;

    debug!("rank {rank}: FacesGlobal -> Extracted");
    let out_bytes = extract(
        &raw,
        &raw_bytes,
        &mut labelling,
        pad_offset,
        &flow,
        config.wall,
        &mut progress_logger(config.log_interval_secs),
    )?;

    debug!("rank {rank}: Extracted -> Written");
    let ghost_bytes = partition.ghost as u64 * plane_cells;
    let write_offset = byte_offset + ghost_bytes;
    let to_write = &out_bytes[ghost_bytes as usize..];
    writer.write(write_offset, to_write)?;
    debug!("rank {rank}: Written -> Done");

    let non_ghost_in = &raw_bytes[ghost_bytes as usize..];
    let pore_cells = non_ghost_in.iter().filter(|&&b| b != config.wall).count() as u64;
    let flow_cells = to_write.iter().filter(|&&b| b != config.wall).count() as u64;

    Ok(WorkerReport {
        pore_cells,
        flow_cells,
        flow_components: flow.len(),
    })
}

/// Runs the full pipeline against a pair of [`SliceReader`]/[`SliceWriter`]
/// backends. [`run`] is the production entry point (mmap-backed); this is
/// what lets tests exercise the coordinator against in-memory I/O.
pub fn run_with_io(
    config: &PercolateConfig,
    reader: &dyn SliceReader,
    writer: &dyn SliceWriter,
) -> Result<RunReport> {
    let partitions = partition_z(config.dims.nz, config.workers)?;

    info!(
        "starting run: {}x{}x{} across {} worker(s), connectivity={:?}",
        config.dims.nx, config.dims.ny, config.dims.nz, config.workers, config.connectivity
    );

    // A single worker has no neighbour to stitch against, so it runs on
    // `LocalTransport` directly rather than paying for a `ChannelTransport`
    // fleet's channels and barriers it would never use.
    let reports = if config.workers == 1 {
        vec![run_worker(0, &partitions[0], config, reader, writer, &LocalTransport)?]
    } else {
        let fleet = ChannelTransport::fanout(config.workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| crate::error::Error::InvalidArg(format!("failed to start worker pool: {e}")))?;

        let outcomes: Vec<Mutex<Option<Result<WorkerReport>>>> =
            (0..config.workers).map(|_| Mutex::new(None)).collect();

        pool.scope(|scope| {
            for (rank, (transport, partition)) in fleet.into_iter().zip(partitions.iter()).enumerate() {
                let outcomes = &outcomes;
                scope.spawn(move |_| {
                    let result = run_worker(rank, partition, config, reader, writer, &transport);
                    *outcomes[rank].lock().unwrap() = Some(result);
                });
            }
        });

        let mut reports = Vec::with_capacity(config.workers);
        for slot in outcomes {
            match slot.into_inner().unwrap() {
                Some(Ok(report)) => reports.push(report),
                Some(Err(e)) => return Err(e),
                None => unreachable!("every rank writes its outcome before the scope returns"),
            }
        }
        reports
    };

    let mut pore_cells = 0u64;
    let mut flow_cells = 0u64;
    let mut flow_components = 0usize;
    for report in reports {
        pore_cells += report.pore_cells;
        flow_cells += report.flow_cells;
        flow_components = report.flow_components;
    }

    info!("run complete: {pore_cells} pore cells, {flow_cells} preserved, {flow_components} flow component(s)");

    Ok(RunReport {
        dims: config.dims,
        pore_cells,
        flow_cells,
        flow_components,
    })
}

/// Runs the full pipeline against the mmap-backed input/output files named
/// in `config`.
pub fn run(config: &PercolateConfig) -> Result<RunReport> {
    let reader = MmapSliceReader::open(&config.input_file)?;
    let expected_len = config.dims.len() as u64;
    if reader.len() as u64 != expected_len {
        return Err(crate::error::Error::InvalidArg(format!(
            "input file {} is {} bytes, expected {} for a {}x{}x{} volume",
            config.input_file.display(),
            reader.len(),
            expected_len,
            config.dims.nx,
            config.dims.ny,
            config.dims.nz
        )));
    }
    let writer = MmapSliceWriter::create(&config.output, expected_len)?;
    run_with_io(config, &reader, &writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{InMemorySliceReader, InMemorySliceWriter};
    use percolate_core::index::Connectivity;
    use std::path::PathBuf;

    fn config(nx: u32, ny: u32, nz: u32, workers: usize, connectivity: Connectivity) -> PercolateConfig {
        PercolateConfig {
            input_file: PathBuf::from("<memory>"),
            output: PathBuf::from("<memory>"),
            dims: GridDims::new(nx, ny, nz).unwrap(),
            connectivity,
            wall: 255,
            flow_dir: None,
            workers,
            log_interval_secs: 3600,
        }
    }

    fn run_in_memory(cfg: &PercolateConfig, bytes: Vec<u8>) -> Vec<u8> {
        let reader = InMemorySliceReader::new(bytes);
        let writer = InMemorySliceWriter::new(cfg.dims.len() as usize);
        run_with_io(cfg, &reader, &writer).unwrap();
        writer.into_inner()
    }

    #[test]
    fn partition_z_gives_every_rank_but_the_first_a_ghost_plane() {
        let parts = partition_z(6, 3).unwrap();
        assert_eq!(parts[0].offset_z, 0);
        assert_eq!(parts[0].nz_loc, 2);
        assert_eq!(parts[0].ghost, 0);
        assert_eq!(parts[1].offset_z, 1);
        assert_eq!(parts[1].nz_loc, 3);
        assert_eq!(parts[1].ghost, 1);
        assert_eq!(parts[2].offset_z, 3);
        assert_eq!(parts[2].nz_loc, 3);
        assert_eq!(parts[2].ghost, 1);
    }

    #[test]
    fn partition_z_rejects_a_remainder() {
        assert!(partition_z(5, 2).is_err());
    }

    #[test]
    fn cube_of_zeros_preserves_every_cell() {
        let cfg = config(3, 3, 3, 1, Connectivity::Face);
        let bytes = vec![0u8; 27];
        let out = run_in_memory(&cfg, bytes);
        assert_eq!(out, vec![0u8; 27]);
    }

    #[test]
    fn cube_of_wall_is_unchanged() {
        let cfg = config(3, 3, 3, 1, Connectivity::Face);
        let bytes = vec![255u8; 27];
        let out = run_in_memory(&cfg, bytes.clone());
        assert_eq!(out, bytes);
    }

    #[test]
    fn isolated_interior_cell_is_removed() {
        let cfg = config(3, 3, 3, 1, Connectivity::Face);
        let mut bytes = vec![255u8; 27];
        bytes[cfg.dims.flat(1, 1, 1) as usize] = 0;
        let out = run_in_memory(&cfg, bytes);
        assert_eq!(out, vec![255u8; 27]);
    }

    #[test]
    fn vertical_column_touching_two_faces_is_preserved() {
        let cfg = config(3, 3, 3, 1, Connectivity::Face);
        let mut bytes = vec![255u8; 27];
        for z in 0..3 {
            bytes[cfg.dims.flat(1, 1, z) as usize] = 0;
        }
        let out = run_in_memory(&cfg, bytes.clone());
        assert_eq!(out, bytes);
    }

    #[test]
    fn isolated_corner_cell_in_a_disjoint_pair_is_removed_but_the_column_survives() {
        let cfg = config(3, 3, 3, 1, Connectivity::Face);
        let mut bytes = vec![255u8; 27];
        for z in 0..3 {
            bytes[cfg.dims.flat(0, 0, z) as usize] = 0;
        }
        bytes[cfg.dims.flat(2, 2, 1) as usize] = 0;
        let out = run_in_memory(&cfg, bytes);

        for z in 0..3 {
            assert_eq!(out[cfg.dims.flat(0, 0, z) as usize], 0);
        }
        assert_eq!(out[cfg.dims.flat(2, 2, 1) as usize], 255);
    }

    #[test]
    fn corner_diagonal_pair_survives_only_under_vertex_connectivity() {
        // A sits on the x=0 face only, B sits on the x=nx-1 face only, and B
        // is A's (-1,-1,-1) raster-preceding neighbour -- a pure 3-axis
        // diagonal step that Face and Edge connectivity both miss (see
        // Connectivity::preceding_offsets) and only Vertex connectivity
        // unites. United, the pair touches two distinct faces and survives;
        // left apart, each half touches only one face and is removed.
        let mk_bytes = |dims: &GridDims| {
            let mut bytes = vec![255u8; dims.len() as usize];
            bytes[dims.flat(0, 2, 2) as usize] = 0;
            bytes[dims.flat(1, 3, 3) as usize] = 0;
            bytes
        };

        for connectivity in [Connectivity::Face, Connectivity::Edge] {
            let cfg = config(2, 5, 5, 1, connectivity);
            let bytes = mk_bytes(&cfg.dims);
            let out = run_in_memory(&cfg, bytes);
            assert!(
                out.iter().all(|&b| b == 255),
                "{connectivity:?} must not unite a pure 3-axis diagonal step"
            );
        }

        let cfg = config(2, 5, 5, 1, Connectivity::Vertex);
        let bytes = mk_bytes(&cfg.dims);
        let out = run_in_memory(&cfg, bytes);
        assert_eq!(out[cfg.dims.flat(0, 2, 2) as usize], 0);
        assert_eq!(out[cfg.dims.flat(1, 3, 3) as usize], 0);
        assert_eq!(out.iter().filter(|&&b| b == 0).count(), 2);
    }

    #[test]
    fn two_workers_match_a_single_worker_on_the_same_volume() {
        let bytes = vec![0u8; 4 * 4 * 2];
        let single = config(4, 4, 2, 1, Connectivity::Face);
        let out_single = run_in_memory(&single, bytes.clone());

        let dual = config(4, 4, 2, 2, Connectivity::Face);
        let out_dual = run_in_memory(&dual, bytes);

        assert_eq!(out_single, out_dual);
    }
}
