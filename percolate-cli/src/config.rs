/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Command-line surface and the validated [`PercolateConfig`] it resolves
//! into.
//!
//! No component below the CLI reads `std::env::args` or re-derives a
//! dimension or connectivity value on its own; every worker reads from one
//! `PercolateConfig` built once, here.

use std::path::{Path, PathBuf};

use clap::Parser;
use percolate_core::index::{Connectivity, GridDims};

use crate::error::{Error, Result};

/// Raw command-line arguments, as `clap` parses them.
#[derive(Parser, Debug)]
#[command(
    name = "percolate",
    version,
    about = "Extract percolating (flow) connected components from a segmented volumetric image"
)]
pub struct Cli {
    /// Path to the raw segmented input volume: Nx*Ny*Nz bytes, no header,
    /// x-fastest and z-slowest byte order.
    pub input_file: PathBuf,

    /// Volume dimensions: a single edge length for a cube (Nx=Ny=Nz), or Nx
    /// Ny Nz.
    #[arg(num_args = 1..=3, required = true, value_names = ["NX", "NY", "NZ"])]
    pub dims: Vec<u32>,

    /// Which neighbours of a pore cell count as adjacent.
    #[arg(long, default_value = "face")]
    pub connectivity: String,

    /// The byte value that marks a cell as wall (non-pore).
    #[arg(long, default_value_t = 255)]
    pub wall: u8,

    /// Restrict face classification to a single axis (0=x, 1=y, 2=z) instead
    /// of all six faces of the volume.
    #[arg(long)]
    pub flow_dir: Option<u32>,

    /// Number of cooperating workers to simulate in-process. Must evenly
    /// divide Nz.
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Output file path. Defaults to `connected.raw` next to the input file.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// How often, in seconds, the labelling and extraction passes log
    /// progress.
    #[arg(long, default_value_t = 10)]
    pub log_interval_secs: u64,
}

/// The resolved, validated run configuration. Constructed once by the CLI
/// from [`Cli`] and passed down by reference to the coordinator and every
/// worker.
#[derive(Debug, Clone)]
pub struct PercolateConfig {
    pub input_file: PathBuf,
    pub output: PathBuf,
    pub dims: GridDims,
    pub connectivity: Connectivity,
    pub wall: u8,
    pub flow_dir: Option<u32>,
    pub workers: usize,
    pub log_interval_secs: u64,
}

impl PercolateConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let (nx, ny, nz) = match cli.dims.as_slice() {
            [edge] => (*edge, *edge, *edge),
            [nx, ny, nz] => (*nx, *ny, *nz),
            other => {
                return Err(Error::InvalidArg(format!(
                    "expected 1 or 3 dimension arguments (Nx, or Nx Ny Nz), got {}",
                    other.len()
                )))
            }
        };
        let dims = GridDims::new(nx, ny, nz)?;

        let connectivity: Connectivity = cli.connectivity.parse()?;

        if let Some(axis) = cli.flow_dir {
            if axis > 2 {
                return Err(Error::InvalidArg(format!(
                    "--flow-dir must be 0, 1, or 2, got {axis}"
                )));
            }
        }

        if cli.workers == 0 {
            return Err(Error::InvalidArg("--workers must be at least 1".into()));
        }
        if dims.nz % cli.workers as u32 != 0 {
            return Err(Error::InvalidArg(format!(
                "--workers {} does not evenly divide Nz={} (remainder distribution is not supported)",
                cli.workers, dims.nz
            )));
        }

        let output = cli.output.unwrap_or_else(|| {
            cli.input_file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("connected.raw")
        });

        Ok(Self {
            input_file: cli.input_file,
            output,
            dims,
            connectivity,
            wall: cli.wall,
            flow_dir: cli.flow_dir,
            workers: cli.workers,
            log_interval_secs: cli.log_interval_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli(dims: Vec<u32>) -> Cli {
        Cli {
            input_file: PathBuf::from("/tmp/in.raw"),
            dims,
            connectivity: "face".to_string(),
            wall: 255,
            flow_dir: None,
            workers: 1,
            output: None,
            log_interval_secs: 10,
        }
    }

    #[test]
    fn single_edge_length_makes_a_cube() {
        let config = PercolateConfig::from_cli(base_cli(vec![4])).unwrap();
        assert_eq!((config.dims.nx, config.dims.ny, config.dims.nz), (4, 4, 4));
    }

    #[test]
    fn three_dims_are_taken_as_is() {
        let config = PercolateConfig::from_cli(base_cli(vec![2, 3, 4])).unwrap();
        assert_eq!((config.dims.nx, config.dims.ny, config.dims.nz), (2, 3, 4));
    }

    #[test]
    fn two_dims_is_rejected() {
        assert!(PercolateConfig::from_cli(base_cli(vec![2, 3])).is_err());
    }

    #[test]
    fn unknown_connectivity_is_rejected() {
        let mut cli = base_cli(vec![3]);
        cli.connectivity = "diagonal".to_string();
        assert!(PercolateConfig::from_cli(cli).is_err());
    }

    #[test]
    fn flow_dir_out_of_range_is_rejected() {
        let mut cli = base_cli(vec![3]);
        cli.flow_dir = Some(3);
        assert!(PercolateConfig::from_cli(cli).is_err());
    }

    #[test]
    fn workers_not_dividing_nz_is_rejected() {
        let mut cli = base_cli(vec![4, 4, 5]);
        cli.workers = 2;
        assert!(PercolateConfig::from_cli(cli).is_err());
    }

    #[test]
    fn default_output_sits_beside_the_input_file() {
        let config = PercolateConfig::from_cli(base_cli(vec![2])).unwrap();
        assert_eq!(config.output, PathBuf::from("/tmp/connected.raw"));
    }
}
