/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Context, Result};
use clap::Parser;
use percolate_cli::prelude::*;

fn try_main() -> Result<RunReport> {
    let cli = Cli::parse();
    let config = PercolateConfig::from_cli(cli).context("resolving command-line arguments")?;
    percolate_cli::coordinator::run(&config).context("running the percolation pipeline")
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match try_main() {
        Ok(report) => println!("{report}"),
        Err(err) => {
            log::error!("{err:#}");
            let code = err.downcast_ref::<Error>().map(exit_code).unwrap_or(1);
            std::process::exit(code);
        }
    }
}
