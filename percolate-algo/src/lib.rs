/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Labelling, stitching, face-classification and extraction pipeline for
//! percolating connected components, plus the in-process transport that
//! stands in for a distributed message-passing backend.
//!
//! A single worker's run through this crate is: build a [`slab::PaddedSlab`]
//! from its raw byte range, [`labeller::label`] it into a [`labeller::Labelling`],
//! [`stitch::stitch`] it against its neighbours over a [`transport::Transport`],
//! classify flow labels with [`faces`], then [`extract::extract`] the output
//! bytes. `percolate-cli` owns the partitioning, I/O, and thread spawning
//! around this pipeline.

pub mod error;
pub mod extract;
pub mod faces;
pub mod labeller;
pub mod slab;
pub mod stitch;
pub mod transport;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::extract::extract;
    pub use crate::faces::{classify_flow_labels, local_face_labels, NUM_FACES};
    pub use crate::labeller::{label, silent_logger, Labelling};
    pub use crate::slab::PaddedSlab;
    pub use crate::stitch::stitch;
    pub use crate::transport::{ChannelTransport, LocalTransport, Transport};
}
