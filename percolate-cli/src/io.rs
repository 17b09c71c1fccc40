/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Slice-level I/O over the input and output volume files.
//!
//! `SliceReader`/`SliceWriter` are the capability traits the coordinator
//! drives the pipeline through; [`MmapSliceReader`]/[`MmapSliceWriter`] back
//! them with `mmap-rs` memory maps so that concurrent workers can touch
//! disjoint byte ranges of the same file without funnelling through a single
//! file handle. An in-memory pair ([`InMemorySliceReader`]/
//! [`InMemorySliceWriter`]) exercises the same trait surface in tests
//! without touching the filesystem.

// mmap-rs's `map()`/`map_mut()` are themselves unsafe (the kernel mapping is
// only as safe as the caller's promise not to alias it unsoundly), and
// turning a raw mapping into a `&[u8]`/`&mut [u8]` needs `from_raw_parts`.
// The workspace forbids `unsafe_code` everywhere else; this module is the
// sole, narrowly-scoped exception, downgraded to `deny` in this crate's
// `Cargo.toml` so it can be locally allowed here. See DESIGN.md.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use mmap_rs::{Mmap, MmapMut, MmapOptions};

use crate::error::{Error, Result};

/// Returns exactly `len` bytes from the given byte offset of the backing
/// store. Fails with [`Error::Io`] on a short read (offset+len past EOF).
pub trait SliceReader: Send + Sync {
    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// Writes `bytes` at the given byte offset of the backing store. Writes from
/// distinct workers must target disjoint ranges; this trait does not itself
/// enforce that, the coordinator's partitioning does.
pub trait SliceWriter: Send + Sync {
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()>;
}

fn mmap_err(path: &Path, source: impl std::fmt::Display) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(source.to_string()),
    }
}

fn short_read_err(path: &Path, offset: u64, wanted: usize, have: usize) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("short read: wanted {wanted} bytes at offset {offset}, file is {have} bytes"),
        ),
    }
}

/// Read-only memory map of the input volume file.
pub struct MmapSliceReader {
    path: PathBuf,
    mmap: Mmap,
}

impl MmapSliceReader {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
        let len = file
            .metadata()
            .map_err(|e| Error::Io {
                path: path.clone(),
                source: e,
            })?
            .len() as usize;

        let mmap = unsafe {
            MmapOptions::new(len)
                .map_err(|e| mmap_err(&path, e))?
                .with_file(file, 0)
                .map()
                .map_err(|e| mmap_err(&path, e))?
        };

        Ok(Self { path, mmap })
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SliceReader for MmapSliceReader {
    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let data = unsafe { std::slice::from_raw_parts(self.mmap.as_ptr(), self.mmap.len()) };
        let start = offset as usize;
        let end = start + len;
        if end > data.len() {
            return Err(short_read_err(&self.path, offset, len, data.len()));
        }
        Ok(data[start..end].to_vec())
    }
}

/// Read-write memory map of the output volume file, pre-sized to its final
/// length before any worker writes to it. Writes are serialized through a
/// mutex; correctness does not depend on that serialization since workers
/// only ever write disjoint ranges, but it is what lets us expose a safe
/// `&self` API instead of splitting the mapping into raw pointer slices.
pub struct MmapSliceWriter {
    path: PathBuf,
    len: usize,
    mmap: Mutex<MmapMut>,
}

impl MmapSliceWriter {
    /// Creates (or truncates) the output file, sizes it to `len` bytes, and
    /// maps it read-write.
    pub fn create(path: impl Into<PathBuf>, len: u64) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::Io {
                path: path.clone(),
                source: e,
            })?;
        file.set_len(len).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;

        let mmap = unsafe {
            MmapOptions::new(len as usize)
                .map_err(|e| mmap_err(&path, e))?
                .with_file(file, 0)
                .map_mut()
                .map_err(|e| mmap_err(&path, e))?
        };

        Ok(Self {
            path,
            len: len as usize,
            mmap: Mutex::new(mmap),
        })
    }
}

impl SliceWriter for MmapSliceWriter {
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > self.len {
            return Err(short_read_err(&self.path, offset, bytes.len(), self.len));
        }
        let mut mmap = self.mmap.lock().unwrap();
        let dest = unsafe { std::slice::from_raw_parts_mut(mmap.as_mut_ptr(), mmap.len()) };
        dest[start..end].copy_from_slice(bytes);
        Ok(())
    }
}

/// An in-memory [`SliceReader`] used by tests to exercise the pipeline
/// without a real file.
pub struct InMemorySliceReader {
    data: Vec<u8>,
}

impl InMemorySliceReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl SliceReader for InMemorySliceReader {
    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(short_read_err(
                Path::new("<memory>"),
                offset,
                len,
                self.data.len(),
            ));
        }
        Ok(self.data[start..end].to_vec())
    }
}

/// An in-memory [`SliceWriter`] used by tests; [`InMemorySliceWriter::into_inner`]
/// recovers the assembled output buffer once every worker has written its
/// region.
pub struct InMemorySliceWriter {
    data: Mutex<Vec<u8>>,
}

impl InMemorySliceWriter {
    pub fn new(len: usize) -> Self {
        Self {
            data: Mutex::new(vec![0u8; len]),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner().unwrap()
    }
}

impl SliceWriter for InMemorySliceWriter {
    fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + bytes.len();
        let mut data = self.data.lock().unwrap();
        if end > data.len() {
            return Err(short_read_err(
                Path::new("<memory>"),
                offset,
                bytes.len(),
                data.len(),
            ));
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }
}
