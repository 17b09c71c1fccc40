/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Disjoint-Set Union over 32-bit cell ids.
//!
//! The reference implementation this crate grew from links nodes with raw,
//! self-referential pointers (a root points to itself). That shape doesn't
//! translate to safe Rust, so it is re-architected here as an arena: a dense
//! `Vec<Node>` addressed by index, where a root is a node whose `parent`
//! equals its own index. A `HashMap<u32, usize>` supplies the external
//! lookup from cell id to arena index.

use std::collections::HashMap;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct Node {
    label: u32,
    parent: usize,
    rank: u8,
}

/// A snapshot of a tree's root at the moment [`Dsu::find`] was called: its
/// label, its rank, and an opaque arena index identifying the tree. Two
/// `Root`s compare equal (via `same_tree`) iff they were produced by finds
/// on cells in the same set, even if the underlying tree has since been
/// re-rooted by a later union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Root {
    index: usize,
    pub label: u32,
    pub rank: u8,
}

impl Root {
    /// Whether `self` and `other` were the root of the same tree at the time
    /// they were found. Not meaningful to compare roots taken before and
    /// after an intervening `union`.
    pub fn same_tree(&self, other: &Root) -> bool {
        self.index == other.index
    }
}

/// Union-find over padded cell ids (raw ids extended with a worker's
/// `pad_offset`, see [the indexing module](crate::index)).
#[derive(Debug, Default)]
pub struct Dsu {
    nodes: Vec<Node>,
    index_of: HashMap<u32, usize>,
}

impl Dsu {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index_of: HashMap::with_capacity(capacity),
        }
    }

    /// Number of sets created (not the number of distinct trees).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index_of.contains_key(&id)
    }

    /// Creates a new singleton set for `id`, with `label` initialised to
    /// `id` itself. Fails with [`Error::AlreadyPresent`] if a node for `id`
    /// already exists — insertion is "insert-if-absent", never an overwrite.
    pub fn make_set(&mut self, id: u32) -> Result<()> {
        if self.index_of.contains_key(&id) {
            return Err(Error::AlreadyPresent(id));
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            label: id,
            parent: index,
            rank: 0,
        });
        self.index_of.insert(id, index);
        Ok(())
    }

    fn index_for(&self, id: u32) -> Result<usize> {
        self.index_of.get(&id).copied().ok_or(Error::NotFound(id))
    }

    /// Locates the root arena index of `id`'s tree, compressing every node
    /// on the path to point directly at the root.
    fn find_root_index(&mut self, id: u32) -> Result<usize> {
        let start = self.index_for(id)?;

        let mut root = start;
        while self.nodes[root].parent != root {
            root = self.nodes[root].parent;
        }

        let mut cur = start;
        while cur != root {
            let next = self.nodes[cur].parent;
            self.nodes[cur].parent = root;
            cur = next;
        }

        Ok(root)
    }

    /// Returns the root of `id`'s tree, performing full path compression.
    /// Fails with [`Error::NotFound`] if `id` has no node.
    pub fn find(&mut self, id: u32) -> Result<Root> {
        let index = self.find_root_index(id)?;
        let node = self.nodes[index];
        Ok(Root {
            index,
            label: node.label,
            rank: node.rank,
        })
    }

    /// Merges the sets containing `a` and `b`. A no-op if they are already
    /// the same set. Otherwise the lower-rank root is attached under the
    /// higher-rank root (ties are broken by keeping `a`'s root as the
    /// winner, consistently); the winning root's `label` is left unchanged.
    pub fn union(&mut self, a: u32, b: u32) -> Result<()> {
        let ra = self.find_root_index(a)?;
        let rb = self.find_root_index(b)?;
        if ra == rb {
            return Ok(());
        }

        let (winner, loser) = match self.nodes[ra].rank.cmp(&self.nodes[rb].rank) {
            std::cmp::Ordering::Less => (rb, ra),
            _ => (ra, rb),
        };

        self.nodes[loser].parent = winner;
        if self.nodes[ra].rank == self.nodes[rb].rank {
            self.nodes[winner].rank += 1;
        }
        Ok(())
    }

    /// Overwrites the `label` of `id`'s root in place, without altering
    /// tree shape. Used exclusively by the stitcher to make a worker's
    /// bottom-face labels advertise the upstream worker's labels.
    pub fn retarget(&mut self, id: u32, new_label: u32) -> Result<()> {
        let root = self.find_root_index(id)?;
        self.nodes[root].label = new_label;
        Ok(())
    }
}
