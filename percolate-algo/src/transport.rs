/*
 * SPDX-FileCopyrightText: 2026 The percolate-rs Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Message-passing capability injected into the pipeline.
//!
//! No distributed message-passing crate appears anywhere in the reference
//! pack this tool was grown from, so `Transport` is realized in-process: `P`
//! cooperating workers run as OS threads within one process, and
//! [`ChannelTransport`] wires them together with `crossbeam-channel` for
//! point-to-point halo exchange and a shared, mutex-guarded state plus
//! `std::sync::Barrier` for the collective operations. [`LocalTransport`]
//! services the single-worker case without paying for any synchronization.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, Result};

/// The capability set a worker needs to participate in the stitch and
/// face-classification collectives: `rank`/`size`, point-to-point
/// `send`/`recv` for the halo exchange, and `barrier`/`gather`/`broadcast`
/// for the global synchronisation points.
pub trait Transport: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Sends `data` to rank `dst`, tagged `tag`. The stitcher only ever
    /// calls this with `dst == rank()+1` and `tag == rank()`.
    fn send(&self, dst: usize, tag: usize, data: Vec<u32>) -> Result<()>;

    /// Receives a vector sent to this rank under `tag` from rank `src`. The
    /// stitcher only ever calls this with `src == rank()-1` and `tag == src`.
    fn recv(&self, src: usize, tag: usize) -> Result<Vec<u32>>;

    /// Blocks until every worker has called `barrier`.
    fn barrier(&self) -> Result<()>;

    /// Collects `v` from every rank at `root`. Returns `Some(vectors)` at
    /// `root` (indexed by rank), `None` everywhere else.
    fn gather(&self, v: Vec<u32>, root: usize) -> Result<Option<Vec<Vec<u32>>>>;

    /// Broadcasts `root`'s value (which must be `Some` only at `root`) to
    /// every worker, including `root` itself.
    fn broadcast(&self, v: Option<Vec<u32>>, root: usize) -> Result<Vec<u32>>;
}

/// The trivial single-worker transport: rank 0 of size 1. `send`/`recv` are
/// never called in a single-worker run (there is no `r+1` or `r-1`), so they
/// are left unreachable rather than silently accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransport;

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, dst: usize, tag: usize, _data: Vec<u32>) -> Result<()> {
        unreachable!("LocalTransport has no peers to send to (dst={dst}, tag={tag})")
    }

    fn recv(&self, src: usize, tag: usize) -> Result<Vec<u32>> {
        unreachable!("LocalTransport has no peers to receive from (src={src}, tag={tag})")
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn gather(&self, v: Vec<u32>, root: usize) -> Result<Option<Vec<Vec<u32>>>> {
        debug_assert_eq!(root, 0);
        Ok(Some(vec![v]))
    }

    fn broadcast(&self, v: Option<Vec<u32>>, root: usize) -> Result<Vec<u32>> {
        debug_assert_eq!(root, 0);
        v.ok_or_else(|| Error::Transport("broadcast root must supply a value".into()))
    }
}

struct SharedState {
    size: usize,
    barrier: Barrier,
    gather_barrier: Barrier,
    gather_slots: Mutex<Vec<Option<Vec<u32>>>>,
    bcast_barrier: Barrier,
    bcast_slot: Mutex<Option<Vec<u32>>>,
    /// Set once any worker observes a collective failure, so the remaining
    /// workers' next call fails fast instead of hanging on a barrier a
    /// failed peer will never reach.
    poisoned: AtomicBool,
}

/// An in-process, thread-backed [`Transport`]. Construct a fleet of `size`
/// cooperating instances with [`ChannelTransport::fanout`]; each belongs to
/// exactly one worker thread.
pub struct ChannelTransport {
    rank: usize,
    state: Arc<SharedState>,
    /// The channel this rank sends its top-plane halo on (`Some` unless
    /// this is the last rank).
    send_chan: Option<Sender<Vec<u32>>>,
    /// The channel this rank receives its bottom-plane halo on (`Some`
    /// unless this is the first rank).
    recv_chan: Option<Receiver<Vec<u32>>>,
}

impl ChannelTransport {
    /// Builds one [`ChannelTransport`] per rank `0..size`, wired into a
    /// chain: rank `r` can send to `r+1` and receive from `r-1`.
    pub fn fanout(size: usize) -> Vec<ChannelTransport> {
        assert!(size > 0, "a fleet needs at least one worker");

        let mut senders = Vec::with_capacity(size.saturating_sub(1));
        let mut receivers = Vec::with_capacity(size.saturating_sub(1));
        for _ in 0..size.saturating_sub(1) {
            let (tx, rx) = crossbeam_channel::bounded(1);
            senders.push(tx);
            receivers.push(rx);
        }

        let state = Arc::new(SharedState {
            size,
            barrier: Barrier::new(size),
            gather_barrier: Barrier::new(size),
            gather_slots: Mutex::new(vec![None; size]),
            bcast_barrier: Barrier::new(size),
            bcast_slot: Mutex::new(None),
            poisoned: AtomicBool::new(false),
        });

        (0..size)
            .map(|rank| ChannelTransport {
                rank,
                state: state.clone(),
                send_chan: senders.get(rank).cloned(),
                recv_chan: rank.checked_sub(1).and_then(|i| receivers.get(i)).cloned(),
            })
            .collect()
    }

    fn check_poisoned(&self) -> Result<()> {
        if self.state.poisoned.load(Ordering::SeqCst) {
            return Err(Error::Transport(
                "aborting: another worker's collective already failed".into(),
            ));
        }
        Ok(())
    }

    fn poison(&self) {
        self.state.poisoned.store(true, Ordering::SeqCst);
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.state.size
    }

    fn send(&self, dst: usize, tag: usize, data: Vec<u32>) -> Result<()> {
        self.check_poisoned()?;
        if dst != self.rank + 1 || tag != self.rank {
            return Err(Error::Transport(format!(
                "unsupported send topology: rank {} -> {} (tag {})",
                self.rank, dst, tag
            )));
        }
        let Some(chan) = &self.send_chan else {
            return Err(Error::Transport(format!("rank {} has no successor", self.rank)));
        };
        chan.send(data).map_err(|e| {
            self.poison();
            Error::Transport(format!("send to rank {dst} failed: {e}"))
        })
    }

    fn recv(&self, src: usize, tag: usize) -> Result<Vec<u32>> {
        self.check_poisoned()?;
        if self.rank == 0 || src != self.rank - 1 || tag != src {
            return Err(Error::Transport(format!(
                "unsupported recv topology: rank {} <- {} (tag {})",
                self.rank, src, tag
            )));
        }
        let Some(chan) = &self.recv_chan else {
            return Err(Error::Transport(format!("rank {} has no predecessor", self.rank)));
        };
        chan.recv().map_err(|e| {
            self.poison();
            Error::Transport(format!("recv from rank {src} failed: {e}"))
        })
    }

    fn barrier(&self) -> Result<()> {
        self.check_poisoned()?;
        self.state.barrier.wait();
        Ok(())
    }

    fn gather(&self, v: Vec<u32>, root: usize) -> Result<Option<Vec<Vec<u32>>>> {
        self.check_poisoned()?;
        {
            let mut slots = self.state.gather_slots.lock().unwrap();
            slots[self.rank] = Some(v);
        }
        self.state.gather_barrier.wait();

        let result = if self.rank == root {
            let slots = self.state.gather_slots.lock().unwrap();
            Some(
                slots
                    .iter()
                    .cloned()
                    .map(|slot| slot.expect("every rank gathers before root reads"))
                    .collect(),
            )
        } else {
            None
        };
        self.state.gather_barrier.wait();

        {
            let mut slots = self.state.gather_slots.lock().unwrap();
            slots[self.rank] = None;
        }
        Ok(result)
    }

    fn broadcast(&self, v: Option<Vec<u32>>, root: usize) -> Result<Vec<u32>> {
        self.check_poisoned()?;
        if self.rank == root {
            let v = v.ok_or_else(|| Error::Transport("broadcast root must supply a value".into()))?;
            let mut slot = self.state.bcast_slot.lock().unwrap();
            *slot = Some(v);
        }
        self.state.bcast_barrier.wait();

        let result = {
            let slot = self.state.bcast_slot.lock().unwrap();
            slot.clone()
                .expect("root has set the broadcast slot before this barrier")
        };
        self.state.bcast_barrier.wait();

        if self.rank == root {
            let mut slot = self.state.bcast_slot.lock().unwrap();
            *slot = None;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn local_transport_gather_and_broadcast_are_identity() {
        let t = LocalTransport;
        let gathered = t.gather(vec![1, 2, 3], 0).unwrap();
        assert_eq!(gathered, Some(vec![vec![1, 2, 3]]));
        let bcast = t.broadcast(Some(vec![7, 8]), 0).unwrap();
        assert_eq!(bcast, vec![7, 8]);
    }

    #[test]
    fn channel_transport_halo_chain_delivers_in_order() {
        let fleet = ChannelTransport::fanout(3);
        thread::scope(|scope| {
            for (rank, t) in fleet.into_iter().enumerate() {
                scope.spawn(move || {
                    if rank < 2 {
                        t.send(rank + 1, rank, vec![rank as u32, 100]).unwrap();
                    }
                    if rank > 0 {
                        let got = t.recv(rank - 1, rank - 1).unwrap();
                        assert_eq!(got, vec![(rank - 1) as u32, 100]);
                    }
                    t.barrier().unwrap();
                });
            }
        });
    }

    #[test]
    fn channel_transport_gather_collects_all_ranks_in_order() {
        let fleet = ChannelTransport::fanout(4);
        thread::scope(|scope| {
            for t in fleet {
                scope.spawn(move || {
                    let rank = t.rank();
                    let gathered = t.gather(vec![rank as u32], 0).unwrap();
                    if rank == 0 {
                        assert_eq!(gathered, Some(vec![vec![0], vec![1], vec![2], vec![3]]));
                    } else {
                        assert_eq!(gathered, None);
                    }
                });
            }
        });
    }

    #[test]
    fn channel_transport_broadcast_reaches_every_rank() {
        let fleet = ChannelTransport::fanout(3);
        thread::scope(|scope| {
            for t in fleet {
                scope.spawn(move || {
                    let rank = t.rank();
                    let value = if rank == 1 { Some(vec![42]) } else { None };
                    let got = t.broadcast(value, 1).unwrap();
                    assert_eq!(got, vec![42]);
                });
            }
        });
    }

    #[test]
    fn channel_transport_can_run_multiple_gather_rounds() {
        let fleet = ChannelTransport::fanout(2);
        thread::scope(|scope| {
            for t in fleet {
                scope.spawn(move || {
                    let rank = t.rank();
                    for round in 0..6u32 {
                        let gathered = t.gather(vec![rank as u32, round], 0).unwrap();
                        if rank == 0 {
                            let gathered = gathered.unwrap();
                            assert_eq!(gathered[0], vec![0, round]);
                            assert_eq!(gathered[1], vec![1, round]);
                        }
                    }
                });
            }
        });
    }
}
