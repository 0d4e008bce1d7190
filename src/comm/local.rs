// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-process group: every participant is a scoped thread, and the
//! transport is one crossbeam channel per participant.
//!
//! Collectives are built from point-to-point packets.  Every packet is
//! stamped with the sender, the number of collectives the sender has
//! entered so far, and which collective it is.  A participant waiting
//! on a particular peer and step sets aside anything else it receives
//! until its turn comes, so a fast peer that has already moved on to
//! the next collective does not confuse a slow root.
//!
//! A handle that goes away says so: dropping a `LocalComm` sends a
//! hang-up to every peer.  Anyone still waiting on that peer gets
//! `Disconnected`, and a hang-up sent while unwinding from a panic stops
//! every survivor at its next receive, whoever it was waiting on.

use std::cell::{Cell, RefCell};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::{check_layout, check_root, Collective, Communicator};
use crate::error::{Error, Result};

#[derive(Debug)]
enum Body {
    Data(Collective, Vec<u8>),
    Hangup { panicked: bool },
}

#[derive(Debug)]
struct Packet {
    from: usize,
    step: u64,
    body: Body,
}

impl Packet {
    // Whether this packet settles a wait on `from` at `step`.  A peer's
    // hang-up always follows everything it sent, so it only answers
    // once nothing else from that peer can.
    fn answers(&self, from: usize, step: u64) -> bool {
        match self.body {
            Body::Data(..) => self.from == from && self.step == step,
            Body::Hangup { panicked } => panicked || self.from == from,
        }
    }
}

/// One participant's handle on an in-process group.
pub struct LocalComm {
    rank: usize,
    size: usize,
    // Senders to every peer, indexed by rank.  None at our own rank, so
    // our inbox disconnects once every peer has gone.
    peers: Vec<Option<Sender<Packet>>>,
    inbox: Receiver<Packet>,
    stash: RefCell<Vec<Packet>>,
    step: Cell<u64>,
    timeout: Option<Duration>,
}

impl LocalComm {
    fn next_step(&self) -> u64 {
        let step = self.step.get();
        self.step.set(step + 1);
        step
    }

    fn send(&self, to: usize, step: u64, kind: Collective, payload: Vec<u8>) -> Result<()> {
        let peer = self
            .peers
            .get(to)
            .and_then(|p| p.as_ref())
            .ok_or(Error::InvalidRank {
                rank: to,
                size: self.size,
            })?;
        peer.send(Packet {
            from: self.rank,
            step,
            body: Body::Data(kind, payload),
        })
        .map_err(|_| Error::Disconnected {
            rank: self.rank,
            peer: to,
        })
    }

    fn receive(&self, from: usize, step: u64, kind: Collective) -> Result<Vec<u8>> {
        let stashed = {
            let mut stash = self.stash.borrow_mut();
            let pos = stash.iter().position(|p| p.answers(from, step));
            pos.map(|pos| stash.remove(pos))
        };
        if let Some(packet) = stashed {
            return self.accept(packet, kind);
        }

        loop {
            let packet = match self.timeout {
                Some(timeout) => self.inbox.recv_timeout(timeout).map_err(|e| match e {
                    RecvTimeoutError::Timeout => Error::Timeout {
                        rank: self.rank,
                        peer: from,
                    },
                    RecvTimeoutError::Disconnected => Error::Disconnected {
                        rank: self.rank,
                        peer: from,
                    },
                })?,
                None => self.inbox.recv().map_err(|_| Error::Disconnected {
                    rank: self.rank,
                    peer: from,
                })?,
            };
            if packet.answers(from, step) {
                return self.accept(packet, kind);
            }
            self.stash.borrow_mut().push(packet);
        }
    }

    fn accept(&self, packet: Packet, kind: Collective) -> Result<Vec<u8>> {
        match packet.body {
            Body::Data(found, _) if found != kind => Err(Error::CollectiveMismatch {
                rank: self.rank,
                peer: packet.from,
                expected: kind,
                found,
            }),
            Body::Data(_, payload) => Ok(payload),
            Body::Hangup { panicked } => {
                if panicked {
                    warn!("[rank {}] peer {} panicked", self.rank, packet.from);
                }
                Err(Error::Disconnected {
                    rank: self.rank,
                    peer: packet.from,
                })
            }
        }
    }

    // Shared by gather and gatherv: the root pulls each contribution
    // into place; everyone else ships theirs.
    fn collect(
        &self,
        kind: Collective,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        root: usize,
    ) -> Result<()> {
        check_root(self, root)?;
        let step = self.next_step();

        if self.rank != root {
            return self.send(root, step, kind, send.to_vec());
        }

        let recv = recv.ok_or(Error::MissingReceiveBuffer(root))?;
        let offsets = check_layout(recv, counts, self.size)?;
        for peer in 0..self.size {
            let payload = if peer == root {
                send.to_vec()
            } else {
                self.receive(peer, step, kind)?
            };
            if payload.len() != counts[peer] {
                return Err(Error::BufferSize {
                    expected: counts[peer],
                    found: payload.len(),
                });
            }
            recv[offsets[peer]..offsets[peer] + payload.len()].copy_from_slice(&payload);
        }
        debug!("[rank {}] {:?} #{} complete", self.rank, kind, step);
        Ok(())
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        let panicked = thread::panicking();
        for peer in self.peers.iter().flatten() {
            // A peer that has already gone has nothing left to hear.
            let _ = peer.send(Packet {
                from: self.rank,
                step: self.step.get(),
                body: Body::Hangup { panicked },
            });
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_bytes(&self, buffer: &mut [u8], root: usize) -> Result<()> {
        check_root(self, root)?;
        let step = self.next_step();

        if self.rank == root {
            for peer in (0..self.size).filter(|&p| p != root) {
                self.send(peer, step, Collective::Broadcast, buffer.to_vec())?;
            }
            return Ok(());
        }

        let payload = self.receive(root, step, Collective::Broadcast)?;
        if payload.len() != buffer.len() {
            return Err(Error::BufferSize {
                expected: buffer.len(),
                found: payload.len(),
            });
        }
        buffer.copy_from_slice(&payload);
        Ok(())
    }

    fn gather_bytes(&self, send: &[u8], recv: Option<&mut [u8]>, root: usize) -> Result<()> {
        let counts = vec![send.len(); self.size];
        self.collect(Collective::Gather, send, recv, &counts, root)
    }

    fn gatherv_bytes(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        root: usize,
    ) -> Result<()> {
        self.collect(Collective::Gatherv, send, recv, counts, root)
    }
}

/// A group of participants living as threads in this process.
#[derive(Clone, Debug)]
pub struct LocalGroup {
    size: usize,
    timeout: Option<Duration>,
}

impl LocalGroup {
    /// A group of `size` participants.  Collectives wait forever for
    /// slow peers unless a timeout is set.
    pub fn new(size: usize) -> Result<LocalGroup> {
        if size == 0 {
            return Err(Error::EmptyGroup);
        }
        Ok(LocalGroup {
            size,
            timeout: None,
        })
    }

    /// Give up on a peer that has not answered within `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> LocalGroup {
        self.timeout = timeout;
        self
    }

    /// Number of participants.
    pub fn size(&self) -> usize {
        self.size
    }

    /// One connected handle per participant, in rank order.
    pub fn communicators(&self) -> Vec<LocalComm> {
        let (senders, inboxes): (Vec<Sender<Packet>>, Vec<Receiver<Packet>>) =
            (0..self.size).map(|_| channel::unbounded()).unzip();

        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                size: self.size,
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(peer, s)| if peer == rank { None } else { Some(s.clone()) })
                    .collect(),
                inbox,
                stash: RefCell::new(Vec::new()),
                step: Cell::new(0),
                timeout: self.timeout,
            })
            .collect()
    }

    /// Run `work` once per participant, each on its own thread, and
    /// return what each returned, in rank order.
    pub fn run<F, R>(&self, work: F) -> Result<Vec<R>>
    where
        F: Fn(LocalComm) -> R + Sync,
        R: Send,
    {
        let comms = self.communicators();
        let work = &work;
        let joined = crossbeam::scope(|spawner| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| spawner.spawn(move |_| work(comm)))
                .collect();
            // Join everyone before looking at any outcome.
            let outcomes: Vec<_> = handles.into_iter().map(|handle| handle.join()).collect();
            outcomes
                .into_iter()
                .enumerate()
                .map(|(rank, outcome)| outcome.map_err(|_| Error::ParticipantPanicked(rank)))
                .collect::<Result<Vec<R>>>()
        });
        match joined {
            Ok(results) => results,
            Err(_) => Err(Error::ParticipantPanicked(0)),
        }
    }
}
