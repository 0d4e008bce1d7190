// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A group made of MPI ranks, for runs launched with `mpirun`.
//!
//! MPI collectives do not report failure; a broken collective aborts
//! the whole job, which is the behaviour we want anyway.  Counts and
//! offsets travel as `i32`, so nothing larger than `i32::MAX` bytes is
//! ever handed to MPI.

use mpi::collective::Root;
use mpi::datatype::PartitionMut;
use mpi::environment::Universe;
use mpi::topology::{Communicator as _, SimpleCommunicator};
use mpi::Count;

use super::{check_layout, check_root, narrow_counts, Communicator};
use crate::error::{Error, Result};

/// The MPI world communicator.  Finalizes MPI when dropped.
pub struct MpiWorld {
    world: SimpleCommunicator,
    // Held so MPI stays initialized for as long as the world is in use.
    _universe: Universe,
}

impl MpiWorld {
    /// Initialize MPI.  Fails if MPI is missing or was already
    /// initialized in this process.
    pub fn initialize() -> Result<MpiWorld> {
        let universe = mpi::initialize().ok_or(Error::MpiUnavailable)?;
        let world = universe.world();
        Ok(MpiWorld {
            world,
            _universe: universe,
        })
    }
}

impl Communicator for MpiWorld {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn max_bytes(&self) -> Option<usize> {
        Some(Count::max_value() as usize)
    }

    fn broadcast_bytes(&self, buffer: &mut [u8], root: usize) -> Result<()> {
        check_root(self, root)?;
        self.world
            .process_at_rank(root as mpi::Rank)
            .broadcast_into(buffer);
        Ok(())
    }

    fn gather_bytes(&self, send: &[u8], recv: Option<&mut [u8]>, root: usize) -> Result<()> {
        check_root(self, root)?;
        let process = self.world.process_at_rank(root as mpi::Rank);
        if self.rank() != root {
            process.gather_into(send);
            return Ok(());
        }
        let recv = recv.ok_or(Error::MissingReceiveBuffer(root))?;
        let expected = send.len() * self.size();
        if recv.len() != expected {
            return Err(Error::BufferSize {
                expected,
                found: recv.len(),
            });
        }
        process.gather_into_root(send, recv);
        Ok(())
    }

    fn gatherv_bytes(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        root: usize,
    ) -> Result<()> {
        check_root(self, root)?;
        let process = self.world.process_at_rank(root as mpi::Rank);
        if self.rank() != root {
            narrow_counts::<Count>(&[send.len()])?;
            process.gather_varcount_into(send);
            return Ok(());
        }
        let recv = recv.ok_or(Error::MissingReceiveBuffer(root))?;
        let offsets = check_layout(recv, counts, self.size())?;
        let counts: Vec<Count> = narrow_counts(counts)?;
        let offsets: Vec<Count> = narrow_counts(&offsets)?;
        let mut partition = PartitionMut::new(recv, &counts[..], &offsets[..]);
        process.gather_varcount_into_root(send, &mut partition);
        Ok(())
    }
}
