// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The process group.
//!
//! A group is a fixed set of participants, numbered 0 through size-1,
//! that talk only through collective operations: every participant
//! calls the same collective, in the same order, and none gets past it
//! until all have arrived.  A backend only has to move raw bytes; the
//! typed versions of each collective are layered on top through the
//! `Element` codec.
//!
//! Two backends exist: `local`, which runs each participant as a
//! thread inside this process, and `mpi_world`, which runs each
//! participant as an MPI rank (feature `mpi`).

pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi_world;

pub use self::local::{LocalComm, LocalGroup};
#[cfg(feature = "mpi")]
pub use self::mpi_world::MpiWorld;

use std::convert::TryFrom;

use crate::error::{Error, Result};

/// The participant that holds the parameters and collects the image.
pub const ROOT: usize = 0;

/// The kinds of collective a participant can be in.  Carried on the
/// wire so a participant out of step is caught rather than waited on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Collective {
    /// One-to-all copy.
    Broadcast,
    /// All-to-one, equal contributions.
    Gather,
    /// All-to-one, per-participant contribution lengths.
    Gatherv,
}

/// A fixed-width value that can be laid out as little-endian bytes.
pub trait Element: Copy + Default {
    /// Encoded size in bytes.
    const WIDTH: usize;

    /// Append the encoding of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);

    /// Read a value back from exactly `WIDTH` bytes.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! le_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

le_element!(u32, i32, u64, f32, f64);

/// Lay a slice of elements out as bytes.
pub fn encode_slice<T: Element>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::WIDTH);
    for value in values {
        value.encode(&mut out);
    }
    out
}

/// Fill `values` from `bytes`, which must hold exactly as many
/// elements as `values` has room for.
pub fn decode_into<T: Element>(bytes: &[u8], values: &mut [T]) -> Result<()> {
    if bytes.len() != values.len() * T::WIDTH {
        return Err(Error::BufferSize {
            expected: values.len() * T::WIDTH,
            found: bytes.len(),
        });
    }
    for (value, chunk) in values.iter_mut().zip(bytes.chunks(T::WIDTH)) {
        *value = T::decode(chunk);
    }
    Ok(())
}

/// Where each participant's contribution starts: the running total of
/// the counts before it.
pub fn displacements(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |acc, &c| {
            let d = *acc;
            *acc += c;
            Some(d)
        })
        .collect()
}

/// A participant's handle on its group.
///
/// Backends implement the three byte-level collectives; the typed
/// collectives come for free.  Receive buffers and counts only mean
/// anything at the root, and may be omitted everywhere else.
pub trait Communicator {
    /// This participant's 0-based identity.
    fn rank(&self) -> usize;

    /// How many participants the group has.
    fn size(&self) -> usize;

    /// Copy the root's `buffer` into every other participant's
    /// `buffer`.  All buffers must have the same length.
    fn broadcast_bytes(&self, buffer: &mut [u8], root: usize) -> Result<()>;

    /// Every participant contributes `send`, all of the same length;
    /// the root receives them concatenated in rank order.
    fn gather_bytes(&self, send: &[u8], recv: Option<&mut [u8]>, root: usize) -> Result<()>;

    /// Participant k contributes `counts[k]` bytes; the root receives
    /// them at offsets given by `displacements(counts)`.
    fn gatherv_bytes(
        &self,
        send: &[u8],
        recv: Option<&mut [u8]>,
        counts: &[usize],
        root: usize,
    ) -> Result<()>;

    /// The largest buffer, in bytes, one collective can move.  `None`
    /// when the backend has no limit of its own.
    fn max_bytes(&self) -> Option<usize> {
        None
    }

    /// Whether this participant is the root of a collective.
    fn is_root(&self, root: usize) -> bool {
        self.rank() == root
    }

    /// Typed `broadcast_bytes`.
    fn broadcast<T: Element>(&self, buffer: &mut [T], root: usize) -> Result<()> {
        let mut bytes = encode_slice(buffer);
        self.broadcast_bytes(&mut bytes, root)?;
        decode_into(&bytes, buffer)
    }

    /// Typed `gather_bytes`.
    fn gather<T: Element>(&self, send: &[T], recv: Option<&mut [T]>, root: usize) -> Result<()> {
        let bytes = encode_slice(send);
        match recv {
            Some(recv) => {
                let mut raw = vec![0u8; recv.len() * T::WIDTH];
                self.gather_bytes(&bytes, Some(&mut raw), root)?;
                decode_into(&raw, recv)
            }
            None => self.gather_bytes(&bytes, None, root),
        }
    }

    /// Typed `gatherv_bytes`; `counts` are in elements.
    fn gatherv<T: Element>(
        &self,
        send: &[T],
        recv: Option<&mut [T]>,
        counts: &[usize],
        root: usize,
    ) -> Result<()> {
        let bytes = encode_slice(send);
        let byte_counts: Vec<usize> = counts.iter().map(|c| c * T::WIDTH).collect();
        match recv {
            Some(recv) => {
                let mut raw = vec![0u8; recv.len() * T::WIDTH];
                self.gatherv_bytes(&bytes, Some(&mut raw), &byte_counts, root)?;
                decode_into(&raw, recv)
            }
            None => self.gatherv_bytes(&bytes, None, &byte_counts, root),
        }
    }
}

/// Refuse a root that is not a member of the group.
pub(crate) fn check_root<C: Communicator>(comm: &C, root: usize) -> Result<()> {
    if root >= comm.size() {
        return Err(Error::InvalidRank {
            rank: root,
            size: comm.size(),
        });
    }
    Ok(())
}

/// Check the root's receive buffer against the counts it expects and
/// hand back where each contribution lands.
pub(crate) fn check_layout(recv: &[u8], counts: &[usize], size: usize) -> Result<Vec<usize>> {
    if counts.len() != size {
        return Err(Error::BufferSize {
            expected: size,
            found: counts.len(),
        });
    }
    let total: usize = counts.iter().sum();
    if recv.len() < total {
        return Err(Error::BufferSize {
            expected: total,
            found: recv.len(),
        });
    }
    Ok(displacements(counts))
}

/// Convert byte counts or offsets into a backend's narrower count
/// type, refusing any that would not survive the trip.
#[cfg_attr(not(feature = "mpi"), allow(dead_code))]
pub(crate) fn narrow_counts<N: TryFrom<usize>>(values: &[usize]) -> Result<Vec<N>> {
    values
        .iter()
        .map(|&v| N::try_from(v).map_err(|_| Error::CountOverflow(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacements_are_exclusive_prefix_sums() {
        assert_eq!(displacements(&[3, 0, 2, 5]), vec![0, 3, 3, 5]);
        assert_eq!(displacements(&[]), Vec::<usize>::new());
    }

    #[test]
    fn elements_survive_the_wire() {
        let values = [-2.0f64, 1.0, -1.0, 1.0];
        let bytes = encode_slice(&values);
        assert_eq!(bytes.len(), 32);
        let mut back = [0.0f64; 4];
        decode_into(&bytes, &mut back).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn decode_refuses_short_buffers() {
        let mut back = [0u32; 3];
        assert!(decode_into(&[0u8; 11], &mut back).is_err());
    }

    #[test]
    fn layout_refuses_small_receive_buffer() {
        assert!(check_layout(&[0u8; 4], &[2, 3], 2).is_err());
        assert!(check_layout(&[0u8; 5], &[2, 3], 3).is_err());
        assert_eq!(check_layout(&[0u8; 5], &[2, 3], 2).unwrap(), vec![0, 2]);
    }

    #[test]
    fn counts_past_i32_are_refused() {
        // One participant's share of a 24000x24000 frame, in bytes.
        let share = 24_000usize * 24_000 * 4;
        match narrow_counts::<i32>(&[0, share]) {
            Err(Error::CountOverflow(found)) => assert_eq!(found, share),
            other => panic!("unexpected {:?}", other),
        }
        let largest = i32::max_value() as usize;
        assert_eq!(
            narrow_counts::<i32>(&[0, 7, largest]).unwrap(),
            vec![0, 7, i32::max_value()]
        );
    }
}
