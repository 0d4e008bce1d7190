// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The single error type shared by every stage of a run.

use failure::Fail;

use crate::comm::Collective;

/// Everything that can go wrong while distributing, computing,
/// collecting, or displaying an image.
#[derive(Debug, Fail)]
pub enum Error {
    /// The complex-plane bounds are empty, inverted, or not finite.
    #[fail(display = "invalid viewport: {}", _0)]
    InvalidViewport(String),

    /// The pixel grid or iteration cap is zero, or too large to ship.
    #[fail(display = "invalid grid {}x{} with {} iterations", width, height, maxit)]
    InvalidGrid {
        /// Columns requested.
        width: usize,
        /// Rows requested.
        height: usize,
        /// Iteration cap requested.
        maxit: u32,
    },

    /// A participant received the poisoned parameter frame the
    /// coordinator sends after rejecting its own parameters.
    #[fail(display = "parameters were rejected by the coordinator")]
    RejectedByCoordinator,

    /// The coordinator was asked to broadcast but holds no parameters.
    #[fail(display = "coordinator {} was not given parameters", _0)]
    MissingParameters(usize),

    /// The root of a collective was not handed a receive buffer.
    #[fail(display = "root {} was not given a receive buffer", _0)]
    MissingReceiveBuffer(usize),

    /// A group needs at least one participant.
    #[fail(display = "a group needs at least one participant")]
    EmptyGroup,

    /// A rank named in a call lies outside the group.
    #[fail(display = "rank {} is outside a group of {}", rank, size)]
    InvalidRank {
        /// The offending rank.
        rank: usize,
        /// Group size.
        size: usize,
    },

    /// A peer's end of the transport went away mid-collective.
    #[fail(display = "participant {} lost contact with participant {}", rank, peer)]
    Disconnected {
        /// The participant reporting.
        rank: usize,
        /// The participant that vanished.
        peer: usize,
    },

    /// A peer did not answer within the configured timeout.
    #[fail(display = "participant {} timed out waiting for participant {}", rank, peer)]
    Timeout {
        /// The participant reporting.
        rank: usize,
        /// The participant it was waiting on.
        peer: usize,
    },

    /// Two participants called different collectives at the same step.
    #[fail(
        display = "participant {} expected {:?} but participant {} called {:?}",
        rank, expected, peer, found
    )]
    CollectiveMismatch {
        /// The participant reporting.
        rank: usize,
        /// The participant out of step.
        peer: usize,
        /// The collective this participant is in.
        expected: Collective,
        /// The collective the peer is in.
        found: Collective,
    },

    /// A buffer does not have the length the collective needs.
    #[fail(display = "buffer of {} bytes where {} were expected", found, expected)]
    BufferSize {
        /// Length required.
        expected: usize,
        /// Length supplied.
        found: usize,
    },

    /// A byte count or offset is too large for the backend to carry.
    #[fail(display = "{} bytes is more than one collective can carry", _0)]
    CountOverflow(usize),

    /// The group finished without the coordinator producing an image.
    #[fail(display = "the coordinator returned no frame")]
    NoFrame,

    /// A participant thread panicked.
    #[fail(display = "participant {} panicked", _0)]
    ParticipantPanicked(usize),

    /// A gathered row index does not name a row of the image.
    #[fail(display = "row {} is not a row of the image", _0)]
    RowOutOfRange(usize),

    /// Two participants claimed the same row.
    #[fail(display = "row {} was delivered twice", _0)]
    DuplicateRow(usize),

    /// The MPI runtime could not be brought up.
    #[fail(display = "MPI is unavailable or already initialized")]
    MpiUnavailable,

    /// Encoding or writing an image failed.
    #[fail(display = "could not write image: {}", _0)]
    Image(#[cause] image::ImageError),

    /// Plain I/O failure from a display sink.
    #[fail(display = "i/o failure: {}", _0)]
    Io(#[cause] std::io::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
