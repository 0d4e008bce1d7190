// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The full pipeline a participant runs: receive the parameters,
//! compute its rows, and hand them to the coordinator, which puts the
//! image back together.
//!
//! Collection is three collectives in fixed order: a gather of row
//! counts, then a variable-length gather of row indices, then a
//! variable-length gather of the rows themselves (each participant's
//! share being its row count times W).  Because every row is owned by
//! exactly one participant, scattering the gathered rows to their
//! indices leaves no gaps.

use std::mem;
use std::time::Duration;

use log::{debug, info};

use crate::comm::{Communicator, LocalGroup, ROOT};
use crate::distribute::broadcast_params;
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::partition::{compute_local, LocalBlock};
use crate::planes::{Grid, Params};

/// Everything a participant does in one run.  The coordinator must be
/// given the parameters and gets back `Some(frame)`; every other
/// participant gets back `None` as soon as its rows are delivered.
pub fn render<C: Communicator>(comm: &C, params: Option<&Params>) -> Result<Option<Frame>> {
    let params = broadcast_params(comm, params, ROOT)?;
    let block = compute_local(&params, comm.rank(), comm.size());
    debug!(
        "[rank {}] computed {} of {} rows",
        comm.rank(),
        block.row_count(),
        params.grid.height
    );
    collect(comm, &params.grid, &block, ROOT)
}

/// Gather every participant's block at `root` and reassemble it there.
pub fn collect<C: Communicator>(
    comm: &C,
    grid: &Grid,
    block: &LocalBlock,
    root: usize,
) -> Result<Option<Frame>> {
    let at_root = comm.is_root(root);

    // The grid is the same everywhere, so every participant refuses
    // together.
    if let Some(limit) = comm.max_bytes() {
        let frame_bytes = grid.len().saturating_mul(mem::size_of::<u32>());
        if frame_bytes > limit {
            return Err(Error::CountOverflow(frame_bytes));
        }
    }

    let mut counts = if at_root {
        vec![0u32; comm.size()]
    } else {
        Vec::new()
    };
    comm.gather(
        &[block.row_count() as u32],
        if at_root { Some(&mut counts[..]) } else { None },
        root,
    )?;
    let counts: Vec<usize> = counts.into_iter().map(|c| c as usize).collect();

    if at_root {
        let total: usize = counts.iter().sum();
        if total != grid.height {
            return Err(Error::BufferSize {
                expected: grid.height,
                found: total,
            });
        }
    }

    let mut indices = if at_root {
        vec![0u32; grid.height]
    } else {
        Vec::new()
    };
    comm.gatherv(
        &block.rows,
        if at_root { Some(&mut indices[..]) } else { None },
        &counts,
        root,
    )?;

    let value_counts: Vec<usize> = counts.iter().map(|c| c * grid.width).collect();
    let mut values = if at_root {
        vec![0u32; grid.len()]
    } else {
        Vec::new()
    };
    comm.gatherv(
        &block.values,
        if at_root { Some(&mut values[..]) } else { None },
        &value_counts,
        root,
    )?;

    if !at_root {
        return Ok(None);
    }
    info!("[rank {}] collected rows from {} participants", root, counts.len());
    reassemble(grid, &indices, &values).map(Some)
}

/// Write each gathered row into the frame at its global index.
/// `indices[k]` names the row whose counts are the k-th run of W values
/// in `values`.
pub fn reassemble(grid: &Grid, indices: &[u32], values: &[u32]) -> Result<Frame> {
    if indices.len() != grid.height {
        return Err(Error::BufferSize {
            expected: grid.height,
            found: indices.len(),
        });
    }
    if values.len() != grid.len() {
        return Err(Error::BufferSize {
            expected: grid.len(),
            found: values.len(),
        });
    }

    let mut frame = Frame::new(grid.width, grid.height, grid.maxit);
    let mut filled = vec![false; grid.height];
    for (&index, row) in indices.iter().zip(values.chunks(grid.width)) {
        let index = index as usize;
        if index >= grid.height {
            return Err(Error::RowOutOfRange(index));
        }
        if filled[index] {
            return Err(Error::DuplicateRow(index));
        }
        filled[index] = true;
        frame.set_row(index, row);
    }
    Ok(frame)
}

/// The whole grid computed in one participant with no communication.
pub fn render_serial(params: &Params) -> Result<Frame> {
    params.viewport.validate()?;
    params.grid.validate()?;
    let block = compute_local(params, 0, 1);
    reassemble(&params.grid, &block.rows, &block.values)
}

/// Run a complete render over `participants` threads in this process
/// and return the coordinator's frame.  A participant that hears
/// nothing for `timeout` gives up.
pub fn render_local(
    params: &Params,
    participants: usize,
    timeout: Option<Duration>,
) -> Result<Frame> {
    let group = LocalGroup::new(participants)?.with_timeout(timeout);
    info!("rendering over {} local participants", group.size());
    let outcomes = group.run(|comm| {
        let mine = if comm.is_root(ROOT) { Some(params) } else { None };
        render(&comm, mine)
    })?;
    coordinator_frame(outcomes)
}

// The first failure in rank order wins; otherwise the coordinator's
// frame.
fn coordinator_frame(outcomes: Vec<Result<Option<Frame>>>) -> Result<Frame> {
    let mut frame = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome? {
            Some(f) if rank == ROOT => frame = Some(f),
            _ => (),
        }
    }
    frame.ok_or(Error::NoFrame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::escape_time_xy;
    use crate::planes::Viewport;

    fn small() -> Params {
        Params::new(
            Viewport::from_bounds(-2.0, 1.0, -1.0, 1.0).unwrap(),
            Grid::new(30, 17, 40).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn reassemble_places_rows_by_index() {
        let grid = Grid::new(2, 3, 9).unwrap();
        let frame = reassemble(&grid, &[2, 0, 1], &[5, 5, 1, 1, 3, 3]).unwrap();
        assert_eq!(frame.row(0), &[1, 1]);
        assert_eq!(frame.row(1), &[3, 3]);
        assert_eq!(frame.row(2), &[5, 5]);
    }

    #[test]
    fn reassemble_refuses_duplicates() {
        let grid = Grid::new(1, 2, 9).unwrap();
        assert!(match reassemble(&grid, &[1, 1], &[0, 0]) {
            Err(Error::DuplicateRow(1)) => true,
            _ => false,
        });
    }

    #[test]
    fn reassemble_refuses_rows_off_the_image() {
        let grid = Grid::new(1, 2, 9).unwrap();
        assert!(match reassemble(&grid, &[0, 2], &[0, 0]) {
            Err(Error::RowOutOfRange(2)) => true,
            _ => false,
        });
    }

    #[test]
    fn reassemble_refuses_short_values() {
        let grid = Grid::new(2, 2, 9).unwrap();
        assert!(reassemble(&grid, &[0, 1], &[0, 0, 0]).is_err());
    }

    #[test]
    fn single_participant_matches_serial() {
        let params = small();
        let frame = render_local(&params, 1, None).unwrap();
        assert_eq!(frame, render_serial(&params).unwrap());
    }

    #[test]
    fn frame_is_independent_of_group_size() {
        let params = small();
        let reference = render_serial(&params).unwrap();
        for &participants in &[1, 2, 5, 7, 17, 20] {
            let frame = render_local(&params, participants, None).unwrap();
            assert_eq!(frame, reference, "{} participants", participants);
        }
    }

    #[test]
    fn serial_frame_matches_the_kernel() {
        let params = small();
        let frame = render_serial(&params).unwrap();
        for row in 0..17 {
            for col in 0..30 {
                let expected = escape_time_xy(params.x_at(col), params.y_at(row), 40);
                assert_eq!(frame.get(row, col), expected);
            }
        }
    }

    #[test]
    fn non_root_participants_return_nothing() {
        let params = small();
        let group = LocalGroup::new(3).unwrap();
        let outcomes = group
            .run(|comm| {
                let mine = if comm.rank() == 0 { Some(&params) } else { None };
                render(&comm, mine)
            })
            .unwrap();
        assert!(outcomes[0].as_ref().unwrap().is_some());
        assert!(outcomes[1].as_ref().unwrap().is_none());
        assert!(outcomes[2].as_ref().unwrap().is_none());
    }

    #[test]
    fn invalid_params_fail_the_run() {
        let mut params = small();
        params.grid.maxit = 0;
        assert!(render_local(&params, 3, None).is_err());
    }

    // A one-participant group with a tiny transport.
    struct Cramped {
        limit: usize,
    }

    impl Communicator for Cramped {
        fn rank(&self) -> usize {
            0
        }

        fn size(&self) -> usize {
            1
        }

        fn max_bytes(&self) -> Option<usize> {
            Some(self.limit)
        }

        fn broadcast_bytes(&self, _buffer: &mut [u8], _root: usize) -> Result<()> {
            Ok(())
        }

        fn gather_bytes(&self, send: &[u8], recv: Option<&mut [u8]>, _root: usize) -> Result<()> {
            if let Some(recv) = recv {
                recv[..send.len()].copy_from_slice(send);
            }
            Ok(())
        }

        fn gatherv_bytes(
            &self,
            send: &[u8],
            recv: Option<&mut [u8]>,
            _counts: &[usize],
            root: usize,
        ) -> Result<()> {
            self.gather_bytes(send, recv, root)
        }
    }

    #[test]
    fn frame_larger_than_the_transport_is_refused() {
        let params = small();
        let block = compute_local(&params, 0, 1);
        let cramped = Cramped { limit: 30 * 17 * 4 - 1 };
        match collect(&cramped, &params.grid, &block, ROOT) {
            Err(Error::CountOverflow(bytes)) => assert_eq!(bytes, 30 * 17 * 4),
            other => panic!("unexpected {:?}", other),
        }
        let roomy = Cramped { limit: 30 * 17 * 4 };
        let frame = collect(&roomy, &params.grid, &block, ROOT).unwrap().unwrap();
        assert_eq!(frame, render_serial(&params).unwrap());
    }

    #[test]
    fn silent_coordinator_yields_no_frame() {
        match coordinator_frame(vec![Ok(None), Ok(None), Ok(None)]) {
            Err(Error::NoFrame) => (),
            other => panic!("unexpected {:?}", other),
        }
        let stray = Frame::new(2, 2, 9);
        match coordinator_frame(vec![Ok(None), Ok(Some(stray))]) {
            Err(Error::NoFrame) => (),
            other => panic!("unexpected {:?}", other),
        }
        match coordinator_frame(vec![Ok(None), Err(Error::RejectedByCoordinator)]) {
            Err(Error::RejectedByCoordinator) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
