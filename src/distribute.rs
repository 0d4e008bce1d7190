// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameter distribution: the coordinator's viewport and grid are
//! copied to every participant before any computing starts.
//!
//! Two broadcasts go out: the four bounds as f64, then width, height
//! and iteration cap as u32.  A coordinator that rejects its own
//! parameters still takes part in both, sending an all-zero grid, so
//! that every other participant fails too instead of waiting forever.

use log::{debug, warn};

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::planes::{Grid, Params, Viewport};

/// Deliver the root's `params` to every participant.  Only the root's
/// `params` is read; everyone gets back an identical copy, with dx and
/// dy derived locally.
pub fn broadcast_params<C: Communicator>(
    comm: &C,
    params: Option<&Params>,
    root: usize,
) -> Result<Params> {
    let mut bounds = [0.0f64; 4];
    let mut sizes = [0u32; 3];
    let mut rejected = None;

    if comm.is_root(root) {
        match params.ok_or(Error::MissingParameters(root)).and_then(validated) {
            Ok(p) => {
                bounds = p.viewport.to_array();
                sizes = [p.grid.width as u32, p.grid.height as u32, p.grid.maxit];
            }
            Err(e) => {
                warn!("[rank {}] refusing parameters: {}", comm.rank(), e);
                rejected = Some(e);
            }
        }
    }

    comm.broadcast(&mut bounds, root)?;
    comm.broadcast(&mut sizes, root)?;

    if let Some(e) = rejected {
        return Err(e);
    }
    if sizes.iter().all(|&s| s == 0) {
        return Err(Error::RejectedByCoordinator);
    }

    let viewport = Viewport::from_bounds(bounds[0], bounds[1], bounds[2], bounds[3])?;
    let grid = Grid::new(sizes[0] as usize, sizes[1] as usize, sizes[2])?;
    let shared = Params::new(viewport, grid)?;
    debug!(
        "[rank {}] received {}x{} grid, {} iterations",
        comm.rank(),
        grid.width,
        grid.height,
        grid.maxit
    );
    Ok(shared)
}

fn validated(params: &Params) -> Result<Params> {
    params.viewport.validate()?;
    params.grid.validate()?;
    Ok(*params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalGroup;

    #[test]
    fn everyone_gets_the_same_params() {
        let params = Params::default();
        let group = LocalGroup::new(4).unwrap();
        let received = group
            .run(|comm| {
                let mine = if comm.rank() == 0 { Some(&params) } else { None };
                broadcast_params(&comm, mine, 0)
            })
            .unwrap();
        for p in received {
            let p = p.unwrap();
            assert_eq!(p, params);
            assert_eq!(p.dx(), 0.02);
        }
    }

    #[test]
    fn only_the_root_is_read() {
        let params = Params::default();
        let decoy = Params::new(
            Viewport::from_bounds(0.0, 1.0, 0.0, 1.0).unwrap(),
            Grid::new(3, 3, 3).unwrap(),
        )
        .unwrap();
        let group = LocalGroup::new(3).unwrap();
        let received = group
            .run(|comm| {
                let mine = if comm.rank() == 0 { &params } else { &decoy };
                broadcast_params(&comm, Some(mine), 0)
            })
            .unwrap();
        for p in received {
            assert_eq!(p.unwrap(), params);
        }
    }

    #[test]
    fn bad_params_fail_everywhere() {
        let mut params = Params::default();
        params.grid.width = 0;
        let group = LocalGroup::new(3).unwrap();
        let received = group
            .run(|comm| {
                let mine = if comm.rank() == 0 { Some(&params) } else { None };
                broadcast_params(&comm, mine, 0)
            })
            .unwrap();
        match received[0] {
            Err(Error::InvalidGrid { width, .. }) => assert_eq!(width, 0),
            ref other => panic!("unexpected {:?}", other),
        }
        for p in &received[1..] {
            match p {
                Err(Error::RejectedByCoordinator) => (),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn missing_params_at_root_fail_everywhere() {
        let group = LocalGroup::new(2).unwrap();
        let received = group
            .run(|comm| broadcast_params(&comm, None, 0))
            .unwrap();
        assert!(match received[0] {
            Err(Error::MissingParameters(0)) => true,
            _ => false,
        });
        assert!(received[1].is_err());
    }

    #[test]
    fn coordinator_panic_fails_the_run() {
        let group = LocalGroup::new(3).unwrap();
        let result = group.run(|comm| {
            if comm.rank() == 0 {
                panic!("coordinator failure");
            }
            broadcast_params(&comm, None, 0)
        });
        match result {
            Err(Error::ParticipantPanicked(rank)) => assert_eq!(rank, 0),
            other => panic!("unexpected {:?}", other),
        }
    }
}
