// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Row ownership and local compute.
//!
//! Rows are dealt out like cards: participant r of P owns rows r, r+P,
//! r+2P, and so on below H.  Every participant works out its own hand
//! from its rank alone, so nobody has to be told what to compute.

use std::iter::StepBy;
use std::ops::Range;

use itertools::iproduct;

use crate::escape::escape_time;
use crate::planes::Params;

/// The rows `rank` owns in a group of `size` over `height` rows, in
/// ascending order.  `size` must be at least one.
pub fn owned_rows(rank: usize, size: usize, height: usize) -> StepBy<Range<usize>> {
    (rank..height).step_by(size.max(1))
}

/// How many rows `rank` owns, without walking them.
pub fn row_count(rank: usize, size: usize, height: usize) -> usize {
    let size = size.max(1);
    height / size + if height % size > rank { 1 } else { 0 }
}

/// One participant's share of the image: the global indices of the
/// rows it owns, and those rows' iteration counts laid end to end.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalBlock {
    /// Global row indices, ascending.
    pub rows: Vec<u32>,
    /// `rows.len() * width` iteration counts, row-major.
    pub values: Vec<u32>,
    /// Columns per row.
    pub width: usize,
}

impl LocalBlock {
    /// Rows held.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The counts of the k-th owned row (local position, not global
    /// index).
    pub fn row(&self, k: usize) -> &[u32] {
        &self.values[k * self.width..(k + 1) * self.width]
    }
}

/// Compute every pixel of the rows `rank` owns.
pub fn compute_local(params: &Params, rank: usize, size: usize) -> LocalBlock {
    let grid = params.grid;
    let rows: Vec<usize> = owned_rows(rank, size, grid.height).collect();
    let values = iproduct!(rows.iter(), 0..grid.width)
        .map(|(&row, col)| escape_time(params.pixel_to_point(row, col), grid.maxit))
        .collect();
    LocalBlock {
        rows: rows.into_iter().map(|r| r as u32).collect(),
        values,
        width: grid.width,
    }
}
