// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The reassembled image: a dense H x W array of iteration counts.

use std::slice::Chunks;

/// Iteration counts for every pixel, row-major.  Only the coordinator
/// ever holds one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    limit: u32,
    data: Vec<u32>,
}

impl Frame {
    /// An all-zero frame.  `limit` is the iteration cap the counts were
    /// computed against, used when mapping counts to colours.
    pub fn new(width: usize, height: usize, limit: u32) -> Frame {
        Frame {
            width,
            height,
            limit,
            data: vec![0; width * height],
        }
    }

    /// Columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The iteration cap.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Count at (row, col).
    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.data[row * self.width + col]
    }

    /// One row of counts.
    pub fn row(&self, row: usize) -> &[u32] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// Overwrite row `row` with `values`, which must be exactly one row
    /// long.
    pub fn set_row(&mut self, row: usize, values: &[u32]) {
        let width = self.width;
        self.data[row * width..(row + 1) * width].copy_from_slice(values);
    }

    /// Every row, top to bottom.
    pub fn rows(&self) -> Chunks<u32> {
        self.data.chunks(self.width.max(1))
    }

    /// The raw row-major counts.
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_addressable() {
        let mut frame = Frame::new(3, 2, 10);
        frame.set_row(1, &[4, 5, 6]);
        assert_eq!(frame.row(0), &[0, 0, 0]);
        assert_eq!(frame.row(1), &[4, 5, 6]);
        assert_eq!(frame.get(1, 2), 6);
        assert_eq!(frame.rows().count(), 2);
        assert_eq!(frame.as_slice().len(), 6);
    }
}
