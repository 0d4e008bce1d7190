#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Row-partitioned Mandelbrot renderer
//!
//! The Mandelbrot set is drawn by taking each pixel's point on the
//! complex plane, repeatedly squaring it and adding the original back,
//! and counting how many steps it takes to fly off towards infinity.
//! That count is the pixel's colour.
//!
//! Here the work is split across a group of cooperating participants
//! that share nothing and talk only through collective operations.
//! The coordinator (rank 0) broadcasts the viewport and grid; each
//! participant computes every P-th row starting at its own rank; the
//! coordinator gathers the row counts, the row indices, and the rows,
//! and scatters the rows back into a single image.  The image is the
//! same whatever the group size.
//!
//! ```
//! use mandelpart::{render_local, render_serial, Params};
//!
//! let params = Params::default();
//! let frame = render_local(&params, 4, None).unwrap();
//! assert_eq!(frame, render_serial(&params).unwrap());
//! ```

pub mod comm;
pub mod config;
pub mod display;
pub mod distribute;
pub mod error;
pub mod escape;
pub mod frame;
pub mod partition;
pub mod planes;
pub mod render;

pub use comm::{Communicator, LocalGroup, ROOT};
pub use error::{Error, Result};
pub use escape::{escape_time, escape_time_xy};
pub use frame::Frame;
pub use planes::{Grid, Params, Viewport};
pub use render::{render, render_local, render_serial};
