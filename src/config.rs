// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Run configuration, and the small parsers the command line needs.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use num::Complex;

use crate::error::Result;
use crate::planes::{Grid, Params, Viewport};

/// Which process group a run uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// One thread per participant, in this process.
    Threads,
    /// One MPI rank per participant; the group size comes from the
    /// launcher.
    Mpi,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Backend, String> {
        match s {
            "threads" => Ok(Backend::Threads),
            "mpi" => Ok(Backend::Mpi),
            other => Err(format!("Unknown backend '{}'", other)),
        }
    }
}

/// Everything the binary needs to know to do one run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// What to render.
    pub params: Params,
    /// Group size for the thread backend.
    pub participants: usize,
    /// How long a participant waits on a silent peer.
    pub timeout: Option<Duration>,
    /// Where to write the image, if anywhere.
    pub output: Option<PathBuf>,
    /// Whether to print a character preview to stdout.
    pub preview: bool,
    /// Which group to run in.
    pub backend: Backend,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            params: Params::default(),
            participants: num_cpus::get(),
            timeout: None,
            output: None,
            preview: false,
            backend: Backend::Threads,
        }
    }
}

impl RunConfig {
    /// Build the render parameters from the pieces the command line
    /// provides, validating them on the way.
    pub fn params_from(
        size: (usize, usize),
        leftlower: Complex<f64>,
        rightupper: Complex<f64>,
        iterations: u32,
    ) -> Result<Params> {
        let viewport = Viewport::new(leftlower, rightupper)?;
        let grid = Grid::new(size.0, size.1, iterations)?;
        Params::new(viewport, grid)
    }
}

/// Split `s` at the first `separator` and parse both halves, as in
/// `150x100` or `-2.0,-1.0`.
pub fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    let index = s.find(separator)?;
    let left = s[..index].parse().ok()?;
    let right = s[index + separator.len_utf8()..].parse().ok()?;
    Some((left, right))
}

/// A specific implementation of parse_pair using a comma and expecting
/// floating point numbers.
pub fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex { re, im })
}

/// Command-line check that `s` is a pair `parse_pair` accepts.  `what`
/// names the option in the message.
pub fn validate_pair<T: FromStr>(
    s: &str,
    separator: char,
    what: &str,
) -> std::result::Result<(), String> {
    parse_pair::<T>(s, separator).map(|_| ()).ok_or_else(|| {
        format!(
            "{} must be two numbers joined by '{}', not '{}'",
            what, separator, s
        )
    })
}

/// Command-line check that `s` parses as a `T` inside `range`.
pub fn validate_in_range<T>(
    s: &str,
    range: RangeInclusive<T>,
    what: &str,
) -> std::result::Result<(), String>
where
    T: FromStr + PartialOrd + Display,
{
    let value: T = s
        .parse()
        .map_err(|_| format!("{} must be a whole number, not '{}'", what, s))?;
    if range.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "{} must be between {} and {}, not {}",
            what,
            range.start(),
            range.end(),
            value
        ))
    }
}
