// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Display sinks: somewhere for the coordinator to put the finished
//! frame.  Having none is fine; the run just ends.

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, Rgb, RgbImage};
use log::info;

use crate::error::Result;
use crate::frame::Frame;

/// Anything that can show a frame.
pub trait DisplaySink {
    /// Render `frame`.
    fn show(&self, frame: &Frame) -> Result<()>;
}

// ColorBrewer "Spectral", dark red through yellow to dark blue.
const SPECTRAL: [[u8; 3]; 11] = [
    [158, 1, 66],
    [213, 62, 79],
    [244, 109, 67],
    [253, 174, 97],
    [254, 224, 139],
    [255, 255, 191],
    [230, 245, 152],
    [171, 221, 164],
    [102, 194, 165],
    [50, 136, 189],
    [94, 79, 162],
];

/// Map an iteration count onto the spectral gradient.  Zero lands on
/// the first stop, `limit` on the last.
pub fn spectral(value: u32, limit: u32) -> Rgb<u8> {
    let t = if limit == 0 {
        0.0
    } else {
        (value.min(limit) as f64) / (limit as f64)
    };
    let scaled = t * (SPECTRAL.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(SPECTRAL.len() - 1);
    let frac = scaled - lower as f64;
    let mut out = [0u8; 3];
    for (c, o) in out.iter_mut().enumerate() {
        let a = SPECTRAL[lower][c] as f64;
        let b = SPECTRAL[upper][c] as f64;
        *o = (a + (b - a) * frac).round() as u8;
    }
    Rgb(out)
}

/// Scale a count to a grey level, 0 through 255.
pub fn grey(value: u32, limit: u32) -> u8 {
    if limit == 0 {
        return 0;
    }
    ((u64::from(value.min(limit)) * 255) / u64::from(limit)) as u8
}

/// Writes a false-colour image.  The format follows the file
/// extension.
pub struct PaletteSink {
    path: PathBuf,
}

impl PaletteSink {
    /// A sink that writes to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> PaletteSink {
        PaletteSink {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DisplaySink for PaletteSink {
    fn show(&self, frame: &Frame) -> Result<()> {
        let img = RgbImage::from_fn(frame.width() as u32, frame.height() as u32, |x, y| {
            spectral(frame.get(y as usize, x as usize), frame.limit())
        });
        img.save(&self.path)?;
        info!("wrote {}", self.path.display());
        Ok(())
    }
}

/// Writes a binary greymap (PGM).
pub struct GraymapSink {
    path: PathBuf,
}

impl GraymapSink {
    /// A sink that writes to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> GraymapSink {
        GraymapSink {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DisplaySink for GraymapSink {
    fn show(&self, frame: &Frame) -> Result<()> {
        let pixels: Vec<u8> = frame
            .as_slice()
            .iter()
            .map(|&v| grey(v, frame.limit()))
            .collect();
        let output = File::create(&self.path)?;
        let mut encoder =
            PnmEncoder::new(output).with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary));
        encoder.encode(
            &pixels[..],
            frame.width() as u32,
            frame.height() as u32,
            ColorType::L8,
        )?;
        info!("wrote {}", self.path.display());
        Ok(())
    }
}

const RAMP: &[u8] = b" .:-=+*#%@";

/// A character-cell preview, at most `columns` wide, written to any
/// writer.  Rows are sampled at twice the column step since a terminal
/// cell is about twice as tall as it is wide.
pub struct TerminalSink<W: Write> {
    out: RefCell<W>,
    columns: usize,
}

impl<W: Write> TerminalSink<W> {
    /// A preview no wider than `columns` characters.
    pub fn new(out: W, columns: usize) -> TerminalSink<W> {
        TerminalSink {
            out: RefCell::new(out),
            columns: columns.max(1),
        }
    }

    /// Hand back the writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn show(&self, frame: &Frame) -> Result<()> {
        let step = (frame.width() + self.columns - 1) / self.columns;
        let step = step.max(1);
        let mut out = self.out.borrow_mut();
        for row in (0..frame.height()).step_by(step * 2) {
            let line: String = (0..frame.width())
                .step_by(step)
                .map(|col| {
                    let level = grey(frame.get(row, col), frame.limit()) as usize;
                    RAMP[level * (RAMP.len() - 1) / 255] as char
                })
                .collect();
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Pick a file sink for `path`: PGM for `.pgm` and `.pnm`, false
/// colour for everything else.
pub fn sink_for_path(path: &Path) -> Box<dyn DisplaySink> {
    let greymap = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pgm") || e.eq_ignore_ascii_case("pnm"))
        .unwrap_or(false);
    if greymap {
        Box::new(GraymapSink::new(path))
    } else {
        Box::new(PaletteSink::new(path))
    }
}
