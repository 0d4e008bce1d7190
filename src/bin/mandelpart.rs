// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{App, Arg, ArgMatches};
use log::info;

use mandelpart::config::{
    parse_complex, parse_pair, validate_in_range, validate_pair, Backend, RunConfig,
};
use mandelpart::display::{sink_for_path, DisplaySink, TerminalSink};
use mandelpart::{render_local, Frame, Result};

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const PARTICIPANTS: &str = "participants";
const ITERATIONS: &str = "iterations";
const TIMEOUT: &str = "timeout";
const PREVIEW: &str = "preview";
const BACKEND: &str = "backend";

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandelpart")
        .version("0.1.0")
        .author("elf")
        .about("Mandelbrot renderer split by rows across a group of participants")
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; .pgm/.pnm for greymap, anything else for false colour"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("150x100")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2.0,-1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Left lower corner"))
                .help("Left lower corner of the mandelbrot space"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1.0,1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Right upper corner"))
                .help("Right upper corner of the mandelbrot space"),
        )
        .arg(
            Arg::with_name(PARTICIPANTS)
                .required(false)
                .long(PARTICIPANTS)
                .short("p")
                .takes_value(true)
                .validator(|s| validate_in_range(&s, 1usize..=4096, "Participant count"))
                .help("Number of participants to split the rows across (default: one per cpu)"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("127")
                .validator(|s| validate_in_range(&s, 1u32..=1_000_000, "Iteration count"))
                .help("Iteration cap per pixel"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .required(false)
                .long(TIMEOUT)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_in_range(&s, 1..=u64::max_value(), "Timeout in milliseconds")
                })
                .help("Milliseconds a participant waits on a silent peer before giving up"),
        )
        .arg(
            Arg::with_name(PREVIEW)
                .long(PREVIEW)
                .help("Print a character preview of the image"),
        )
        .arg(
            Arg::with_name(BACKEND)
                .required(false)
                .long(BACKEND)
                .short("b")
                .takes_value(true)
                .possible_values(&["threads", "mpi"])
                .default_value("threads")
                .help("Process group to run in"),
        )
        .get_matches()
}

// Every value below has been through a validator, but the parsers are
// rerun rather than trusted.
fn run_config(matches: &ArgMatches) -> std::result::Result<RunConfig, String> {
    let mut config = RunConfig::default();

    let size = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<usize>(s, 'x'))
        .ok_or("Error parsing image dimensions")?;
    let leftlower = matches
        .value_of(LEFTLOWER)
        .and_then(parse_complex)
        .ok_or("Error parsing left lower point")?;
    let rightupper = matches
        .value_of(RIGHTUPPER)
        .and_then(parse_complex)
        .ok_or("Error parsing right upper point")?;
    let iterations = matches
        .value_of(ITERATIONS)
        .and_then(|s| u32::from_str(s).ok())
        .ok_or("Could not parse iteration count.")?;

    config.params = RunConfig::params_from(size, leftlower, rightupper, iterations)
        .map_err(|e| e.to_string())?;
    if let Some(p) = matches.value_of(PARTICIPANTS) {
        config.participants =
            usize::from_str(p).map_err(|_| "Could not parse participant count.")?;
    }
    if let Some(t) = matches.value_of(TIMEOUT) {
        let ms = u64::from_str(t).map_err(|_| "Could not parse timeout.")?;
        config.timeout = Some(Duration::from_millis(ms));
    }
    config.output = matches.value_of(OUTPUT).map(PathBuf::from);
    config.preview = matches.is_present(PREVIEW);
    if let Some(b) = matches.value_of(BACKEND) {
        config.backend = Backend::from_str(b)?;
    }
    Ok(config)
}

fn show(config: &RunConfig, frame: &Frame) -> Result<()> {
    if config.preview {
        TerminalSink::new(io::stdout(), 80).show(frame)?;
    }
    match config.output {
        Some(ref path) => sink_for_path(path).show(frame),
        None => {
            info!("no output configured, skipping display");
            Ok(())
        }
    }
}

#[cfg(feature = "mpi")]
fn run_mpi(config: &RunConfig) -> Result<()> {
    use mandelpart::comm::MpiWorld;
    use mandelpart::{render, Communicator, ROOT};

    let world = MpiWorld::initialize()?;
    let params = if world.is_root(ROOT) {
        Some(&config.params)
    } else {
        None
    };
    // Everyone but the coordinator is done once its rows are delivered.
    match render(&world, params)? {
        Some(frame) => show(config, &frame),
        None => Ok(()),
    }
}

#[cfg(not(feature = "mpi"))]
fn run_mpi(_config: &RunConfig) -> Result<()> {
    Err(mandelpart::Error::MpiUnavailable)
}

fn run(config: &RunConfig) -> Result<()> {
    match config.backend {
        Backend::Threads => {
            let frame = render_local(&config.params, config.participants, config.timeout)?;
            show(config, &frame)
        }
        Backend::Mpi => run_mpi(config),
    }
}

fn main() {
    env_logger::init();
    let matches = args();

    let config = match run_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration failure: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
