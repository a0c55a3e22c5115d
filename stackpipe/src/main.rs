//! # stackpipe - Main Entry Point
//!
//! Reads samples as JSON lines (standing in for the host engine's per-sample
//! callbacks), runs them through the pipeline and reports at the end.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader};

use stackpipe::cli::Args;
use stackpipe::export::{parse_endpoints, read_bootstrap, Connection};
use stackpipe::filtering::CallchainFilter;
use stackpipe::pipeline::PipelineDriver;
use stackpipe_common::SampleEvent;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

fn main() {
    env_logger::init();
    let args = Args::parse();
    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code_for(&e)
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.chain().any(|cause| cause.is::<stackpipe::domain::ConnectError>()) {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run(args: &Args) -> Result<()> {
    // Control channel first: the filter must be known before any sample
    let (control, filter) = match &args.control {
        Some(instructions) => {
            let endpoint = parse_endpoints(instructions)
                .context("Invalid control channel instructions")?
                .into_iter()
                .next()
                .context("No control channel endpoint")?;
            let (reader, writer) = Connection::open_control(&endpoint)?;
            let settings = read_bootstrap(reader).context("Failed to read bootstrap messages")?;
            let filter = settings
                .map(|settings| CallchainFilter::from_settings(&settings, &args.python))
                .transpose()
                .context("Failed to set up the callchain filter")?;
            (Some(writer), filter)
        }
        None => {
            warn!("No control channel: running unfiltered, reports go to the log");
            (None, None)
        }
    };

    let outputs = parse_endpoints(&args.outputs)
        .context("Invalid output instructions")?
        .iter()
        .map(Connection::open)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to open output connections")?;

    let mut driver = PipelineDriver::new(&args.artifact_dir);
    driver.begin(outputs, control, filter)?;

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("Failed to read samples")?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: SampleEvent = serde_json::from_str(&line)
            .with_context(|| format!("Invalid sample on line {}", line_no + 1))?;
        driver.process_sample(&sample)?;
    }

    let summary = driver.end()?;
    info!("Run finished: {} samples", summary.samples);

    if !args.quiet {
        eprintln!(
            "stats: samples={} symbols={} streams={} missing_maps={}",
            summary.samples,
            summary.distinct_symbols,
            summary.outputs.len(),
            summary.missing_maps.len()
        );
        if let Some(path) = &summary.artifact {
            eprintln!("dictionary: {}", path.display());
        }
    }

    Ok(())
}
