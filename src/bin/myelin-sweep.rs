//! myelin-sweep - Threshold sweep across fiber diameters
//!
//! # Usage
//!
//! ```bash
//! # Default sweep: 2, 5, 8 µm fibers, 31 nodes, bracket [0, 2000]
//! myelin-sweep
//!
//! # Custom diameters (µm)
//! myelin-sweep 1.0 4.0 12.0
//!
//! # Shorter fiber, tighter tolerance, verbose trial logging
//! myelin-sweep --nodes 21 --tol 0.05 -v 5.0
//! ```
//!
//! Prints the diameter → threshold map as JSON on stdout.
//!
//! # Exit Codes
//!
//! - 0: every diameter produced a threshold
//! - 1: one or more diameters were not bracketed or failed
//! - 2: invalid arguments

use std::process::ExitCode;

use anyhow::Context;
use myelin::{run_sweep, SweepConfig};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut config = SweepConfig::default();
    let mut verbose = false;
    let mut diameters = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            "--nodes" => match iter.next().and_then(|v| v.parse::<usize>().ok()) {
                Some(n) => config.node_count = n,
                None => return usage_error("--nodes needs an integer argument"),
            },
            "--lo" => match iter.next().and_then(|v| v.parse::<f64>().ok()) {
                Some(x) => config.search.scale_lo = x,
                None => return usage_error("--lo needs a numeric argument"),
            },
            "--hi" => match iter.next().and_then(|v| v.parse::<f64>().ok()) {
                Some(x) => config.search.scale_hi = x,
                None => return usage_error("--hi needs a numeric argument"),
            },
            "--tol" => match iter.next().and_then(|v| v.parse::<f64>().ok()) {
                Some(x) => config.search.tolerance = x,
                None => return usage_error("--tol needs a numeric argument"),
            },
            _ if arg.starts_with('-') => {
                eprintln!("Unknown option: {}\n", arg);
                print_help();
                return ExitCode::from(2);
            }
            _ => match arg.parse::<f64>() {
                Ok(d) if d > 0.0 => diameters.push(d),
                _ => return usage_error(&format!("bad diameter: {arg}")),
            },
        }
    }

    if !diameters.is_empty() {
        config.diameters_um = diameters;
    }

    env_logger::Builder::from_default_env()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    match sweep_and_print(&config) {
        Ok(all_found) => {
            if all_found {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn sweep_and_print(config: &SweepConfig) -> anyhow::Result<bool> {
    let entries = run_sweep(config).context("sweep failed")?;
    let json = serde_json::to_string_pretty(&entries).context("serializing results")?;
    println!("{json}");
    Ok(entries.iter().all(|e| e.threshold.is_some()))
}

fn usage_error(message: &str) -> ExitCode {
    eprintln!("Error: {message}\n");
    print_help();
    ExitCode::from(2)
}

fn print_help() {
    eprintln!("myelin-sweep - threshold sweep across fiber diameters");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    myelin-sweep [OPTIONS] [DIAMETER_UM]...");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    --nodes <N>    Nodes of Ranvier per fiber (default 31)");
    eprintln!("    --lo <SCALE>   Lower scale bound (default 0)");
    eprintln!("    --hi <SCALE>   Upper scale bound (default 2000)");
    eprintln!("    --tol <SCALE>  Bisection tolerance (default 0.1)");
    eprintln!("    -v, --verbose  Per-trial debug logging");
    eprintln!("    -h, --help     Show this help");
}
