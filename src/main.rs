//! Danmaku Motion scenario runner
//!
//! Loads a JSON scenario, simulates it headlessly and prints the recorded
//! trajectories as JSON on stdout.
//!
//! Usage:
//!   danmaku-motion <scenario.json> [--frames N] [--every K] [--pretty]

use std::process::ExitCode;

use clap::Parser;

use danmaku_motion::{Result, Scenario};

#[derive(Parser)]
#[command(name = "danmaku-motion")]
#[command(about = "Simulate a danmaku motion scenario and print object trajectories")]
struct Args {
    /// Path to the scenario JSON file
    scenario: String,

    /// Override the number of frames to simulate
    #[arg(long)]
    frames: Option<u32>,

    /// Record every K-th frame (the first and last are always recorded)
    #[arg(long, default_value_t = 1)]
    every: u32,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn run(args: &Args) -> Result<String> {
    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(frames) = args.frames {
        scenario.frames = frames;
    }

    let trajectory = scenario.run_sampled(args.every)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&trajectory)?
    } else {
        serde_json::to_string(&trajectory)?
    };
    Ok(json)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    log::info!("Danmaku Motion starting: {}", args.scenario);

    match run(&args) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
