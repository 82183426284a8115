//! Self-play CLI.
//!
//! Plays TBETS engines against each other and writes game records as JSONL.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --games N         Number of games to play (default: 10)
//!   --turn-time MS    Time bank per turn in ms (default: 1000)
//!   --iterations N    Iteration cap per decision (default: none)
//!   --layout FILE     Layout file to start from (default: built-in skirmish)
//!   --config FILE     Search config JSON
//!   --set NAME=VALUE  Override one search option (repeatable)
//!   --threads N       Number of parallel threads (default: 4)
//!   --seed N          Random seed, 0 for entropy (default: 0)
//!   --output FILE     Output file path (default: stdout)
//!   --quiet           Suppress progress and summary output
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use tbets::config::SearchConfig;
use tbets::logging::setup_logging;
use tbets::selfplay::{self, SelfPlayConfig};

fn fail(message: String) -> ! {
    eprintln!("{message}");
    print_usage();
    process::exit(1);
}

fn next_value<T: FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    *i += 1;
    let Some(raw) = args.get(*i) else {
        fail(format!("missing value for {flag}"));
    };
    raw.parse()
        .unwrap_or_else(|_| fail(format!("invalid {flag} value '{raw}'")))
}

fn main() {
    let _logger = match setup_logging() {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };

    let args: Vec<String> = env::args().collect();
    let mut config = SelfPlayConfig::default();
    let mut output_path: Option<String> = None;
    let mut overrides: Vec<String> = Vec::new();
    let mut turn_time: Option<u64> = None;
    let mut iterations: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => config.num_games = next_value(&args, &mut i, "--games"),
            "--turn-time" => turn_time = Some(next_value(&args, &mut i, "--turn-time")),
            "--iterations" => iterations = Some(next_value(&args, &mut i, "--iterations")),
            "--threads" => config.threads = next_value(&args, &mut i, "--threads"),
            "--seed" => config.seed = next_value(&args, &mut i, "--seed"),
            "--layout" => {
                let path: String = next_value(&args, &mut i, "--layout");
                config.layout = fs::read_to_string(&path)
                    .unwrap_or_else(|e| fail(format!("cannot read layout {path}: {e}")));
            }
            "--config" => {
                let path: String = next_value(&args, &mut i, "--config");
                config.search = SearchConfig::from_path(&path)
                    .unwrap_or_else(|e| fail(format!("cannot load config {path}: {e}")));
            }
            "--set" => overrides.push(next_value(&args, &mut i, "--set")),
            "--output" => output_path = Some(next_value(&args, &mut i, "--output")),
            "--quiet" => config.quiet = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => fail(format!("Unknown argument: {other}")),
        }
        i += 1;
    }

    if let Some(ms) = turn_time {
        config.search.turn_time_ms = ms;
    }
    if iterations.is_some() {
        config.search.max_iterations = iterations;
    }
    for pair in &overrides {
        let Some((name, value)) = pair.split_once('=') else {
            fail(format!("--set expects NAME=VALUE, got '{pair}'"));
        };
        if let Err(e) = config.search.set_option(name, value) {
            fail(format!("--set {pair}: {e}"));
        }
    }

    if !config.quiet {
        eprintln!(
            "Self-play: {} games, {}ms/turn, {} threads",
            config.num_games, config.search.turn_time_ms, config.threads
        );
    }

    let start = Instant::now();
    let games = match selfplay::run_self_play(&config) {
        Ok(games) => games,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !config.quiet {
        eprintln!(
            "Completed {} games in {:.1}s",
            games.len(),
            elapsed.as_secs_f64()
        );
        selfplay::print_summary(&games);
    }

    let written = match &output_path {
        Some(path) => File::create(path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            selfplay::write_jsonl(&games, &mut writer)
        }),
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&games, &mut writer)
        }
    };
    match (written, output_path) {
        (Err(e), _) => {
            log::error!("failed to write output: {e}");
            process::exit(1);
        }
        (Ok(()), Some(path)) if !config.quiet => eprintln!("Wrote {} games to {}", games.len(), path),
        (Ok(()), _) => {}
    }
}

fn print_usage() {
    eprintln!("Usage: selfplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N         Number of games to play (default: 10)");
    eprintln!("  --turn-time MS    Time bank per turn in ms (default: 1000)");
    eprintln!("  --iterations N    Iteration cap per decision (default: none)");
    eprintln!("  --layout FILE     Layout file to start from (default: built-in skirmish)");
    eprintln!("  --config FILE     Search config JSON");
    eprintln!("  --set NAME=VALUE  Override one search option (repeatable)");
    eprintln!("  --threads N       Number of parallel threads (default: 4)");
    eprintln!("  --seed N          Random seed, 0 for entropy (default: 0)");
    eprintln!("  --output FILE     Output file path (default: stdout)");
    eprintln!("  --quiet           Suppress progress and summary output");
    eprintln!("  --help            Show this help");
}
