//! Playout CLI.
//!
//! Plays full games between two controller kinds on a scenario and writes
//! one JSON record per game.
//!
//! Usage:
//!   cargo run --release --bin playout -- [OPTIONS]
//!
//! Options:
//!   --scenario FILE   Scenario JSON file, or `demo` (default: demo)
//!   --games N         Number of games to play (default: 10)
//!   --threads N       Number of parallel threads (default: 4)
//!   --seed N          Random seed, 0 for entropy (default: 0)
//!   --max-turns N     Turn limit per game (default: 100)
//!   --red KIND        Red controller: uct, rules, random (default: uct)
//!   --blue KIND       Blue controller (default: rules)
//!   --iterations N    UCT iterations per decision (default: 1000)
//!   --defense MODE    pass, block, lethal (default: pass)
//!   --output FILE     Output file path (default: stdout)
//!   --quiet           Suppress per-game progress

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skirmish::controller::ControllerKind;
use skirmish::playout::{self, PlayoutConfig};
use skirmish::resolve::DefenseMode;
use skirmish::scenario::Scenario;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = PlayoutConfig::default();
    let mut scenario_path = "demo".to_string();
    let mut output_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--scenario" => scenario_path = value(&args, &mut i, flag),
            "--games" => config.games = parsed(&args, &mut i, flag),
            "--threads" => config.threads = parsed(&args, &mut i, flag),
            "--seed" => config.seed = parsed(&args, &mut i, flag),
            "--max-turns" => config.max_turns = parsed(&args, &mut i, flag),
            "--iterations" => config.search.iterations = parsed(&args, &mut i, flag),
            "--red" => config.red = controller(&value(&args, &mut i, flag)),
            "--blue" => config.blue = controller(&value(&args, &mut i, flag)),
            "--defense" => {
                let name = value(&args, &mut i, flag);
                config.search.defense = DefenseMode::from_name(&name)
                    .unwrap_or_else(|| fail(&format!("unknown defense mode: {}", name)));
            }
            "--output" => output_path = Some(value(&args, &mut i, flag)),
            "--quiet" => config.quiet = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => fail(&format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    config.search.seed = config.seed;

    let scenario = if scenario_path == "demo" {
        Scenario::demo()
    } else {
        Scenario::load(&scenario_path).unwrap_or_else(|e| fail(&e.to_string()))
    };
    let (ctx, opening) = scenario.build().unwrap_or_else(|e| fail(&e.to_string()));

    info!(
        scenario = %scenario.name,
        games = config.games,
        threads = config.threads,
        red = ?config.red,
        blue = ?config.blue,
        iterations = config.search.iterations,
        "starting playouts"
    );

    let start = Instant::now();
    let records = playout::run_playouts(&ctx, &opening, &config).unwrap_or_else(|e| fail(&e.to_string()));
    let elapsed = start.elapsed().as_secs_f64();
    info!(
        games = records.len(),
        secs = (elapsed * 10.0).round() / 10.0,
        "playouts complete"
    );
    playout::print_summary(&records);

    let written = match &output_path {
        Some(path) => File::create(path)
            .and_then(|f| playout::write_jsonl(&records, &mut BufWriter::new(f))),
        None => playout::write_jsonl(&records, &mut BufWriter::new(io::stdout().lock())),
    };
    if let Err(e) = written {
        fail(&format!("failed to write output: {}", e));
    }
    if let Some(path) = output_path {
        info!(path = %path, "wrote records");
    }
}

/// The argument after `flag`, advancing the cursor.
fn value(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => fail(&format!("missing value for {}", flag)),
    }
}

fn parsed<T: FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    let raw = value(args, i, flag);
    raw.parse()
        .unwrap_or_else(|_| fail(&format!("invalid {} value: {}", flag, raw)))
}

fn controller(name: &str) -> ControllerKind {
    ControllerKind::from_name(name).unwrap_or_else(|| fail(&format!("unknown controller: {}", name)))
}

fn fail(message: &str) -> ! {
    error!("{}", message);
    print_usage();
    process::exit(1);
}

fn print_usage() {
    eprintln!("Usage: playout [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario FILE  Scenario JSON file, or `demo` (default: demo)");
    eprintln!("  --games N        Number of games to play (default: 10)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Random seed, 0 for entropy (default: 0)");
    eprintln!("  --max-turns N    Turn limit per game (default: 100)");
    eprintln!("  --red KIND       Red controller: uct, rules, random (default: uct)");
    eprintln!("  --blue KIND      Blue controller (default: rules)");
    eprintln!("  --iterations N   UCT iterations per decision (default: 1000)");
    eprintln!("  --defense MODE   pass, block, lethal (default: pass)");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress per-game progress");
    eprintln!("  --help           Show this help");
}
