//! Skirmish -- a turn-based hex combat engine speaking a line protocol.
//!
//! This binary reads commands from stdin and writes responses to stdout.
//! Logs go to stderr; set `RUST_LOG` to see them.

use std::io::{self, BufRead};

use tracing_subscriber::EnvFilter;

use skirmish::engine::Engine;
use skirmish::protocol::parser::{parse_command, Command};

/// Runs the main protocol loop, reading commands from stdin and writing
/// responses to stdout.
fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut engine = Engine::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        match cmd {
            Command::Skirmish => engine.handle_skirmish(&mut out)?,
            Command::IsReady => engine.handle_isready(&mut out)?,
            Command::SetOption { name, value } => engine.set_option(name, value),
            Command::NewGame => engine.new_game(),
            Command::Scenario { path } => engine.handle_scenario(&path, &mut out)?,
            Command::Go(params) => engine.handle_go(&params, &mut out)?,
            Command::Play { raw } => engine.handle_play(&raw, &mut out)?,
            Command::State => engine.handle_state(&mut out)?,
            Command::Quit => break,
        }
    }
    Ok(())
}
