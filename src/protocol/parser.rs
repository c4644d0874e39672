//! Protocol command parser.
//!
//! Parses incoming protocol lines into structured `Command` variants that the
//! engine main loop can dispatch on.

use tracing::warn;

/// Search constraints passed with the `go` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    /// Overrides the `Iterations` option for this search only.
    pub iterations: Option<u32>,
    pub seed: Option<u64>,
}

/// A parsed client-to-engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Protocol handshake.
    Skirmish,

    /// Synchronization ping; engine must reply `readyok`.
    IsReady,

    /// Set an engine option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Reset the live state to the scenario's opening position.
    NewGame,

    /// Load a scenario file: `scenario <path>`.
    Scenario { path: String },

    /// Search the current mob's activation.
    Go(GoParams),

    /// Commit actions to the live state: `play <a> ; <b>`.
    Play { raw: String },

    /// Print a one-line state summary.
    State,

    /// Terminate the engine process.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging a warning.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let first = *tokens.first()?;

    match first {
        "skirmish" => Some(Command::Skirmish),
        "isready" => Some(Command::IsReady),
        "quit" => Some(Command::Quit),
        "newgame" => Some(Command::NewGame),
        "state" => Some(Command::State),

        "setoption" => parse_setoption(&tokens),
        "scenario" => parse_scenario(trimmed),
        "go" => parse_go(&tokens),
        "play" => parse_play(trimmed),

        other => {
            warn!(command = other, "unknown command");
            None
        }
    }
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        warn!("malformed setoption: expected 'setoption name <id> [value <x>]'");
        return None;
    }

    let value_idx = tokens.iter().position(|&t| t == "value");

    let (name, value) = match value_idx {
        Some(vi) => {
            let name_parts = &tokens[2..vi];
            let value_parts = &tokens[vi + 1..];
            if name_parts.is_empty() {
                warn!("malformed setoption: empty name");
                return None;
            }
            let value = (!value_parts.is_empty()).then(|| value_parts.join(" "));
            (name_parts.join(" "), value)
        }
        None => (tokens[2..].join(" "), None),
    };

    Some(Command::SetOption { name, value })
}

/// Parses `scenario <path>`. The path may contain spaces.
fn parse_scenario(line: &str) -> Option<Command> {
    let path = rest_after(line, "scenario");
    if path.is_empty() {
        warn!("malformed scenario: expected 'scenario <path>'");
        return None;
    }
    Some(Command::Scenario {
        path: path.to_string(),
    })
}

/// Parses `go [iterations <n>] [seed <n>]`.
fn parse_go(tokens: &[&str]) -> Option<Command> {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "iterations" => {
                i += 1;
                match tokens.get(i).map(|t| t.parse::<u32>()) {
                    Some(Ok(v)) => params.iterations = Some(v),
                    _ => warn!(value = tokens.get(i).copied(), "invalid iterations value"),
                }
            }
            "seed" => {
                i += 1;
                match tokens.get(i).map(|t| t.parse::<u64>()) {
                    Some(Ok(v)) => params.seed = Some(v),
                    _ => warn!(value = tokens.get(i).copied(), "invalid seed value"),
                }
            }
            other => warn!(param = other, "unknown go parameter"),
        }
        i += 1;
    }

    Some(Command::Go(params))
}

/// Parses `play <actions>`, capturing everything after `play` as raw text.
fn parse_play(line: &str) -> Option<Command> {
    let raw = rest_after(line, "play");
    if raw.is_empty() {
        warn!("malformed play: expected 'play <action> [; <action> ...]'");
        return None;
    }
    Some(Command::Play {
        raw: raw.to_string(),
    })
}

fn rest_after<'a>(line: &'a str, keyword: &str) -> &'a str {
    line.trim().strip_prefix(keyword).unwrap_or("").trim()
}
