//! Engine state management.
//!
//! Holds the loaded scenario, the live combat state, engine options and the
//! recent action history, and runs the UCT search for the `go` command.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::board::{CombatState, GameContext};
use crate::controller::rng_from_seed;
use crate::game::{commit_action, History, MatchObserver};
use crate::protocol::{format_actions, parse_actions, GoParams};
use crate::resolve::DefenseMode;
use crate::scenario::{Scenario, ScenarioError};
use crate::search::{uct_search, RolloutPolicy, SearchConfig};

/// Name accepted by `scenario` for the built-in demo.
pub const DEMO_SCENARIO: &str = "demo";

/// A loaded scenario: its setup, opening state and live state.
struct Session {
    name: String,
    ctx: GameContext,
    opening: CombatState,
    state: CombatState,
}

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    session: Option<Session>,
    pub options: HashMap<String, String>,
    history: History,
    rng: SmallRng,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with no scenario loaded.
    pub fn new() -> Self {
        Engine {
            session: None,
            options: HashMap::new(),
            history: History::default(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// The live state, if a scenario is loaded.
    pub fn state(&self) -> Option<&CombatState> {
        self.session.as_ref().map(|s| &s.state)
    }

    pub fn context(&self) -> Option<&GameContext> {
        self.session.as_ref().map(|s| &s.ctx)
    }

    /// Loads a scenario file, or the built-in demo for `demo`.
    pub fn load_scenario(&mut self, path: &str) -> Result<(), ScenarioError> {
        let scenario = if path == DEMO_SCENARIO {
            Scenario::demo()
        } else {
            Scenario::load(path)?
        };
        let (ctx, opening) = scenario.build()?;
        info!(name = %scenario.name, mobs = ctx.roster.mobs.len(), "scenario ready");
        self.session = Some(Session {
            name: scenario.name,
            ctx,
            state: opening.clone(),
            opening,
        });
        self.history.clear();
        Ok(())
    }

    /// Resets the live state to the scenario's opening position.
    pub fn new_game(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.state = session.opening.clone();
            debug!(name = %session.name, "new game");
        }
        self.history.clear();
    }

    /// Sets an engine option. Options that affect engine state directly
    /// (seed, history length) take effect immediately.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        let value = value.unwrap_or_default();
        match name.as_str() {
            "Seed" => match value.parse::<u64>() {
                Ok(seed) => self.rng = rng_from_seed(seed),
                Err(_) => warn!(value = %value, "invalid Seed"),
            },
            "HistoryLength" => match value.parse::<usize>() {
                Ok(len) => self.history.set_capacity(len),
                Err(_) => warn!(value = %value, "invalid HistoryLength"),
            },
            _ => {}
        }
        self.options.insert(name, value);
    }

    fn option<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        let raw = self.options.get(name)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(option = name, value = %raw, "ignoring unparsable option");
                None
            }
        }
    }

    /// A boolean option; a bare `setoption name X` means true.
    fn flag(&self, name: &str) -> Option<bool> {
        match self.options.get(name)?.to_ascii_lowercase().as_str() {
            "" | "true" | "on" | "1" => Some(true),
            "false" | "off" | "0" => Some(false),
            other => {
                warn!(option = name, value = other, "ignoring non-boolean option");
                None
            }
        }
    }

    /// The search configuration implied by the current options.
    pub fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::default();
        if let Some(n) = self.option("Iterations") {
            config = config.with_iterations(n);
        }
        if let Some(c) = self.option("Exploration") {
            config = config.with_exploration(c);
        }
        if let Some(cap) = self.option("RolloutPlyCap") {
            config = config.with_rollout_ply_cap(cap);
        }
        if let Some(seed) = self.option("Seed") {
            config = config.with_seed(seed);
        }
        if let Some(p) = self
            .options
            .get("RolloutPolicy")
            .and_then(|v| RolloutPolicy::from_name(v))
        {
            config = config.with_rollout_policy(p);
        }
        if let Some(d) = self
            .options
            .get("DefenseMode")
            .and_then(|v| DefenseMode::from_name(v))
        {
            config = config.with_defense(d);
        }
        let mut generator = config.generator;
        if let Some(on) = self.flag("LastResortEndTurn") {
            generator = generator.with_last_resort_end_turn(on);
        }
        if let Some(on) = self.flag("AlwaysAttackMove") {
            generator = generator.with_always_attack_move(on);
        }
        config.with_generator(generator)
    }

    /// Handles the protocol handshake: writes id, options, and skirmishok.
    pub fn handle_skirmish<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "id name skirmish {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "id author skirmish developers")?;
        writeln!(out, "option name Iterations type spin default 1000 min 1 max 10000000")?;
        writeln!(out, "option name Seed type spin default 0 min 0")?;
        writeln!(out, "option name Exploration type string default 2.0")?;
        writeln!(out, "option name RolloutPlyCap type spin default 100 min 1 max 100000")?;
        writeln!(
            out,
            "option name RolloutPolicy type combo default deterministic var deterministic var weighted"
        )?;
        writeln!(
            out,
            "option name DefenseMode type combo default pass var pass var block var lethal"
        )?;
        writeln!(out, "option name LastResortEndTurn type check default false")?;
        writeln!(out, "option name AlwaysAttackMove type check default false")?;
        writeln!(out, "option name HistoryLength type spin default 16 min 0 max 1024")?;
        writeln!(out, "skirmishok")?;
        out.flush()
    }

    /// Handles the `isready` command.
    pub fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "readyok")?;
        out.flush()
    }

    /// Handles `scenario <path>`, reporting failures as an `error` line.
    pub fn handle_scenario<W: Write>(&mut self, path: &str, out: &mut W) -> io::Result<()> {
        if let Err(e) = self.load_scenario(path) {
            warn!(path, error = %e, "scenario rejected");
            writeln!(out, "error {}", e)?;
            out.flush()?;
        }
        Ok(())
    }

    /// Handles the `go` command: searches the current mob's activation and
    /// writes an `info` line followed by `bestactions`.
    pub fn handle_go<W: Write>(&mut self, params: &GoParams, out: &mut W) -> io::Result<()> {
        let mut config = self.search_config();
        if let Some(n) = params.iterations {
            config = config.with_iterations(n);
        }
        let mut seeded = params.seed.map(rng_from_seed);
        let session = match &self.session {
            Some(s) => s,
            None => {
                writeln!(out, "error no scenario loaded")?;
                writeln!(out, "bestactions -")?;
                return out.flush();
            }
        };

        let rng = seeded.as_mut().unwrap_or(&mut self.rng);
        let start = Instant::now();
        match uct_search(&session.ctx, &session.state, &config, rng) {
            Ok(result) => {
                let stats = result.stats;
                writeln!(
                    out,
                    "info iterations {} nodes {} depth {} score {:.3} time {}",
                    stats.iterations,
                    stats.nodes,
                    stats.max_depth,
                    result.score,
                    start.elapsed().as_millis()
                )?;
                writeln!(out, "bestactions {}", format_actions(&result.actions))?;
            }
            Err(e) => {
                writeln!(out, "error {}", e)?;
                writeln!(out, "bestactions -")?;
            }
        }
        out.flush()
    }

    /// Handles `play <actions>`: commits each action to the live state.
    ///
    /// Stops at the first illegal action and reports it with the most
    /// recently committed actions. Actions before it stay committed.
    pub fn handle_play<W: Write>(&mut self, raw: &str, out: &mut W) -> io::Result<()> {
        let actions = match parse_actions(raw) {
            Ok(a) => a,
            Err(e) => {
                writeln!(out, "error {}", e)?;
                return out.flush();
            }
        };
        let defense = self.search_config().defense;
        let session = match self.session.as_mut() {
            Some(s) => s,
            None => {
                writeln!(out, "error no scenario loaded")?;
                return out.flush();
            }
        };

        let mut observers: [Box<dyn MatchObserver>; 0] = [];
        for action in actions {
            match commit_action(&session.ctx, &mut session.state, action, &defense, &mut observers) {
                Ok(_) => self.history.push(action),
                Err(e) => {
                    writeln!(out, "error {}", e)?;
                    writeln!(out, "recent {}", format_actions(&self.history.recent()))?;
                    break;
                }
            }
        }
        out.flush()
    }

    /// Handles `state`: a one-line summary of the live state.
    pub fn handle_state<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match &self.session {
            Some(s) => {
                let winner = match s.state.winner() {
                    Some(team) => team.name(),
                    None if s.state.is_finished() => "draw",
                    None => "-",
                };
                writeln!(out, "state {} winner {}", s.state.summary(&s.ctx.roster), winner)?;
            }
            None => writeln!(out, "error no scenario loaded")?,
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Action, Hex};

    fn output(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn demo_engine() -> Engine {
        let mut engine = Engine::new();
        engine.load_scenario(DEMO_SCENARIO).unwrap();
        engine.set_option("Iterations".to_string(), Some("150".to_string()));
        engine.set_option("Seed".to_string(), Some("7".to_string()));
        engine
    }

    #[test]
    fn new_engine_has_no_state() {
        let engine = Engine::new();
        assert!(engine.state().is_none());
        assert!(engine.options.is_empty());
    }

    #[test]
    fn handshake_lists_options() {
        let engine = Engine::new();
        let text = output(|o| engine.handle_skirmish(o));
        assert!(text.starts_with("id name skirmish"));
        assert!(text.contains("option name Iterations"));
        assert!(text.contains("option name DefenseMode"));
        assert_eq!(text.lines().last(), Some("skirmishok"));
    }

    #[test]
    fn isready_outputs_readyok() {
        let engine = Engine::new();
        assert_eq!(output(|o| engine.handle_isready(o)).trim(), "readyok");
    }

    #[test]
    fn options_shape_search_config() {
        let mut engine = Engine::new();
        engine.set_option("Iterations".to_string(), Some("42".to_string()));
        engine.set_option("Exploration".to_string(), Some("1.5".to_string()));
        engine.set_option("RolloutPolicy".to_string(), Some("weighted".to_string()));
        engine.set_option("DefenseMode".to_string(), Some("lethal".to_string()));
        engine.set_option("LastResortEndTurn".to_string(), None);
        engine.set_option("RolloutPlyCap".to_string(), Some("nope".to_string()));
        let config = engine.search_config();
        assert_eq!(config.iterations, 42);
        assert_eq!(config.exploration, 1.5);
        assert_eq!(config.rollout_policy, RolloutPolicy::Weighted);
        assert_eq!(config.defense, DefenseMode::BlockLethal);
        assert!(config.generator.last_resort_end_turn);
        assert!(!config.generator.always_attack_move);
        assert_eq!(config.rollout_ply_cap, SearchConfig::default().rollout_ply_cap);
    }

    #[test]
    fn go_without_scenario_reports_error() {
        let mut engine = Engine::new();
        let text = output(|o| engine.handle_go(&GoParams::default(), o));
        assert!(text.starts_with("error no scenario loaded"));
        assert!(text.contains("bestactions -"));
    }

    #[test]
    fn go_outputs_info_and_bestactions() {
        let mut engine = demo_engine();
        let text = output(|o| engine.handle_go(&GoParams::default(), o));
        let info = text.lines().find(|l| l.starts_with("info ")).unwrap();
        assert!(info.contains("iterations 150"));
        let best = text.lines().find(|l| l.starts_with("bestactions ")).unwrap();
        let actions = parse_actions(best.strip_prefix("bestactions ").unwrap()).unwrap();
        assert!(!actions.contains(&Action::EndTurn));
    }

    #[test]
    fn searched_actions_can_be_played() {
        let mut engine = demo_engine();
        let text = output(|o| engine.handle_go(&GoParams { iterations: Some(80), seed: Some(3) }, o));
        let best = text.lines().find(|l| l.starts_with("bestactions ")).unwrap();
        let mut raw = best.strip_prefix("bestactions ").unwrap().to_string();
        raw = if raw == "-" { "end".to_string() } else { format!("{raw} ; end") };
        let before = engine.state().unwrap().current_mob();
        let played = output(|o| engine.handle_play(&raw, o));
        assert!(played.is_empty(), "{played}");
        assert_ne!(engine.state().unwrap().current_mob(), before);
    }

    #[test]
    fn illegal_play_reports_recent_actions() {
        let mut engine = demo_engine();
        let current = engine.state().unwrap().current_mob().unwrap();
        // Mob 1 initiative 1 acts first in the demo.
        assert_eq!(current, 1);
        let text = output(|o| engine.handle_play("end ; move 1 -2,2", o));
        let mut lines = text.lines();
        let error = lines.next().unwrap();
        assert!(error.starts_with("error illegal action `move 1 -2,2`"), "{error}");
        assert_eq!(lines.next(), Some("recent end"));
        assert_ne!(engine.state().unwrap().current_mob(), Some(1));
    }

    #[test]
    fn far_off_map_coordinates_are_rejected() {
        let mut engine = demo_engine();
        for raw in [
            "move 1 2000000000,2000000000",
            "dmove 1 -2147483648,-2147483648",
            "amove 1 2147483647,-2147483648 1 2",
        ] {
            let text = output(|o| engine.handle_play(raw, o));
            let mut lines = text.lines();
            let error = lines.next().unwrap();
            assert!(error.starts_with(&format!("error illegal action `{raw}`")), "{error}");
            assert!(error.contains("off the map"), "{error}");
            assert_eq!(lines.next(), Some("recent -"));
        }
        assert_eq!(engine.state().unwrap(), &engine.session.as_ref().unwrap().opening);
    }

    #[test]
    fn malformed_play_commits_nothing() {
        let mut engine = demo_engine();
        let text = output(|o| engine.handle_play("end ; fly 1", o));
        assert!(text.starts_with("error unknown action 'fly'"));
        assert_eq!(engine.state().unwrap().current_mob(), Some(1));
    }

    #[test]
    fn new_game_restores_opening() {
        let mut engine = demo_engine();
        output(|o| engine.handle_play("move 1 -2,2 ; end", o));
        assert_eq!(engine.state().unwrap().mob(1).coord, Hex::new(-2, 2));
        engine.new_game();
        assert_eq!(engine.state().unwrap().mob(1).coord, Hex::new(-3, 2));
        assert_eq!(engine.state().unwrap().current_mob(), Some(1));
    }

    #[test]
    fn state_line_summarizes() {
        let engine = demo_engine();
        let text = output(|o| engine.handle_state(o));
        assert_eq!(text.trim(), "state turn 1 mob 1 (red) red 17 blue 17 winner -");
    }

    #[test]
    fn bad_scenario_path_reports_error() {
        let mut engine = Engine::new();
        let text = output(|o| engine.handle_scenario("/nonexistent/x.json", o));
        assert!(text.starts_with("error cannot read scenario"));
        assert!(engine.state().is_none());
    }
}
