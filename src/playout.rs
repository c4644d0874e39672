//! Full-game playouts between two controller kinds.
//!
//! Each game owns its own state and controllers and plays from the
//! scenario's opening position. Games run sequentially or in parallel on a
//! rayon pool; results stream back through a channel in completion order.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::board::{CombatState, GameContext, Team};
use crate::controller::ControllerKind;
use crate::game::{Match, MatchOutcome};
use crate::search::SearchConfig;

#[derive(Debug, Error)]
pub enum PlayoutError {
    #[error("cannot build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for a batch of playouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayoutConfig {
    /// Number of games to play.
    pub games: usize,
    /// Worker threads; 1 plays on the calling thread.
    pub threads: usize,
    /// Base seed; game `i` uses `seed + i`. Zero draws every seed from entropy.
    pub seed: u64,
    /// Full turns before a game is stopped as undecided.
    pub max_turns: u32,
    pub red: ControllerKind,
    pub blue: ControllerKind,
    pub search: SearchConfig,
    /// Suppress per-game progress logging.
    pub quiet: bool,
}

impl Default for PlayoutConfig {
    fn default() -> Self {
        PlayoutConfig {
            games: 10,
            threads: 4,
            seed: 0,
            max_turns: 100,
            red: ControllerKind::Uct,
            blue: ControllerKind::RuleBased,
            search: SearchConfig::default(),
            quiet: false,
        }
    }
}

/// One finished playout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub game_id: usize,
    pub seed: u64,
    pub red: ControllerKind,
    pub blue: ControllerKind,
    /// Missing when a controller produced an illegal first action.
    pub outcome: Option<MatchOutcome>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl MatchRecord {
    pub fn winner(&self) -> Option<Team> {
        self.outcome.and_then(|o| o.winner)
    }
}

fn game_seed(config: &PlayoutConfig, game_id: usize) -> u64 {
    if config.seed == 0 {
        0
    } else {
        config.seed.wrapping_add(game_id as u64)
    }
}

/// Plays one game from `opening`.
pub fn play_game(
    ctx: &GameContext,
    opening: &CombatState,
    config: &PlayoutConfig,
    game_id: usize,
) -> MatchRecord {
    let seed = game_seed(config, game_id);
    // Distinct non-zero streams for the two sides; zero stays entropy.
    let blue_seed = if seed == 0 { 0 } else { seed.rotate_left(32) | 1 };
    let red = config.red.build(&config.search, seed);
    let blue = config.blue.build(&config.search, blue_seed);

    let start = Instant::now();
    let mut game = Match::new(ctx.clone(), red, blue).with_state(opening.clone());
    let (outcome, error) = match game.run(config.max_turns) {
        Ok(outcome) => (Some(outcome), None),
        Err(e) => {
            warn!(game_id, error = %e, "playout aborted");
            (None, Some(e.to_string()))
        }
    };

    MatchRecord {
        game_id,
        seed,
        red: config.red,
        blue: config.blue,
        outcome,
        error,
        elapsed_ms: start.elapsed().as_millis() as u64,
    }
}

/// Plays every game and collects the records, in completion order.
pub fn run_playouts(
    ctx: &GameContext,
    opening: &CombatState,
    config: &PlayoutConfig,
) -> Result<Vec<MatchRecord>, PlayoutError> {
    let mut records = Vec::with_capacity(config.games);
    run_playouts_with_callback(ctx, opening, config, |r| records.push(r))?;
    Ok(records)
}

/// Plays every game, handing each record to `on_game` as it finishes.
pub fn run_playouts_with_callback<F>(
    ctx: &GameContext,
    opening: &CombatState,
    config: &PlayoutConfig,
    on_game: F,
) -> Result<(), PlayoutError>
where
    F: FnMut(MatchRecord) + Send,
{
    if config.threads > 1 {
        run_parallel(ctx, opening, config, on_game)
    } else {
        run_sequential(ctx, opening, config, on_game);
        Ok(())
    }
}

fn log_progress(record: &MatchRecord, done: usize, total: usize) {
    let result = match (&record.outcome, record.winner()) {
        (None, _) => "aborted",
        (Some(_), Some(team)) => team.name(),
        (Some(_), None) => "draw",
    };
    info!(
        game = done,
        of = total,
        result,
        turns = record.outcome.map_or(0, |o| o.turns),
        ms = record.elapsed_ms,
        "game finished"
    );
}

fn run_sequential<F>(ctx: &GameContext, opening: &CombatState, config: &PlayoutConfig, mut on_game: F)
where
    F: FnMut(MatchRecord),
{
    for i in 0..config.games {
        let record = play_game(ctx, opening, config, i);
        if !config.quiet {
            log_progress(&record, i + 1, config.games);
        }
        on_game(record);
    }
}

fn run_parallel<F>(
    ctx: &GameContext,
    opening: &CombatState,
    config: &PlayoutConfig,
    mut on_game: F,
) -> Result<(), PlayoutError>
where
    F: FnMut(MatchRecord) + Send,
{
    use rayon::prelude::*;
    use std::sync::mpsc;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;
    let (tx, rx) = mpsc::channel::<MatchRecord>();

    let config = *config;
    let ctx = ctx.clone();
    let opening = opening.clone();
    let handle = std::thread::spawn(move || {
        let completed = AtomicUsize::new(0);
        pool.install(|| {
            (0..config.games).into_par_iter().for_each_with(tx, |tx, i| {
                let record = play_game(&ctx, &opening, &config, i);
                if !config.quiet {
                    let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    log_progress(&record, n, config.games);
                }
                let _ = tx.send(record);
            });
        });
    });

    for record in rx {
        on_game(record);
    }

    if let Err(panic) = handle.join() {
        std::panic::resume_unwind(panic);
    }
    Ok(())
}

/// Writes one JSON object per line.
pub fn write_jsonl<W: Write>(records: &[MatchRecord], out: &mut W) -> std::io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Win/draw counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub games: usize,
    pub red_wins: usize,
    pub blue_wins: usize,
    pub draws: usize,
    pub aborted: usize,
    pub avg_turns: f64,
}

pub fn summarize(records: &[MatchRecord]) -> Summary {
    let mut s = Summary {
        games: records.len(),
        ..Summary::default()
    };
    let mut turns = 0u64;
    for record in records {
        match record.outcome {
            None => s.aborted += 1,
            Some(o) => {
                turns += o.turns as u64;
                match o.winner {
                    Some(Team::Red) => s.red_wins += 1,
                    Some(Team::Blue) => s.blue_wins += 1,
                    None => s.draws += 1,
                }
            }
        }
    }
    let finished = s.games - s.aborted;
    s.avg_turns = turns as f64 / finished.max(1) as f64;
    s
}

/// Logs a summary of a batch at info level.
pub fn print_summary(records: &[MatchRecord]) {
    let s = summarize(records);
    let pct = |n: usize| (1000.0 * n as f64 / s.games.max(1) as f64).round() / 10.0;
    info!(
        games = s.games,
        red_wins = s.red_wins,
        red_pct = pct(s.red_wins),
        blue_wins = s.blue_wins,
        blue_pct = pct(s.blue_wins),
        draws = s.draws,
        aborted = s.aborted,
        avg_turns = (s.avg_turns * 10.0).round() / 10.0,
        "playout summary"
    );
}
