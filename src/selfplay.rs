//! Engine-versus-engine games.
//!
//! Plays whole games between two engine instances on a layout: each side is
//! asked for one action per movable unit, the turn ends when it has no unit
//! left to move, and a game still running at the turn limit is judged on
//! remaining HP. Records every turn for later analysis.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::board::{Action, Color, Map, ALL_COLORS};
use crate::config::SearchConfig;
use crate::engine::Engine;
use crate::protocol::{encode_layout, parse_layout, LayoutError};

/// Small open skirmish used when no layout is given.
pub const DEFAULT_LAYOUT: &str = "\
limit 20
draw 5
row ........
row ..f..^..
row ...==...
row .^..f...
row ........
row ...ff...
unit red panzer 1 1
unit red infantry 2 2
unit red cannon 1 3
unit red fighter 1 5
unit blue panzer 8 6
unit blue infantry 7 5
unit blue cannon 8 4
unit blue antiair 7 3
";

/// Errors that stop a self-play run before any game is played.
#[derive(Debug, thiserror::Error)]
pub enum SelfPlayError {
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for a batch of self-play games.
#[derive(Clone)]
pub struct SelfPlayConfig {
    /// Number of games to play.
    pub num_games: usize,
    /// Search settings shared by both sides. Each engine gets its own seed.
    pub search: SearchConfig,
    /// Layout text every game starts from.
    pub layout: String,
    /// Number of parallel threads for concurrent games.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Suppress per-game progress output.
    pub quiet: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_games: 10,
            search: SearchConfig {
                turn_time_ms: 1000,
                ..SearchConfig::default()
            },
            layout: DEFAULT_LAYOUT.to_string(),
            threads: 4,
            seed: 0,
            quiet: false,
        }
    }
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// One side lost every unit.
    Annihilation,
    /// One side surrendered.
    Surrender,
    /// The turn limit was reached and remaining HP decided.
    Judgement,
}

/// One color's full turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub color: Color,
    pub actions: Vec<Action>,
    /// Total HP per color after the turn, red first.
    pub hp: [u32; 2],
}

/// A complete self-play game record.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub winner: Option<Color>,
    pub outcome: Outcome,
    pub turns: u32,
    /// Engine calls made over the whole game.
    pub decisions: u64,
    /// Total search iterations over the whole game.
    pub iterations: u64,
    /// Final total HP per color, red first.
    pub final_hp: [u32; 2],
    /// Final map in layout form.
    pub final_layout: String,
    pub history: Vec<TurnRecord>,
}

fn hp_pair(map: &Map) -> [u32; 2] {
    [map.total_hp(Color::Red), map.total_hp(Color::Blue)]
}

/// Plays one game from `start` to completion.
pub fn play_game(config: &SelfPlayConfig, start: &Map, game_id: usize, rng: &mut SmallRng) -> GameRecord {
    let mut engines = ALL_COLORS.map(|_| {
        Engine::new(SearchConfig {
            seed: Some(rng.gen()),
            ..config.search.clone()
        })
    });
    let mut map = start.clone();
    let mut history = Vec::new();
    let mut decisions = 0u64;
    let mut iterations = 0u64;
    let mut surrendered = None;

    'game: while !map.is_terminal() {
        for color in ALL_COLORS {
            if map.is_terminal() {
                break 'game;
            }
            let engine = &mut engines[color.index()];
            let turn = map.turn_count();
            let mut actions = Vec::new();
            let mut turn_start = true;

            while map.movable_count(color) > 0 && !map.is_terminal() {
                let game_start = turn_start && turn <= 1;
                let action = engine.decide_action(&map, color, turn_start, game_start);
                turn_start = false;
                decisions += 1;
                iterations += engine.last_stats().iterations;

                match action {
                    Action::EndTurn { .. } => {
                        map.finish_units(color);
                    }
                    Action::Surrender { .. } => {
                        surrendered = Some(color);
                        actions.push(action);
                        break 'game;
                    }
                    _ => {
                        if let Err(e) = map.apply_action(&action) {
                            log::error!("game {game_id}: {color} played illegal {action}: {e}");
                            map.finish_units(color);
                        }
                    }
                }
                actions.push(action);
            }

            map.end_turn();
            history.push(TurnRecord {
                turn,
                color,
                actions,
                hp: hp_pair(&map),
            });
        }
    }

    let (winner, outcome) = if let Some(loser) = surrendered {
        (Some(loser.opponent()), Outcome::Surrender)
    } else if map.alive_count(Color::Red) == 0 || map.alive_count(Color::Blue) == 0 {
        let winner = ALL_COLORS.into_iter().find(|&c| map.alive_count(c) > 0);
        (winner, Outcome::Annihilation)
    } else {
        (map.winner_by_hp(), Outcome::Judgement)
    };

    GameRecord {
        game_id,
        winner,
        outcome,
        turns: map.turn_count() - start.turn_count(),
        decisions,
        iterations,
        final_hp: hp_pair(&map),
        final_layout: encode_layout(&map),
        history,
    }
}

fn game_rng(seed: u64, game_id: usize) -> SmallRng {
    if seed != 0 {
        SmallRng::seed_from_u64(seed.wrapping_add(game_id as u64))
    } else {
        SmallRng::from_entropy()
    }
}

fn report(game: &GameRecord, done: usize, total: usize, secs: f64) {
    let outcome = match game.winner {
        Some(w) => format!("{w} wins"),
        None => "draw".to_string(),
    };
    eprintln!(
        "Game {}/{}: {} by {:?} after {} turns ({:.1}s)",
        done, total, outcome, game.outcome, game.turns, secs
    );
}

/// Runs self-play generation, producing multiple game records.
///
/// When `config.threads > 1`, games are played concurrently using rayon.
pub fn run_self_play(config: &SelfPlayConfig) -> Result<Vec<GameRecord>, SelfPlayError> {
    let mut games = Vec::with_capacity(config.num_games);
    run_self_play_with_callback(config, |game| games.push(game))?;
    games.sort_by_key(|g| g.game_id);
    Ok(games)
}

/// Runs self-play generation, calling `on_game` with each completed game
/// record as soon as it finishes.
pub fn run_self_play_with_callback<F>(config: &SelfPlayConfig, on_game: F) -> Result<(), SelfPlayError>
where
    F: FnMut(GameRecord) + Send,
{
    let start = parse_layout(&config.layout)?;
    if config.threads > 1 {
        run_self_play_parallel(config, &start, on_game)
    } else {
        run_self_play_sequential(config, &start, on_game);
        Ok(())
    }
}

fn run_self_play_sequential<F>(config: &SelfPlayConfig, start: &Map, mut on_game: F)
where
    F: FnMut(GameRecord),
{
    for i in 0..config.num_games {
        let game_start = Instant::now();
        let mut rng = game_rng(config.seed, i);
        let game = play_game(config, start, i, &mut rng);
        if !config.quiet {
            report(&game, i + 1, config.num_games, game_start.elapsed().as_secs_f64());
        }
        on_game(game);
    }
}

/// Plays games concurrently on a dedicated rayon pool and hands finished
/// games to `on_game` on the calling thread.
fn run_self_play_parallel<F>(config: &SelfPlayConfig, start: &Map, mut on_game: F) -> Result<(), SelfPlayError>
where
    F: FnMut(GameRecord) + Send,
{
    use rayon::prelude::*;
    use std::sync::mpsc;

    let pool = rayon::ThreadPoolBuilder::new().num_threads(config.threads).build()?;
    let completed = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<GameRecord>();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            pool.install(|| {
                (0..config.num_games).into_par_iter().for_each_with(tx, |tx, i| {
                    let game_start = Instant::now();
                    let mut rng = game_rng(config.seed, i);
                    let game = play_game(config, start, i, &mut rng);
                    if !config.quiet {
                        let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        report(&game, n, config.num_games, game_start.elapsed().as_secs_f64());
                    }
                    let _ = tx.send(game);
                });
            });
        });

        for game in rx {
            on_game(game);
        }
    });
    Ok(())
}

/// Writes game records as JSONL (one JSON object per game, one per line).
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Prints win/draw counts and average game length to stderr.
pub fn print_summary(games: &[GameRecord]) {
    if games.is_empty() {
        return;
    }
    let wins = |c: Color| games.iter().filter(|g| g.winner == Some(c)).count();
    let draws = games.iter().filter(|g| g.winner.is_none()).count();
    let turns: u32 = games.iter().map(|g| g.turns).sum();
    let decisions: u64 = games.iter().map(|g| g.decisions).sum();
    let iterations: u64 = games.iter().map(|g| g.iterations).sum();

    eprintln!("--- Summary ---");
    eprintln!(
        "red {} / blue {} / draw {}",
        wins(Color::Red),
        wins(Color::Blue),
        draws
    );
    eprintln!("Average turns: {:.1}", turns as f64 / games.len() as f64);
    if decisions > 0 {
        eprintln!("Average iterations per decision: {:.1}", iterations as f64 / decisions as f64);
    }
}
