//! Engine state management.
//!
//! Holds the configuration, RNG, per-turn time bank and the subtree kept
//! from the previous decision, and answers one unit-decision at a time.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::board::{Action, Color, Map};
use crate::config::{ConfigError, SearchConfig};
use crate::movegen::is_legal;
use crate::search::{
    best_root_child, exploit, iterate, new_tree, run, seed_root, Node, NodeId, SearchContext, SearchStats, Tree,
};

/// Iterations run on the throwaway tree built at game start.
const WARM_UP_ITERATIONS: usize = 2;

/// The tree from the last decision.
struct Retained {
    tree: Tree,
    /// Root child whose turn was played in full. `None` when the tree was
    /// cut down to the rest of the current turn instead.
    chosen: Option<NodeId>,
}

/// A TBETS player for one side of one game at a time.
pub struct Engine {
    config: SearchConfig,
    rng: SmallRng,
    time_left: Duration,
    retained: Option<Retained>,
    last_stats: SearchStats,
}

impl Engine {
    /// Creates an engine seeded from `config.seed`, or from entropy.
    pub fn new(config: SearchConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Engine {
            time_left: config.turn_time(),
            config,
            rng,
            retained: None,
            last_stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Sets an engine option by name. Changing the seed reseeds the RNG.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let old_seed = self.config.seed;
        self.config.set_option(name, value)?;
        if self.config.seed != old_seed {
            if let Some(seed) = self.config.seed {
                self.rng = SmallRng::seed_from_u64(seed);
            }
        }
        Ok(())
    }

    /// Drops the retained tree and refills the time bank.
    pub fn new_game(&mut self) {
        self.retained = None;
        self.time_left = self.config.turn_time();
    }

    /// Time left in the current turn's bank.
    pub fn time_left(&self) -> Duration {
        self.time_left
    }

    /// Counters from the most recent search.
    pub fn last_stats(&self) -> SearchStats {
        self.last_stats
    }

    /// Picks the next action for `color` on `state`.
    ///
    /// Called once per unit-decision. `is_turn_start` refills the turn's time
    /// bank; the bank is split evenly over the units still to move.
    /// `is_game_start` forgets the previous game and optionally warms up.
    /// Always returns an action legal on `state`.
    pub fn decide_action(&mut self, state: &Map, color: Color, is_turn_start: bool, is_game_start: bool) -> Action {
        let started = Instant::now();
        if is_game_start {
            self.retained = None;
            if self.config.warm_up {
                self.warm_up(state, color);
            }
        }
        if is_turn_start {
            self.time_left = self.config.turn_time();
        }

        let movable = state.movable_count(color);
        if movable == 0 {
            log::debug!("{color} has no unit left to move");
            self.last_stats = SearchStats::default();
            return Action::EndTurn { color };
        }
        let budget = self.time_left / movable as u32;

        let mut tree = match self.reuse(state, color) {
            Some(tree) => tree,
            None => new_tree(state.clone(), color),
        };

        let mut ctx = SearchContext::new(&self.config, &mut self.rng);
        seed_root(&mut tree, &mut ctx);
        run(&mut tree, &mut ctx, budget);
        let stats = ctx.stats;
        self.last_stats = stats;

        let action = match best_root_child(&tree) {
            Some(best) => {
                let node = tree.get(best);
                log::debug!(
                    "{color} turn {}: {} iterations, {} root visits, {} nodes, fitness {:.3}",
                    state.turn_count(),
                    stats.iterations,
                    tree.get(tree.root()).visits(),
                    tree.len(),
                    node.fitness().unwrap_or(0.0)
                );
                let first = node.actions().first().copied();
                let chosen = match first {
                    Some(a) if tree.prune_by_action(&a) => {
                        log::trace!("kept {} nodes for the rest of the turn", tree.len());
                        None
                    }
                    _ => Some(best),
                };
                self.retained = Some(Retained { tree, chosen });
                first
            }
            None => {
                if !tree.get(tree.root()).is_leaf() {
                    panic!("search root for {color} has no children after seeding");
                }
                log::warn!("{color} asked to move in a finished game");
                self.retained = None;
                None
            }
        };

        let action = match action {
            Some(a) if is_legal(&a, state) => a,
            other => {
                if let Some(a) = other {
                    log::warn!("search picked {a}, which is illegal here; staying put instead");
                }
                fallback_action(state, color)
            }
        };

        self.time_left = self.time_left.saturating_sub(started.elapsed());
        action
    }

    /// Takes the retained tree if `state` continues it: either the map after
    /// the action just played, mid-turn, or one of the positions the
    /// opponent could have answered the last full turn with.
    fn reuse(&mut self, state: &Map, color: Color) -> Option<Tree> {
        let Retained { tree, chosen } = self.retained.take()?;
        if tree.root_color() != color {
            return None;
        }
        if tree.get(tree.root()).state().turn_count() > state.turn_count() {
            log::trace!("discarding retained tree from a later turn");
            return None;
        }

        let hash = state.content_hash();
        let same_position = |node: &Node| {
            node.hash() == hash
                && node.state().is_equivalent(state)
                && node.state().movable_count(color) == state.movable_count(color)
        };
        let Some(chosen) = chosen else {
            if !same_position(tree.get(tree.root())) {
                return None;
            }
            log::trace!("continuing {color}'s turn {} on the retained tree", state.turn_count());
            return Some(tree);
        };

        let found = tree
            .get(chosen)
            .children()
            .iter()
            .copied()
            .find(|&c| same_position(tree.get(c)))?;
        let root = tree.primary_of(found);
        if tree.get(root).color() != color {
            return None;
        }
        log::trace!("reusing retained subtree for {color} at turn {}", state.turn_count());
        Some(tree.extract(root))
    }

    /// Builds and discards a small tree so the first real decision does not
    /// pay one-off costs.
    fn warm_up(&mut self, state: &Map, color: Color) {
        if state.movable_count(color) == 0 {
            return;
        }
        let mut tree = new_tree(state.clone(), color);
        let mut ctx = SearchContext::new(&self.config, &mut self.rng);
        let root = tree.root();
        if tree.get(root).is_leaf() {
            return;
        }
        exploit(&mut tree, root, self.config.starting_pop, &mut ctx);
        for _ in 0..WARM_UP_ITERATIONS {
            iterate(&mut tree, &mut ctx);
        }
    }
}

/// Always-legal answer: the first movable unit stays where it is.
fn fallback_action(state: &Map, color: Color) -> Action {
    match state.movable_units(color).first() {
        Some(unit) => Action::stay(unit),
        None => Action::EndTurn { color },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Pos, UnitKind};

    fn skirmish() -> Map {
        let mut map = Map::new(9, 9, 30);
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(2, 4)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(5, 3)).unwrap();
        map.add_unit(UnitKind::Cannon, Color::Blue, Pos::new(6, 5)).unwrap();
        map
    }

    fn quick_engine(seed: u64) -> Engine {
        Engine::new(SearchConfig {
            num_init: 6,
            starting_pop: 3,
            max_iterations: Some(30),
            turn_time_ms: 60_000,
            warm_up: false,
            seed: Some(seed),
            ..SearchConfig::default()
        })
    }

    #[test]
    fn decision_is_legal() {
        let mut engine = quick_engine(1);
        let map = skirmish();
        let action = engine.decide_action(&map, Color::Red, true, true);
        assert!(is_legal(&action, &map), "{action}");
        assert_eq!(action.color(), Color::Red);
        assert_eq!(engine.last_stats().iterations, 30);
    }

    #[test]
    fn zero_budget_still_returns_legal_action() {
        let mut engine = quick_engine(2);
        engine.set_option("TurnTime", "0").unwrap();
        let map = skirmish();
        let action = engine.decide_action(&map, Color::Red, true, false);
        assert!(is_legal(&action, &map));
        assert_eq!(engine.last_stats().iterations, 0);
        assert_eq!(engine.time_left(), Duration::ZERO);
    }

    #[test]
    fn no_movable_units_ends_turn() {
        let mut engine = quick_engine(3);
        let mut map = skirmish();
        map.finish_units(Color::Red);
        let action = engine.decide_action(&map, Color::Red, false, false);
        assert_eq!(action, Action::EndTurn { color: Color::Red });
    }

    #[test]
    fn same_seed_same_decision() {
        let map = skirmish();
        let a = quick_engine(7).decide_action(&map, Color::Red, true, true);
        let b = quick_engine(7).decide_action(&map, Color::Red, true, true);
        assert_eq!(a, b);
    }

    #[test]
    fn warm_up_does_not_break_the_decision() {
        let mut engine = quick_engine(4);
        engine.set_option("WarmUp", "true").unwrap();
        let map = skirmish();
        let action = engine.decide_action(&map, Color::Blue, true, true);
        assert!(is_legal(&action, &map));
    }

    #[test]
    fn retained_tree_is_reused_after_opponent_reply() {
        let mut engine = quick_engine(5);
        let mut map = Map::new(9, 9, 30);
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(5, 3)).unwrap();
        map.add_unit(UnitKind::Cannon, Color::Blue, Pos::new(6, 5)).unwrap();
        engine.decide_action(&map, Color::Red, true, true);

        // Play the chosen turn and a reply the tree already contains.
        let retained = engine.retained.as_ref().unwrap();
        let chosen = retained.tree.get(retained.chosen.unwrap());
        let reply = match chosen.children().first() {
            Some(&r) => r,
            None => return,
        };
        let next = retained.tree.get(reply).state().clone();
        let reply_nodes = retained.tree.extract(retained.tree.primary_of(reply)).len();

        let reused = engine.reuse(&next, Color::Red).unwrap();
        assert_eq!(reused.len(), reply_nodes);
        assert!(reused.get(reused.root()).state().is_equivalent(&next));
    }

    #[test]
    fn mid_turn_call_continues_the_pruned_tree() {
        let mut engine = quick_engine(5);
        let map = skirmish();
        let first = engine.decide_action(&map, Color::Red, true, true);

        let retained = engine.retained.as_ref().unwrap();
        assert_eq!(retained.chosen, None);
        let kept = retained.tree.len();
        let root = retained.tree.get(retained.tree.root());
        assert!(!root.children().is_empty());
        assert!(root.children().iter().all(|&c| retained.tree.get(c).actions().len() == 1));

        let mut next = map.clone();
        next.apply_action(&first).unwrap();
        assert!(root.state().is_equivalent(&next));
        let reused = engine.reuse(&next, Color::Red).unwrap();
        assert_eq!(reused.len(), kept);
        assert_eq!(reused.find_inconsistency(), None);

        engine.retained = Some(Retained { tree: reused, chosen: None });
        let second = engine.decide_action(&next, Color::Red, false, false);
        assert!(is_legal(&second, &next));
        assert_ne!(second.unit(), first.unit());
    }

    #[test]
    fn unknown_position_builds_fresh_tree() {
        let mut engine = quick_engine(6);
        let map = skirmish();
        engine.decide_action(&map, Color::Red, true, true);
        let mut elsewhere = skirmish();
        elsewhere.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(7, 7)).unwrap();
        elsewhere.set_turn_count(2);
        assert!(engine.reuse(&elsewhere, Color::Red).is_none());
        assert!(engine.retained.is_none());
    }

    #[test]
    fn set_option_rejects_unknown_names() {
        let mut engine = quick_engine(1);
        assert!(engine.set_option("Strength", "3").is_err());
    }
}
