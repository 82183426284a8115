//! Variation operators producing new sibling turns.
//!
//! Both operators replay a bundle from the parent's map one action at a
//! time, so every action in the offspring is legal at the moment it is
//! played. Units the replay did not cover get a biased random action, and
//! the turn is ended at the close.

use rand::seq::SliceRandom;
use rand::Rng;

use super::node::{NodeId, Tree};
use super::tbets::SearchContext;
use crate::board::{Action, Color, Map, Unit, UnitId};
use crate::movegen::{attack_actions, biased_action, is_legal};

/// A candidate turn ready to be added under a node.
#[derive(Debug, Clone)]
pub struct Offspring {
    pub actions: Vec<Action>,
    pub state: Map,
}

struct Replay<'a, 'c> {
    state: Map,
    actor: Color,
    actions: Vec<Action>,
    ctx: &'a mut SearchContext<'c>,
}

impl<'a, 'c> Replay<'a, 'c> {
    fn new(tree: &Tree, parent: NodeId, ctx: &'a mut SearchContext<'c>) -> Self {
        Replay {
            state: tree.base_state(parent),
            actor: tree.get(parent).color(),
            actions: Vec::new(),
            ctx,
        }
    }

    /// The unit `action` would move, if it can still act.
    fn idle_unit(&self, action: &Action) -> Option<Unit> {
        let unit = self.state.unit(action.unit()?)?;
        (unit.color == self.actor && !unit.finished).then_some(*unit)
    }

    fn random(&mut self, unit: &Unit) -> Action {
        biased_action(unit, &self.state, self.ctx.config.attack_bias, &mut *self.ctx.rng)
    }

    fn play(&mut self, action: Action) {
        if let Err(e) = self.state.apply_action(&action) {
            panic!("replay produced illegal action {action}: {e}");
        }
        self.actions.push(action);
    }

    fn finish(mut self) -> Offspring {
        for unit in self.state.movable_units(self.actor) {
            let action = self.random(&unit);
            self.play(action);
        }
        self.state.end_turn();
        Offspring {
            actions: self.actions,
            state: self.state,
        }
    }
}

fn parent_of(tree: &Tree, child: NodeId) -> NodeId {
    tree.get(child)
        .parent()
        .unwrap_or_else(|| panic!("node {child:?} has no parent to vary from"))
}

/// Copies `child`'s bundle, re-rolling each action with probability
/// `mutation_rate` and whenever the original is no longer legal.
pub fn mutate(tree: &Tree, child: NodeId, ctx: &mut SearchContext<'_>) -> Offspring {
    let parent = parent_of(tree, child);
    let mut replay = Replay::new(tree, parent, ctx);

    for original in tree.get(child).actions() {
        let Some(unit) = replay.idle_unit(original) else {
            continue;
        };
        let reroll = replay.ctx.rng.gen_bool(replay.ctx.config.mutation_rate);
        let action = if reroll || !is_legal(original, &replay.state) {
            replay.random(&unit)
        } else {
            *original
        };
        replay.play(action);
    }

    replay.finish()
}

/// Interleaves two sibling bundles.
///
/// A random half (rounded up) of `first`'s units keep their actions from
/// `first`; every other unit acts as in `second`. `second`'s ordering is
/// kept, and `first`'s kept actions are slotted in at the same relative
/// positions they held in `first`. An attack that became illegal is first
/// retried as another attack from the same tile.
pub fn crossover(tree: &Tree, first: NodeId, second: NodeId, ctx: &mut SearchContext<'_>) -> Offspring {
    let parent = parent_of(tree, first);
    assert_eq!(
        tree.get(second).parent(),
        Some(parent),
        "crossover parents {first:?} and {second:?} are not siblings"
    );
    let a1 = tree.get(first).actions();
    let a2 = tree.get(second).actions();

    let mut units: Vec<UnitId> = a1.iter().filter_map(Action::unit).collect();
    units.shuffle(&mut *ctx.rng);
    let kept = &units[..units.len().div_ceil(2)];

    let mut merged: Vec<Action> = a2
        .iter()
        .filter(|a| a.unit().map_or(true, |u| !kept.contains(&u)))
        .copied()
        .collect();
    let mut last: Option<usize> = None;
    for (pos, action) in a1.iter().enumerate() {
        if !action.unit().is_some_and(|u| kept.contains(&u)) {
            continue;
        }
        let proportional = pos * merged.len() / a1.len();
        let at = last.map_or(proportional, |l| proportional.max(l + 1)).min(merged.len());
        merged.insert(at, *action);
        last = Some(at);
    }

    let mut replay = Replay::new(tree, parent, ctx);
    for action in merged {
        let Some(unit) = replay.idle_unit(&action) else {
            continue;
        };
        let chosen = if is_legal(&action, &replay.state) {
            action
        } else if action.is_attack() {
            repair_attack(&replay.state, &unit, &action).unwrap_or_else(|| replay.random(&unit))
        } else {
            replay.random(&unit)
        };
        replay.play(chosen);
    }

    replay.finish()
}

/// A legal attack by `unit` from the tile `broken` wanted to attack from.
fn repair_attack(state: &Map, unit: &Unit, broken: &Action) -> Option<Action> {
    let from = broken.destination()?;
    attack_actions(state, unit)
        .into_iter()
        .find(|a| a.destination() == Some(from) && is_legal(a, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Pos, UnitKind};
    use crate::config::SearchConfig;
    use crate::search::node::NodeKind;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn skirmish() -> Map {
        let mut map = Map::new(9, 9, 30);
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(2, 4)).unwrap();
        map.add_unit(UnitKind::Cannon, Color::Red, Pos::new(1, 3)).unwrap();
        map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(4, 3)).unwrap();
        map.add_unit(UnitKind::Panzer, Color::Blue, Pos::new(6, 6)).unwrap();
        map
    }

    fn tree_with_two_children(rng: &mut SmallRng) -> (Tree, NodeId, NodeId) {
        let map = skirmish();
        let mut tree = Tree::new(map.clone(), Color::Red);
        let root = tree.root();
        let mut ids = Vec::new();
        for _ in 0..2 {
            let actions = crate::movegen::random_turn(&map, Color::Red, 0.8, rng);
            let mut state = map.clone();
            for a in &actions {
                state.apply_action(a).unwrap();
            }
            state.end_turn();
            let id = tree.create_child(root, actions, state, NodeKind::Real);
            tree.attach(id);
            ids.push(id);
        }
        (tree, ids[0], ids[1])
    }

    fn assert_replays(tree: &Tree, offspring: &Offspring) {
        let mut state = tree.get(tree.root()).state().clone();
        for a in &offspring.actions {
            state.apply_action(a).unwrap();
        }
        state.end_turn();
        assert!(state.is_equivalent(&offspring.state));
        assert_eq!(offspring.actions.len(), 3);
        let mut units: Vec<UnitId> = offspring.actions.iter().filter_map(Action::unit).collect();
        units.sort();
        units.dedup();
        assert_eq!(units.len(), 3);
    }

    #[test]
    fn mutation_without_rerolls_copies_the_bundle() {
        let config = SearchConfig {
            mutation_rate: 0.0,
            ..SearchConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let (tree, a, _) = tree_with_two_children(&mut rng);
        let mut ctx = SearchContext::new(&config, &mut rng);
        let child = mutate(&tree, a, &mut ctx);
        assert_eq!(child.actions, tree.get(a).actions());
        assert!(child.state.is_equivalent(tree.get(a).state()));
    }

    #[test]
    fn mutated_bundles_are_legal_and_complete() {
        let config = SearchConfig {
            mutation_rate: 1.0,
            ..SearchConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(8);
        let (tree, a, _) = tree_with_two_children(&mut rng);
        let mut ctx = SearchContext::new(&config, &mut rng);
        for _ in 0..20 {
            let child = mutate(&tree, a, &mut ctx);
            assert_replays(&tree, &child);
        }
    }

    #[test]
    fn crossover_bundles_are_legal_and_complete() {
        let config = SearchConfig::default();
        let mut rng = SmallRng::seed_from_u64(21);
        let (tree, a, b) = tree_with_two_children(&mut rng);
        let mut ctx = SearchContext::new(&config, &mut rng);
        for _ in 0..20 {
            let child = crossover(&tree, a, b, &mut ctx);
            assert_replays(&tree, &child);
        }
    }

    #[test]
    fn broken_attack_is_retargeted_from_same_tile() {
        let mut map = Map::new(8, 8, 30);
        let p = map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        let gone = map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(4, 2)).unwrap();
        let other = map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(3, 3)).unwrap();
        let panzer = map.unit(p).copied().unwrap();
        let broken = Action::attack(&panzer, Pos::new(3, 2), map.unit(gone).unwrap());
        map.remove_unit(gone);

        let fixed = repair_attack(&map, &panzer, &broken).unwrap();
        assert_eq!(fixed.destination(), Some(Pos::new(3, 2)));
        assert_eq!(fixed.target(), Some(other));
        assert!(is_legal(&fixed, &map));
    }

    #[test]
    #[should_panic(expected = "not siblings")]
    fn crossover_requires_siblings() {
        let config = SearchConfig::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let (mut tree, a, _) = tree_with_two_children(&mut rng);
        let state = tree.get(a).state().clone();
        let grandchild = tree.create_child(a, Vec::new(), state, NodeKind::Real);
        tree.attach(grandchild);
        let mut ctx = SearchContext::new(&config, &mut rng);
        crossover(&tree, a, grandchild, &mut ctx);
    }
}
