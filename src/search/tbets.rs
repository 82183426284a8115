//! Turn-based evolutionary tree search.
//!
//! Each node of the tree is a whole turn for one color. Iterations select a
//! node with UCB and progressive widening, then grow it: an unexpanded node
//! gets a first population of random turns, an expanded one gets a new
//! child bred from its best children by mutation or crossover. Every new
//! primary node is scored with a greedy two-ply lookahead and its fitness
//! is pushed up the minimax tree.

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;

use super::duplicate::{check_duplicate, mark_duplicate};
use super::evaluator::evaluate;
use super::evolution::{crossover, mutate, Offspring};
use super::node::{NodeId, NodeKind, Tree};
use super::selector::{select, select_high_fitness_child};
use crate::board::{same_bundle, Action, Color, Map};
use crate::config::SearchConfig;
use crate::movegen::random_turn;

/// Counters for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub iterations: u64,
    /// Nodes given their first population.
    pub expansions: u64,
    pub mutations: u64,
    pub crossovers: u64,
    /// Iterations that selected a finished game and did nothing.
    pub leaf_hits: u64,
    /// New primary nodes.
    pub added: u64,
    pub duplicates: u64,
    /// Offspring dropped because a sibling already played the same bundle.
    pub repeats: u64,
}

/// Mutable state threaded through one search.
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub rng: &'a mut SmallRng,
    pub stats: SearchStats,
}

impl<'a> SearchContext<'a> {
    pub fn new(config: &'a SearchConfig, rng: &'a mut SmallRng) -> Self {
        SearchContext {
            config,
            rng,
            stats: SearchStats::default(),
        }
    }
}

/// What a single iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Leaf,
    Expanded(NodeId),
    Mutated(NodeId),
    Crossed(NodeId),
}

/// Builds a tree for `color` to move on `state` and scores its root.
pub fn new_tree(state: Map, color: Color) -> Tree {
    let mut tree = Tree::new(state, color);
    let root = tree.root();
    evaluate(&mut tree, root);
    tree
}

/// Gives an unexpanded root its initial population of `num_init` children.
pub fn seed_root(tree: &mut Tree, ctx: &mut SearchContext<'_>) {
    let root = tree.root();
    let node = tree.get(root);
    if node.is_leaf() || node.is_explored() {
        return;
    }
    exploit(tree, root, ctx.config.num_init, ctx);
}

/// Expands `id` with `count` children: its phantom child becomes the first
/// real one, and the rest are random attack-biased turns.
///
/// Panics if `id` is already expanded or is a duplicate.
pub fn exploit(tree: &mut Tree, id: NodeId, count: usize, ctx: &mut SearchContext<'_>) {
    let node = tree.get(id);
    assert!(
        node.is_primary() && !node.is_explored(),
        "cannot expand node {id:?}: already expanded or a duplicate"
    );
    if node.phantom().is_none() {
        evaluate(tree, id);
    }

    let first = tree.realize_phantom(id);
    evaluate(tree, first);
    tree.propagate(first);
    tree.add_descendant(id);
    ctx.stats.added += 1;

    let actor = tree.get(id).color();
    for _ in 1..count {
        let mut state = tree.base_state(id);
        let actions = random_turn(&state, actor, ctx.config.attack_bias, &mut *ctx.rng);
        for action in &actions {
            if let Err(e) = state.apply_action(action) {
                panic!("random turn produced illegal action {action}: {e}");
            }
        }
        state.end_turn();
        add_node(tree, id, actions, state, ctx);
    }

    tree.mark_explored(id);
    ctx.stats.expansions += 1;
}

/// Adds a turn under `parent` unless a sibling already played the same
/// bundle. A turn reaching a sibling's state becomes that sibling's
/// duplicate; any other turn is scored and its fitness propagated.
pub fn add_node(
    tree: &mut Tree,
    parent: NodeId,
    actions: Vec<Action>,
    state: Map,
    ctx: &mut SearchContext<'_>,
) -> Option<NodeId> {
    let repeated = tree
        .get(parent)
        .children()
        .iter()
        .any(|&c| same_bundle(tree.get(c).actions(), &actions));
    if repeated {
        ctx.stats.repeats += 1;
        return None;
    }

    let child = tree.create_child(parent, actions, state, NodeKind::Real);
    let primary = check_duplicate(tree, child);
    tree.attach(child);
    match primary {
        Some(primary) => {
            mark_duplicate(tree, child, primary);
            ctx.stats.duplicates += 1;
        }
        None => {
            evaluate(tree, child);
            tree.propagate(child);
            tree.add_descendant(parent);
            ctx.stats.added += 1;
        }
    }
    Some(child)
}

/// Breeds one new child for an expanded node from its fittest children.
fn evolve(tree: &mut Tree, id: NodeId, ctx: &mut SearchContext<'_>) -> Step {
    let only_child = tree.get(id).children().len() == 1;
    let mutating = only_child || ctx.rng.gen_bool(ctx.config.mutation_ratio);

    let first = select_high_fitness_child(tree, id, None, ctx)
        .unwrap_or_else(|| panic!("expanded node {id:?} has no evaluated children"));
    let second = if mutating {
        None
    } else {
        select_high_fitness_child(tree, id, Some(first), ctx)
    };

    let Offspring { actions, state } = match second {
        Some(second) => {
            ctx.stats.crossovers += 1;
            crossover(tree, first, second, ctx)
        }
        None => {
            ctx.stats.mutations += 1;
            mutate(tree, first, ctx)
        }
    };
    add_node(tree, id, actions, state, ctx);

    if second.is_some() {
        Step::Crossed(id)
    } else {
        Step::Mutated(id)
    }
}

/// Runs one select-and-grow iteration.
pub fn iterate(tree: &mut Tree, ctx: &mut SearchContext<'_>) -> Step {
    let id = select(tree, ctx);
    ctx.stats.iterations += 1;
    let node = tree.get(id);
    if node.is_leaf() {
        ctx.stats.leaf_hits += 1;
        Step::Leaf
    } else if !node.is_explored() {
        exploit(tree, id, ctx.config.starting_pop, ctx);
        Step::Expanded(id)
    } else {
        evolve(tree, id, ctx)
    }
}

/// Iterates until `budget` has elapsed or the configured iteration cap is
/// reached. A zero budget runs no iterations.
pub fn run(tree: &mut Tree, ctx: &mut SearchContext<'_>, budget: Duration) {
    let start = Instant::now();
    loop {
        if start.elapsed() >= budget {
            break;
        }
        if ctx.config.max_iterations.is_some_and(|cap| ctx.stats.iterations >= cap) {
            break;
        }
        iterate(tree, ctx);
    }
    log::trace!(
        "search ran {} iterations in {:?}, {} nodes",
        ctx.stats.iterations,
        start.elapsed(),
        tree.len()
    );
}

/// The root child to play: the fittest expanded child, primaries winning
/// ties. When no child has been expanded yet, the fittest child of any
/// kind. `None` only if the root has no children.
pub fn best_root_child(tree: &Tree) -> Option<NodeId> {
    let root = tree.root();
    let children = tree.get(root).children();
    let pick = |explored_only: bool| {
        let mut best: Option<(NodeId, f64, bool)> = None;
        for &c in children {
            let node = tree.get(c);
            if explored_only && !node.is_explored() {
                continue;
            }
            let Some(f) = node.fitness() else {
                continue;
            };
            let primary = node.is_primary();
            let better = match best {
                None => true,
                Some((_, bf, bp)) => f > bf || (f == bf && primary && !bp),
            };
            if better {
                best = Some((c, f, primary));
            }
        }
        best.map(|(id, _, _)| id)
    };

    pick(true).or_else(|| {
        let fallback = pick(false);
        if fallback.is_some() {
            log::warn!("no expanded root child; choosing among unexpanded ones");
        }
        fallback
    })
}
