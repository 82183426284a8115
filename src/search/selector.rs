//! Choosing where to grow the tree.
//!
//! `select` walks down from the root with a UCB rule, stopping early at
//! nodes that still have room to widen. `select_high_fitness_child` picks an
//! evolutionary parent by tournament among a node's children.

use rand::Rng;

use super::node::{NodeId, Tree};
use super::tbets::SearchContext;

/// Walks from the root to the node the next iteration should grow.
///
/// Descent stops at a leaf, at an unexpanded node, at a node with a single
/// child, or (with probability `widening_stop`) at a node whose child count
/// is below its widening threshold `k * descendants^alpha`. Every node on
/// the path counts a visit.
pub fn select(tree: &mut Tree, ctx: &mut SearchContext<'_>) -> NodeId {
    let mut current = tree.root();
    tree.visit(current);
    loop {
        let node = tree.get(current);
        if node.is_leaf() || !node.is_explored() || node.children().len() <= 1 {
            return current;
        }

        let threshold = ctx.config.widening_k * (node.descendants() as f64).powf(ctx.config.widening_alpha);
        if (node.children().len() as f64) < threshold && ctx.rng.gen_bool(ctx.config.widening_stop) {
            return current;
        }

        match best_ucb_child(tree, current, ctx.config.ucb_c) {
            Some(next) => {
                current = next;
                tree.visit(current);
            }
            None => return current,
        }
    }
}

/// UCB score of `child` under `parent`. Exploitation is the child's fitness
/// as seen by the side choosing at `parent`.
fn ucb(tree: &Tree, parent: NodeId, child: NodeId, c: f64) -> Option<f64> {
    let fitness = tree.get(child).fitness()?;
    let exploit = if tree.maximizes(parent) { fitness } else { 1.0 - fitness };
    let parent_n = tree.get(parent).descendants() as f64 + 1.0;
    let child_n = tree.get(child).descendants() as f64 + 1.0;
    Some(exploit + c * (parent_n.ln() / child_n).sqrt())
}

/// Primary child of `parent` with the highest UCB score; first wins ties.
pub fn best_ucb_child(tree: &Tree, parent: NodeId, c: f64) -> Option<NodeId> {
    let mut best: Option<(NodeId, f64)> = None;
    for &child in tree.get(parent).children() {
        if !tree.get(child).is_primary() {
            continue;
        }
        let Some(score) = ucb(tree, parent, child, c) else {
            continue;
        };
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((child, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Tournament pick among `parent`'s evaluated children, skipping `exclude`.
///
/// Candidates are ranked best-first for the side choosing at `parent`. Each
/// of `tournament_size` draws takes a rank from the top
/// `1 / tournament_slice` of the list, and the best drawn rank wins.
pub fn select_high_fitness_child(
    tree: &Tree,
    parent: NodeId,
    exclude: Option<NodeId>,
    ctx: &mut SearchContext<'_>,
) -> Option<NodeId> {
    let mut ranked: Vec<(NodeId, f64)> = tree
        .get(parent)
        .children()
        .iter()
        .copied()
        .filter(|&c| Some(c) != exclude)
        .filter_map(|c| Some((c, tree.get(c).fitness()?)))
        .collect();
    if ranked.is_empty() {
        return None;
    }

    if tree.maximizes(parent) {
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    } else {
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    }

    let slice = (ranked.len() / ctx.config.tournament_slice).max(1);
    let rank = (0..ctx.config.tournament_size)
        .map(|_| ctx.rng.gen_range(0..slice))
        .min()
        .unwrap_or(0);
    Some(ranked[rank].0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::search::node::tests::{child_with, open_map};
    use crate::board::Color;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn explored_tree(values: &[f64]) -> (Tree, Vec<NodeId>) {
        let mut tree = Tree::new(open_map(), Color::Red);
        let root = tree.root();
        tree.set_fitness(root, 0.0);
        tree.mark_explored(root);
        let ids = values.iter().map(|&v| child_with(&mut tree, root, v)).collect();
        (tree, ids)
    }

    #[test]
    fn tournament_of_one_slice_picks_best() {
        let (tree, ids) = explored_tree(&[0.2, 0.9, 0.5, 0.4]);
        let config = SearchConfig {
            tournament_slice: 100,
            ..SearchConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = SearchContext::new(&config, &mut rng);
        let root = tree.root();
        assert_eq!(select_high_fitness_child(&tree, root, None, &mut ctx), Some(ids[1]));
        assert_eq!(
            select_high_fitness_child(&tree, root, Some(ids[1]), &mut ctx),
            Some(ids[2])
        );
    }

    #[test]
    fn tournament_for_opponent_prefers_low_fitness() {
        let (mut tree, ids) = explored_tree(&[0.5]);
        let reply = ids[0];
        tree.mark_explored(reply);
        child_with(&mut tree, reply, 0.8);
        let low = child_with(&mut tree, reply, 0.1);
        let config = SearchConfig {
            tournament_slice: 100,
            ..SearchConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ctx = SearchContext::new(&config, &mut rng);
        assert_eq!(select_high_fitness_child(&tree, reply, None, &mut ctx), Some(low));
    }

    #[test]
    fn tournament_draws_stay_in_top_slice() {
        let values: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();
        let (tree, ids) = explored_tree(&values);
        let config = SearchConfig::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut ctx = SearchContext::new(&config, &mut rng);
        let top: Vec<NodeId> = ids[16..].to_vec();
        for _ in 0..50 {
            let pick = select_high_fitness_child(&tree, tree.root(), None, &mut ctx).unwrap();
            assert!(top.contains(&pick));
        }
    }

    #[test]
    fn nothing_to_pick_without_children() {
        let (tree, ids) = explored_tree(&[0.5]);
        let config = SearchConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ctx = SearchContext::new(&config, &mut rng);
        assert_eq!(select_high_fitness_child(&tree, tree.root(), Some(ids[0]), &mut ctx), None);
    }

    #[test]
    fn select_stops_at_single_child_node() {
        let (mut tree, _) = explored_tree(&[0.5]);
        let config = SearchConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ctx = SearchContext::new(&config, &mut rng);
        assert_eq!(select(&mut tree, &mut ctx), tree.root());
        assert_eq!(tree.get(tree.root()).visits(), 1);
    }

    #[test]
    fn select_descends_to_unexplored_child_when_widening_is_off() {
        let (mut tree, ids) = explored_tree(&[0.2, 0.7, 0.3]);
        let config = SearchConfig {
            widening_k: 0.0,
            ucb_c: 0.0,
            ..SearchConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ctx = SearchContext::new(&config, &mut rng);
        assert_eq!(select(&mut tree, &mut ctx), ids[1]);
        assert_eq!(tree.get(ids[1]).visits(), 1);
    }

    #[test]
    fn select_stops_to_widen_when_below_threshold() {
        let (mut tree, _) = explored_tree(&[0.2, 0.7, 0.3]);
        let config = SearchConfig {
            widening_k: 10.0,
            widening_stop: 1.0,
            ..SearchConfig::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let mut ctx = SearchContext::new(&config, &mut rng);
        assert_eq!(select(&mut tree, &mut ctx), tree.root());
    }

    #[test]
    fn ucb_prefers_less_visited_at_equal_fitness() {
        let (mut tree, ids) = explored_tree(&[0.5, 0.5]);
        tree.mark_explored(ids[0]);
        child_with(&mut tree, ids[0], 0.5);
        child_with(&mut tree, ids[0], 0.5);
        assert_eq!(best_ucb_child(&tree, tree.root(), 1.414), Some(ids[1]));
    }
}
