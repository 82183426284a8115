//! Node scoring with a two-ply greedy lookahead.
//!
//! A node's own map is scored only when the game is over there. Otherwise
//! the side to move plays one greedy turn (the phantom child) and its
//! opponent answers greedily (the phantom grandchild); the map after both
//! replies is scored for the root color. Phantom nodes are built once and
//! reused, so evaluating a node twice allocates nothing new.

use super::node::{NodeId, NodeKind, Tree};
use crate::eval::{evaluate as static_evaluation, greedy_turn};

/// Scores `id`, stores the result as its fitness and returns it.
///
/// Fitness is not propagated to ancestors here.
pub fn evaluate(tree: &mut Tree, id: NodeId) -> f64 {
    let value = lookahead_value(tree, id);
    tree.set_fitness(id, value);
    value
}

fn lookahead_value(tree: &mut Tree, id: NodeId) -> f64 {
    let root_color = tree.root_color();
    if tree.get(id).is_leaf() {
        return static_evaluation(tree.get(id).state(), root_color);
    }

    let phantom = ensure_phantom(tree, id);
    tree.set_successor(id, phantom);
    if tree.get(phantom).is_leaf() {
        return static_evaluation(tree.get(phantom).state(), root_color);
    }

    let reply = ensure_phantom(tree, phantom);
    static_evaluation(tree.get(reply).state(), root_color)
}

/// Returns `id`'s phantom child, playing the greedy turn if it does not
/// exist yet.
fn ensure_phantom(tree: &mut Tree, id: NodeId) -> NodeId {
    if let Some(existing) = tree.get(id).phantom() {
        return existing;
    }
    let actor = tree.get(id).color();
    let mut state = tree.base_state(id);
    let actions = greedy_turn(&mut state, actor);
    state.end_turn();
    let child = tree.create_child(id, actions, state, NodeKind::Phantom);
    tree.attach_phantom(child);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Color, Map, Pos, UnitKind};
    use crate::search::node::tests::open_map;

    #[test]
    fn evaluation_builds_two_phantom_plies() {
        let mut tree = Tree::new(open_map(), Color::Red);
        let root = tree.root();
        let value = evaluate(&mut tree, root);
        assert!((0.0..=1.0).contains(&value));
        assert_eq!(tree.len(), 3);

        let phantom = tree.get(root).phantom().unwrap();
        assert!(tree.get(phantom).is_phantom());
        assert_eq!(tree.get(phantom).color(), Color::Blue);
        assert_eq!(tree.get(root).successor(), Some(phantom));
        assert!(tree.get(root).children().is_empty());
        let reply = tree.get(phantom).phantom().unwrap();
        assert_eq!(tree.get(reply).color(), Color::Red);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut tree = Tree::new(open_map(), Color::Red);
        let root = tree.root();
        let first = evaluate(&mut tree, root);
        let nodes = tree.len();
        let phantom = tree.get(root).phantom();
        let second = evaluate(&mut tree, root);
        assert_eq!(first, second);
        assert_eq!(tree.len(), nodes);
        assert_eq!(tree.get(root).phantom(), phantom);
    }

    #[test]
    fn leaf_is_scored_directly() {
        let mut map = Map::new(6, 6, 30);
        map.add_unit(UnitKind::Infantry, Color::Red, Pos::new(1, 1)).unwrap();
        let mut tree = Tree::new(map, Color::Red);
        let root = tree.root();
        assert!(tree.get(root).is_leaf());
        assert_eq!(evaluate(&mut tree, root), 1.0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn phantom_leaf_stops_lookahead() {
        // Red's panzer can finish off the last blue unit this turn.
        let mut map = Map::new(8, 8, 30);
        map.add_unit(UnitKind::Panzer, Color::Red, Pos::new(2, 2)).unwrap();
        let target = map.add_unit(UnitKind::Infantry, Color::Blue, Pos::new(3, 3)).unwrap();
        map.unit_mut(target).unwrap().hp = 1;
        let mut tree = Tree::new(map, Color::Red);
        let root = tree.root();
        assert_eq!(evaluate(&mut tree, root), 1.0);
        let phantom = tree.get(root).phantom().unwrap();
        assert!(tree.get(phantom).is_leaf());
        assert_eq!(tree.get(phantom).phantom(), None);
    }

    #[test]
    fn score_is_from_root_perspective() {
        let mut red_tree = Tree::new(open_map(), Color::Red);
        let mut blue_tree = Tree::new(open_map(), Color::Blue);
        let red_root = red_tree.root();
        let blue_root = blue_tree.root();
        let red = evaluate(&mut red_tree, red_root);
        let blue = evaluate(&mut blue_tree, blue_root);
        // Panzer against a lone infantry favours red either way round.
        assert!(red > 0.5);
        assert!(blue < 0.5);
    }
}
