//! Search tree storage and minimax fitness bookkeeping.
//!
//! Nodes live in a flat arena and refer to each other by `NodeId`. A node
//! holds one color's whole turn (its action bundle) and the map after that
//! turn ended. `Node::color` is the side to move on that map, which is also
//! the side choosing among the node's children: nodes where it equals the
//! tree's root color take the maximum child fitness, the others the minimum.
//!
//! Fitness is always expressed from the root color's perspective, in
//! `[0, 1]`, and `None` until the node has been evaluated.

use crate::board::{same_bundle, Action, Color, Map};

/// Typed index into a `Tree`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Whether a node is part of the searched tree or only a lookahead helper.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Real,
    /// Greedy-policy child used to score its parent. Never selected,
    /// widened, or counted as a branch.
    Phantom,
}

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    color: Color,
    depth: u32,
    parent: Option<NodeId>,
    actions: Vec<Action>,
    state: Map,
    hash: u64,
    fitness: Option<f64>,
    visits: u64,
    descendants: u64,
    explored: bool,
    leaf: bool,
    primary: Option<NodeId>,
    duplicates: Vec<NodeId>,
    children: Vec<NodeId>,
    phantom: Option<NodeId>,
    successor: Option<NodeId>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_phantom(&self) -> bool {
        self.kind == NodeKind::Phantom
    }

    /// Side to move on `state`.
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The turn bundle that produced `state`. Empty for the root.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn state(&self) -> &Map {
        &self.state
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// Times selection passed through this node. Reported in logs only;
    /// UCB and widening count `descendants` instead.
    pub fn visits(&self) -> u64 {
        self.visits
    }

    /// Primary real nodes added anywhere below this one.
    pub fn descendants(&self) -> u64 {
        self.descendants
    }

    pub fn is_explored(&self) -> bool {
        self.explored
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn is_primary(&self) -> bool {
        self.primary.is_none()
    }

    /// The sibling this node duplicates, if any.
    pub fn primary(&self) -> Option<NodeId> {
        self.primary
    }

    pub fn duplicates(&self) -> &[NodeId] {
        &self.duplicates
    }

    /// Real children, primaries and duplicates alike.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn phantom(&self) -> Option<NodeId> {
        self.phantom
    }

    /// Cached child currently holding this node's fitness.
    pub fn successor(&self) -> Option<NodeId> {
        self.successor
    }
}

/// Picks who moves on `state`: `preferred` if it has an idle unit, else the
/// opponent if it has one. When neither side can act the turn has fully
/// elapsed and `preferred` moves once units are re-enabled.
pub fn side_to_move(state: &Map, preferred: Color) -> Color {
    if state.movable_count(preferred) > 0 {
        preferred
    } else if state.movable_count(preferred.opponent()) > 0 {
        preferred.opponent()
    } else {
        preferred
    }
}

/// Arena-backed search tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    root_color: Color,
}

impl Tree {
    /// Creates a tree with a single unevaluated root for `color` to move.
    pub fn new(state: Map, color: Color) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
            root_color: color,
        };
        let to_move = side_to_move(&state, color);
        tree.root = tree.alloc(None, 0, to_move, Vec::new(), state, NodeKind::Real);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The searching player; fitness is from its perspective.
    pub fn root_color(&self) -> Color {
        self.root_color
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.as_usize()]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.as_usize()]
    }

    /// Total nodes allocated, phantoms included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn alloc(
        &mut self,
        parent: Option<NodeId>,
        depth: u32,
        color: Color,
        actions: Vec<Action>,
        state: Map,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let leaf = state.is_terminal();
        self.nodes.push(Node {
            kind,
            color,
            depth,
            parent,
            actions,
            hash: state.content_hash(),
            state,
            fitness: None,
            visits: 0,
            descendants: 0,
            explored: leaf,
            leaf,
            primary: None,
            duplicates: Vec::new(),
            children: Vec::new(),
            phantom: None,
            successor: None,
        });
        id
    }

    /// Allocates a node produced by `parent`'s side playing `actions` into
    /// `state`. The node is not linked into `parent` yet.
    pub(crate) fn create_child(&mut self, parent: NodeId, actions: Vec<Action>, state: Map, kind: NodeKind) -> NodeId {
        let p = self.get(parent);
        let depth = p.depth + 1;
        let color = side_to_move(&state, p.color.opponent());
        self.alloc(Some(parent), depth, color, actions, state, kind)
    }

    /// Links a real node created by `create_child` under its parent.
    pub(crate) fn attach(&mut self, child: NodeId) {
        let node = self.get(child);
        assert_eq!(node.kind, NodeKind::Real, "phantom node {child:?} attached as a real child");
        let parent = node
            .parent
            .unwrap_or_else(|| panic!("node {child:?} has no parent to attach to"));
        self.get_mut(parent).children.push(child);
    }

    /// Links a phantom node created by `create_child` as its parent's
    /// lookahead child.
    pub(crate) fn attach_phantom(&mut self, child: NodeId) {
        let node = self.get(child);
        assert_eq!(node.kind, NodeKind::Phantom, "real node {child:?} attached as a phantom");
        let parent = node
            .parent
            .unwrap_or_else(|| panic!("phantom {child:?} has no parent"));
        assert!(self.get(parent).phantom.is_none(), "node {parent:?} already has a phantom child");
        self.get_mut(parent).phantom = Some(child);
    }

    /// Turns `parent`'s phantom child into its first real child.
    ///
    /// Panics if there is no phantom to realize.
    pub(crate) fn realize_phantom(&mut self, parent: NodeId) -> NodeId {
        let child = self
            .get_mut(parent)
            .phantom
            .take()
            .unwrap_or_else(|| panic!("node {parent:?} has no phantom child to realize"));
        self.get_mut(child).kind = NodeKind::Real;
        self.get_mut(parent).children.push(child);
        child
    }

    /// The map `id`'s side starts its turn from. Re-enables everyone when
    /// no unit on the map can act any more.
    pub fn base_state(&self, id: NodeId) -> Map {
        let node = self.get(id);
        let mut state = node.state.clone();
        if state.movable_count(node.color) == 0 {
            for c in crate::board::ALL_COLORS {
                state.enable_units(c);
            }
        }
        state
    }

    pub(crate) fn mark_explored(&mut self, id: NodeId) {
        self.get_mut(id).explored = true;
    }

    pub(crate) fn set_successor(&mut self, id: NodeId, successor: NodeId) {
        self.get_mut(id).successor = Some(successor);
    }

    pub(crate) fn visit(&mut self, id: NodeId) {
        self.get_mut(id).visits += 1;
    }

    /// Counts a newly added primary child of `parent` on every ancestor.
    pub(crate) fn add_descendant(&mut self, parent: NodeId) {
        let mut cur = Some(parent);
        while let Some(id) = cur {
            let node = self.get_mut(id);
            node.descendants += 1;
            cur = node.parent;
        }
    }

    /// Follows duplicate links to the primary node.
    pub fn primary_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(p) = self.get(cur).primary {
            cur = p;
        }
        cur
    }

    /// Records `dup` as a duplicate of `primary` and mirrors its fitness.
    pub(crate) fn link_duplicate(&mut self, dup: NodeId, primary: NodeId) {
        let primary = self.primary_of(primary);
        assert_ne!(dup, primary, "node {dup:?} cannot duplicate itself");
        let fitness = self.get(primary).fitness;
        let node = self.get_mut(dup);
        node.primary = Some(primary);
        node.fitness = fitness;
        self.get_mut(primary).duplicates.push(dup);
    }

    /// True if `id` takes the maximum over its children.
    pub fn maximizes(&self, id: NodeId) -> bool {
        self.get(id).color == self.root_color
    }

    fn better(&self, id: NodeId, a: f64, b: f64) -> bool {
        if self.maximizes(id) {
            a > b
        } else {
            a < b
        }
    }

    /// Sets a primary node's fitness and mirrors it onto every duplicate.
    ///
    /// Panics if `id` is itself a duplicate.
    pub(crate) fn set_fitness(&mut self, id: NodeId, value: f64) {
        assert!(
            self.get(id).is_primary(),
            "fitness written directly to duplicate node {id:?}"
        );
        self.get_mut(id).fitness = Some(value);
        for i in 0..self.get(id).duplicates.len() {
            let dup = self.get(id).duplicates[i];
            self.get_mut(dup).fitness = Some(value);
        }
    }

    /// Best evaluated primary child of `id` from its chooser's perspective.
    /// The first child wins ties.
    pub fn extremum_child(&self, id: NodeId) -> Option<(NodeId, f64)> {
        let mut best: Option<(NodeId, f64)> = None;
        for &c in &self.get(id).children {
            let child = self.get(c);
            if !child.is_primary() {
                continue;
            }
            let Some(f) = child.fitness else {
                continue;
            };
            if best.map_or(true, |(_, b)| self.better(id, f, b)) {
                best = Some((c, f));
            }
        }
        best
    }

    /// Pushes a changed child fitness up the tree.
    ///
    /// A parent adopts the child outright when it strictly improves on the
    /// parent's value. If the child was the cached successor and no longer
    /// wins, the parent rescans its children; propagation continues only
    /// while some ancestor's value actually changes.
    pub(crate) fn propagate(&mut self, child: NodeId) {
        let mut child = child;
        loop {
            let node = self.get(child);
            let (Some(parent), Some(value)) = (node.parent, node.fitness) else {
                return;
            };
            if node.is_phantom() {
                return;
            }
            let current = self.get(parent).fitness;

            if current.map_or(true, |c| self.better(parent, value, c)) {
                self.get_mut(parent).successor = Some(child);
                self.set_fitness(parent, value);
                child = parent;
                continue;
            }

            if self.get(parent).successor == Some(child) {
                if let Some((best, best_value)) = self.extremum_child(parent) {
                    self.get_mut(parent).successor = Some(best);
                    if Some(best_value) != current {
                        self.set_fitness(parent, best_value);
                        child = parent;
                        continue;
                    }
                }
            }
            return;
        }
    }

    /// Returns the first node breaking the tree's fitness accounting: an
    /// expanded primary whose fitness is not the extremum of its evaluated
    /// primary children, or a duplicate whose fitness differs from its
    /// primary's.
    pub fn find_inconsistency(&self) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.get(id);
            if let Some(p) = node.primary {
                if self.get(p).fitness.map(f64::to_bits) != node.fitness.map(f64::to_bits) {
                    return Some(id);
                }
            } else if node.explored && !node.leaf {
                if let Some((_, best)) = self.extremum_child(id) {
                    if node.fitness != Some(best) {
                        return Some(id);
                    }
                }
            }
            stack.extend(node.children.iter().copied());
        }
        None
    }

    /// Copies the subtree under `new_root` into a fresh, compact tree with
    /// `new_root` as its root. Everything else is dropped.
    pub fn extract(&self, new_root: NodeId) -> Tree {
        let mut order = Vec::new();
        let mut remap = vec![None; self.nodes.len()];
        let mut stack = vec![new_root];
        while let Some(id) = stack.pop() {
            remap[id.as_usize()] = Some(NodeId(order.len() as u32));
            order.push(id);
            let node = self.get(id);
            stack.extend(node.children.iter().rev().copied());
            stack.extend(node.phantom);
        }

        let map_id = |id: NodeId| remap[id.as_usize()];
        let nodes = order
            .iter()
            .map(|&old| {
                let mut node = self.get(old).clone();
                node.parent = if old == new_root { None } else { node.parent.and_then(map_id) };
                node.children = node.children.iter().filter_map(|&c| map_id(c)).collect();
                node.duplicates = node.duplicates.iter().filter_map(|&d| map_id(d)).collect();
                node.phantom = node.phantom.and_then(map_id);
                node.successor = node.successor.and_then(map_id);
                node.primary = node.primary.and_then(map_id);
                node
            })
            .collect();

        Tree {
            nodes,
            root: NodeId(0),
            root_color: self.root_color,
        }
    }

    /// Cuts the tree down to what is still reachable after the root's side
    /// played `action` as the next step of its turn, and moves the root to
    /// the map after `action`.
    ///
    /// A root child survives if its bundle contains a matching action and
    /// the rest of the bundle still replays from the new root map to the
    /// child's state; it keeps only that rest. A duplicate left with the
    /// same bundle as its primary is dropped. A duplicate whose primary was
    /// dropped hands its bundle to the primary, which takes its place.
    ///
    /// Returns false, leaving the tree untouched, when `action` is illegal
    /// at the root, ends the root's turn or game, or no child survives.
    pub fn prune_by_action(&mut self, action: &Action) -> bool {
        let root = self.root;
        let color = self.get(root).color;
        let mut played = self.base_state(root);
        if played.apply_action(action).is_err() || played.is_terminal() || played.movable_count(color) == 0 {
            return false;
        }

        let mut kept: Vec<(NodeId, Vec<Action>)> = Vec::new();
        for &c in &self.get(root).children {
            let bundle = &self.get(c).actions;
            let Some(at) = bundle.iter().position(|a| a.matches(action)) else {
                continue;
            };
            let mut rest = bundle.clone();
            rest.remove(at);
            if replays_to(&played, &rest, &self.get(c).state) {
                kept.push((c, rest));
            }
        }

        let mut children: Vec<(NodeId, Vec<Action>)> = Vec::with_capacity(kept.len());
        for (c, rest) in &kept {
            let Some(primary) = self.get(*c).primary else {
                children.push((*c, rest.clone()));
                continue;
            };
            let primary_rest = kept
                .iter()
                .chain(children.iter())
                .find(|(k, _)| *k == primary)
                .map(|(_, r)| same_bundle(r, rest));
            match primary_rest {
                Some(true) => {}
                Some(false) => children.push((*c, rest.clone())),
                None => children.push((primary, rest.clone())),
            }
        }
        if children.is_empty() {
            return false;
        }

        let node = self.get_mut(root);
        node.hash = played.content_hash();
        node.state = played;
        node.phantom = None;
        node.successor = None;
        node.children = children.iter().map(|(c, _)| *c).collect();
        for (c, rest) in children {
            self.get_mut(c).actions = rest;
        }
        *self = self.extract(root);

        let root = self.root;
        let descendants: u64 = self
            .get(root)
            .children
            .iter()
            .map(|&c| self.get(c))
            .filter(|n| n.is_primary())
            .map(|n| n.descendants + 1)
            .sum();
        self.get_mut(root).descendants = descendants;
        if let Some((best, value)) = self.extremum_child(root) {
            self.get_mut(root).successor = Some(best);
            self.set_fitness(root, value);
        }
        true
    }
}

/// True if `actions` are all legal in order from `from` and, once the turn
/// ends, reach a map equivalent to `target`.
fn replays_to(from: &Map, actions: &[Action], target: &Map) -> bool {
    let mut state = from.clone();
    for action in actions {
        if state.apply_action(action).is_err() {
            return false;
        }
    }
    state.end_turn();
    state.is_equivalent(target)
}
