//! UCT tree with arena allocation.
//!
//! Nodes live in one `Vec` and refer to each other by `NodeId`, so the
//! parent links used for backpropagation never own anything.

use crate::board::{Action, CombatState, Team};

use super::node::{NodeId, UctNode};

#[derive(Debug)]
pub struct UctTree {
    nodes: Vec<UctNode>,
    root: NodeId,
}

impl UctTree {
    /// Creates a tree holding only the root.
    pub fn new(root_state: CombatState, team: Team) -> Self {
        Self {
            nodes: vec![UctNode::new_root(root_state, team)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &UctNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut UctNode {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a child under `parent` and returns its id.
    pub fn add_child(&mut self, parent: NodeId, action: Action, team: Team, state: CombatState) -> NodeId {
        let depth = self.get(parent).depth + 1;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(UctNode::new_child(parent, depth, action, team, state));
        self.get_mut(parent).children.push(id);
        id
    }

    /// UCB1 of `child` as seen by the team to move at `parent`.
    ///
    /// A child's reward is kept from its own mover's side, so it is negated
    /// when the child sits across a change of team.
    pub fn ucb1(&self, parent: NodeId, child: NodeId, exploration: f64) -> f64 {
        let p = self.get(parent);
        let c = self.get(child);
        if c.n == 0 {
            return f64::INFINITY;
        }
        let exploit = if c.team == p.team { c.mean() } else { -c.mean() };
        let explore = (exploration * (p.n.max(1) as f64).ln() / c.n as f64).sqrt();
        exploit + explore
    }

    /// The child of `id` with the highest UCB1 score. Ties keep the first.
    pub fn select_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let mut best: Option<(f64, NodeId)> = None;
        for &child in &self.get(id).children {
            let score = self.ucb1(id, child, exploration);
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, child));
            }
        }
        best.map(|(_, c)| c)
    }

    /// Walks from `leaf` to the root adding `reward` (from `leaf`'s team's
    /// point of view). The sign flips only where control passes to the other
    /// team. That is usually an `EndTurn` edge, but not always: when two mobs
    /// of one team are adjacent in the initiative order, the `EndTurn` between
    /// their activations keeps the sign, since the same side is still to move.
    pub fn backpropagate(&mut self, leaf: NodeId, reward: f64) {
        let mut current = Some(leaf);
        let mut delta = reward;
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.n += 1;
            node.q += delta;
            let team = node.team;
            current = node.parent;
            if let Some(parent) = current {
                if self.get(parent).team != team {
                    delta = -delta;
                }
            }
        }
    }

    /// The most visited child of `id`. Ties keep the first.
    pub fn most_visited_child(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<(u32, NodeId)> = None;
        for &child in &self.get(id).children {
            let n = self.get(child).n;
            if best.map_or(true, |(b, _)| n > b) {
                best = Some((n, child));
            }
        }
        best.map(|(_, c)| c)
    }

    /// Follows the most visited path from the root and returns the actions
    /// up to (not including) the first `EndTurn`. Stops early at a leaf or
    /// at a finished match.
    pub fn extract_turn(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut id = self.root;
        while let Some(child) = self.most_visited_child(id) {
            let node = self.get(child);
            if node.action.is_end_turn() {
                break;
            }
            actions.push(node.action);
            if node.is_terminal() {
                break;
            }
            id = child;
        }
        actions
    }

    /// Depth of the deepest node.
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}
