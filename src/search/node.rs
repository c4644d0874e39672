//! UCT tree node.
//!
//! Each node owns a snapshot of the combat state reached by its action.
//! `q` is the summed reward from the point of view of `team`, the team to
//! move in that snapshot.

use crate::board::{Action, CombatState, Team};

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct UctNode {
    pub state: CombatState,

    /// Action that produced `state`; `Null` at the root.
    pub action: Action,

    /// Team whose perspective `q` is kept in.
    pub team: Team,

    pub parent: Option<NodeId>,

    pub children: Vec<NodeId>,

    /// Actions not yet expanded, popped from the back. `None` until the
    /// node is first asked to expand.
    pub untried: Option<Vec<Action>>,

    pub q: f64,

    pub n: u32,

    /// Edges from the root.
    pub depth: u32,
}

impl UctNode {
    /// The root starts with one visit, counting the position it wraps.
    pub fn new_root(state: CombatState, team: Team) -> Self {
        Self {
            state,
            action: Action::Null,
            team,
            parent: None,
            children: Vec::new(),
            untried: None,
            q: 0.0,
            n: 1,
            depth: 0,
        }
    }

    pub fn new_child(parent: NodeId, depth: u32, action: Action, team: Team, state: CombatState) -> Self {
        Self {
            state,
            action,
            team,
            parent: Some(parent),
            children: Vec::new(),
            untried: None,
            q: 0.0,
            n: 0,
            depth,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_finished()
    }

    /// Average reward, zero before the first visit.
    #[inline]
    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.q / self.n as f64
        }
    }

    /// Movement is not regenerated right after a defensive move.
    #[inline]
    pub fn allows_movement(&self) -> bool {
        !matches!(self.action, Action::DefensiveMove { .. })
    }

    /// True once every candidate action has a child.
    pub fn is_fully_expanded(&self) -> bool {
        matches!(&self.untried, Some(u) if u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Hex, Roster};

    #[test]
    fn root_defaults() {
        let node = UctNode::new_root(CombatState::new(&Roster::default()), Team::Red);
        assert_eq!(node.action, Action::Null);
        assert_eq!(node.parent, None);
        assert_eq!(node.n, 1);
        assert_eq!(node.mean(), 0.0);
        assert!(!node.is_fully_expanded());
    }

    #[test]
    fn defensive_move_blocks_movement() {
        let state = CombatState::new(&Roster::default());
        let node = UctNode::new_child(
            NodeId(0),
            1,
            Action::DefensiveMove { mob: 0, to: Hex::new(1, 0) },
            Team::Red,
            state,
        );
        assert!(!node.allows_movement());
    }
}
