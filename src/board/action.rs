//! Action types for a mob's activation.
//!
//! A mob's activation is a chain of actions ended by `EndTurn`. The two
//! composite variants exist to keep the search branching factor small: an
//! `AttackMove` is "walk into range, then use an ability" as a single tree
//! edge, and a `DefensiveMove` is a plain move picked by the threat heuristic.

use std::fmt;

use super::hex::Hex;
use super::roster::{AbilityId, MobId};

/// A single step a mob can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Placeholder for the search root.
    Null,

    /// Ends the current mob's activation.
    EndTurn,

    /// `use <mob> <ability> <target>`
    AbilityUse {
        ability: AbilityId,
        mob: MobId,
        target: MobId,
    },

    /// `move <mob> <q>,<r>`
    Move { mob: MobId, to: Hex },

    /// `dmove <mob> <q>,<r>`: a move chosen to minimize incoming threat.
    DefensiveMove { mob: MobId, to: Hex },

    /// `amove <mob> <q>,<r> <ability> <target>`
    AttackMove {
        mob: MobId,
        to: Hex,
        ability: AbilityId,
        target: MobId,
    },
}

impl Action {
    /// The movement part of a moving action.
    pub fn to_move(self) -> Option<Action> {
        match self {
            Action::Move { mob, to }
            | Action::DefensiveMove { mob, to }
            | Action::AttackMove { mob, to, .. } => Some(Action::Move { mob, to }),
            _ => None,
        }
    }

    /// The ability part of an attacking action.
    pub fn to_ability_use(self) -> Option<Action> {
        match self {
            Action::AbilityUse { .. } => Some(self),
            Action::AttackMove {
                mob,
                ability,
                target,
                ..
            } => Some(Action::AbilityUse {
                ability,
                mob,
                target,
            }),
            _ => None,
        }
    }

    /// The acting mob, for actions that name one.
    pub fn mob(self) -> Option<MobId> {
        match self {
            Action::AbilityUse { mob, .. }
            | Action::Move { mob, .. }
            | Action::DefensiveMove { mob, .. }
            | Action::AttackMove { mob, .. } => Some(mob),
            Action::Null | Action::EndTurn => None,
        }
    }

    #[inline]
    pub fn is_end_turn(self) -> bool {
        matches!(self, Action::EndTurn)
    }

    /// Returns true for actions that change the actor's cell.
    #[inline]
    pub fn is_movement(self) -> bool {
        matches!(
            self,
            Action::Move { .. } | Action::DefensiveMove { .. } | Action::AttackMove { .. }
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Null => write!(f, "null"),
            Action::EndTurn => write!(f, "end"),
            Action::AbilityUse {
                ability,
                mob,
                target,
            } => write!(f, "use {} {} {}", mob, ability, target),
            Action::Move { mob, to } => write!(f, "move {} {}", mob, to),
            Action::DefensiveMove { mob, to } => write!(f, "dmove {} {}", mob, to),
            Action::AttackMove {
                mob,
                to,
                ability,
                target,
            } => write!(f, "amove {} {} {} {}", mob, to, ability, target),
        }
    }
}
