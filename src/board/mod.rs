//! Board representation and combat-state types.
//!
//! Contains the hex geometry, the battle map and its pathfinding, the static
//! roster shared by a whole match, the mutable combat state, and actions.

pub mod action;
pub mod hex;
pub mod map;
pub mod path;
pub mod roster;
pub mod state;

pub use action::Action;
pub use hex::Hex;
pub use map::{Cell, HexMap};
pub use path::{Pathfinder, Reachability};
pub use roster::{
    AbilityId, AbilityInfo, AreaBuff, AreaBuffTemplate, Buff, Element, GameContext, MobId,
    MobInfo, Roster, Rules, Team,
};
pub use state::{CombatState, MobInstance};
