//! Defense desire: the defender's block-or-take decision.
//!
//! When an ability is about to hit a mob that can afford its defense cost,
//! the defender's controller is asked synchronously whether to block. This
//! is a decision, not a dice roll.

use serde::{Deserialize, Serialize};

use crate::board::{AbilityId, CombatState, GameContext, MobId};

/// A defender's answer to an incoming ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefenseDesire {
    /// Spend the defense cost and negate the ability entirely.
    Block,
    /// Take the hit.
    Pass,
}

/// Anything that can answer a defense query.
pub trait DefensePolicy {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire;
}

/// Never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPass;

impl DefensePolicy for AlwaysPass {
    fn defense_desire(&self, _: &GameContext, _: &CombatState, _: MobId, _: AbilityId) -> DefenseDesire {
        DefenseDesire::Pass
    }
}

/// Blocks whenever asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysBlock;

impl DefensePolicy for AlwaysBlock {
    fn defense_desire(&self, _: &GameContext, _: &CombatState, _: MobId, _: AbilityId) -> DefenseDesire {
        DefenseDesire::Block
    }
}

/// Blocks only hits that would kill the defender.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockLethal;

impl DefensePolicy for BlockLethal {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire {
        if ctx.roster.ability(ability).damage >= state.mob(defender).hp {
            DefenseDesire::Block
        } else {
            DefenseDesire::Pass
        }
    }
}

/// Configurable choice among the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseMode {
    #[default]
    Pass,
    Block,
    BlockLethal,
}

impl DefenseMode {
    /// Parses the protocol option spelling.
    pub fn from_name(name: &str) -> Option<DefenseMode> {
        match name.to_ascii_lowercase().as_str() {
            "pass" => Some(DefenseMode::Pass),
            "block" => Some(DefenseMode::Block),
            "lethal" | "blocklethal" | "block_lethal" => Some(DefenseMode::BlockLethal),
            _ => None,
        }
    }
}

impl DefensePolicy for DefenseMode {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire {
        match self {
            DefenseMode::Pass => AlwaysPass.defense_desire(ctx, state, defender, ability),
            DefenseMode::Block => AlwaysBlock.defense_desire(ctx, state, defender, ability),
            DefenseMode::BlockLethal => BlockLethal.defense_desire(ctx, state, defender, ability),
        }
    }
}
