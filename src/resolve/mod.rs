//! Action resolution.
//!
//! `apply` is the state transition function: it mutates a `CombatState` by
//! one action. Legality is the caller's job. Debug builds re-validate every
//! action and panic on an illegal one; release builds trust the generator.

pub mod defense;
pub mod turn;

use crate::board::{AbilityId, Action, CombatState, GameContext, Hex, MobId, Pathfinder};
use crate::movegen::validate;

pub use defense::{AlwaysBlock, AlwaysPass, BlockLethal, DefenseDesire, DefenseMode, DefensePolicy};
pub use turn::{next_mob_or_end_turn, start_new_turn};

/// What happened when an action was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolution {
    /// The defender's answer, when one was asked.
    pub defense: Option<DefenseDesire>,
    /// HP actually removed from the target.
    pub damage: i32,
    /// AP the acting mob spent.
    pub ap_spent: i32,
    /// Where the acting mob stood before moving.
    pub moved_from: Option<Hex>,
}

/// Applies `action` to `state`.
///
/// # Panics
///
/// In debug builds, if `action` is not legal in `state`.
pub fn apply(
    ctx: &GameContext,
    state: &mut CombatState,
    action: Action,
    defense: &dyn DefensePolicy,
) -> Resolution {
    if cfg!(debug_assertions) {
        if let Err(e) = validate(ctx, state, action) {
            panic!("{e}");
        }
    }

    let mut res = Resolution::default();
    match action {
        Action::Null => {}
        Action::EndTurn => next_mob_or_end_turn(ctx, state),
        Action::Move { mob, to } | Action::DefensiveMove { mob, to } => {
            apply_move(ctx, state, mob, to, &mut res);
        }
        Action::AbilityUse {
            ability,
            mob,
            target,
        } => apply_ability(ctx, state, mob, ability, target, defense, &mut res),
        Action::AttackMove {
            mob,
            to,
            ability,
            target,
        } => {
            apply_move(ctx, state, mob, to, &mut res);
            if cfg!(debug_assertions) {
                if let Some(part) = action.to_ability_use() {
                    if let Err(e) = validate(ctx, state, part) {
                        panic!("{e}");
                    }
                }
            }
            apply_ability(ctx, state, mob, ability, target, defense, &mut res);
        }
    }
    res
}

fn apply_move(ctx: &GameContext, state: &mut CombatState, mob: MobId, to: Hex, res: &mut Resolution) {
    let from = state.mob(mob).coord;
    // Falls back to the straight-line distance only for illegal moves.
    let cost = ctx
        .map
        .distance(state, from, to)
        .unwrap_or_else(|| from.distance(to)) as i32;
    state.mobs[mob].coord = to;
    state.change_ap(mob, -cost);
    res.ap_spent += cost;
    res.moved_from = Some(from);
}

fn apply_ability(
    ctx: &GameContext,
    state: &mut CombatState,
    mob: MobId,
    ability: AbilityId,
    target: MobId,
    defense: &dyn DefensePolicy,
    res: &mut Resolution,
) {
    let roster = &ctx.roster;
    let info = roster.ability(ability);
    state.cooldowns[ability] = info.cooldown;

    let victim = state.mob(target);
    let cost = roster.mob(target).defense_cost;
    if victim.is_alive() && victim.ap >= cost {
        let desire = defense.defense_desire(ctx, state, target, ability);
        res.defense = Some(desire);
        if desire == DefenseDesire::Block {
            state.change_ap(target, -cost);
            return;
        }
    }

    res.damage = -state.change_hp(roster, target, -info.damage);
    let effect = info.direct_effect();
    if !effect.is_zero() {
        state.mobs[target].buff = state.mobs[target].buff.combine(effect);
    }
    let anchor = state.mob(target).coord;
    state
        .area_buffs
        .extend(info.area_buffs.iter().map(|t| t.anchor(anchor)));

    state.change_ap(mob, -info.cost);
    res.ap_spent += info.cost;
}
