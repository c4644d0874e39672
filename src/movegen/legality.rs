//! Legality predicates for actions.
//!
//! Every check is a pure function of the context and state. A failed check
//! names the exact predicate that failed so that an illegal action reaching
//! the transition function can be reported precisely.

use thiserror::Error;

use crate::board::{AbilityId, Action, CombatState, GameContext, Hex, MobId, Pathfinder, Reachability};

/// The legality predicate an action failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalAction {
    #[error("the match is already finished")]
    MatchFinished,

    #[error("no mob is scheduled to act")]
    NoCurrentMob,

    #[error("mob {0} does not exist")]
    UnknownMob(MobId),

    #[error("mob {mob} is not the current mob (current is {current})")]
    NotCurrentMob { mob: MobId, current: MobId },

    #[error("ability {0} does not exist")]
    UnknownAbility(AbilityId),

    #[error("mob {mob} does not own ability {ability}")]
    AbilityNotOwned { mob: MobId, ability: AbilityId },

    #[error("ability {ability} is on cooldown for {remaining} more turns")]
    CooldownActive { ability: AbilityId, remaining: u32 },

    #[error("insufficient AP: have {have}, need {need}")]
    InsufficientAp { have: i32, need: i32 },

    #[error("target {0} is dead")]
    TargetDead(MobId),

    #[error("target {target} is on the same team as mob {mob}")]
    FriendlyTarget { mob: MobId, target: MobId },

    #[error("target {target} is {distance} cells away, ability range is {range}")]
    OutOfRange {
        target: MobId,
        distance: u32,
        range: u32,
    },

    #[error("no line of sight from {from} to {to}")]
    NoLineOfSight { from: Hex, to: Hex },

    #[error("destination {0} is off the map")]
    OffMap(Hex),

    #[error("destination {0} is a wall")]
    DestinationWall(Hex),

    #[error("destination {0} is occupied")]
    DestinationOccupied(Hex),

    #[error("destination {0} is the mob's own cell")]
    DestinationIsOrigin(Hex),

    #[error("destination {0} is unreachable")]
    Unreachable(Hex),

    #[error("action cannot be applied to a state")]
    NotApplicable,
}

/// An action together with the predicate it failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal action `{action}`: {reason}")]
pub struct InvalidAction {
    pub action: Action,
    pub reason: IllegalAction,
}

/// Checks a move of `mob` to `to`. Returns the path distance on success.
pub fn check_move(
    ctx: &GameContext,
    state: &CombatState,
    mob: MobId,
    to: Hex,
) -> Result<u32, IllegalAction> {
    let reach = Reachability::compute(&ctx.map, state, state.mob(mob).coord);
    check_move_with(ctx, state, &reach, mob, to)
}

/// `check_move` against a precomputed search from the mob's cell.
pub fn check_move_with(
    ctx: &GameContext,
    state: &CombatState,
    reach: &Reachability,
    mob: MobId,
    to: Hex,
) -> Result<u32, IllegalAction> {
    let instance = state.mob(mob);
    if !ctx.map.contains(to) {
        return Err(IllegalAction::OffMap(to));
    }
    if ctx.map.is_wall(to) {
        return Err(IllegalAction::DestinationWall(to));
    }
    if to == instance.coord {
        return Err(IllegalAction::DestinationIsOrigin(to));
    }
    if state.is_occupied(to) {
        return Err(IllegalAction::DestinationOccupied(to));
    }
    let distance = reach
        .distance(&ctx.map, to)
        .ok_or(IllegalAction::Unreachable(to))?;
    if distance as i32 > instance.ap {
        return Err(IllegalAction::InsufficientAp {
            have: instance.ap,
            need: distance as i32,
        });
    }
    Ok(distance)
}

/// Checks `mob` using `ability` on `target` while standing on `from` with
/// `ap` action points left.
pub fn check_ability_use(
    ctx: &GameContext,
    state: &CombatState,
    mob: MobId,
    ability: AbilityId,
    target: MobId,
    from: Hex,
    ap: i32,
) -> Result<(), IllegalAction> {
    let roster = &ctx.roster;
    if ability >= roster.abilities.len() {
        return Err(IllegalAction::UnknownAbility(ability));
    }
    if !roster.owns(mob, ability) {
        return Err(IllegalAction::AbilityNotOwned { mob, ability });
    }
    let info = roster.ability(ability);
    let remaining = state.cooldown(ability);
    if remaining > 0 {
        return Err(IllegalAction::CooldownActive { ability, remaining });
    }
    if ap < info.cost {
        return Err(IllegalAction::InsufficientAp {
            have: ap,
            need: info.cost,
        });
    }
    if target >= roster.mobs.len() {
        return Err(IllegalAction::UnknownMob(target));
    }
    let victim = state.mob(target);
    if !victim.is_alive() && !ctx.rules.allow_corpse_targeting {
        return Err(IllegalAction::TargetDead(target));
    }
    if roster.mob(target).team == roster.mob(mob).team {
        return Err(IllegalAction::FriendlyTarget { mob, target });
    }
    let distance = from.distance(victim.coord);
    if distance > info.range {
        return Err(IllegalAction::OutOfRange {
            target,
            distance,
            range: info.range,
        });
    }
    if !ctx.map.is_visible(from, victim.coord) {
        return Err(IllegalAction::NoLineOfSight {
            from,
            to: victim.coord,
        });
    }
    Ok(())
}

/// Checks any action against the current state.
pub fn check_action(
    ctx: &GameContext,
    state: &CombatState,
    action: Action,
) -> Result<(), IllegalAction> {
    let mob = match action {
        Action::Null => return Err(IllegalAction::NotApplicable),
        Action::EndTurn => return Ok(()),
        other => other.mob().ok_or(IllegalAction::NotApplicable)?,
    };

    if state.is_finished() {
        return Err(IllegalAction::MatchFinished);
    }
    if mob >= ctx.roster.mobs.len() {
        return Err(IllegalAction::UnknownMob(mob));
    }
    let current = state.current_mob().ok_or(IllegalAction::NoCurrentMob)?;
    if current != mob {
        return Err(IllegalAction::NotCurrentMob { mob, current });
    }

    let instance = state.mob(mob);
    match action {
        Action::AbilityUse { ability, target, .. } => {
            check_ability_use(ctx, state, mob, ability, target, instance.coord, instance.ap)
        }
        Action::Move { to, .. } | Action::DefensiveMove { to, .. } => {
            check_move(ctx, state, mob, to).map(|_| ())
        }
        Action::AttackMove {
            to,
            ability,
            target,
            ..
        } => {
            let distance = check_move(ctx, state, mob, to)?;
            check_ability_use(ctx, state, mob, ability, target, to, instance.ap - distance as i32)
        }
        Action::Null | Action::EndTurn => Ok(()),
    }
}

/// `check_action`, with the failure tied to the action for reporting.
pub fn validate(ctx: &GameContext, state: &CombatState, action: Action) -> Result<(), InvalidAction> {
    check_action(ctx, state, action).map_err(|reason| InvalidAction { action, reason })
}
