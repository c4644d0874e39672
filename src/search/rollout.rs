//! Default policy for simulations.
//!
//! A cheap greedy player: use the best usable ability on the weakest enemy
//! in reach, otherwise walk toward the nearest enemy, otherwise end the
//! activation.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::board::{AbilityId, Action, CombatState, GameContext, Hex, MobId, Pathfinder, Team};
use crate::movegen::direct_ability_uses;
use crate::resolve::{apply, DefensePolicy};

use super::config::RolloutPolicy;

/// Floor added to ability weights so zero-damage abilities stay possible.
const MIN_WEIGHT: f64 = 0.01;

/// Reward of a finished state for `team`: +1 win, -1 loss, 0 otherwise.
pub fn reward(state: &CombatState, team: Team) -> f64 {
    match state.winner() {
        Some(winner) if winner == team => 1.0,
        Some(_) => -1.0,
        None => 0.0,
    }
}

/// Plays `state` forward with the default policy for at most `ply_cap`
/// actions. Returns the reward for `team` and the plies played.
pub fn rollout(
    ctx: &GameContext,
    mut state: CombatState,
    team: Team,
    policy: RolloutPolicy,
    ply_cap: u32,
    defense: &dyn DefensePolicy,
    rng: &mut impl Rng,
) -> (f64, u32) {
    let mut plies = 0;
    while plies < ply_cap && !state.is_finished() {
        let action = default_action(ctx, &state, policy, rng);
        apply(ctx, &mut state, action, defense);
        plies += 1;
    }
    (reward(&state, team), plies)
}

/// The default policy's choice for the current mob.
pub fn default_action(
    ctx: &GameContext,
    state: &CombatState,
    policy: RolloutPolicy,
    rng: &mut impl Rng,
) -> Action {
    let mob = match state.current_mob() {
        Some(m) if !state.is_finished() => m,
        _ => return Action::EndTurn,
    };

    let uses = direct_ability_uses(ctx, state, mob);
    if !uses.is_empty() {
        return pick_ability_use(ctx, state, &uses, policy, rng);
    }

    match approach(ctx, state, mob) {
        Some(to) => Action::Move { mob, to },
        None => Action::EndTurn,
    }
}

fn pick_ability_use(
    ctx: &GameContext,
    state: &CombatState,
    uses: &[Action],
    policy: RolloutPolicy,
    rng: &mut impl Rng,
) -> Action {
    let mut abilities: Vec<AbilityId> = Vec::new();
    for action in uses {
        if let Action::AbilityUse { ability, .. } = *action {
            if !abilities.contains(&ability) {
                abilities.push(ability);
            }
        }
    }

    let ratio = |a: AbilityId| ctx.roster.ability(a).damage_ratio();
    let best = || {
        abilities
            .iter()
            .copied()
            .fold(None, |best: Option<AbilityId>, a| match best {
                Some(b) if ratio(b) >= ratio(a) => Some(b),
                _ => Some(a),
            })
    };
    let chosen = match policy {
        RolloutPolicy::Deterministic => best(),
        RolloutPolicy::Weighted => {
            match WeightedIndex::new(abilities.iter().map(|&a| ratio(a).max(0.0) + MIN_WEIGHT)) {
                Ok(dist) => Some(abilities[dist.sample(rng)]),
                Err(_) => best(),
            }
        }
    };

    // Weakest target of the chosen ability; first on ties.
    let mut pick = uses[0];
    let mut lowest = i32::MAX;
    for action in uses {
        if let Action::AbilityUse { ability, target, .. } = *action {
            if Some(ability) == chosen && state.mob(target).hp < lowest {
                lowest = state.mob(target).hp;
                pick = *action;
            }
        }
    }
    pick
}

/// The cell closest to the nearest enemy that `mob` can walk to this
/// activation, trying farther enemies when the nearest is walled off.
fn approach(ctx: &GameContext, state: &CombatState, mob: MobId) -> Option<Hex> {
    let instance = state.mob(mob);
    if instance.ap <= 0 {
        return None;
    }
    let team = ctx.roster.mob(mob).team;
    let mut enemies: Vec<Hex> = state
        .living(&ctx.roster, team.opponent())
        .map(|id| state.mob(id).coord)
        .collect();
    enemies.sort_by_key(|&h| instance.coord.distance(h));

    enemies.into_iter().find_map(|enemy| {
        ctx.map
            .furthest_reachable_toward(state, instance.coord, enemy, instance.ap as u32)
    })
}
