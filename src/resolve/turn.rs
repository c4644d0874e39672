//! Turn sequencing.
//!
//! Walks the fixed initiative order one mob at a time. When the order is
//! exhausted a new turn starts: AP refills, buffs and area effects tick,
//! cooldowns decay, and mobs killed since the last boundary leave the order
//! for good.

use crate::board::{Buff, CombatState, GameContext};

/// Advances to the next living mob, starting a new turn when the current
/// cycle through the initiative order is done.
pub fn next_mob_or_end_turn(ctx: &GameContext, state: &mut CombatState) {
    loop {
        state.current_index += 1;
        if state.current_index >= state.turn_order.len() {
            start_new_turn(ctx, state);
            return;
        }
        let id = state.turn_order[state.current_index];
        if state.mobs[id].is_alive() {
            return;
        }
    }
}

/// Applies start-of-turn effects and rewinds to the first living mob.
///
/// Per mob, the stacked buff ticks before area effects. A mob brought to
/// zero HP here is pruned before it can act in the new turn.
pub fn start_new_turn(ctx: &GameContext, state: &mut CombatState) {
    let roster = &ctx.roster;
    state.turn_number += 1;

    for id in 0..state.mobs.len() {
        if !state.mobs[id].is_alive() {
            continue;
        }
        state.mobs[id].ap = roster.mob(id).max_ap;

        let buff = state.mobs[id].buff;
        if !buff.is_zero() {
            state.change_hp(roster, id, buff.hp_change);
            state.change_ap(id, buff.ap_change);
            let lifetime = buff.lifetime - 1;
            state.mobs[id].buff = if lifetime == 0 {
                Buff::ZERO
            } else {
                Buff { lifetime, ..buff }
            };
        }

        let coord = state.mobs[id].coord;
        for i in 0..state.area_buffs.len() {
            let area = state.area_buffs[i];
            if area.covers(coord) {
                state.change_hp(roster, id, area.effect.hp_change);
                state.change_ap(id, area.effect.ap_change);
            }
        }
    }

    for area in state.area_buffs.iter_mut() {
        area.effect.lifetime = area.effect.lifetime.saturating_sub(1);
    }
    state.area_buffs.retain(|a| !a.effect.is_zero());

    for cd in state.cooldowns.iter_mut() {
        *cd = cd.saturating_sub(1);
    }

    let mobs = &state.mobs;
    state.turn_order.retain(|&id| mobs[id].is_alive());
    state.current_index = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AbilityInfo, AreaBuff, Element, Hex, HexMap, MobInfo, Roster, Team};

    fn ctx_with(initiatives: &[(Team, i32)]) -> GameContext {
        let mut roster = Roster::default();
        roster.add_ability(AbilityInfo {
            damage: 1,
            cost: 1,
            range: 1,
            cooldown: 2,
            element: Element::Fire,
            buffs: Vec::new(),
            area_buffs: Vec::new(),
        });
        for (i, &(team, initiative)) in initiatives.iter().enumerate() {
            roster.add_mob(MobInfo {
                team,
                max_hp: 6,
                max_ap: 4,
                initiative,
                abilities: Vec::new(),
                origin: Hex::new(i as i32 - 2, 0),
                defense_cost: 1,
            });
        }
        GameContext::new(HexMap::new(3), roster)
    }

    #[test]
    fn cycles_in_initiative_order() {
        let ctx = ctx_with(&[(Team::Red, 1), (Team::Blue, 2), (Team::Blue, 3), (Team::Red, 4)]);
        let mut state = CombatState::new(&ctx.roster);
        let mut seen = vec![state.current_mob().unwrap()];
        for _ in 0..3 {
            next_mob_or_end_turn(&ctx, &mut state);
            seen.push(state.current_mob().unwrap());
            assert_eq!(state.turn_number, 1);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        next_mob_or_end_turn(&ctx, &mut state);
        assert_eq!(state.turn_number, 2);
        assert_eq!(state.current_mob(), Some(0));
    }

    #[test]
    fn dead_mobs_are_skipped_then_pruned() {
        let ctx = ctx_with(&[(Team::Red, 1), (Team::Blue, 2), (Team::Blue, 3), (Team::Red, 4)]);
        let mut state = CombatState::new(&ctx.roster);
        state.change_hp(&ctx.roster, 1, -6);
        next_mob_or_end_turn(&ctx, &mut state);
        assert_eq!(state.current_mob(), Some(2));
        assert_eq!(state.turn_order.len(), 4);

        next_mob_or_end_turn(&ctx, &mut state);
        next_mob_or_end_turn(&ctx, &mut state);
        assert_eq!(state.turn_order, vec![0, 2, 3]);
        assert_eq!(state.current_mob(), Some(0));
    }

    #[test]
    fn new_turn_refills_ap_and_decays_cooldowns() {
        let ctx = ctx_with(&[(Team::Red, 1), (Team::Blue, 2)]);
        let mut state = CombatState::new(&ctx.roster);
        state.mobs[0].ap = 0;
        state.cooldowns[0] = 2;
        start_new_turn(&ctx, &mut state);
        assert_eq!(state.mobs[0].ap, 4);
        assert_eq!(state.cooldowns[0], 1);
        start_new_turn(&ctx, &mut state);
        start_new_turn(&ctx, &mut state);
        assert_eq!(state.cooldowns[0], 0);
    }

    #[test]
    fn buff_ticks_and_expires() {
        let ctx = ctx_with(&[(Team::Red, 1), (Team::Blue, 2)]);
        let mut state = CombatState::new(&ctx.roster);
        state.mobs[1].buff = Buff::new(Element::Fire, -1, -1, 2);

        start_new_turn(&ctx, &mut state);
        assert_eq!(state.mobs[1].hp, 5);
        assert_eq!(state.mobs[1].ap, 3);
        assert_eq!(state.mobs[1].buff.lifetime, 1);

        start_new_turn(&ctx, &mut state);
        assert_eq!(state.mobs[1].hp, 4);
        assert!(state.mobs[1].buff.is_zero());

        start_new_turn(&ctx, &mut state);
        assert_eq!(state.mobs[1].hp, 4);
        assert_eq!(state.mobs[1].ap, 4);
        assert_eq!(state.blue_total_hp, 4);
    }

    #[test]
    fn area_buffs_hit_covered_mobs_and_expire() {
        let ctx = ctx_with(&[(Team::Red, 1), (Team::Blue, 2)]);
        let mut state = CombatState::new(&ctx.roster);
        // Mob 0 stands at (-2, 0), mob 1 at (-1, 0).
        state.area_buffs.push(AreaBuff {
            coord: Hex::new(-2, 0),
            radius: 0,
            effect: Buff::new(Element::Fire, -2, 0, 1),
        });
        start_new_turn(&ctx, &mut state);
        assert_eq!(state.mobs[0].hp, 4);
        assert_eq!(state.mobs[1].hp, 6);
        assert!(state.area_buffs.is_empty());
    }

    #[test]
    fn dot_kill_at_boundary_prunes_before_acting() {
        let ctx = ctx_with(&[(Team::Red, 1), (Team::Blue, 2), (Team::Blue, 3)]);
        let mut state = CombatState::new(&ctx.roster);
        state.mobs[0].buff = Buff::new(Element::Fire, -6, 0, 3);
        state.current_index = 2;
        next_mob_or_end_turn(&ctx, &mut state);
        assert_eq!(state.mobs[0].hp, 0);
        assert_eq!(state.turn_order, vec![1, 2]);
        assert_eq!(state.current_mob(), Some(1));
        assert!(state.is_finished());
    }
}
