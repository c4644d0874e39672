//! Candidate action generation.
//!
//! Produces a small, heuristically pruned set of legal actions for the mob
//! whose activation it is. Tree search is only tractable with a small
//! branching factor, so movement is never enumerated exhaustively by default:
//!
//! 1. direct ability uses from the current cell;
//! 2. attack-moves: for each enemy, the closest reachable cell from which an
//!    ability connects (only when no direct use exists, unless configured);
//! 3. defensive moves: if nothing above applied, up to three random cells of
//!    minimal threat on the heatmap;
//! 4. end turn.

pub mod heatmap;
pub mod legality;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Action, CombatState, GameContext, Hex, MobId, Reachability};
use heatmap::Heatmap;
use legality::{check_ability_use, check_move_with};

pub use legality::{check_action, validate, IllegalAction, InvalidAction};

/// Switches for the branching-control heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Generate attack-moves even when a direct ability use exists.
    pub always_attack_move: bool,
    /// Emit `AttackMove` composites; when false, emit the plain `Move` part.
    pub combined_attack_moves: bool,
    /// Restrict fallback movement to minimal-threat cells. When false, every
    /// reachable cell becomes a plain `Move` candidate.
    pub defensive_moves: bool,
    /// Upper bound on the candidate count once defensive moves are added.
    pub max_defensive_moves: usize,
    /// Offer `EndTurn` only when fewer than two other candidates exist.
    pub last_resort_end_turn: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            always_attack_move: false,
            combined_attack_moves: true,
            defensive_moves: true,
            max_defensive_moves: 3,
            last_resort_end_turn: false,
        }
    }
}

impl GeneratorConfig {
    pub fn with_defensive_moves(mut self, on: bool) -> Self {
        self.defensive_moves = on;
        self
    }

    pub fn with_last_resort_end_turn(mut self, on: bool) -> Self {
        self.last_resort_end_turn = on;
        self
    }

    pub fn with_always_attack_move(mut self, on: bool) -> Self {
        self.always_attack_move = on;
        self
    }

    pub fn with_combined_attack_moves(mut self, on: bool) -> Self {
        self.combined_attack_moves = on;
        self
    }
}

/// Generates the candidate actions for the current mob.
///
/// `allow_movement` is false right after a defensive move, where moving
/// again would only undo the repositioning. Returns an empty vec when the
/// match is finished or no mob is left to act.
pub fn candidate_actions(
    ctx: &GameContext,
    state: &CombatState,
    config: &GeneratorConfig,
    allow_movement: bool,
    rng: &mut impl Rng,
) -> Vec<Action> {
    if state.is_finished() {
        return Vec::new();
    }
    let mob = match state.current_mob() {
        Some(m) => m,
        None => return Vec::new(),
    };

    let mut actions = direct_ability_uses(ctx, state, mob);

    if allow_movement {
        let reach = Reachability::compute(&ctx.map, state, state.mob(mob).coord);

        if actions.is_empty() || config.always_attack_move {
            attack_moves(ctx, state, config, &reach, mob, &mut actions);
        }

        if actions.is_empty() {
            if config.defensive_moves {
                defensive_moves(ctx, state, config, &reach, mob, &mut actions, rng);
            } else {
                let ap = state.mob(mob).ap.max(0) as u32;
                for (to, _) in reach.within(&ctx.map, ap) {
                    actions.push(Action::Move { mob, to });
                }
            }
        }
    }

    if !config.last_resort_end_turn || actions.len() < 2 {
        actions.push(Action::EndTurn);
    }

    actions
}

/// Every affordable, off-cooldown ability against every enemy it can hit
/// from the mob's current cell.
pub fn direct_ability_uses(ctx: &GameContext, state: &CombatState, mob: MobId) -> Vec<Action> {
    let instance = state.mob(mob);
    let team = ctx.roster.mob(mob).team;
    let mut actions = Vec::new();

    for &ability in &ctx.roster.mob(mob).abilities {
        for target in state.living(&ctx.roster, team.opponent()) {
            if check_ability_use(ctx, state, mob, ability, target, instance.coord, instance.ap)
                .is_ok()
            {
                actions.push(Action::AbilityUse {
                    ability,
                    mob,
                    target,
                });
            }
        }
    }

    actions
}

/// One attack-move per enemy: the reachable cell closest to the mob from
/// which one of its abilities connects. Ties keep the first cell found.
fn attack_moves(
    ctx: &GameContext,
    state: &CombatState,
    config: &GeneratorConfig,
    reach: &Reachability,
    mob: MobId,
    actions: &mut Vec<Action>,
) {
    let instance = state.mob(mob);
    let abilities = &ctx.roster.mob(mob).abilities;
    if abilities.is_empty() {
        return;
    }
    let team = ctx.roster.mob(mob).team;
    let cells = reach.within(&ctx.map, instance.ap.max(0) as u32);

    for target in state.living(&ctx.roster, team.opponent()) {
        let mut best: Option<(u32, Hex, usize)> = None;
        for &(cell, distance) in &cells {
            if matches!(best, Some((d, _, _)) if distance >= d) {
                continue;
            }
            let ap_left = instance.ap - distance as i32;
            let usable = abilities.iter().copied().find(|&a| {
                check_ability_use(ctx, state, mob, a, target, cell, ap_left).is_ok()
            });
            if let Some(ability) = usable {
                best = Some((distance, cell, ability));
            }
        }

        if let Some((_, to, ability)) = best {
            debug_assert!(check_move_with(ctx, state, reach, mob, to).is_ok());
            let action = if config.combined_attack_moves {
                Action::AttackMove {
                    mob,
                    to,
                    ability,
                    target,
                }
            } else {
                Action::Move { mob, to }
            };
            if !actions.contains(&action) {
                actions.push(action);
            }
        }
    }
}

/// Up to `max_defensive_moves - |actions|` random reachable cells whose
/// threat equals the heatmap minimum.
fn defensive_moves(
    ctx: &GameContext,
    state: &CombatState,
    config: &GeneratorConfig,
    reach: &Reachability,
    mob: MobId,
    actions: &mut Vec<Action>,
    rng: &mut impl Rng,
) {
    let budget = config.max_defensive_moves.saturating_sub(actions.len());
    if budget == 0 {
        return;
    }
    let heat = Heatmap::compute(ctx, state, mob);
    let ap = state.mob(mob).ap.max(0) as u32;

    let mut coolest: Vec<Hex> = reach
        .within(&ctx.map, ap)
        .into_iter()
        .map(|(h, _)| h)
        .filter(|&h| heat.heat(ctx, h) == heat.min())
        .collect();
    coolest.shuffle(rng);

    for to in coolest.into_iter().take(budget) {
        actions.push(Action::DefensiveMove { mob, to });
    }
}

/// Picks one random candidate action for the current mob, or `EndTurn`
/// when nothing else is available.
pub fn random_action(
    ctx: &GameContext,
    state: &CombatState,
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> Action {
    let actions = candidate_actions(ctx, state, config, true, rng);
    actions.choose(rng).copied().unwrap_or(Action::EndTurn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AbilityInfo, Element, HexMap, MobInfo, Roster, Team};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn seeded_rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn ability(damage: i32, cost: i32, range: u32) -> AbilityInfo {
        AbilityInfo {
            damage,
            cost,
            range,
            cooldown: 0,
            element: Element::Fire,
            buffs: Vec::new(),
            area_buffs: Vec::new(),
        }
    }

    fn mob(team: Team, ap: i32, initiative: i32, abilities: Vec<usize>, origin: Hex) -> MobInfo {
        MobInfo {
            team,
            max_hp: 10,
            max_ap: ap,
            initiative,
            abilities,
            origin,
            defense_cost: 1,
        }
    }

    /// A red mob with the given abilities at the origin and a blue mob at `enemy`.
    fn duel(red_abilities: Vec<AbilityInfo>, red_ap: i32, enemy: Hex) -> (GameContext, CombatState) {
        let mut roster = Roster::default();
        let ids: Vec<usize> = red_abilities.into_iter().map(|a| roster.add_ability(a)).collect();
        roster.add_mob(mob(Team::Red, red_ap, 1, ids, Hex::ORIGIN));
        roster.add_mob(mob(Team::Blue, 3, 2, Vec::new(), enemy));
        let ctx = GameContext::new(HexMap::new(4), roster);
        let state = CombatState::new(&ctx.roster);
        (ctx, state)
    }

    #[test]
    fn no_abilities_exhaustive_moves_plus_end_turn() {
        let (ctx, state) = duel(Vec::new(), 1, Hex::new(2, 0));
        let config = GeneratorConfig::default().with_defensive_moves(false);
        let actions = candidate_actions(&ctx, &state, &config, true, &mut seeded_rng());
        assert_eq!(actions.len(), 7);
        assert_eq!(actions.iter().filter(|a| matches!(a, Action::Move { .. })).count(), 6);
        assert_eq!(*actions.last().unwrap(), Action::EndTurn);
    }

    #[test]
    fn direct_use_suppresses_movement() {
        let (ctx, state) = duel(vec![ability(2, 1, 3)], 3, Hex::new(2, 0));
        let actions = candidate_actions(&ctx, &state, &GeneratorConfig::default(), true, &mut seeded_rng());
        assert_eq!(
            actions,
            vec![Action::AbilityUse { ability: 0, mob: 0, target: 1 }, Action::EndTurn]
        );
    }

    #[test]
    fn attack_move_picks_closest_cell() {
        let (ctx, state) = duel(vec![ability(2, 1, 1)], 4, Hex::new(3, 0));
        let actions = candidate_actions(&ctx, &state, &GeneratorConfig::default(), true, &mut seeded_rng());
        assert_eq!(actions.len(), 2);
        match actions[0] {
            Action::AttackMove { mob, to, ability, target } => {
                assert_eq!((mob, ability, target), (0, 0, 1));
                assert_eq!(to.distance(Hex::ORIGIN), 2);
                assert_eq!(to.distance(Hex::new(3, 0)), 1);
            }
            other => panic!("expected attack-move, got {other}"),
        }
    }

    #[test]
    fn attack_move_can_emit_plain_move() {
        let (ctx, state) = duel(vec![ability(2, 1, 1)], 4, Hex::new(3, 0));
        let config = GeneratorConfig::default().with_combined_attack_moves(false);
        let actions = candidate_actions(&ctx, &state, &config, true, &mut seeded_rng());
        assert!(matches!(actions[0], Action::Move { .. }));
    }

    #[test]
    fn defensive_moves_are_capped_at_three() {
        // The enemy is far out of reach, so only defensive moves remain.
        let (ctx, state) = duel(vec![ability(2, 3, 1)], 3, Hex::new(4, 0));
        let actions = candidate_actions(&ctx, &state, &GeneratorConfig::default(), true, &mut seeded_rng());
        let defensive = actions
            .iter()
            .filter(|a| matches!(a, Action::DefensiveMove { .. }))
            .count();
        assert_eq!(defensive, 3);
        assert_eq!(actions.len(), 4);
    }

    #[test]
    fn no_movement_after_defensive_move() {
        let (ctx, state) = duel(vec![ability(2, 3, 1)], 3, Hex::new(4, 0));
        let actions = candidate_actions(&ctx, &state, &GeneratorConfig::default(), false, &mut seeded_rng());
        assert_eq!(actions, vec![Action::EndTurn]);
    }

    #[test]
    fn last_resort_end_turn_only_when_few_options() {
        let (ctx, state) = duel(Vec::new(), 1, Hex::new(2, 0));
        let config = GeneratorConfig::default()
            .with_defensive_moves(false)
            .with_last_resort_end_turn(true);
        let actions = candidate_actions(&ctx, &state, &config, true, &mut seeded_rng());
        assert!(!actions.contains(&Action::EndTurn));

        let (ctx, state) = duel(vec![ability(2, 1, 3)], 3, Hex::new(2, 0));
        let actions = candidate_actions(&ctx, &state, &config, true, &mut seeded_rng());
        assert!(actions.contains(&Action::EndTurn));
    }

    #[test]
    fn every_candidate_is_legal() {
        let (ctx, state) = duel(vec![ability(2, 1, 1), ability(1, 1, 3)], 4, Hex::new(3, -1));
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            for config in [
                GeneratorConfig::default(),
                GeneratorConfig::default().with_always_attack_move(true),
                GeneratorConfig::default().with_defensive_moves(false),
            ] {
                for action in candidate_actions(&ctx, &state, &config, true, &mut rng) {
                    assert_eq!(check_action(&ctx, &state, action), Ok(()), "{action}");
                }
            }
        }
    }

    #[test]
    fn finished_match_has_no_candidates() {
        let (ctx, mut state) = duel(Vec::new(), 1, Hex::new(2, 0));
        state.change_hp(&ctx.roster, 1, -10);
        assert!(candidate_actions(&ctx, &state, &GeneratorConfig::default(), true, &mut seeded_rng()).is_empty());
    }

    #[test]
    fn random_action_is_deterministic_with_seed() {
        let (ctx, state) = duel(Vec::new(), 2, Hex::new(3, 0));
        let config = GeneratorConfig::default().with_defensive_moves(false);
        let a = random_action(&ctx, &state, &config, &mut SmallRng::seed_from_u64(7));
        let b = random_action(&ctx, &state, &config, &mut SmallRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
