//! Live match driver.
//!
//! Unlike the search, the live path always validates: an illegal action is
//! reported as an error together with the most recent committed actions.
//! Observers are told about every committed ability use, move and defense
//! decision.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board::{AbilityId, Action, CombatState, GameContext, Hex, MobId, Team};
use crate::controller::Controller;
use crate::movegen::{validate, IllegalAction, InvalidAction};
use crate::resolve::{apply, DefenseDesire, DefensePolicy, Resolution};

/// Default number of committed actions kept for error reports.
pub const DEFAULT_HISTORY_LEN: usize = 16;

/// Times a mob may re-plan within one activation after its plan went stale.
const MAX_REPLANS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("illegal action `{action}`: {reason}")]
    IllegalAction {
        action: Action,
        reason: IllegalAction,
        /// Most recent committed actions, oldest first.
        recent: Vec<Action>,
    },

    #[error("no mob is scheduled to act")]
    NoCurrentMob,

    #[error("the match is already finished")]
    Finished,
}

/// Notifications for committed actions. All methods default to no-ops.
pub trait MatchObserver: Send {
    fn ability_used(
        &mut self,
        _ctx: &GameContext,
        _state: &CombatState,
        _mob: MobId,
        _ability: AbilityId,
        _target: MobId,
        _resolution: &Resolution,
    ) {
    }

    fn mob_moved(&mut self, _ctx: &GameContext, _state: &CombatState, _mob: MobId, _from: Hex, _to: Hex) {}

    fn defense_desire_resolved(
        &mut self,
        _ctx: &GameContext,
        _state: &CombatState,
        _defender: MobId,
        _ability: AbilityId,
        _desire: DefenseDesire,
    ) {
    }
}

/// Writes every notification to the `tracing` log at debug level.
#[derive(Debug, Default)]
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn ability_used(
        &mut self,
        _ctx: &GameContext,
        state: &CombatState,
        mob: MobId,
        ability: AbilityId,
        target: MobId,
        resolution: &Resolution,
    ) {
        debug!(
            mob,
            ability,
            target,
            damage = resolution.damage,
            target_hp = state.mob(target).hp,
            "ability used"
        );
    }

    fn mob_moved(&mut self, _ctx: &GameContext, state: &CombatState, mob: MobId, from: Hex, to: Hex) {
        debug!(mob, %from, %to, ap = state.mob(mob).ap, "mob moved");
    }

    fn defense_desire_resolved(
        &mut self,
        _ctx: &GameContext,
        _state: &CombatState,
        defender: MobId,
        ability: AbilityId,
        desire: DefenseDesire,
    ) {
        debug!(defender, ability, ?desire, "defense resolved");
    }
}

/// Routes block queries to the defender's team controller.
pub struct TeamDefense<'a> {
    pub red: &'a dyn Controller,
    pub blue: &'a dyn Controller,
}

impl DefensePolicy for TeamDefense<'_> {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire {
        match ctx.roster.mob(defender).team {
            Team::Red => self.red.defense_desire(ctx, state, defender, ability),
            Team::Blue => self.blue.defense_desire(ctx, state, defender, ability),
        }
    }
}

/// Validates and applies `action`, then notifies `observers`.
pub fn commit_action(
    ctx: &GameContext,
    state: &mut CombatState,
    action: Action,
    defense: &dyn DefensePolicy,
    observers: &mut [Box<dyn MatchObserver>],
) -> Result<Resolution, InvalidAction> {
    validate(ctx, state, action)?;
    let res = apply(ctx, state, action, defense);

    if let (Some(from), Some(Action::Move { mob, to })) = (res.moved_from, action.to_move()) {
        for obs in observers.iter_mut() {
            obs.mob_moved(ctx, state, mob, from, to);
        }
    }
    if let Some(Action::AbilityUse { ability, mob, target }) = action.to_ability_use() {
        for obs in observers.iter_mut() {
            if let Some(desire) = res.defense {
                obs.defense_desire_resolved(ctx, state, target, ability, desire);
            }
            obs.ability_used(ctx, state, mob, ability, target, &res);
        }
    }
    Ok(res)
}

/// Bounded ring of the most recently committed actions.
#[derive(Debug, Clone)]
pub struct History {
    actions: VecDeque<Action>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        History {
            actions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, action: Action) {
        if self.capacity == 0 {
            return;
        }
        if self.actions.len() == self.capacity {
            self.actions.pop_front();
        }
        self.actions.push_back(action);
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<Action> {
        self.actions.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Changes the capacity, dropping the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.actions.len() > capacity {
            self.actions.pop_front();
        }
    }
}

impl Default for History {
    fn default() -> Self {
        History::new(DEFAULT_HISTORY_LEN)
    }
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    /// `None` for a draw or a match stopped at the turn limit.
    pub winner: Option<Team>,
    pub turns: u32,
    pub red_hp: i32,
    pub blue_hp: i32,
    /// Committed actions, `EndTurn` included.
    pub actions: u64,
}

/// A live match between two controllers.
pub struct Match {
    ctx: GameContext,
    state: CombatState,
    red: Box<dyn Controller>,
    blue: Box<dyn Controller>,
    observers: Vec<Box<dyn MatchObserver>>,
    history: History,
    actions: u64,
}

impl Match {
    /// Starts a match from the roster's opening state.
    pub fn new(ctx: GameContext, red: Box<dyn Controller>, blue: Box<dyn Controller>) -> Self {
        let state = CombatState::new(&ctx.roster);
        Match {
            ctx,
            state,
            red,
            blue,
            observers: Vec::new(),
            history: History::default(),
            actions: 0,
        }
    }

    /// Replaces the starting state.
    pub fn with_state(mut self, state: CombatState) -> Self {
        self.state = state;
        self
    }

    pub fn with_history_len(mut self, len: usize) -> Self {
        self.history.set_capacity(len);
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn MatchObserver>) {
        self.observers.push(observer);
    }

    pub fn ctx(&self) -> &GameContext {
        &self.ctx
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn recent_actions(&self) -> Vec<Action> {
        self.history.recent()
    }

    /// Validates and commits one action to the live state.
    pub fn commit(&mut self, action: Action) -> Result<Resolution, MatchError> {
        let defense = TeamDefense {
            red: self.red.as_ref(),
            blue: self.blue.as_ref(),
        };
        match commit_action(&self.ctx, &mut self.state, action, &defense, &mut self.observers) {
            Ok(res) => {
                self.history.push(action);
                self.actions += 1;
                Ok(res)
            }
            Err(InvalidAction { action, reason }) => Err(MatchError::IllegalAction {
                action,
                reason,
                recent: self.history.recent(),
            }),
        }
    }

    /// Plays one mob activation: asks the mob's controller for a plan,
    /// commits it, then ends the activation.
    ///
    /// A defender may answer a block query differently from what the
    /// planner assumed, which can make the rest of a plan illegal. The mob
    /// then re-plans from the live state. An illegal first action of a plan
    /// is an error.
    pub fn play_turn(&mut self) -> Result<(), MatchError> {
        if self.state.is_finished() {
            return Err(MatchError::Finished);
        }
        let mob = self.state.current_mob().ok_or(MatchError::NoCurrentMob)?;
        let team = self.ctx.roster.mob(mob).team;

        for _ in 0..=MAX_REPLANS {
            let controller = match team {
                Team::Red => &mut self.red,
                Team::Blue => &mut self.blue,
            };
            let plan = controller.choose_turn_actions(&self.ctx, &self.state);
            if plan.is_empty() {
                break;
            }

            let mut stale = false;
            for (i, action) in plan.into_iter().enumerate() {
                if action.is_end_turn() || self.state.is_finished() {
                    break;
                }
                if i > 0 && validate(&self.ctx, &self.state, action).is_err() {
                    debug!(mob, %action, "plan went stale, re-planning");
                    stale = true;
                    break;
                }
                self.commit(action)?;
            }
            if !stale {
                break;
            }
        }

        if !self.state.is_finished() {
            self.commit(Action::EndTurn)?;
        }
        Ok(())
    }

    /// Plays until the match is finished or `max_turns` full turns passed.
    pub fn run(&mut self, max_turns: u32) -> Result<MatchOutcome, MatchError> {
        while !self.state.is_finished() && self.state.turn_number <= max_turns {
            self.play_turn()?;
        }
        let outcome = self.outcome();
        if self.state.is_finished() {
            info!(
                winner = outcome.winner.map_or("draw", Team::name),
                turns = outcome.turns,
                red_hp = outcome.red_hp,
                blue_hp = outcome.blue_hp,
                "match finished"
            );
        } else {
            warn!(turns = max_turns, "match stopped at turn limit");
        }
        Ok(outcome)
    }

    pub fn outcome(&self) -> MatchOutcome {
        MatchOutcome {
            winner: self.state.winner(),
            turns: self.state.turn_number,
            red_hp: self.state.red_total_hp,
            blue_hp: self.state.blue_total_hp,
            actions: self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{AbilityInfo, Element, HexMap, MobInfo, Roster};
    use crate::controller::{RandomController, RuleBasedController, UctController};
    use crate::movegen::GeneratorConfig;
    use crate::resolve::DefenseMode;
    use crate::search::{RolloutPolicy, SearchConfig};
    use std::sync::{Arc, Mutex};

    fn context() -> GameContext {
        let mut roster = Roster::default();
        for element in [Element::Fire, Element::Water] {
            roster.add_ability(AbilityInfo {
                damage: 2,
                cost: 2,
                range: 2,
                cooldown: 0,
                element,
                buffs: Vec::new(),
                area_buffs: Vec::new(),
            });
        }
        roster.add_mob(MobInfo {
            team: Team::Red,
            max_hp: 6,
            max_ap: 4,
            initiative: 1,
            abilities: vec![0],
            origin: Hex::new(-1, 0),
            defense_cost: 2,
        });
        roster.add_mob(MobInfo {
            team: Team::Blue,
            max_hp: 6,
            max_ap: 4,
            initiative: 2,
            abilities: vec![1],
            origin: Hex::new(2, 0),
            defense_cost: 2,
        });
        GameContext::new(HexMap::new(3), roster)
    }

    fn rules(defense: DefenseMode) -> Box<dyn Controller> {
        Box::new(RuleBasedController::new(RolloutPolicy::Deterministic, defense, 1))
    }

    #[derive(Default)]
    struct Counts {
        used: usize,
        moved: usize,
        defended: usize,
    }

    struct Recorder(Arc<Mutex<Counts>>);

    impl MatchObserver for Recorder {
        fn ability_used(&mut self, _: &GameContext, _: &CombatState, _: MobId, _: AbilityId, _: MobId, _: &Resolution) {
            self.0.lock().unwrap().used += 1;
        }

        fn mob_moved(&mut self, _: &GameContext, _: &CombatState, _: MobId, _: Hex, _: Hex) {
            self.0.lock().unwrap().moved += 1;
        }

        fn defense_desire_resolved(&mut self, _: &GameContext, _: &CombatState, _: MobId, _: AbilityId, _: DefenseDesire) {
            self.0.lock().unwrap().defended += 1;
        }
    }

    #[test]
    fn illegal_commit_reports_recent_actions() {
        let mut game = Match::new(context(), rules(DefenseMode::Pass), rules(DefenseMode::Pass));
        game.commit(Action::EndTurn).unwrap();
        let err = game.commit(Action::Move { mob: 0, to: Hex::new(0, 0) }).unwrap_err();
        match err {
            MatchError::IllegalAction { action, reason, recent } => {
                assert_eq!(action, Action::Move { mob: 0, to: Hex::new(0, 0) });
                assert_eq!(reason, IllegalAction::NotCurrentMob { mob: 0, current: 1 });
                assert_eq!(recent, vec![Action::EndTurn]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn play_turn_ends_the_activation() {
        let mut game = Match::new(context(), rules(DefenseMode::Pass), rules(DefenseMode::Pass));
        game.play_turn().unwrap();
        assert_eq!(game.state().current_mob(), Some(1));
        assert_eq!(game.recent_actions().last(), Some(&Action::EndTurn));
    }

    #[test]
    fn observers_see_moves_and_hits() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let mut game = Match::new(context(), rules(DefenseMode::Pass), rules(DefenseMode::Pass));
        game.add_observer(Box::new(Recorder(Arc::clone(&counts))));
        // Red walks into range and strikes; blue can afford to be asked.
        game.play_turn().unwrap();
        let counts = counts.lock().unwrap();
        assert_eq!(counts.moved, 1);
        assert_eq!(counts.used, 1);
        assert_eq!(counts.defended, 1);
    }

    #[test]
    fn blocking_defender_takes_no_damage() {
        let mut game = Match::new(context(), rules(DefenseMode::Pass), rules(DefenseMode::Block));
        game.play_turn().unwrap();
        assert_eq!(game.state().mob(1).hp, 6);
        assert_eq!(game.state().mob(1).ap, 2);
    }

    #[test]
    fn rule_based_match_runs_to_completion() {
        let mut game = Match::new(context(), rules(DefenseMode::Pass), rules(DefenseMode::Pass));
        let outcome = game.run(50).unwrap();
        assert!(outcome.winner.is_some());
        assert!(outcome.red_hp == 0 || outcome.blue_hp == 0);
        assert!(outcome.actions > 0);
        assert_eq!(game.play_turn().unwrap_err(), MatchError::Finished);
    }

    #[test]
    fn uct_against_random_stays_legal() {
        let red = Box::new(UctController::new(SearchConfig::for_testing().with_iterations(60)));
        let blue = Box::new(RandomController::new(GeneratorConfig::default(), DefenseMode::Pass, 5));
        let mut game = Match::new(context(), red, blue).with_history_len(4);
        let outcome = game.run(6).unwrap();
        assert!(outcome.turns >= 1);
        assert!(game.recent_actions().len() <= 4);
    }

    #[test]
    fn history_ring_is_bounded() {
        let mut history = History::new(2);
        history.push(Action::EndTurn);
        history.push(Action::Null);
        history.push(Action::Move { mob: 0, to: Hex::new(1, 0) });
        assert_eq!(history.recent(), vec![Action::Null, Action::Move { mob: 0, to: Hex::new(1, 0) }]);
        history.set_capacity(1);
        assert_eq!(history.recent().len(), 1);
    }
}
