//! Controllers: whoever decides what a team does.
//!
//! A controller answers two questions for its team: which actions the
//! current mob takes this activation, and whether a defender blocks an
//! incoming ability. The match driver owns one controller per team.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{AbilityId, Action, CombatState, GameContext, MobId};
use crate::movegen::{candidate_actions, GeneratorConfig};
use crate::resolve::{apply, DefenseDesire, DefenseMode, DefensePolicy};
use crate::search::{default_action, uct_search, RolloutPolicy, SearchConfig, SearchStats};

/// Upper bound on actions a non-search controller plans for one activation.
const MAX_PLAN_LEN: usize = 32;

/// A team's decision maker.
///
/// `DefensePolicy` supplies the defense answer; the match driver routes
/// block queries to the defender's team controller.
pub trait Controller: DefensePolicy + Send {
    fn name(&self) -> &str;

    /// Ordered actions for the current mob, without the trailing `EndTurn`.
    /// An empty plan ends the activation immediately.
    fn choose_turn_actions(&mut self, ctx: &GameContext, state: &CombatState) -> Vec<Action>;
}

/// A seeded generator, or one from entropy for seed 0.
pub fn rng_from_seed(seed: u64) -> SmallRng {
    if seed == 0 {
        SmallRng::from_entropy()
    } else {
        SmallRng::seed_from_u64(seed)
    }
}

/// Plays the UCT search result.
pub struct UctController {
    config: SearchConfig,
    rng: SmallRng,
    last_stats: Option<SearchStats>,
}

impl UctController {
    pub fn new(config: SearchConfig) -> Self {
        UctController {
            rng: rng_from_seed(config.seed),
            config,
            last_stats: None,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Statistics of the most recent search, if one ran.
    pub fn last_stats(&self) -> Option<&SearchStats> {
        self.last_stats.as_ref()
    }
}

impl DefensePolicy for UctController {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire {
        self.config.defense.defense_desire(ctx, state, defender, ability)
    }
}

impl Controller for UctController {
    fn name(&self) -> &str {
        "uct"
    }

    fn choose_turn_actions(&mut self, ctx: &GameContext, state: &CombatState) -> Vec<Action> {
        match uct_search(ctx, state, &self.config, &mut self.rng) {
            Ok(result) => {
                self.last_stats = Some(result.stats);
                result.actions
            }
            Err(e) => {
                debug!(error = %e, "search skipped");
                Vec::new()
            }
        }
    }
}

/// Plays the rollout default policy greedily for a whole activation.
pub struct RuleBasedController {
    policy: RolloutPolicy,
    defense: DefenseMode,
    rng: SmallRng,
}

impl RuleBasedController {
    pub fn new(policy: RolloutPolicy, defense: DefenseMode, seed: u64) -> Self {
        RuleBasedController {
            policy,
            defense,
            rng: rng_from_seed(seed),
        }
    }
}

impl DefensePolicy for RuleBasedController {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire {
        self.defense.defense_desire(ctx, state, defender, ability)
    }
}

impl Controller for RuleBasedController {
    fn name(&self) -> &str {
        "rules"
    }

    fn choose_turn_actions(&mut self, ctx: &GameContext, state: &CombatState) -> Vec<Action> {
        let mob = state.current_mob();
        let mut sim = state.clone();
        let mut plan = Vec::new();
        while plan.len() < MAX_PLAN_LEN && !sim.is_finished() && sim.current_mob() == mob {
            let action = default_action(ctx, &sim, self.policy, &mut self.rng);
            if action.is_end_turn() {
                break;
            }
            apply(ctx, &mut sim, action, &self.defense);
            plan.push(action);
        }
        plan
    }
}

/// Picks uniformly among the generator's candidates until it draws `EndTurn`.
pub struct RandomController {
    generator: GeneratorConfig,
    defense: DefenseMode,
    rng: SmallRng,
}

impl RandomController {
    pub fn new(generator: GeneratorConfig, defense: DefenseMode, seed: u64) -> Self {
        RandomController {
            generator,
            defense,
            rng: rng_from_seed(seed),
        }
    }
}

impl DefensePolicy for RandomController {
    fn defense_desire(
        &self,
        ctx: &GameContext,
        state: &CombatState,
        defender: MobId,
        ability: AbilityId,
    ) -> DefenseDesire {
        self.defense.defense_desire(ctx, state, defender, ability)
    }
}

impl Controller for RandomController {
    fn name(&self) -> &str {
        "random"
    }

    fn choose_turn_actions(&mut self, ctx: &GameContext, state: &CombatState) -> Vec<Action> {
        use rand::seq::SliceRandom;

        let mut sim = state.clone();
        let mut plan: Vec<Action> = Vec::new();
        while plan.len() < MAX_PLAN_LEN && !sim.is_finished() {
            let allow_movement = !matches!(plan.last(), Some(Action::DefensiveMove { .. }));
            let candidates = candidate_actions(ctx, &sim, &self.generator, allow_movement, &mut self.rng);
            let action = match candidates.choose(&mut self.rng) {
                Some(&a) if !a.is_end_turn() => a,
                _ => break,
            };
            apply(ctx, &mut sim, action, &self.defense);
            plan.push(action);
        }
        plan
    }
}

/// Controller choice in configuration files and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    #[default]
    Uct,
    RuleBased,
    Random,
}

impl ControllerKind {
    pub fn from_name(name: &str) -> Option<ControllerKind> {
        match name.to_ascii_lowercase().as_str() {
            "uct" | "mcts" => Some(ControllerKind::Uct),
            "rules" | "rule_based" | "greedy" => Some(ControllerKind::RuleBased),
            "random" => Some(ControllerKind::Random),
            _ => None,
        }
    }

    /// Builds a controller. `seed` overrides the search config's seed.
    pub fn build(self, search: &SearchConfig, seed: u64) -> Box<dyn Controller> {
        match self {
            ControllerKind::Uct => Box::new(UctController::new(search.with_seed(seed))),
            ControllerKind::RuleBased => {
                Box::new(RuleBasedController::new(search.rollout_policy, search.defense, seed))
            }
            ControllerKind::Random => {
                Box::new(RandomController::new(search.generator, search.defense, seed))
            }
        }
    }
}
