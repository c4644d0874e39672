//! UCT search configuration.

use serde::{Deserialize, Serialize};

use crate::movegen::GeneratorConfig;
use crate::resolve::DefenseMode;

/// How the default policy picks among usable abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutPolicy {
    /// Always the best damage/cost ratio, first on ties.
    #[default]
    Deterministic,
    /// Random, weighted by damage/cost ratio.
    Weighted,
}

impl RolloutPolicy {
    pub fn from_name(name: &str) -> Option<RolloutPolicy> {
        match name.to_ascii_lowercase().as_str() {
            "deterministic" => Some(RolloutPolicy::Deterministic),
            "weighted" => Some(RolloutPolicy::Weighted),
            _ => None,
        }
    }
}

/// Configuration for one UCT search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Fixed iteration budget. Searches never stop on wall-clock time.
    pub iterations: u32,

    /// Constant under the square root of the UCB1 exploration term.
    /// 2.0 gives the textbook `sqrt(2 ln N / n)`.
    pub exploration: f64,

    /// Rollouts that run this many plies without a winner score as a draw.
    pub rollout_ply_cap: u32,

    pub rollout_policy: RolloutPolicy,

    /// How defenders answer block queries inside the search.
    pub defense: DefenseMode,

    pub generator: GeneratorConfig,

    /// RNG seed for controllers that own their generator. Zero draws one
    /// from entropy.
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploration: 2.0,
            rollout_ply_cap: 100,
            rollout_policy: RolloutPolicy::Deterministic,
            defense: DefenseMode::Pass,
            generator: GeneratorConfig::default(),
            seed: 0,
        }
    }
}

impl SearchConfig {
    /// A small budget for tests.
    pub fn for_testing() -> Self {
        Self {
            iterations: 200,
            rollout_ply_cap: 60,
            seed: 1,
            ..Self::default()
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_rollout_ply_cap(mut self, cap: u32) -> Self {
        self.rollout_ply_cap = cap;
        self
    }

    pub fn with_rollout_policy(mut self, policy: RolloutPolicy) -> Self {
        self.rollout_policy = policy;
        self
    }

    pub fn with_defense(mut self, defense: DefenseMode) -> Self {
        self.defense = defense;
        self
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
