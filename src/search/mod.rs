//! UCT search over one mob's activation.
//!
//! Each iteration descends the tree with UCB1, expands one untried candidate
//! action, plays the resulting state out with the default policy, and
//! backpropagates the result. After a fixed number of iterations the most
//! visited path from the root up to the first `EndTurn` is the chosen turn.

pub mod config;
pub mod node;
pub mod rollout;
pub mod tree;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace};

use crate::board::{Action, CombatState, GameContext};
use crate::movegen::candidate_actions;
use crate::resolve::apply;

pub use config::{RolloutPolicy, SearchConfig};
pub use node::{NodeId, UctNode};
pub use rollout::{default_action, reward, rollout};
pub use tree::UctTree;

/// Why a search could not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("the match is already finished")]
    Finished,

    #[error("no mob is scheduled to act")]
    NoCurrentMob,

    #[error("iteration budget must be at least 1")]
    NoIterations,
}

/// Expansions per action kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionTally {
    pub ability_uses: u64,
    pub moves: u64,
    pub defensive_moves: u64,
    pub attack_moves: u64,
    pub end_turns: u64,
}

impl ActionTally {
    fn record(&mut self, action: Action) {
        match action {
            Action::AbilityUse { .. } => self.ability_uses += 1,
            Action::Move { .. } => self.moves += 1,
            Action::DefensiveMove { .. } => self.defensive_moves += 1,
            Action::AttackMove { .. } => self.attack_moves += 1,
            Action::EndTurn => self.end_turns += 1,
            Action::Null => {}
        }
    }
}

/// Counters for one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub iterations: u32,
    pub nodes: usize,
    pub rollouts: u32,
    pub rollout_plies: u64,
    pub max_depth: u32,
    pub expanded: ActionTally,
}

/// Visit statistics for one root child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootChild {
    pub action: Action,
    pub visits: u32,
    /// Mean reward for the searching team.
    pub value: f64,
}

/// Result of a search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The chosen activation, without the trailing `EndTurn`.
    pub actions: Vec<Action>,
    /// Mean reward of the first chosen edge for the searching team.
    pub score: f64,
    pub root_children: Vec<RootChild>,
    pub stats: SearchStats,
}

/// Runs a UCT search from `state` for the team of the current mob.
pub fn uct_search(
    ctx: &GameContext,
    state: &CombatState,
    config: &SearchConfig,
    rng: &mut impl Rng,
) -> Result<SearchResult, SearchError> {
    if config.iterations == 0 {
        return Err(SearchError::NoIterations);
    }
    if state.is_finished() {
        return Err(SearchError::Finished);
    }
    let team = state
        .current_team(&ctx.roster)
        .ok_or(SearchError::NoCurrentMob)?;

    let mut tree = UctTree::new(state.clone(), team);
    let mut stats = SearchStats::default();

    for iteration in 0..config.iterations {
        let leaf = tree_policy(ctx, &mut tree, config, rng, &mut stats);
        let node = tree.get(leaf);
        let value = if node.is_terminal() {
            reward(&node.state, node.team)
        } else {
            let (value, plies) = rollout(
                ctx,
                node.state.clone(),
                node.team,
                config.rollout_policy,
                config.rollout_ply_cap,
                &config.defense,
                rng,
            );
            stats.rollouts += 1;
            stats.rollout_plies += plies as u64;
            value
        };
        trace!(iteration, depth = node.depth, value, "iteration");
        tree.backpropagate(leaf, value);
        stats.iterations += 1;
    }

    stats.nodes = tree.len();
    stats.max_depth = tree.max_depth();

    let root = tree.root();
    let root_children: Vec<RootChild> = tree
        .get(root)
        .children
        .iter()
        .map(|&c| {
            let child = tree.get(c);
            RootChild {
                action: child.action,
                visits: child.n,
                value: if child.team == team { child.mean() } else { -child.mean() },
            }
        })
        .collect();

    let score = tree
        .most_visited_child(root)
        .and_then(|c| root_children.iter().find(|rc| rc.action == tree.get(c).action))
        .map_or(0.0, |rc| rc.value);
    let actions = tree.extract_turn();

    debug!(
        iterations = stats.iterations,
        nodes = stats.nodes,
        depth = stats.max_depth,
        score,
        actions = actions.len(),
        "search finished"
    );

    Ok(SearchResult {
        actions,
        score,
        root_children,
        stats,
    })
}

/// Descends from the root and returns the node to evaluate: a freshly
/// expanded child, a terminal node, or a node with nothing to try.
fn tree_policy(
    ctx: &GameContext,
    tree: &mut UctTree,
    config: &SearchConfig,
    rng: &mut impl Rng,
    stats: &mut SearchStats,
) -> NodeId {
    let mut id = tree.root();
    loop {
        let node = tree.get(id);
        if node.is_terminal() {
            return id;
        }
        if node.untried.is_none() {
            let mut actions =
                candidate_actions(ctx, &node.state, &config.generator, node.allows_movement(), rng);
            actions.reverse();
            tree.get_mut(id).untried = Some(actions);
        }

        if let Some(action) = tree.get_mut(id).untried.as_mut().and_then(|u| u.pop()) {
            return expand(ctx, tree, id, action, config, stats);
        }

        debug_assert!(
            !tree.get(id).children.is_empty(),
            "no candidate actions for an unfinished state: {}",
            tree.get(id).state.summary(&ctx.roster)
        );
        match tree.select_child(id, config.exploration) {
            Some(child) => id = child,
            None => return id,
        }
    }
}

fn expand(
    ctx: &GameContext,
    tree: &mut UctTree,
    parent: NodeId,
    action: Action,
    config: &SearchConfig,
    stats: &mut SearchStats,
) -> NodeId {
    let parent_node = tree.get(parent);
    let mut state = parent_node.state.clone();
    apply(ctx, &mut state, action, &config.defense);
    let team = state.current_team(&ctx.roster).unwrap_or(parent_node.team);
    stats.expanded.record(action);
    tree.add_child(parent, action, team, state)
}
