//! Threat heatmap for defensive positioning.
//!
//! For every open cell, sums over all other living mobs the largest damage
//! one of their abilities could deal to a mob standing there. Abilities count
//! if they are off cooldown and affordable on a full AP bar, since the
//! threat materializes on the owner's next activation.

use crate::board::{CombatState, GameContext, Hex, MobId, Pathfinder};

/// Per-cell threat values, indexed by the map's dense cell index.
#[derive(Debug, Clone)]
pub struct Heatmap {
    values: Vec<i32>,
    min: i32,
    max: i32,
}

impl Heatmap {
    /// Builds the heatmap as seen by `actor`.
    pub fn compute(ctx: &GameContext, state: &CombatState, actor: MobId) -> Self {
        let map = &ctx.map;
        let roster = &ctx.roster;
        let mut values = vec![0i32; map.index_len()];
        let mut min = i32::MAX;
        let mut max = 0;

        for &cell in map.cells() {
            if map.is_wall(cell) {
                continue;
            }
            let mut heat = 0;
            for (id, mob) in state.mobs.iter().enumerate() {
                if id == actor || !mob.is_alive() {
                    continue;
                }
                let info = roster.mob(id);
                let best = info
                    .abilities
                    .iter()
                    .map(|&a| (a, roster.ability(a)))
                    .filter(|(a, ability)| {
                        state.cooldown(*a) == 0
                            && ability.cost <= info.max_ap
                            && mob.coord.distance(cell) <= ability.range
                    })
                    .map(|(_, ability)| ability.damage)
                    .max();
                if let Some(damage) = best {
                    if map.is_visible(mob.coord, cell) {
                        heat += damage;
                    }
                }
            }
            if let Some(i) = map.index_of(cell) {
                values[i] = heat;
            }
            min = min.min(heat);
            max = max.max(heat);
        }

        if min == i32::MAX {
            min = 0;
        }
        Heatmap { values, min, max }
    }

    /// Threat at a cell; off-map cells read as zero.
    pub fn heat(&self, ctx: &GameContext, hex: Hex) -> i32 {
        ctx.map.index_of(hex).map(|i| self.values[i]).unwrap_or(0)
    }

    /// The lowest threat over all open cells.
    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}
