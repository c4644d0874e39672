//! Pathfinding and line of sight.
//!
//! Movement is blocked by walls and by living mobs (the mover's own cell is
//! always passable); sight is blocked by walls only. All queries run a
//! breadth-first search over the dense cell index of the `HexMap`. A single
//! search from a source cell is kept as a `Reachability` so move generation
//! can answer every query for one actor from one BFS.

use std::collections::VecDeque;

use super::hex::Hex;
use super::map::HexMap;
use super::state::CombatState;

const UNREACHED: u32 = u32::MAX;
const NO_PREV: usize = usize::MAX;

/// Distance and reachability queries the combat core needs from the map.
pub trait Pathfinder {
    /// Walking distance between two cells, or `None` if `to` cannot be reached.
    fn distance(&self, state: &CombatState, from: Hex, to: Hex) -> Option<u32>;

    /// Cells walked from `from` to `to`, excluding `from` and including `to`.
    fn path_to(&self, state: &CombatState, from: Hex, to: Hex) -> Option<Vec<Hex>>;

    /// The cell reachable within `ap_budget` steps that gets closest to
    /// `toward`, or `None` if no reachable cell improves on standing still.
    fn furthest_reachable_toward(
        &self,
        state: &CombatState,
        from: Hex,
        toward: Hex,
        ap_budget: u32,
    ) -> Option<Hex>;

    /// Returns true if no wall lies strictly between the two cells.
    fn is_visible(&self, from: Hex, to: Hex) -> bool;
}

/// The result of one breadth-first search from an origin cell.
#[derive(Debug, Clone)]
pub struct Reachability {
    origin: Hex,
    dist: Vec<u32>,
    prev: Vec<usize>,
}

impl Reachability {
    /// Searches outward from `origin`, treating living mobs as obstacles.
    pub fn compute(map: &HexMap, state: &CombatState, origin: Hex) -> Self {
        let blocked = occupancy(map, state, &[origin]);
        let (dist, prev) = bfs(map, &blocked, origin);
        Reachability { origin, dist, prev }
    }

    pub fn origin(&self) -> Hex {
        self.origin
    }

    /// Steps needed to reach `to`, or `None` if it is unreachable.
    #[inline]
    pub fn distance(&self, map: &HexMap, to: Hex) -> Option<u32> {
        let d = self.dist[map.index_of(to)?];
        (d != UNREACHED).then_some(d)
    }

    /// Cells walked to reach `to`, excluding the origin.
    pub fn path_to(&self, map: &HexMap, to: Hex) -> Option<Vec<Hex>> {
        let mut idx = map.index_of(to)?;
        if self.dist[idx] == UNREACHED {
            return None;
        }
        let mut path = Vec::with_capacity(self.dist[idx] as usize);
        while self.prev[idx] != NO_PREV {
            path.push(map.hex_at(idx));
            idx = self.prev[idx];
        }
        path.reverse();
        Some(path)
    }

    /// Cells other than the origin reachable within `budget` steps, with
    /// their distances, in map order.
    pub fn within(&self, map: &HexMap, budget: u32) -> Vec<(Hex, u32)> {
        map.cells()
            .iter()
            .filter_map(|&h| {
                if h == self.origin {
                    return None;
                }
                let d = self.distance(map, h)?;
                (d <= budget).then_some((h, d))
            })
            .collect()
    }
}

/// Marks cells holding a living mob, except the listed cells.
fn occupancy(map: &HexMap, state: &CombatState, passable: &[Hex]) -> Vec<bool> {
    let mut blocked = vec![false; map.index_len()];
    for mob in state.mobs.iter().filter(|m| m.is_alive()) {
        if passable.contains(&mob.coord) {
            continue;
        }
        if let Some(i) = map.index_of(mob.coord) {
            blocked[i] = true;
        }
    }
    blocked
}

/// Plain BFS over non-wall, non-blocked cells.
fn bfs(map: &HexMap, blocked: &[bool], origin: Hex) -> (Vec<u32>, Vec<usize>) {
    let mut dist = vec![UNREACHED; map.index_len()];
    let mut prev = vec![NO_PREV; map.index_len()];
    let start = match map.index_of(origin) {
        Some(i) => i,
        None => return (dist, prev),
    };

    let mut queue = VecDeque::with_capacity(map.cells().len());
    dist[start] = 0;
    queue.push_back(start);

    while let Some(cur) = queue.pop_front() {
        let d = dist[cur];
        for n in map.hex_at(cur).neighbors() {
            let ni = match map.index_of(n) {
                Some(i) => i,
                None => continue,
            };
            if dist[ni] != UNREACHED || blocked[ni] || map.is_wall(n) {
                continue;
            }
            dist[ni] = d + 1;
            prev[ni] = cur;
            queue.push_back(ni);
        }
    }

    (dist, prev)
}

impl Pathfinder for HexMap {
    fn distance(&self, state: &CombatState, from: Hex, to: Hex) -> Option<u32> {
        Reachability::compute(self, state, from).distance(self, to)
    }

    fn path_to(&self, state: &CombatState, from: Hex, to: Hex) -> Option<Vec<Hex>> {
        Reachability::compute(self, state, from).path_to(self, to)
    }

    fn furthest_reachable_toward(
        &self,
        state: &CombatState,
        from: Hex,
        toward: Hex,
        ap_budget: u32,
    ) -> Option<Hex> {
        let reach = Reachability::compute(self, state, from);
        let blocked = occupancy(self, state, &[from, toward]);
        let (to_target, _) = bfs(self, &blocked, toward);

        let here = to_target[self.index_of(from)?];
        let mut best: Option<(u32, u32, Hex)> = None;
        for (h, d) in reach.within(self, ap_budget) {
            let remaining = match self.index_of(h).map(|i| to_target[i]) {
                Some(r) if r != UNREACHED => r,
                _ => continue,
            };
            if remaining >= here {
                continue;
            }
            let better = match best {
                None => true,
                Some((br, bd, _)) => (remaining, d) < (br, bd),
            };
            if better {
                best = Some((remaining, d, h));
            }
        }
        best.map(|(_, _, h)| h)
    }

    fn is_visible(&self, from: Hex, to: Hex) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        let line = from.line_to(to);
        let inner = line.len().saturating_sub(1);
        line.iter().take(inner).skip(1).all(|&h| !self.is_wall(h))
    }
}
