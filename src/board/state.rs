//! Mutable combat state.
//!
//! Holds the per-match data that changes as actions are applied: mob
//! positions, HP/AP, the single stacked buff slot per mob, ability cooldowns,
//! the initiative order, and area effects. This is the only thing cloned when
//! the search branches; the roster and map live in `GameContext`.

use super::hex::Hex;
use super::roster::{AbilityId, AreaBuff, Buff, MobId, Roster, Team};

/// Runtime data for one mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MobInstance {
    pub coord: Hex,
    pub hp: i32,
    pub ap: i32,
    pub buff: Buff,
}

impl MobInstance {
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// Complete mutable state of a match at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatState {
    pub mobs: Vec<MobInstance>,
    /// Turns left before each ability can be used again, indexed by ability id.
    pub cooldowns: Vec<u32>,
    /// Mob ids in ascending initiative. Dead mobs are pruned at turn boundaries.
    pub turn_order: Vec<MobId>,
    pub current_index: usize,
    pub turn_number: u32,
    pub area_buffs: Vec<AreaBuff>,
    pub red_total_hp: i32,
    pub blue_total_hp: i32,
}

impl CombatState {
    /// Creates the opening state of a match: every mob at its origin with
    /// full HP and AP, no buffs, no cooldowns, turn 1.
    ///
    /// The initiative order is sorted once here (stable for ties) and never
    /// re-sorted afterwards.
    pub fn new(roster: &Roster) -> Self {
        let mobs: Vec<MobInstance> = roster
            .mobs
            .iter()
            .map(|m| MobInstance {
                coord: m.origin,
                hp: m.max_hp,
                ap: m.max_ap,
                buff: Buff::ZERO,
            })
            .collect();

        let mut turn_order: Vec<MobId> = (0..roster.mobs.len()).collect();
        turn_order.sort_by_key(|&id| roster.mobs[id].initiative);

        let mut state = CombatState {
            mobs,
            cooldowns: vec![0; roster.abilities.len()],
            turn_order,
            current_index: 0,
            turn_number: 1,
            area_buffs: Vec::new(),
            red_total_hp: 0,
            blue_total_hp: 0,
        };
        state.recompute_totals(roster);
        state
    }

    /// Recomputes both team HP totals from scratch.
    pub fn recompute_totals(&mut self, roster: &Roster) {
        self.red_total_hp = 0;
        self.blue_total_hp = 0;
        for (id, mob) in self.mobs.iter().enumerate() {
            let hp = mob.hp.max(0);
            match roster.mobs[id].team {
                Team::Red => self.red_total_hp += hp,
                Team::Blue => self.blue_total_hp += hp,
            }
        }
    }

    /// The mob whose activation it is, if any mob is left in the order.
    #[inline]
    pub fn current_mob(&self) -> Option<MobId> {
        self.turn_order.get(self.current_index).copied()
    }

    /// The team of the current mob.
    #[inline]
    pub fn current_team(&self, roster: &Roster) -> Option<Team> {
        self.current_mob().map(|id| roster.mobs[id].team)
    }

    #[inline]
    pub fn mob(&self, id: MobId) -> &MobInstance {
        &self.mobs[id]
    }

    #[inline]
    pub fn total_hp(&self, team: Team) -> i32 {
        match team {
            Team::Red => self.red_total_hp,
            Team::Blue => self.blue_total_hp,
        }
    }

    /// A match is over once either team has no HP left.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.red_total_hp == 0 || self.blue_total_hp == 0
    }

    /// The surviving team of a finished match. `None` while the match is
    /// running or when both teams were wiped out together.
    pub fn winner(&self) -> Option<Team> {
        match (self.red_total_hp > 0, self.blue_total_hp > 0) {
            (true, false) => Some(Team::Red),
            (false, true) => Some(Team::Blue),
            _ => None,
        }
    }

    /// The living mob standing on `hex`, if any.
    pub fn mob_at(&self, hex: Hex) -> Option<MobId> {
        self.mobs
            .iter()
            .position(|m| m.is_alive() && m.coord == hex)
    }

    /// Returns true if a living mob stands on `hex`.
    #[inline]
    pub fn is_occupied(&self, hex: Hex) -> bool {
        self.mobs.iter().any(|m| m.is_alive() && m.coord == hex)
    }

    /// Changes a mob's HP, clamped to `[0, max_hp]`, and keeps the team
    /// total in sync. Returns the applied delta.
    pub fn change_hp(&mut self, roster: &Roster, id: MobId, delta: i32) -> i32 {
        let info = &roster.mobs[id];
        let mob = &mut self.mobs[id];
        let before = mob.hp;
        mob.hp = (mob.hp + delta).clamp(0, info.max_hp);
        let applied = mob.hp - before;
        match info.team {
            Team::Red => self.red_total_hp += applied,
            Team::Blue => self.blue_total_hp += applied,
        }
        applied
    }

    /// Changes a mob's AP, floored at zero.
    pub fn change_ap(&mut self, id: MobId, delta: i32) {
        let mob = &mut self.mobs[id];
        mob.ap = (mob.ap + delta).max(0);
    }

    #[inline]
    pub fn cooldown(&self, ability: AbilityId) -> u32 {
        self.cooldowns[ability]
    }

    /// Living mobs of a team.
    pub fn living<'a>(&'a self, roster: &'a Roster, team: Team) -> impl Iterator<Item = MobId> + 'a {
        self.mobs
            .iter()
            .enumerate()
            .filter(move |(id, m)| m.is_alive() && roster.mobs[*id].team == team)
            .map(|(id, _)| id)
    }

    /// One-line summary used in logs and protocol output.
    pub fn summary(&self, roster: &Roster) -> String {
        let mob = match self.current_mob() {
            Some(id) => format!("{} ({})", id, roster.mobs[id].team.name()),
            None => "-".to_string(),
        };
        format!(
            "turn {} mob {} red {} blue {}",
            self.turn_number, mob, self.red_total_hp, self.blue_total_hp
        )
    }
}
