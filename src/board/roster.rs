//! Static match setup: teams, mobs, abilities, and buffs.
//!
//! Everything here is immutable once a match starts. Search nodes borrow the
//! `GameContext` instead of cloning it; only `CombatState` is copied per node.

use serde::{Deserialize, Serialize};

use super::hex::Hex;
use super::map::HexMap;

/// Index into `Roster::mobs` and `CombatState::mobs`.
pub type MobId = usize;

/// Index into `Roster::abilities` and `CombatState::cooldowns`.
pub type AbilityId = usize;

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// The other side.
    pub const fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Lowercase name used in protocol output and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }
}

/// Elemental tag carried by abilities and their effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    #[default]
    Fire,
    Water,
    Earth,
    Air,
}

/// A timed HP/AP delta applied at every turn boundary.
///
/// A lifetime of zero means "no buff".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Buff {
    #[serde(default)]
    pub element: Element,
    #[serde(default)]
    pub hp_change: i32,
    #[serde(default)]
    pub ap_change: i32,
    pub lifetime: u32,
}

impl Buff {
    /// The empty buff slot.
    pub const ZERO: Buff = Buff {
        element: Element::Fire,
        hp_change: 0,
        ap_change: 0,
        lifetime: 0,
    };

    pub fn new(element: Element, hp_change: i32, ap_change: i32, lifetime: u32) -> Self {
        Buff {
            element,
            hp_change,
            ap_change,
            lifetime,
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.lifetime == 0
    }

    /// Stacks another buff onto this one: deltas add up, the longer
    /// lifetime wins. Stacking onto an empty slot yields the other buff.
    pub fn combine(self, other: Buff) -> Buff {
        if self.is_zero() {
            return other;
        }
        if other.is_zero() {
            return self;
        }
        Buff {
            element: self.element,
            hp_change: self.hp_change + other.hp_change,
            ap_change: self.ap_change + other.ap_change,
            lifetime: self.lifetime.max(other.lifetime),
        }
    }
}

/// Area effect carried by an ability, anchored to the target cell on a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaBuffTemplate {
    pub radius: u32,
    pub effect: Buff,
}

impl AreaBuffTemplate {
    /// Places the effect on the map at `coord`.
    pub fn anchor(&self, coord: Hex) -> AreaBuff {
        AreaBuff {
            coord,
            radius: self.radius,
            effect: self.effect,
        }
    }
}

/// An effect on the map; `effect.lifetime` is its remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaBuff {
    pub coord: Hex,
    pub radius: u32,
    pub effect: Buff,
}

impl AreaBuff {
    #[inline]
    pub fn covers(&self, hex: Hex) -> bool {
        self.coord.distance(hex) <= self.radius
    }
}

fn default_defense_cost() -> i32 {
    2
}

/// Static per-mob data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobInfo {
    pub team: Team,
    pub max_hp: i32,
    pub max_ap: i32,
    pub initiative: i32,
    #[serde(default)]
    pub abilities: Vec<AbilityId>,
    pub origin: Hex,
    /// AP a defender spends to block an incoming ability.
    #[serde(default = "default_defense_cost")]
    pub defense_cost: i32,
}

/// Static per-ability data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityInfo {
    pub damage: i32,
    pub cost: i32,
    pub range: u32,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub element: Element,
    #[serde(default)]
    pub buffs: Vec<Buff>,
    #[serde(default)]
    pub area_buffs: Vec<AreaBuffTemplate>,
}

impl AbilityInfo {
    /// The direct effect stacked onto the target on a hit.
    pub fn direct_effect(&self) -> Buff {
        self.buffs
            .iter()
            .fold(Buff::ZERO, |acc, b| acc.combine(*b))
    }

    /// Damage per AP spent, used by the rollout policy.
    pub fn damage_ratio(&self) -> f64 {
        self.damage as f64 / self.cost.max(1) as f64
    }
}

/// Rule switches that change legality for special configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rules {
    /// Lets abilities target dead mobs. Only used by test setups.
    #[serde(default)]
    pub allow_corpse_targeting: bool,
}

/// Mob and ability tables for one match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roster {
    pub mobs: Vec<MobInfo>,
    pub abilities: Vec<AbilityInfo>,
}

impl Roster {
    #[inline]
    pub fn mob(&self, id: MobId) -> &MobInfo {
        &self.mobs[id]
    }

    #[inline]
    pub fn ability(&self, id: AbilityId) -> &AbilityInfo {
        &self.abilities[id]
    }

    /// Adds an ability and returns its id.
    pub fn add_ability(&mut self, ability: AbilityInfo) -> AbilityId {
        self.abilities.push(ability);
        self.abilities.len() - 1
    }

    /// Adds a mob and returns its id.
    pub fn add_mob(&mut self, mob: MobInfo) -> MobId {
        self.mobs.push(mob);
        self.mobs.len() - 1
    }

    /// Returns true if `mob` owns `ability`.
    pub fn owns(&self, mob: MobId, ability: AbilityId) -> bool {
        self.mobs[mob].abilities.contains(&ability)
    }
}

/// Immutable setup shared by every state of a match.
#[derive(Debug, Clone)]
pub struct GameContext {
    pub map: HexMap,
    pub roster: Roster,
    pub rules: Rules,
}

impl GameContext {
    pub fn new(map: HexMap, roster: Roster) -> Self {
        GameContext {
            map,
            roster,
            rules: Rules::default(),
        }
    }

    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_flips() {
        assert_eq!(Team::Red.opponent(), Team::Blue);
        assert_eq!(Team::Blue.opponent(), Team::Red);
    }

    #[test]
    fn combine_adds_deltas_and_keeps_longer_lifetime() {
        let a = Buff::new(Element::Fire, -2, 0, 3);
        let b = Buff::new(Element::Water, -1, -1, 5);
        let c = a.combine(b);
        assert_eq!(c.hp_change, -3);
        assert_eq!(c.ap_change, -1);
        assert_eq!(c.lifetime, 5);
        assert_eq!(c.element, Element::Fire);
    }

    #[test]
    fn combine_with_zero_is_identity() {
        let a = Buff::new(Element::Air, 1, 2, 2);
        assert_eq!(Buff::ZERO.combine(a), a);
        assert_eq!(a.combine(Buff::ZERO), a);
        assert!(Buff::ZERO.is_zero());
    }

    #[test]
    fn direct_effect_folds_all_buffs() {
        let ability = AbilityInfo {
            damage: 1,
            cost: 1,
            range: 1,
            cooldown: 0,
            element: Element::Earth,
            buffs: vec![
                Buff::new(Element::Earth, -1, 0, 2),
                Buff::new(Element::Earth, 0, -1, 1),
            ],
            area_buffs: Vec::new(),
        };
        let effect = ability.direct_effect();
        assert_eq!(effect.hp_change, -1);
        assert_eq!(effect.ap_change, -1);
        assert_eq!(effect.lifetime, 2);
    }

    #[test]
    fn area_buff_coverage() {
        let template = AreaBuffTemplate {
            radius: 1,
            effect: Buff::new(Element::Fire, -1, 0, 2),
        };
        let area = template.anchor(Hex::new(1, 0));
        assert!(area.covers(Hex::new(1, 0)));
        assert!(area.covers(Hex::new(2, 0)));
        assert!(!area.covers(Hex::new(3, 0)));
    }

    #[test]
    fn mob_info_defaults_from_json() {
        let mob: MobInfo = serde_json::from_str(
            r#"{"team":"blue","max_hp":5,"max_ap":3,"initiative":2,"origin":{"q":0,"r":1}}"#,
        )
        .unwrap();
        assert_eq!(mob.team, Team::Blue);
        assert_eq!(mob.defense_cost, 2);
        assert!(mob.abilities.is_empty());
    }
}
