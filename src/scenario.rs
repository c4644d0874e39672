//! Scenario files.
//!
//! A scenario is a JSON document describing the map, the rule switches, the
//! ability table and the mobs:
//!
//! ```json
//! {
//!   "name": "duel",
//!   "map": { "radius": 3, "walls": [{ "q": 0, "r": 0 }] },
//!   "abilities": [{ "damage": 2, "cost": 2, "range": 1 }],
//!   "mobs": [
//!     { "team": "red", "max_hp": 6, "max_ap": 4, "initiative": 1,
//!       "abilities": [0], "origin": { "q": -2, "r": 0 } }
//!   ]
//! }
//! ```
//!
//! Mob and ability ids are their positions in the two lists.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::board::{
    AbilityId, AbilityInfo, AreaBuffTemplate, Buff, CombatState, Element, GameContext, Hex,
    HexMap, MobId, MobInfo, Roster, Rules, Team,
};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("wall {0} is off the map")]
    WallOffMap(Hex),

    #[error("mob {mob} starts off the map at {hex}")]
    OffMap { mob: MobId, hex: Hex },

    #[error("mob {mob} starts on a wall at {hex}")]
    OnWall { mob: MobId, hex: Hex },

    #[error("mobs {first} and {second} both start at {hex}")]
    SharedCell {
        first: MobId,
        second: MobId,
        hex: Hex,
    },

    #[error("mob {mob} refers to unknown ability {ability}")]
    UnknownAbility { mob: MobId, ability: AbilityId },

    #[error("ability {ability} is owned by both mob {first} and mob {second}")]
    SharedAbility {
        ability: AbilityId,
        first: MobId,
        second: MobId,
    },

    #[error("mob {mob} has non-positive {stat} {value}")]
    NonPositiveStat {
        mob: MobId,
        stat: &'static str,
        value: i32,
    },

    #[error("ability {ability} has negative {stat} {value}")]
    NegativeAbilityStat {
        ability: AbilityId,
        stat: &'static str,
        value: i32,
    },

    #[error("mob {mob} has a non-positive defense cost {value}")]
    ZeroDefenseCost { mob: MobId, value: i32 },

    #[error("team {} has no mobs", .0.name())]
    EmptyTeam(Team),
}

/// Map section of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSpec {
    pub radius: u32,
    #[serde(default)]
    pub walls: Vec<Hex>,
}

/// A parsed, not yet validated scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub map: MapSpec,
    #[serde(default)]
    pub rules: Rules,
    pub abilities: Vec<AbilityInfo>,
    pub mobs: Vec<MobInfo>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Scenario, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and validates a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
        let text = fs::read_to_string(path.as_ref())?;
        let scenario = Scenario::from_json(&text)?;
        scenario.validate()?;
        debug!(
            path = %path.as_ref().display(),
            name = %scenario.name,
            mobs = scenario.mobs.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the scenario describes a playable match.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let map = self.hex_map()?;

        for (id, ability) in self.abilities.iter().enumerate() {
            for (stat, value) in [("damage", ability.damage), ("cost", ability.cost)] {
                if value < 0 {
                    return Err(ScenarioError::NegativeAbilityStat {
                        ability: id,
                        stat,
                        value,
                    });
                }
            }
        }

        let mut cells: HashMap<Hex, MobId> = HashMap::new();
        let mut owners: HashMap<AbilityId, MobId> = HashMap::new();
        for (id, mob) in self.mobs.iter().enumerate() {
            for (stat, value) in [("max_hp", mob.max_hp), ("max_ap", mob.max_ap)] {
                if value <= 0 {
                    return Err(ScenarioError::NonPositiveStat { mob: id, stat, value });
                }
            }
            if mob.defense_cost <= 0 {
                return Err(ScenarioError::ZeroDefenseCost {
                    mob: id,
                    value: mob.defense_cost,
                });
            }

            let hex = mob.origin;
            if !map.contains(hex) {
                return Err(ScenarioError::OffMap { mob: id, hex });
            }
            if map.is_wall(hex) {
                return Err(ScenarioError::OnWall { mob: id, hex });
            }
            if let Some(&first) = cells.get(&hex) {
                return Err(ScenarioError::SharedCell {
                    first,
                    second: id,
                    hex,
                });
            }
            cells.insert(hex, id);

            for &ability in &mob.abilities {
                if ability >= self.abilities.len() {
                    return Err(ScenarioError::UnknownAbility { mob: id, ability });
                }
                match owners.get(&ability) {
                    Some(&first) if first != id => {
                        return Err(ScenarioError::SharedAbility {
                            ability,
                            first,
                            second: id,
                        })
                    }
                    _ => {
                        owners.insert(ability, id);
                    }
                }
            }
        }

        for team in [Team::Red, Team::Blue] {
            if !self.mobs.iter().any(|m| m.team == team) {
                return Err(ScenarioError::EmptyTeam(team));
            }
        }
        Ok(())
    }

    /// Validates and builds the match setup and its opening state.
    pub fn build(&self) -> Result<(GameContext, CombatState), ScenarioError> {
        self.validate()?;
        let roster = Roster {
            mobs: self.mobs.clone(),
            abilities: self.abilities.clone(),
        };
        let ctx = GameContext::new(self.hex_map()?, roster).with_rules(self.rules);
        let state = CombatState::new(&ctx.roster);
        Ok((ctx, state))
    }

    fn hex_map(&self) -> Result<HexMap, ScenarioError> {
        let mut map = HexMap::new(self.map.radius);
        for &wall in &self.map.walls {
            if !map.set_wall(wall) {
                return Err(ScenarioError::WallOffMap(wall));
            }
        }
        Ok(map)
    }

    /// A small two-on-two skirmish across a broken wall.
    pub fn demo() -> Scenario {
        let strike = |damage, cost, range, element| AbilityInfo {
            damage,
            cost,
            range,
            cooldown: 0,
            element,
            buffs: Vec::new(),
            area_buffs: Vec::new(),
        };
        let mob = |team, max_hp, initiative, ability, q, r| MobInfo {
            team,
            max_hp,
            max_ap: 5,
            initiative,
            abilities: vec![ability],
            origin: Hex::new(q, r),
            defense_cost: 2,
        };

        let bolt = AbilityInfo {
            cooldown: 1,
            buffs: vec![Buff::new(Element::Water, -1, 0, 2)],
            ..strike(2, 3, 3, Element::Water)
        };
        let quake = AbilityInfo {
            cooldown: 2,
            area_buffs: vec![AreaBuffTemplate {
                radius: 1,
                effect: Buff::new(Element::Earth, -1, -1, 2),
            }],
            ..strike(1, 3, 2, Element::Earth)
        };

        Scenario {
            name: "demo".to_string(),
            map: MapSpec {
                radius: 4,
                walls: vec![Hex::new(0, -1), Hex::new(0, 0), Hex::new(0, 2)],
            },
            rules: Rules::default(),
            abilities: vec![
                strike(3, 2, 1, Element::Fire),
                bolt,
                strike(3, 2, 1, Element::Air),
                quake,
            ],
            mobs: vec![
                mob(Team::Red, 10, 3, 0, -3, 1),
                mob(Team::Red, 7, 1, 1, -3, 2),
                mob(Team::Blue, 10, 2, 2, 3, -1),
                mob(Team::Blue, 7, 4, 3, 3, -2),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUEL: &str = r#"{
        "name": "duel",
        "map": { "radius": 3, "walls": [{ "q": 0, "r": 0 }] },
        "abilities": [
            { "damage": 2, "cost": 2, "range": 1 },
            { "damage": 1, "cost": 1, "range": 2, "element": "water",
              "buffs": [{ "element": "water", "hp_change": -1, "lifetime": 2 }] }
        ],
        "mobs": [
            { "team": "red", "max_hp": 6, "max_ap": 4, "initiative": 1,
              "abilities": [0], "origin": { "q": -2, "r": 0 } },
            { "team": "blue", "max_hp": 6, "max_ap": 4, "initiative": 2,
              "abilities": [1], "origin": { "q": 2, "r": 0 }, "defense_cost": 1 }
        ]
    }"#;

    fn duel() -> Scenario {
        Scenario::from_json(DUEL).unwrap()
    }

    #[test]
    fn parses_and_builds_duel() {
        let scenario = duel();
        assert_eq!(scenario.name, "duel");
        assert_eq!(scenario.mobs[0].defense_cost, 2);
        assert_eq!(scenario.mobs[1].defense_cost, 1);
        assert_eq!(scenario.abilities[0].cooldown, 0);

        let (ctx, state) = scenario.build().unwrap();
        assert!(ctx.map.is_wall(Hex::ORIGIN));
        assert!(!ctx.rules.allow_corpse_targeting);
        assert_eq!(state.mob(0).coord, Hex::new(-2, 0));
        assert_eq!(state.red_total_hp, 6);
        assert_eq!(state.current_mob(), Some(0));
        assert!(!state.is_finished());
    }

    #[test]
    fn demo_is_valid_and_round_trips() {
        let demo = Scenario::demo();
        demo.validate().unwrap();
        let text = demo.to_json().unwrap();
        assert_eq!(Scenario::from_json(&text).unwrap(), demo);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(Scenario::from_json("{"), Err(ScenarioError::Json(_))));
        assert!(matches!(
            Scenario::load("/nonexistent/skirmish.json"),
            Err(ScenarioError::Io(_))
        ));
    }

    #[test]
    fn rejects_bad_placement() {
        let mut s = duel();
        s.mobs[1].origin = Hex::new(5, 0);
        assert!(matches!(s.validate(), Err(ScenarioError::OffMap { mob: 1, .. })));

        let mut s = duel();
        s.mobs[1].origin = Hex::ORIGIN;
        assert!(matches!(s.validate(), Err(ScenarioError::OnWall { mob: 1, .. })));

        let mut s = duel();
        s.mobs[1].origin = Hex::new(-2, 0);
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::SharedCell { first: 0, second: 1, .. })
        ));

        let mut s = duel();
        s.map.walls.push(Hex::new(9, 9));
        assert!(matches!(s.validate(), Err(ScenarioError::WallOffMap(_))));
    }

    #[test]
    fn extreme_coordinates_are_off_map() {
        for hex in [
            Hex::new(i32::MAX, i32::MAX),
            Hex::new(i32::MIN, i32::MIN),
            Hex::new(i32::MAX, i32::MIN),
            Hex::new(2_000_000_000, -2_000_000_000),
        ] {
            let mut s = duel();
            s.mobs[0].origin = hex;
            assert!(matches!(s.validate(), Err(ScenarioError::OffMap { mob: 0, .. })), "{hex}");

            let mut s = duel();
            s.map.walls.push(hex);
            assert!(matches!(s.validate(), Err(ScenarioError::WallOffMap(_))), "{hex}");
        }

        let json = r#"{
            "name": "far",
            "map": { "radius": 2 },
            "abilities": [],
            "mobs": [
                { "team": "red", "max_hp": 1, "max_ap": 1, "initiative": 1,
                  "origin": { "q": 2147483647, "r": 2147483647 } },
                { "team": "blue", "max_hp": 1, "max_ap": 1, "initiative": 2,
                  "origin": { "q": 1, "r": 0 } }
            ]
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert!(matches!(scenario.build(), Err(ScenarioError::OffMap { mob: 0, .. })));
    }

    #[test]
    fn rejects_bad_abilities() {
        let mut s = duel();
        s.mobs[0].abilities.push(7);
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::UnknownAbility { mob: 0, ability: 7 })
        ));

        let mut s = duel();
        s.mobs[1].abilities.push(0);
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::SharedAbility { ability: 0, first: 0, second: 1 })
        ));

        let mut s = duel();
        s.abilities[1].cost = -1;
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::NegativeAbilityStat { ability: 1, stat: "cost", .. })
        ));
    }

    #[test]
    fn rejects_bad_mobs() {
        let mut s = duel();
        s.mobs[0].max_hp = 0;
        assert!(matches!(
            s.validate(),
            Err(ScenarioError::NonPositiveStat { mob: 0, stat: "max_hp", value: 0 })
        ));

        let mut s = duel();
        s.mobs[1].defense_cost = 0;
        assert!(matches!(s.validate(), Err(ScenarioError::ZeroDefenseCost { mob: 1, .. })));

        let mut s = duel();
        s.mobs[1].team = Team::Red;
        assert!(matches!(s.validate(), Err(ScenarioError::EmptyTeam(Team::Blue))));
    }
}
