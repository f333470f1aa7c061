//! Typed view of a single battle turn.
//!
//! A [`BattleSnapshot`] is decoded fresh from every battle message and never
//! mutated afterwards. Everything the decision pipeline knows about the
//! world comes from here.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize};

use crate::equipment::{EffectType, EngineBlock, EquipmentBlock, GunBlock};
use crate::math::Vector;

/// Ship identifier, unique within one side.
pub type ShipId = u32;

/// A ship as reported by the game server.
///
/// Equality and hashing use the id alone, so the same ship compares equal
/// across turns even though its position and health change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ship {
    /// Identifier.
    pub id: ShipId,
    /// Anchor cell.
    pub position: Vector,
    /// Displacement applied on the next turn.
    pub velocity: Vector,
    /// Current energy, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<i32>,
    /// Current hull points, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    /// Installed blocks in server order. Opponents usually report none.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub equipment: Vec<EquipmentBlock>,
}

impl Ship {
    /// Create a bare ship with no equipment.
    #[must_use]
    pub fn new(id: ShipId, position: Vector) -> Self {
        Self {
            id,
            position,
            velocity: Vector::ZERO,
            energy: None,
            health: None,
            equipment: Vec::new(),
        }
    }

    /// The ship's propulsion. Only the first engine block counts.
    #[must_use]
    pub fn engine(&self) -> Option<&EngineBlock> {
        self.equipment.iter().find_map(EquipmentBlock::as_engine)
    }

    /// All guns in installation order.
    pub fn guns(&self) -> impl Iterator<Item = &GunBlock> {
        self.equipment.iter().filter_map(EquipmentBlock::as_gun)
    }

    /// Where the ship will be next turn if it keeps its velocity.
    #[must_use]
    pub fn predicted_position(&self) -> Vector {
        self.position + self.velocity
    }

    /// Sort key for "weakest first". Unknown health sorts last.
    #[must_use]
    pub fn health_rank(&self) -> i64 {
        self.health.map_or(i64::MAX, i64::from)
    }
}

impl PartialEq for Ship {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Ship {}

impl Hash for Ship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A shot fired last turn, used to predict where it is unsafe to stand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FireInfo {
    /// Projectile effect.
    #[serde(default)]
    pub effect_type: EffectType,
    /// Firing position.
    pub source: Vector,
    /// Aim point.
    pub target: Vector,
}

/// Everything one battle message tells us.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Shots fired last turn.
    #[serde(rename = "FireInfos", default, deserialize_with = "null_as_empty")]
    pub fire_infos: Vec<FireInfo>,
    /// Our ships, in server order.
    #[serde(rename = "My")]
    pub my: Vec<Ship>,
    /// Opponent ships, in server order.
    #[serde(rename = "Opponent", default, deserialize_with = "null_as_empty")]
    pub opponent: Vec<Ship>,
}

impl BattleSnapshot {
    /// Look up an opponent by id.
    #[must_use]
    pub fn opponent(&self, id: ShipId) -> Option<&Ship> {
        self.opponent.iter().find(|o| o.id == id)
    }

    /// Look up one of our ships by id.
    #[must_use]
    pub fn own_ship(&self, id: ShipId) -> Option<&Ship> {
        self.my.iter().find(|s| s.id == id)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATTLE: &str = r#"{
        "FireInfos": [{"EffectType": 0, "Source": "1/1/1", "Target": "5/5/5"}],
        "My": [{
            "Id": 0, "Position": "2/2/2", "Velocity": "0/0/0", "Energy": 10, "Health": 50,
            "Equipment": [
                {"Name": "drive", "Type": 2, "MaxAccelerate": 1},
                {"Name": "gun1", "Type": 1, "Damage": 5, "EffectType": 0, "EnergyPrice": 1, "Radius": 5},
                {"Name": "gun2", "Type": 1, "Damage": 5, "EffectType": 0, "EnergyPrice": 1, "Radius": 3}
            ]
        }],
        "Opponent": [{"Id": 10000, "Position": "20/20/20", "Velocity": "-1/0/0", "Health": 40, "Equipment": null}]
    }"#;

    #[test]
    fn test_decode_battle_snapshot() {
        let snapshot: BattleSnapshot = serde_json::from_str(BATTLE).unwrap();
        assert_eq!(snapshot.fire_infos.len(), 1);
        assert_eq!(snapshot.fire_infos[0].target, Vector::new(5, 5, 5));

        let ship = &snapshot.my[0];
        assert_eq!(ship.engine().map(|e| e.max_accelerate), Some(1));
        let guns: Vec<&str> = ship.guns().map(|g| g.name.as_str()).collect();
        assert_eq!(guns, vec!["gun1", "gun2"]);

        let enemy = snapshot.opponent(10000).unwrap();
        assert!(enemy.equipment.is_empty());
        assert_eq!(enemy.predicted_position(), Vector::new(19, 20, 20));
    }

    #[test]
    fn test_ship_identity_is_id_only() {
        let a = Ship::new(3, Vector::new(1, 1, 1));
        let mut b = Ship::new(3, Vector::new(9, 9, 9));
        b.health = Some(1);
        assert_eq!(a, b);
        assert_ne!(a, Ship::new(4, Vector::new(1, 1, 1)));
    }

    #[test]
    fn test_unknown_health_ranks_last() {
        let mut known = Ship::new(1, Vector::ZERO);
        known.health = Some(1000);
        let unknown = Ship::new(2, Vector::ZERO);
        assert!(known.health_rank() < unknown.health_rank());
    }

    #[test]
    fn test_malformed_vector_fails_decode() {
        let json = r#"{"My": [{"Id": 0, "Position": "2/2", "Velocity": "0/0/0"}]}"#;
        assert!(serde_json::from_str::<BattleSnapshot>(json).is_err());
    }

    #[test]
    fn test_out_of_range_position_fails_decode() {
        let json = r#"{"My": [{"Id": 0, "Position": "2147483647/0/0", "Velocity": "1/0/0"}]}"#;
        let err = serde_json::from_str::<BattleSnapshot>(json).unwrap_err();
        assert!(err.to_string().contains("playable range"));
    }
}
