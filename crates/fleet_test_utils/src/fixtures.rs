//! Test fixtures and helpers.
//!
//! Pre-built ships and battle snapshots for consistent testing.

use fleet_core::equipment::{EffectType, EngineBlock, EquipmentBlock, GunBlock};
use fleet_core::math::Vector;
use fleet_core::snapshot::{BattleSnapshot, FireInfo, Ship, ShipId};

/// Shorthand for [`Vector::new`].
#[must_use]
pub const fn v(x: i32, y: i32, z: i32) -> Vector {
    Vector::new(x, y, z)
}

/// An engine block with the given per-turn step.
#[must_use]
pub fn engine(max_accelerate: i32) -> EquipmentBlock {
    EquipmentBlock::Engine(EngineBlock {
        name: "drive".to_string(),
        max_accelerate,
    })
}

/// A blaster with the given name and radius.
#[must_use]
pub fn gun(name: &str, radius: i32) -> EquipmentBlock {
    EquipmentBlock::Gun(GunBlock {
        name: name.to_string(),
        damage: 5,
        effect_type: EffectType::BLASTER,
        energy_price: 1,
        radius,
    })
}

/// One of our ships with an engine and a single gun.
#[must_use]
pub fn warship(id: ShipId, position: Vector, step: i32, radius: i32) -> Ship {
    let mut ship = Ship::new(id, position);
    ship.energy = Some(10);
    ship.health = Some(50);
    ship.equipment = vec![engine(step), gun("blaster", radius)];
    ship
}

/// One of our ships with an engine only.
#[must_use]
pub fn tug(id: ShipId, position: Vector, step: i32) -> Ship {
    let mut ship = Ship::new(id, position);
    ship.equipment = vec![engine(step)];
    ship
}

/// An opponent as the server reports it: no equipment.
#[must_use]
pub fn enemy(id: ShipId, position: Vector, velocity: Vector, health: i32) -> Ship {
    let mut ship = Ship::new(id, position);
    ship.velocity = velocity;
    ship.health = Some(health);
    ship
}

/// A shot fired last turn at `target`.
#[must_use]
pub fn shot_at(target: Vector) -> FireInfo {
    FireInfo {
        effect_type: EffectType::BLASTER,
        source: Vector::ZERO,
        target,
    }
}

/// Assemble a snapshot.
#[must_use]
pub fn battle(my: Vec<Ship>, opponent: Vec<Ship>, fire_infos: Vec<FireInfo>) -> BattleSnapshot {
    BattleSnapshot {
        fire_infos,
        my,
        opponent,
    }
}

/// A crowded mid-game battle: `per_side` ships each, our fleet on the
/// near half and theirs on the far half, with incoming fire on half our
/// positions.
#[must_use]
pub fn dense_battle(per_side: u32) -> BattleSnapshot {
    let cell = |i: u32, base: i32| {
        let i = i32::try_from(i).unwrap_or(0);
        v(base + (i % 4) * 3, 3 + (i / 4 % 6) * 4, 3 + (i / 24) * 4)
    };

    let my: Vec<Ship> = (0..per_side)
        .map(|i| warship(i, cell(i, 2), 1, 5))
        .collect();
    let opponent: Vec<Ship> = (0..per_side)
        .map(|i| {
            let health = 10 + i32::try_from(i % 7).unwrap_or(0) * 5;
            enemy(10_000 + i, cell(i, 15), v(-1, 0, 0), health)
        })
        .collect();
    let fire_infos = my.iter().step_by(2).map(|s| shot_at(s.position)).collect();

    battle(my, opponent, fire_infos)
}

/// The snapshot as a single protocol line.
///
/// # Panics
///
/// Panics if the snapshot cannot be serialized.
#[must_use]
pub fn snapshot_json(snapshot: &BattleSnapshot) -> String {
    serde_json::to_string(snapshot).expect("snapshot serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_battle_is_in_bounds() {
        let bounds = fleet_core::math::MapBounds::default();
        let snapshot = dense_battle(12);
        assert_eq!(snapshot.my.len(), 12);
        assert!(snapshot.my.iter().all(|s| s.position.in_bounds(&bounds)));
        assert!(snapshot
            .opponent
            .iter()
            .all(|s| s.position.in_bounds(&bounds)));
    }

    #[test]
    fn test_snapshot_json_decodes() {
        let snapshot = dense_battle(3);
        let back: BattleSnapshot = serde_json::from_str(&snapshot_json(&snapshot)).unwrap();
        assert_eq!(back, snapshot);
    }
}
