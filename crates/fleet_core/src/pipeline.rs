//! One turn of decision making.
//!
//! The pipeline is a pure function of the snapshot and the previous
//! target lock. It resolves the lock, then walks our ships in snapshot
//! order planning a move and then gun fire for each. Running it twice on
//! the same input yields the same commands, which is what makes killing
//! and restarting an attempt safe.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::{BattleOutput, Command};
use crate::movement::MovementPlanner;
use crate::snapshot::BattleSnapshot;
use crate::tactics::TacticsConfig;
use crate::targeting::TargetLock;
use crate::weapons::WeaponTargeter;

/// Everything a completed decision produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDecision {
    /// Commands for this turn.
    pub output: BattleOutput,
    /// Lock to carry into the next turn.
    pub lock: TargetLock,
}

/// The composed decision procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionPipeline {
    tactics: TacticsConfig,
}

impl DecisionPipeline {
    /// Create a pipeline with the given tuning.
    #[must_use]
    pub const fn new(tactics: TacticsConfig) -> Self {
        Self { tactics }
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn tactics(&self) -> &TacticsConfig {
        &self.tactics
    }

    /// Decide this turn's commands.
    #[must_use]
    pub fn decide(&self, snapshot: &BattleSnapshot, previous: &TargetLock) -> TurnDecision {
        let lock = previous.resolve(snapshot);
        let commands = self.plan(snapshot, &lock, || false).unwrap_or_default();
        TurnDecision {
            output: BattleOutput::with_commands(commands),
            lock,
        }
    }

    /// Like [`decide`](Self::decide), but gives up between ships once
    /// `cancelled` returns true. A cancelled run returns `None` and its
    /// partial work is dropped.
    pub fn decide_until<F>(
        &self,
        snapshot: &BattleSnapshot,
        previous: &TargetLock,
        cancelled: F,
    ) -> Option<TurnDecision>
    where
        F: FnMut() -> bool,
    {
        let lock = previous.resolve(snapshot);
        let commands = self.plan(snapshot, &lock, cancelled)?;
        Some(TurnDecision {
            output: BattleOutput::with_commands(commands),
            lock,
        })
    }

    fn plan<F>(
        &self,
        snapshot: &BattleSnapshot,
        lock: &TargetLock,
        mut cancelled: F,
    ) -> Option<Vec<Command>>
    where
        F: FnMut() -> bool,
    {
        let mut movement = MovementPlanner::new(snapshot, lock, &self.tactics);
        let weapons = WeaponTargeter::new(snapshot, lock, &self.tactics);
        let mut commands = Vec::new();

        for ship in &snapshot.my {
            if cancelled() {
                debug!(ship = ship.id, "Decision cancelled");
                return None;
            }
            if let Some(target) = movement.plan(ship) {
                commands.push(Command::Move {
                    id: ship.id,
                    target,
                });
            }
            commands.extend(weapons.orders(ship));
        }

        debug!(
            target = ?lock.id(),
            hazards = movement.hazards().len(),
            commands = commands.len(),
            "Turn decided"
        );
        Some(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{EffectType, EngineBlock, EquipmentBlock, GunBlock};
    use crate::math::Vector;
    use crate::snapshot::Ship;

    fn warship(id: u32, pos: Vector) -> Ship {
        let mut ship = Ship::new(id, pos);
        ship.equipment = vec![
            EquipmentBlock::Engine(EngineBlock {
                name: "drive".into(),
                max_accelerate: 1,
            }),
            EquipmentBlock::Gun(GunBlock {
                name: "blaster".into(),
                damage: 5,
                effect_type: EffectType::BLASTER,
                energy_price: 1,
                radius: 5,
            }),
        ];
        ship
    }

    fn battle() -> BattleSnapshot {
        let mut enemy = Ship::new(100, Vector::new(15, 10, 10));
        enemy.health = Some(30);
        BattleSnapshot {
            fire_infos: vec![],
            my: vec![
                warship(1, Vector::new(10, 10, 10)),
                warship(2, Vector::new(10, 12, 10)),
            ],
            opponent: vec![enemy],
        }
    }

    #[test]
    fn test_move_precedes_attack_per_ship() {
        let decision = DecisionPipeline::default().decide(&battle(), &TargetLock::empty());
        let kinds: Vec<(u32, &str)> = decision
            .output
            .commands()
            .iter()
            .map(|c| match c {
                Command::Move { id, .. } => (*id, "move"),
                Command::Attack { id, .. } => (*id, "attack"),
                Command::Accelerate { id, .. } => (*id, "accelerate"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![(1, "move"), (1, "attack"), (2, "move"), (2, "attack")]
        );
        assert_eq!(decision.lock.id(), Some(100));
    }

    #[test]
    fn test_decide_is_deterministic() {
        let pipeline = DecisionPipeline::default();
        let a = pipeline.decide(&battle(), &TargetLock::empty());
        let b = pipeline.decide(&battle(), &TargetLock::empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_cancelled_run_yields_nothing() {
        let pipeline = DecisionPipeline::default();
        assert!(pipeline
            .decide_until(&battle(), &TargetLock::empty(), || true)
            .is_none());

        let mut checks = 0;
        let finished = pipeline.decide_until(&battle(), &TargetLock::empty(), || {
            checks += 1;
            false
        });
        assert_eq!(checks, 2);
        assert_eq!(
            finished,
            Some(pipeline.decide(&battle(), &TargetLock::empty()))
        );
    }
}
