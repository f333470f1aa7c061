//! Per-gun aim selection.
//!
//! Every gun leads its shot by one turn of the target's velocity. The
//! locked target gets priority; otherwise the weakest other opponent in
//! range is engaged.

use crate::commands::Command;
use crate::equipment::GunBlock;
use crate::math::Vector;
use crate::snapshot::{BattleSnapshot, Ship};
use crate::tactics::TacticsConfig;
use crate::targeting::{LockedTarget, TargetLock};

/// Whether a shot from `from` can reach `aim`.
#[must_use]
pub fn in_range(from: Vector, aim: Vector, radius: i32, margin: i32) -> bool {
    from.clen(aim) <= radius.saturating_add(margin)
}

/// Turn-local weapon targeter.
#[derive(Debug, Clone)]
pub struct WeaponTargeter<'a> {
    target: Option<LockedTarget>,
    bystanders: Vec<&'a Ship>,
    margin: i32,
}

impl<'a> WeaponTargeter<'a> {
    /// Prepare a targeter for one turn.
    ///
    /// `lock` must already be resolved against `snapshot`.
    #[must_use]
    pub fn new(snapshot: &'a BattleSnapshot, lock: &TargetLock, tactics: &TacticsConfig) -> Self {
        let target = lock.target().copied();
        let target_id = lock.id();
        Self {
            target,
            bystanders: snapshot
                .opponent
                .iter()
                .filter(|o| Some(o.id) != target_id)
                .collect(),
            margin: tactics.safety_margin(),
        }
    }

    /// Aim point for one gun fired from `shooter`, if anything is in range.
    #[must_use]
    pub fn aim(&self, shooter: &Ship, gun: &GunBlock) -> Option<Vector> {
        let reach = |aim: Vector| in_range(shooter.position, aim, gun.radius, self.margin);

        if let Some(predicted) = self.target.map(|t| t.predicted_position()) {
            if reach(predicted) {
                return Some(predicted);
            }
        }

        self.bystanders
            .iter()
            .filter(|o| reach(o.predicted_position()))
            .min_by_key(|o| (o.health_rank(), o.id))
            .map(|o| o.predicted_position())
    }

    /// ATTACK commands for every gun on `shooter` that has a shot.
    #[must_use]
    pub fn orders(&self, shooter: &Ship) -> Vec<Command> {
        shooter
            .guns()
            .filter_map(|gun| {
                self.aim(shooter, gun).map(|target| Command::Attack {
                    id: shooter.id,
                    name: gun.name.clone(),
                    target,
                })
            })
            .collect()
    }
}
