//! Focus-fire target selection that persists across turns.
//!
//! The lock is plain data. The pipeline takes the previous lock as input
//! and hands back the new one, so a discarded computation leaves no trace.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::Vector;
use crate::snapshot::{BattleSnapshot, Ship, ShipId};

/// The opponent we are focusing fire on, as last seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedTarget {
    /// Opponent id.
    pub id: ShipId,
    /// Position in the snapshot that refreshed the lock.
    pub position: Vector,
    /// Velocity in the snapshot that refreshed the lock.
    pub velocity: Vector,
    /// Hull points, if reported.
    pub health: Option<i32>,
}

impl LockedTarget {
    /// Capture an opponent's current record.
    #[must_use]
    pub fn from_ship(ship: &Ship) -> Self {
        Self {
            id: ship.id,
            position: ship.position,
            velocity: ship.velocity,
            health: ship.health,
        }
    }

    /// One-turn look-ahead of the target's position.
    #[must_use]
    pub fn predicted_position(&self) -> Vector {
        self.position + self.velocity
    }
}

/// Turn-persistent focus-fire selection. Starts empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLock {
    target: Option<LockedTarget>,
}

impl TargetLock {
    /// A lock with no target.
    #[must_use]
    pub const fn empty() -> Self {
        Self { target: None }
    }

    /// A lock on the given opponent.
    #[must_use]
    pub fn on(ship: &Ship) -> Self {
        Self {
            target: Some(LockedTarget::from_ship(ship)),
        }
    }

    /// The locked target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&LockedTarget> {
        self.target.as_ref()
    }

    /// Id of the locked target, if any.
    #[must_use]
    pub fn id(&self) -> Option<ShipId> {
        self.target.map(|t| t.id)
    }

    /// Compute this turn's lock from the previous one.
    ///
    /// A target that is still alive keeps the lock and gets its record
    /// refreshed. Otherwise the nearest opponent to our first ship is
    /// chosen, weakest first on equal distance, lowest id on full ties.
    /// With no ships of our own there is no reference point, so only a
    /// surviving lock is carried over.
    #[must_use]
    pub fn resolve(&self, snapshot: &BattleSnapshot) -> Self {
        if let Some(current) = self.id().and_then(|id| snapshot.opponent(id)) {
            return Self::on(current);
        }

        let Some(reference) = snapshot.my.first() else {
            return Self::empty();
        };

        let next = select_target(reference.position, &snapshot.opponent)
            .map_or_else(Self::empty, Self::on);
        debug!(previous = ?self.id(), next = ?next.id(), "Target lock reselected");
        next
    }
}

/// Nearest opponent to `reference`, then lowest health, then lowest id.
#[must_use]
pub fn select_target(reference: Vector, opponents: &[Ship]) -> Option<&Ship> {
    opponents
        .iter()
        .min_by_key(|o| (reference.clen(o.position), o.health_rank(), o.id))
}
