//! Per-ship destination planning on the lattice.
//!
//! Each ship with an engine may jump by `-s`, `0` or `+s` on every axis.
//! Candidates that leave the map, stand in incoming fire, or overlap a
//! teammate's reserved cube are dropped; the survivor closest to the
//! preferred standoff from the locked target (and furthest from crowds of
//! other opponents) wins. Ships are planned one after another and every
//! choice reserves a cube, so processing order matters and follows the
//! snapshot.

use std::collections::HashSet;

use tracing::trace;

use crate::math::{lattice_offsets, MapBounds, Vector, COORDINATE_LIMIT};
use crate::snapshot::{BattleSnapshot, Ship};
use crate::tactics::{dedup_steps, TacticsConfig};
use crate::targeting::TargetLock;

/// Cells that are unsafe to end a turn in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HazardMap {
    cells: HashSet<Vector>,
}

impl HazardMap {
    /// Stamp the hazard footprint around every incoming shot, and around
    /// opponents' predicted cells when configured.
    #[must_use]
    pub fn build(snapshot: &BattleSnapshot, tactics: &TacticsConfig) -> Self {
        let offsets = tactics.hazard_offsets();
        let mut centres: Vec<Vector> = snapshot.fire_infos.iter().map(|f| f.target).collect();
        if tactics.avoid_opponent_predictions {
            centres.extend(snapshot.opponent.iter().map(Ship::predicted_position));
        }

        let cells = centres
            .iter()
            .flat_map(|&c| offsets.iter().map(move |&d| c + d))
            .collect();
        Self { cells }
    }

    /// Whether `cell` is unsafe.
    #[must_use]
    pub fn contains(&self, cell: Vector) -> bool {
        self.cells.contains(&cell)
    }

    /// Number of unsafe cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when nothing is unsafe.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Turn-local movement planner.
///
/// Holds the cells reserved by ships already planned this turn.
#[derive(Debug, Clone)]
pub struct MovementPlanner {
    bounds: MapBounds,
    hazards: HazardMap,
    reserved: HashSet<Vector>,
    reservation_offsets: Vec<Vector>,
    standoff: i32,
    proximity_threshold: i32,
    target: Option<Vector>,
    bystanders: Vec<Vector>,
}

impl MovementPlanner {
    /// Prepare a planner for one turn.
    ///
    /// `lock` must already be resolved against `snapshot`.
    #[must_use]
    pub fn new(snapshot: &BattleSnapshot, lock: &TargetLock, tactics: &TacticsConfig) -> Self {
        let target_id = lock.id();
        Self {
            bounds: tactics.bounds(),
            hazards: HazardMap::build(snapshot, tactics),
            reserved: HashSet::new(),
            reservation_offsets: tactics.reservation_offsets(),
            standoff: tactics.standoff,
            proximity_threshold: tactics.proximity_threshold,
            target: lock.target().map(|t| t.position),
            bystanders: snapshot
                .opponent
                .iter()
                .filter(|o| Some(o.id) != target_id)
                .map(|o| o.position)
                .collect(),
        }
    }

    /// The hazard cells in effect this turn.
    #[must_use]
    pub const fn hazards(&self) -> &HazardMap {
        &self.hazards
    }

    /// Cells claimed so far this turn.
    #[must_use]
    pub const fn reserved(&self) -> &HashSet<Vector> {
        &self.reserved
    }

    /// Reachable, in-bounds, safe and unreserved cells for a ship at
    /// `position` with engine step `step`, in generation order.
    #[must_use]
    pub fn candidates(&self, position: Vector, step: i32) -> Vec<Vector> {
        let step = step.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT);
        let steps = dedup_steps(&[0, step, -step]);
        lattice_offsets(&steps)
            .map(|d| position + d)
            .filter(|&c| {
                c.in_bounds(&self.bounds) && !self.hazards.contains(c) && !self.reserved.contains(&c)
            })
            .collect()
    }

    /// Lower is better: distance from the preferred standoff plus the
    /// number of other opponents crowding the cell.
    #[must_use]
    pub fn score(&self, cell: Vector) -> i32 {
        let standoff = self
            .target
            .map_or(0, |t| (self.standoff - t.clen(cell)).abs());
        let crowding = self
            .bystanders
            .iter()
            .filter(|&&o| o.clen(cell) < self.proximity_threshold)
            .count();
        standoff + i32::try_from(crowding).unwrap_or(i32::MAX)
    }

    /// Choose a destination for `ship` and reserve the space around it.
    ///
    /// Returns `None` for ships without an engine. A ship with no safe
    /// candidate stays where it is.
    pub fn plan(&mut self, ship: &Ship) -> Option<Vector> {
        let engine = ship.engine()?;
        let candidates = self.candidates(ship.position, engine.max_accelerate);

        // First candidate wins ties, so "stay" is preferred when it scores equal.
        let destination = candidates
            .iter()
            .enumerate()
            .min_by_key(|&(i, &c)| (self.score(c), i))
            .map_or(ship.position, |(_, &c)| c);

        trace!(
            ship = ship.id,
            candidates = candidates.len(),
            destination = %destination,
            "Planned move"
        );

        self.reserve(destination);
        Some(destination)
    }

    fn reserve(&mut self, destination: Vector) {
        self.reserved
            .extend(self.reservation_offsets.iter().map(|&d| destination + d));
    }
}
