//! Determinism testing utilities.
//!
//! Killing a decision attempt and starting over is only safe when the
//! pipeline is a pure function of its input. This module runs the same
//! input many times, sequentially and on parallel threads, and compares
//! the serialized results.
//!
//! # Sources of non-determinism
//!
//! - **Hash set iteration order**: Rust's default hasher is randomized.
//!   Hazard and reservation sets are only ever queried, never iterated.
//!
//! - **Ties in minimisation**: every "pick the best" carries an explicit
//!   secondary key.
//!
//! - **Clocks**: the decision core never reads one.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use fleet_core::pipeline::{DecisionPipeline, TurnDecision};
use fleet_core::snapshot::BattleSnapshot;
use fleet_core::targeting::TargetLock;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns chained per run.
    pub turns: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic pipeline).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Decision pipeline is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Hash of a decision's wire form plus its lock.
///
/// # Panics
///
/// Panics if the decision cannot be serialized.
#[must_use]
pub fn decision_hash(decision: &TurnDecision) -> u64 {
    let json = serde_json::to_string(decision).expect("decision serializes");
    compute_hash(&json)
}

/// Feed the same snapshot `turns` times in a row, threading the lock,
/// and hash the final decision. Repeat `runs` times.
#[must_use]
pub fn verify_determinism(
    pipeline: &DecisionPipeline,
    snapshot: &BattleSnapshot,
    runs: usize,
    turns: u64,
) -> DeterminismResult {
    let hashes: Vec<u64> = (0..runs)
        .map(|_| decision_hash(&chain(pipeline, snapshot, turns)))
        .collect();

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        turns,
    }
}

/// Like [`verify_determinism`] but every run gets its own thread.
///
/// # Panics
///
/// Panics if a worker thread panics.
#[must_use]
pub fn verify_parallel_determinism(
    pipeline: &DecisionPipeline,
    snapshot: &BattleSnapshot,
    runs: usize,
    turns: u64,
) -> DeterminismResult {
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..runs)
            .map(|_| s.spawn(|| decision_hash(&chain(pipeline, snapshot, turns))))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("determinism run panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        turns,
    }
}

fn chain(pipeline: &DecisionPipeline, snapshot: &BattleSnapshot, turns: u64) -> TurnDecision {
    let mut decision = pipeline.decide(snapshot, &TargetLock::empty());
    for _ in 1..turns {
        decision = pipeline.decide(snapshot, &decision.lock);
    }
    decision
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
///
/// Positions stay strictly inside the default 30-cell map so generated
/// ships are always legal anchors.
pub mod strategies {
    use fleet_core::equipment::EquipmentBlock;
    use fleet_core::math::Vector;
    use fleet_core::snapshot::{BattleSnapshot, Ship};
    use proptest::prelude::*;

    use crate::fixtures::{engine, gun, shot_at};

    /// Any vector in a generous range, including negatives.
    pub fn arb_vector() -> impl Strategy<Value = Vector> {
        (-50i32..50, -50i32..50, -50i32..50).prop_map(|(x, y, z)| Vector::new(x, y, z))
    }

    /// A legal anchor cell on the default map.
    pub fn arb_cell() -> impl Strategy<Value = Vector> {
        (1i32..28, 1i32..28, 1i32..28).prop_map(|(x, y, z)| Vector::new(x, y, z))
    }

    /// A small velocity.
    pub fn arb_velocity() -> impl Strategy<Value = Vector> {
        (-2i32..=2, -2i32..=2, -2i32..=2).prop_map(|(x, y, z)| Vector::new(x, y, z))
    }

    /// Equipment for one of our ships: maybe an engine, up to two guns.
    pub fn arb_loadout() -> impl Strategy<Value = Vec<EquipmentBlock>> {
        (
            proptest::option::of(0i32..=3),
            proptest::collection::vec(1i32..=8, 0..=2),
        )
            .prop_map(|(step, radii)| {
                let mut blocks: Vec<EquipmentBlock> = step.map(engine).into_iter().collect();
                blocks.extend(
                    radii
                        .into_iter()
                        .enumerate()
                        .map(|(i, r)| gun(&format!("gun{i}"), r)),
                );
                blocks
            })
    }

    /// Health, sometimes unreported.
    pub fn arb_health() -> impl Strategy<Value = Option<i32>> {
        proptest::option::of(1i32..=100)
    }

    /// A random battle with unique ids on each side.
    pub fn arb_snapshot() -> impl Strategy<Value = BattleSnapshot> {
        let own = proptest::collection::vec((arb_cell(), arb_loadout()), 0..=5);
        let theirs = proptest::collection::vec((arb_cell(), arb_velocity(), arb_health()), 0..=5);
        let fire = proptest::collection::vec(arb_cell(), 0..=4);

        (own, theirs, fire).prop_map(|(own, theirs, fire)| BattleSnapshot {
            fire_infos: fire.into_iter().map(shot_at).collect(),
            my: own
                .into_iter()
                .zip(0u32..)
                .map(|((position, equipment), id)| {
                    let mut ship = Ship::new(id, position);
                    ship.equipment = equipment;
                    ship
                })
                .collect(),
            opponent: theirs
                .into_iter()
                .zip(10_000u32..)
                .map(|((position, velocity, health), id)| {
                    let mut ship = Ship::new(id, position);
                    ship.velocity = velocity;
                    ship.health = health;
                    ship
                })
                .collect(),
        })
    }
}
