//! # Fleet Core
//!
//! Deterministic decision core for the fleet tactics agent.
//!
//! This crate contains **only** deterministic logic:
//! - No IO
//! - No clocks
//! - No randomness
//! - No iteration over unordered collections where order affects a result
//!
//! This separation enables:
//! - Killing and re-running a decision without side effects
//! - Offline profiling against recorded snapshots
//! - Reproducible tests
//!
//! ## Crate Structure
//!
//! - [`math`] - Integer lattice vectors, Chebyshev distance, map bounds
//! - [`equipment`] / [`snapshot`] - Typed battle snapshot
//! - [`targeting`] - Turn-persistent focus-fire lock
//! - [`movement`] - Hazard- and collision-aware destination planning
//! - [`weapons`] - Per-gun aim selection
//! - [`pipeline`] - The composed per-turn decision
//! - [`draft`] - Pre-battle fleet purchase

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod commands;
pub mod draft;
pub mod equipment;
pub mod error;
pub mod math;
pub mod movement;
pub mod pipeline;
pub mod snapshot;
pub mod tactics;
pub mod targeting;
pub mod weapons;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::commands::{BattleOutput, Command};
    pub use crate::draft::{make_draft, DraftChoice, DraftOptions};
    pub use crate::equipment::{
        EffectType, EnergyBlock, EngineBlock, EquipmentBlock, EquipmentKind, GunBlock, HealthBlock,
    };
    pub use crate::error::CoreError;
    pub use crate::math::{BoundsMargin, MapBounds, Vector};
    pub use crate::movement::{HazardMap, MovementPlanner};
    pub use crate::pipeline::{DecisionPipeline, TurnDecision};
    pub use crate::snapshot::{BattleSnapshot, FireInfo, Ship, ShipId};
    pub use crate::tactics::{HazardFootprint, TacticsConfig};
    pub use crate::targeting::{LockedTarget, TargetLock};
    pub use crate::weapons::WeaponTargeter;
}
