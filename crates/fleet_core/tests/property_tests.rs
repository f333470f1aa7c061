//! Property-based tests for the decision core.

use std::collections::HashSet;

use fleet_core::prelude::*;
use fleet_test_utils::determinism::strategies::{arb_cell, arb_snapshot, arb_vector};
use fleet_test_utils::determinism::verify_determinism;
use fleet_test_utils::proptest::prelude::*;

proptest! {
    #[test]
    fn prop_clen_is_symmetric(a in arb_vector(), b in arb_vector()) {
        prop_assert_eq!(a.clen(b), b.clen(a));
    }

    #[test]
    fn prop_clen_is_zero_only_for_equal(a in arb_vector(), b in arb_vector()) {
        prop_assert_eq!(a.clen(b) == 0, a == b);
        prop_assert!(a.clen(b) >= 0);
    }

    #[test]
    fn prop_clen_triangle_inequality(
        a in arb_vector(),
        b in arb_vector(),
        c in arb_vector(),
    ) {
        prop_assert!(a.clen(c) <= a.clen(b) + b.clen(c));
    }

    /// No coordinate at or past the far wall is ever accepted.
    #[test]
    fn prop_in_bounds_rejects_far_wall(a in arb_vector()) {
        let bounds = MapBounds::default();
        let past_wall = [a.x, a.y, a.z].iter().any(|&c| c >= bounds.map_size || c <= 0);
        if past_wall {
            prop_assert!(!a.in_bounds(&bounds));
        }
    }

    #[test]
    fn prop_side_aware_bounds_stay_inside_map(a in arb_vector(), side in 0i32..=1) {
        let bounds = MapBounds::new(30, 2, BoundsMargin::SideAware).with_side(side);
        if a.in_bounds(&bounds) {
            prop_assert!([a.x, a.y, a.z].iter().all(|&c| c > 0 && c < 30));
        }
    }

    #[test]
    fn prop_lock_resolution_is_deterministic(snapshot in arb_snapshot()) {
        let a = TargetLock::empty().resolve(&snapshot);
        let b = TargetLock::empty().resolve(&snapshot);
        prop_assert_eq!(a, b);
        if snapshot.my.is_empty() || snapshot.opponent.is_empty() {
            prop_assert_eq!(a, TargetLock::empty());
        } else {
            prop_assert!(a.id().is_some());
        }
    }

    /// A surviving target keeps the lock no matter what else is closer.
    #[test]
    fn prop_lock_persists_while_target_lives(
        snapshot in arb_snapshot(),
        pick in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!snapshot.opponent.is_empty());
        let chosen = &snapshot.opponent[pick.index(snapshot.opponent.len())];
        let lock = TargetLock::on(chosen).resolve(&snapshot);
        prop_assert_eq!(lock.id(), Some(chosen.id));
    }

    /// A ship with a real choice never lands in a cell an earlier ship
    /// reserved this turn.
    #[test]
    fn prop_reservations_are_respected(snapshot in arb_snapshot()) {
        let tactics = TacticsConfig::default();
        let lock = TargetLock::empty().resolve(&snapshot);
        let mut planner = MovementPlanner::new(&snapshot, &lock, &tactics);

        for ship in &snapshot.my {
            let before: HashSet<Vector> = planner.reserved().clone();
            let had_choice = ship
                .engine()
                .is_some_and(|e| !planner.candidates(ship.position, e.max_accelerate).is_empty());
            let destination = planner.plan(ship);
            if had_choice {
                let destination = destination.unwrap_or(ship.position);
                prop_assert!(!before.contains(&destination));
                prop_assert!(destination.in_bounds(&tactics.bounds()));
            }
        }
    }

    /// Every ATTACK is within the firing gun's radius plus the margin.
    #[test]
    fn prop_attacks_are_in_range(snapshot in arb_snapshot()) {
        let tactics = TacticsConfig::default();
        let decision =
            DecisionPipeline::new(tactics.clone()).decide(&snapshot, &TargetLock::empty());

        for command in decision.output.commands() {
            if let Command::Attack { id, name, target } = command {
                let shooter = snapshot.own_ship(*id);
                prop_assert!(shooter.is_some());
                let shooter = shooter.unwrap();
                let radius = shooter.guns().find(|g| &g.name == name).map(|g| g.radius);
                prop_assert!(radius.is_some());
                let reach = radius.unwrap() + tactics.safety_margin();
                prop_assert!(shooter.position.clen(*target) <= reach);
            }
        }
    }

    /// Commands come out grouped per ship in snapshot order, MOVE first.
    #[test]
    fn prop_commands_follow_ship_order(snapshot in arb_snapshot()) {
        let decision = DecisionPipeline::default().decide(&snapshot, &TargetLock::empty());
        let order: Vec<ShipId> = snapshot.my.iter().map(|s| s.id).collect();
        let mut last = 0usize;
        let mut seen_attack_for = None;
        for command in decision.output.commands() {
            let index = order.iter().position(|&id| id == command.ship_id());
            prop_assert!(index.is_some());
            let index = index.unwrap();
            prop_assert!(index >= last);
            if index > last {
                seen_attack_for = None;
            }
            last = index;
            match command {
                Command::Move { .. } => {
                    prop_assert_ne!(seen_attack_for, Some(index));
                }
                Command::Attack { .. } => seen_attack_for = Some(index),
                Command::Accelerate { .. } => {
                    prop_assert!(false, "pipeline never accelerates");
                }
            }
        }
    }

    #[test]
    fn prop_pipeline_is_deterministic(snapshot in arb_snapshot()) {
        let result = verify_determinism(&DecisionPipeline::default(), &snapshot, 3, 2);
        prop_assert!(result.is_deterministic);
    }

    #[test]
    fn prop_hazard_cells_are_never_chosen(snapshot in arb_snapshot(), extra in arb_cell()) {
        let mut snapshot = snapshot;
        snapshot.fire_infos.push(FireInfo {
            effect_type: EffectType::BLASTER,
            source: Vector::ZERO,
            target: extra,
        });
        let tactics = TacticsConfig::default();
        let lock = TargetLock::empty().resolve(&snapshot);
        let mut planner = MovementPlanner::new(&snapshot, &lock, &tactics);
        let hazards = HazardMap::build(&snapshot, &tactics);

        for ship in &snapshot.my {
            let had_choice = ship
                .engine()
                .is_some_and(|e| !planner.candidates(ship.position, e.max_accelerate).is_empty());
            if let Some(destination) = planner.plan(ship) {
                if had_choice {
                    prop_assert!(!hazards.contains(destination));
                }
            }
        }
    }
}
