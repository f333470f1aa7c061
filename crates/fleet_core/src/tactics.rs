//! Tuning knobs for the decision pipeline.
//!
//! Historical builds of the agent disagreed on a handful of constants and
//! footprint shapes. They are all named here so a configuration file picks
//! one instead of the code guessing.

use serde::{Deserialize, Serialize};

use crate::math::{lattice_offsets, BoundsMargin, MapBounds, Vector};

/// Shape of the no-go cube stamped around each incoming shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HazardFootprint {
    /// Offsets `-ship_size..=0` on every axis: any anchor whose hull
    /// would cover the impact cell.
    #[default]
    Trailing,
    /// Offsets `{0, ship_size/2, -ship_size/2}` on every axis, halves
    /// rounded toward negative infinity.
    Centered,
}

/// Tactical parameters shared by movement and weapon planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    /// Edge length of the cubic map.
    pub map_size: i32,
    /// Physical ship extent, also used as the weapon range safety margin.
    pub ship_size: i32,
    /// Preferred Chebyshev distance to the locked target.
    pub standoff: i32,
    /// Opponents closer than this to a candidate cell count as crowding.
    pub proximity_threshold: i32,
    /// Half-width of the cube reserved around each chosen destination.
    pub reservation_radius: i32,
    /// No-go cube shape around incoming fire.
    pub hazard_footprint: HazardFootprint,
    /// Wall margin policy.
    pub bounds_margin: BoundsMargin,
    /// Our side of the map (player id), for [`BoundsMargin::SideAware`].
    pub side: i32,
    /// Also treat opponents' predicted cells as hazards.
    pub avoid_opponent_predictions: bool,
}

impl Default for TacticsConfig {
    fn default() -> Self {
        Self {
            map_size: 30,
            ship_size: 2,
            standoff: 5,
            proximity_threshold: 6,
            reservation_radius: 1,
            hazard_footprint: HazardFootprint::Trailing,
            bounds_margin: BoundsMargin::Extent,
            side: 0,
            avoid_opponent_predictions: false,
        }
    }
}

impl TacticsConfig {
    /// Legal anchor region.
    #[must_use]
    pub fn bounds(&self) -> MapBounds {
        MapBounds::new(self.map_size, self.ship_size, self.bounds_margin).with_side(self.side)
    }

    /// Extra reach added to every gun radius.
    #[must_use]
    pub const fn safety_margin(&self) -> i32 {
        self.ship_size
    }

    /// Offsets stamped around each hazard cell.
    #[must_use]
    pub fn hazard_offsets(&self) -> Vec<Vector> {
        let steps: Vec<i32> = match self.hazard_footprint {
            HazardFootprint::Trailing => (-self.ship_size..=0).collect(),
            HazardFootprint::Centered => {
                let up = self.ship_size.div_euclid(2);
                let down = (-self.ship_size).div_euclid(2);
                dedup_steps(&[0, up, down])
            }
        };
        lattice_offsets(&steps).collect()
    }

    /// Offsets reserved around a chosen destination.
    #[must_use]
    pub fn reservation_offsets(&self) -> Vec<Vector> {
        let r = self.reservation_radius.max(0);
        let steps: Vec<i32> = (-r..=r).collect();
        lattice_offsets(&steps).collect()
    }
}

/// Drop repeated steps while keeping first-seen order.
pub(crate) fn dedup_steps(steps: &[i32]) -> Vec<i32> {
    let mut out = Vec::with_capacity(steps.len());
    for &s in steps {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_footprint_covers_hull() {
        let tactics = TacticsConfig::default();
        let offsets = tactics.hazard_offsets();
        assert_eq!(offsets.len(), 27);
        assert!(offsets.contains(&Vector::new(-2, -2, -2)));
        assert!(offsets.contains(&Vector::ZERO));
        assert!(!offsets.contains(&Vector::new(1, 0, 0)));
    }

    #[test]
    fn test_centered_footprint() {
        let tactics = TacticsConfig {
            hazard_footprint: HazardFootprint::Centered,
            ..TacticsConfig::default()
        };
        let offsets = tactics.hazard_offsets();
        assert_eq!(offsets.len(), 27);
        assert!(offsets.contains(&Vector::new(1, -1, 0)));
        assert!(!offsets.contains(&Vector::new(2, 0, 0)));
    }

    #[test]
    fn test_centered_footprint_for_unit_ships_leans_negative() {
        let tactics = TacticsConfig {
            ship_size: 1,
            hazard_footprint: HazardFootprint::Centered,
            ..TacticsConfig::default()
        };
        let offsets = tactics.hazard_offsets();
        assert_eq!(offsets.len(), 8);
        assert_eq!(offsets[0], Vector::ZERO);
        assert!(offsets.contains(&Vector::new(-1, -1, -1)));
        assert!(!offsets.contains(&Vector::new(1, 0, 0)));
    }

    #[test]
    fn test_centered_footprint_rounds_down_for_odd_ships() {
        let tactics = TacticsConfig {
            ship_size: 3,
            hazard_footprint: HazardFootprint::Centered,
            ..TacticsConfig::default()
        };
        let offsets = tactics.hazard_offsets();
        assert_eq!(offsets.len(), 27);
        assert!(offsets.contains(&Vector::new(1, -2, 0)));
        assert!(!offsets.contains(&Vector::new(-1, 0, 0)));
        assert!(!offsets.contains(&Vector::new(2, 0, 0)));
    }

    #[test]
    fn test_reservation_cube() {
        let tactics = TacticsConfig::default();
        assert_eq!(tactics.reservation_offsets().len(), 27);

        let none = TacticsConfig {
            reservation_radius: 0,
            ..TacticsConfig::default()
        };
        assert_eq!(none.reservation_offsets(), vec![Vector::ZERO]);
    }
}
