//! Pre-battle fleet purchase.
//!
//! The first message of a game offers a catalogue of complete ships and a
//! budget. We buy greedily: the priciest hull we can afford while keeping
//! enough money to fill every remaining slot with the cheapest hull.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::equipment::EquipmentBlock;
use crate::math::Vector;

/// A purchasable ship design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompleteShip {
    /// Catalogue id.
    pub id: String,
    /// Cost.
    pub price: i64,
    /// Names of the installed equipment.
    #[serde(default)]
    pub equipment: Vec<String>,
}

/// A purchasable equipment block with its hull footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftEquipment {
    /// Hull slots taken.
    pub size: i32,
    /// The block itself.
    pub equipment: EquipmentBlock,
}

/// Corners of our spawn region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartArea {
    /// One corner.
    pub from: Vector,
    /// Opposite corner.
    pub to: Vector,
}

/// The draft-phase message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftOptions {
    /// Our player number, which is also our side of the map.
    pub player_id: i32,
    /// Edge length of the cubic map.
    #[serde(default)]
    pub map_size: Option<i32>,
    /// Budget.
    #[serde(default)]
    pub money: i64,
    /// Fleet size cap.
    #[serde(default)]
    pub max_ships_count: u32,
    /// Time allowed for the draft answer, in milliseconds.
    #[serde(default)]
    pub draft_timeout: Option<u64>,
    /// Time allowed for each battle answer, in milliseconds.
    #[serde(default)]
    pub battle_round_timeout: Option<u64>,
    /// Spawn region.
    #[serde(default)]
    pub start_area: Option<StartArea>,
    /// Loose equipment catalogue.
    #[serde(default)]
    pub equipment: Vec<DraftEquipment>,
    /// Complete ship catalogue.
    #[serde(default)]
    pub complete_ships: Vec<CompleteShip>,
}

/// One purchased ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftShipChoice {
    /// Catalogue id.
    pub complete_ship_id: String,
    /// Requested spawn cell; the server places the ship when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector>,
}

/// Our answer to the draft message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftChoice {
    /// Purchases in slot order.
    pub ships: Vec<DraftShipChoice>,
    /// Status line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Buy a fleet.
#[must_use]
pub fn make_draft(options: &DraftOptions) -> DraftChoice {
    let mut catalogue: Vec<&CompleteShip> = options.complete_ships.iter().collect();
    catalogue.sort_by(|a, b| {
        Reverse(a.price.max(1))
            .cmp(&Reverse(b.price.max(1)))
            .then_with(|| a.id.cmp(&b.id))
    });

    let Some(cheapest) = catalogue.last().map(|s| s.price.max(1)) else {
        return DraftChoice {
            ships: Vec::new(),
            message: Some("Nothing to draft".to_string()),
        };
    };

    let slots = options.max_ships_count;
    let mut money = options.money;
    let mut bought: Vec<&CompleteShip> = Vec::new();

    for slot in 0..slots {
        let reserve = i64::from(slots - slot) * cheapest;
        let pick = catalogue.iter().copied().find(|s| {
            let price = s.price.max(1);
            if price == cheapest {
                money >= price
            } else {
                money >= price + reserve
            }
        });
        let Some(ship) = pick else { break };
        money -= ship.price.max(1);
        bought.push(ship);
    }

    let positions = placements(options, &bought);
    let ships = bought
        .iter()
        .zip(positions)
        .map(|(ship, position)| DraftShipChoice {
            complete_ship_id: ship.id.clone(),
            position,
        })
        .collect();

    let message = summary(&catalogue, &bought);
    info!(spent = options.money - money, %message, "Draft complete");
    DraftChoice {
        ships,
        message: Some(message),
    }
}

/// Line the fleet up along X through the middle of the map, at the near
/// corner of the start area.
fn placements(options: &DraftOptions, bought: &[&CompleteShip]) -> Vec<Option<Vector>> {
    let (Some(area), Some(map_size)) = (options.start_area, options.map_size) else {
        return vec![None; bought.len()];
    };

    let spacing = bought
        .iter()
        .map(|s| isqrt(s.equipment.len()) + 1)
        .max()
        .unwrap_or(1);
    let count = i32::try_from(bought.len()).unwrap_or(i32::MAX);
    let y = area.from.y.min(area.to.y);
    let z = area.from.z.min(area.to.z);

    (0..count)
        .map(|i| Some(Vector::new(map_size / 2 - (count / 2 - i) * spacing, y, z)))
        .collect()
}

fn summary(catalogue: &[&CompleteShip], bought: &[&CompleteShip]) -> String {
    let parts: Vec<String> = catalogue
        .iter()
        .filter_map(|design| {
            let n = bought.iter().filter(|b| b.id == design.id).count();
            (n > 0).then(|| format!("{n}×{}", design.id))
        })
        .collect();
    if parts.is_empty() {
        "Drafted nothing".to_string()
    } else {
        format!("Drafted {}", parts.join(", "))
    }
}

fn isqrt(n: usize) -> i32 {
    let mut root: usize = 0;
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    i32::try_from(root).unwrap_or(i32::MAX)
}
