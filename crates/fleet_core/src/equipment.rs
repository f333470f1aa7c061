//! Ship equipment blocks.
//!
//! Equipment arrives as a flat JSON object discriminated by a `Type` tag.
//! It is decoded into the closed [`EquipmentBlock`] enum so every consumer
//! dispatches with an exhaustive `match`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Projectile effect type carried by guns and fire reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectType(pub u8);

impl EffectType {
    /// Plain blaster bolt.
    pub const BLASTER: Self = Self(0);
}

/// Discriminant for [`EquipmentBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquipmentKind {
    /// Energy generator.
    Energy,
    /// Weapon.
    Gun,
    /// Propulsion.
    Engine,
    /// Hull integrity.
    Health,
}

impl EquipmentKind {
    /// Numeric tag used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Energy => 0,
            Self::Gun => 1,
            Self::Engine => 2,
            Self::Health => 3,
        }
    }

    /// Human-readable name, also accepted as a tag on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Energy => "Energy",
            Self::Gun => "Gun",
            Self::Engine => "Engine",
            Self::Health => "Health",
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Energy),
            1 => Some(Self::Gun),
            2 => Some(Self::Engine),
            3 => Some(Self::Health),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [Self::Energy, Self::Gun, Self::Engine, Self::Health]
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

/// Energy generator block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnergyBlock {
    /// Block name.
    pub name: String,
    /// Energy regained per turn.
    pub increment_per_turn: i32,
    /// Capacity.
    pub max_energy: i32,
    /// Energy at battle start.
    pub start_energy: i32,
}

/// Weapon block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GunBlock {
    /// Block name, used to address the gun in ATTACK commands.
    pub name: String,
    /// Damage per hit.
    pub damage: i32,
    /// Projectile effect.
    pub effect_type: EffectType,
    /// Energy consumed per shot.
    pub energy_price: i32,
    /// Firing radius (Chebyshev).
    pub radius: i32,
}

/// Propulsion block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineBlock {
    /// Block name.
    pub name: String,
    /// Largest per-axis step the ship can take in one turn.
    pub max_accelerate: i32,
}

/// Hull integrity block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthBlock {
    /// Block name.
    pub name: String,
    /// Maximum hull points.
    pub max_health: i32,
    /// Hull points at battle start.
    pub start_health: i32,
}

/// One piece of equipment owned by a ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEquipmentBlock", into = "RawEquipmentBlock")]
pub enum EquipmentBlock {
    /// Energy generator.
    Energy(EnergyBlock),
    /// Weapon.
    Gun(GunBlock),
    /// Propulsion.
    Engine(EngineBlock),
    /// Hull integrity.
    Health(HealthBlock),
}

impl EquipmentBlock {
    /// Kind of this block.
    #[must_use]
    pub const fn kind(&self) -> EquipmentKind {
        match self {
            Self::Energy(_) => EquipmentKind::Energy,
            Self::Gun(_) => EquipmentKind::Gun,
            Self::Engine(_) => EquipmentKind::Engine,
            Self::Health(_) => EquipmentKind::Health,
        }
    }

    /// Block name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Energy(b) => &b.name,
            Self::Gun(b) => &b.name,
            Self::Engine(b) => &b.name,
            Self::Health(b) => &b.name,
        }
    }

    /// The gun payload, if this is a gun.
    #[must_use]
    pub const fn as_gun(&self) -> Option<&GunBlock> {
        match self {
            Self::Gun(gun) => Some(gun),
            _ => None,
        }
    }

    /// The engine payload, if this is an engine.
    #[must_use]
    pub const fn as_engine(&self) -> Option<&EngineBlock> {
        match self {
            Self::Engine(engine) => Some(engine),
            _ => None,
        }
    }
}

/// Kind tag as it may appear on the wire: numeric code or variant name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum KindTag {
    Code(u8),
    Name(String),
}

/// Flat wire shape shared by all equipment kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEquipmentBlock {
    name: String,
    #[serde(rename = "Type")]
    kind: Option<KindTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    increment_per_turn: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_energy: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_energy: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    damage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effect_type: Option<EffectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy_price: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_accelerate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_health: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_health: Option<i32>,
}

impl RawEquipmentBlock {
    fn require(
        &self,
        value: Option<i32>,
        kind: EquipmentKind,
        field: &'static str,
    ) -> crate::error::Result<i32> {
        value.ok_or_else(|| CoreError::MissingEquipmentField {
            name: self.name.clone(),
            kind: kind.name(),
            field,
        })
    }
}

impl TryFrom<RawEquipmentBlock> for EquipmentBlock {
    type Error = CoreError;

    fn try_from(raw: RawEquipmentBlock) -> Result<Self, Self::Error> {
        let kind = match &raw.kind {
            Some(KindTag::Code(code)) => EquipmentKind::from_code(*code)
                .ok_or_else(|| CoreError::UnknownEquipmentKind(code.to_string()))?,
            Some(KindTag::Name(name)) => EquipmentKind::from_name(name)
                .ok_or_else(|| CoreError::UnknownEquipmentKind(name.clone()))?,
            None => return Err(CoreError::UnknownEquipmentKind("<missing>".to_string())),
        };

        let block = match kind {
            EquipmentKind::Energy => Self::Energy(EnergyBlock {
                increment_per_turn: raw.require(raw.increment_per_turn, kind, "IncrementPerTurn")?,
                max_energy: raw.require(raw.max_energy, kind, "MaxEnergy")?,
                start_energy: raw.require(raw.start_energy, kind, "StartEnergy")?,
                name: raw.name,
            }),
            EquipmentKind::Gun => Self::Gun(GunBlock {
                damage: raw.require(raw.damage, kind, "Damage")?,
                effect_type: raw.effect_type.unwrap_or_default(),
                energy_price: raw.energy_price.unwrap_or(0),
                radius: raw.require(raw.radius, kind, "Radius")?,
                name: raw.name,
            }),
            EquipmentKind::Engine => Self::Engine(EngineBlock {
                max_accelerate: raw.require(raw.max_accelerate, kind, "MaxAccelerate")?,
                name: raw.name,
            }),
            EquipmentKind::Health => Self::Health(HealthBlock {
                max_health: raw.require(raw.max_health, kind, "MaxHealth")?,
                start_health: raw.require(raw.start_health, kind, "StartHealth")?,
                name: raw.name,
            }),
        };
        Ok(block)
    }
}

impl From<EquipmentBlock> for RawEquipmentBlock {
    fn from(block: EquipmentBlock) -> Self {
        let kind = Some(KindTag::Code(block.kind().code()));
        match block {
            EquipmentBlock::Energy(b) => Self {
                name: b.name,
                kind,
                increment_per_turn: Some(b.increment_per_turn),
                max_energy: Some(b.max_energy),
                start_energy: Some(b.start_energy),
                ..Self::default()
            },
            EquipmentBlock::Gun(b) => Self {
                name: b.name,
                kind,
                damage: Some(b.damage),
                effect_type: Some(b.effect_type),
                energy_price: Some(b.energy_price),
                radius: Some(b.radius),
                ..Self::default()
            },
            EquipmentBlock::Engine(b) => Self {
                name: b.name,
                kind,
                max_accelerate: Some(b.max_accelerate),
                ..Self::default()
            },
            EquipmentBlock::Health(b) => Self {
                name: b.name,
                kind,
                max_health: Some(b.max_health),
                start_health: Some(b.start_health),
                ..Self::default()
            },
        }
    }
}
