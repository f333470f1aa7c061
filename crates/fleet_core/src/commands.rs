//! Orders issued to our ships and the per-turn response envelope.

use serde::{Deserialize, Serialize};

use crate::math::Vector;
use crate::snapshot::ShipId;

/// A single order, serialized as `{"Command": "...", "Parameters": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Command", content = "Parameters")]
pub enum Command {
    /// Fly to a cell.
    #[serde(rename = "MOVE", rename_all = "PascalCase")]
    Move {
        /// Ship to move.
        id: ShipId,
        /// Destination cell.
        target: Vector,
    },

    /// Fire one gun.
    #[serde(rename = "ATTACK", rename_all = "PascalCase")]
    Attack {
        /// Firing ship.
        id: ShipId,
        /// Gun block name.
        name: String,
        /// Aim point.
        target: Vector,
    },

    /// Change velocity directly. Part of the game protocol; the
    /// pipeline plans with MOVE only.
    #[serde(rename = "ACCELERATE", rename_all = "PascalCase")]
    Accelerate {
        /// Ship to accelerate.
        id: ShipId,
        /// Velocity change.
        vector: Vector,
    },
}

impl Command {
    /// Ship the order is addressed to.
    #[must_use]
    pub const fn ship_id(&self) -> ShipId {
        match self {
            Self::Move { id, .. } | Self::Attack { id, .. } | Self::Accelerate { id, .. } => *id,
        }
    }
}

/// One turn's response: a status line and the ordered command batch.
///
/// Absent fields are left out of the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutput {
    /// Human-readable status.
    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Orders, in the order they should be applied.
    #[serde(
        rename = "UserCommands",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_commands: Option<Vec<Command>>,
}

impl BattleOutput {
    /// A response carrying the given commands.
    #[must_use]
    pub fn with_commands(commands: Vec<Command>) -> Self {
        Self {
            message: None,
            user_commands: Some(commands),
        }
    }

    /// A status-only response with no command list.
    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            user_commands: None,
        }
    }

    /// Commands in this response (empty when absent).
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        self.user_commands.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_wire_shape() {
        let cmd = Command::Move {
            id: 3,
            target: Vector::new(1, 2, 3),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"Command":"MOVE","Parameters":{"Id":3,"Target":"1/2/3"}}"#
        );
    }

    #[test]
    fn test_attack_wire_shape() {
        let cmd = Command::Attack {
            id: 0,
            name: "gun".into(),
            target: Vector::new(5, 5, 5),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"Command":"ATTACK","Parameters":{"Id":0,"Name":"gun","Target":"5/5/5"}}"#
        );
    }

    #[test]
    fn test_accelerate_parses() {
        let json = r#"{"Command":"ACCELERATE","Parameters":{"Id":7,"Vector":"1/0/-1"}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd.ship_id(), 7);
    }

    #[test]
    fn test_status_output_is_sparse() {
        let json = serde_json::to_string(&BattleOutput::status("hello")).unwrap();
        assert_eq!(json, r#"{"Message":"hello"}"#);
        assert!(BattleOutput::status("x").commands().is_empty());
    }

    #[test]
    fn test_empty_batch_keeps_command_list() {
        let json = serde_json::to_string(&BattleOutput::with_commands(vec![])).unwrap();
        assert_eq!(json, r#"{"UserCommands":[]}"#);
    }
}
