//! JSON-lines protocol spoken with the game server.
//!
//! Every exchange is one JSON object per line, request then response:
//!
//! **Input (stdin):** one draft message, then one battle message per turn
//! **Output (stdout):** exactly one response line per input line
//!
//! # Example Session
//!
//! ```text
//! -> {"PlayerId":0,"MapSize":30,"Money":1000,"MaxShipsCount":5,"CompleteShips":[...]}
//! <- {"Ships":[{"CompleteShipId":"scout"},...],"Message":"Drafted 5×scout"}
//! -> {"FireInfos":[],"My":[...],"Opponent":[...]}
//! <- {"Message":"Total retries count: 0","UserCommands":[{"Command":"MOVE",...}]}
//! ```

use fleet_core::commands::BattleOutput;
use fleet_core::draft::{DraftChoice, DraftOptions};
use fleet_core::snapshot::BattleSnapshot;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// Emitted when a response cannot be serialized.
pub const SERIALIZATION_FALLBACK: &str = r#"{"Message":"Serialization failed","UserCommands":[]}"#;

/// Error type for decoding server messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Line is not JSON at all.
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON object with neither `My` nor `PlayerId`.
    #[error("Unrecognised message: expected a battle (My) or draft (PlayerId) object")]
    Unrecognised,
    /// Looked like a battle message but did not decode.
    #[error("Invalid battle message: {0}")]
    Battle(#[source] serde_json::Error),
    /// Looked like a draft message but did not decode.
    #[error("Invalid draft message: {0}")]
    Draft(#[source] serde_json::Error),
}

// ============================================================================
// Input Messages (Server -> Agent)
// ============================================================================

/// A decoded server message.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Pre-battle purchase offer.
    Draft(Box<DraftOptions>),
    /// One battle turn.
    Battle(BattleSnapshot),
}

impl Incoming {
    /// Classify and decode one line.
    ///
    /// An object with `My` is a battle turn; one with `PlayerId` is the
    /// draft.
    pub fn from_json(line: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(line)?;
        let Some(object) = value.as_object() else {
            return Err(ProtocolError::Unrecognised);
        };

        if object.contains_key("My") {
            serde_json::from_value(value)
                .map(Self::Battle)
                .map_err(ProtocolError::Battle)
        } else if object.contains_key("PlayerId") {
            serde_json::from_value(value)
                .map(|d| Self::Draft(Box::new(d)))
                .map_err(ProtocolError::Draft)
        } else {
            Err(ProtocolError::Unrecognised)
        }
    }

    /// Message kind for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Draft(_) => "draft",
            Self::Battle(_) => "battle",
        }
    }
}

// ============================================================================
// Output Responses (Agent -> Server)
// ============================================================================

/// A response line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    /// Answer to the draft.
    Draft(DraftChoice),
    /// Answer to a battle turn.
    Battle(BattleOutput),
}

impl Outgoing {
    /// Serialize to JSON line (with newline).
    ///
    /// Never fails: a serialization error yields
    /// [`SERIALIZATION_FALLBACK`].
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            error!(error = %e, "Response serialization failed");
            SERIALIZATION_FALLBACK.to_string()
        });
        json.push('\n');
        json
    }
}

impl From<BattleOutput> for Outgoing {
    fn from(output: BattleOutput) -> Self {
        Self::Battle(output)
    }
}

impl From<DraftChoice> for Outgoing {
    fn from(choice: DraftChoice) -> Self {
        Self::Draft(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::commands::Command;
    use fleet_core::math::Vector;

    #[test]
    fn test_classify_battle() {
        let line = r#"{"FireInfos":[],"My":[{"Id":1,"Position":"1/1/1","Velocity":"0/0/0"}],"Opponent":[]}"#;
        let msg = Incoming::from_json(line).unwrap();
        assert_eq!(msg.name(), "battle");
        let Incoming::Battle(snapshot) = msg else {
            panic!("expected battle");
        };
        assert_eq!(snapshot.my.len(), 1);
    }

    #[test]
    fn test_classify_draft() {
        let line = r#"{"PlayerId":1,"Money":10,"MaxShipsCount":1,"CompleteShips":[]}"#;
        assert!(matches!(
            Incoming::from_json(line).unwrap(),
            Incoming::Draft(d) if d.player_id == 1
        ));
    }

    #[test]
    fn test_unrecognised_and_malformed() {
        assert!(matches!(
            Incoming::from_json(r#"{"Hello":1}"#),
            Err(ProtocolError::Unrecognised)
        ));
        assert!(matches!(
            Incoming::from_json("[1,2]"),
            Err(ProtocolError::Unrecognised)
        ));
        assert!(matches!(
            Incoming::from_json("{not json"),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            Incoming::from_json(r#"{"My":[{"Id":1,"Position":"1/1","Velocity":"0/0/0"}]}"#),
            Err(ProtocolError::Battle(_))
        ));
    }

    #[test]
    fn test_battle_response_line() {
        let mut output = BattleOutput::with_commands(vec![Command::Move {
            id: 1,
            target: Vector::new(2, 3, 4),
        }]);
        output.message = Some("Total retries count: 0".to_string());
        let line = Outgoing::from(output).to_json_line();
        assert_eq!(
            line,
            "{\"Message\":\"Total retries count: 0\",\"UserCommands\":[{\"Command\":\"MOVE\",\"Parameters\":{\"Id\":1,\"Target\":\"2/3/4\"}}]}\n"
        );
    }

    #[test]
    fn test_draft_response_line() {
        let line = Outgoing::from(DraftChoice::default()).to_json_line();
        assert_eq!(line, "{\"Ships\":[]}\n");
    }

    #[test]
    fn test_fallback_is_valid_json() {
        let value: Value = serde_json::from_str(SERIALIZATION_FALLBACK).unwrap();
        assert!(value.get("Message").is_some());
    }
}
