//! Decoding of raw inbound messages into [`GameEvent`]s.
//!
//! Decoding is pure: it never touches the store. Unknown tags and malformed
//! payloads are reported as distinct [`DecodeError`] variants so the session
//! can surface protocol drift separately from garden-variety bad payloads.

use std::collections::HashSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::event::GameEvent;
use crate::protocol::{PlayerId, ServerMessage};

/// Why an inbound message could not be turned into a [`GameEvent`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message is not valid JSON.
    #[error("message is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The message is JSON but neither a bare tag nor a single-key object.
    #[error("message has no event tag (got {0})")]
    InvalidShape(&'static str),

    /// The tag is not one this client knows.
    #[error("unrecognized event tag `{0}`")]
    UnrecognizedTag(String),

    /// The tag is known but its payload failed validation.
    #[error("malformed `{tag}` payload: {reason}")]
    Malformed {
        /// The event tag.
        tag: String,
        /// What was wrong with the payload.
        reason: String,
    },
}

impl DecodeError {
    /// Returns `true` if this error points at protocol drift between client
    /// and server rather than a single bad message.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::UnrecognizedTag(_))
    }
}

/// Decode one inbound text message into a [`GameEvent`].
///
/// # Errors
///
/// See [`DecodeError`]. None of the outcomes are fatal to a session.
pub fn decode(text: &str) -> Result<GameEvent, DecodeError> {
    decode_message(text).map(GameEvent::from)
}

/// Decode one inbound text message into its wire form.
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode_message(text: &str) -> Result<ServerMessage, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;

    let (tag, payload) = match value {
        Value::String(tag) => (tag, Value::Object(Map::new())),
        Value::Object(map) if map.is_empty() => {
            return Err(DecodeError::InvalidShape("an empty object"))
        }
        Value::Object(map) if map.len() == 1 => {
            let Some((tag, payload)) = map.into_iter().next() else {
                return Err(DecodeError::InvalidShape("an empty object"));
            };
            (tag, payload)
        }
        Value::Object(_) => return Err(DecodeError::InvalidShape("a multi-key object")),
        Value::Array(_) => return Err(DecodeError::InvalidShape("an array")),
        Value::Number(_) => return Err(DecodeError::InvalidShape("a number")),
        Value::Bool(_) => return Err(DecodeError::InvalidShape("a boolean")),
        Value::Null => return Err(DecodeError::InvalidShape("null")),
    };

    if !ServerMessage::TAGS.contains(&tag.as_str()) {
        return Err(DecodeError::UnrecognizedTag(tag));
    }

    // A unit-style tag may still carry `null`; treat it as an empty payload.
    let payload = match payload {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    let mut wrapper = Map::with_capacity(1);
    wrapper.insert(tag.clone(), payload);
    let msg: ServerMessage =
        serde_json::from_value(Value::Object(wrapper)).map_err(|e| DecodeError::Malformed {
            tag: tag.clone(),
            reason: e.to_string(),
        })?;

    validate(&msg).map_err(|reason| DecodeError::Malformed { tag, reason })?;
    Ok(msg)
}

/// Checks serde cannot express on its own.
fn validate(msg: &ServerMessage) -> Result<(), String> {
    match msg {
        ServerMessage::PlayerRegister(player) => {
            require_id(&player.id)?;
            let mut keys = HashSet::with_capacity(player.marbles.len());
            for marble in &player.marbles {
                if !keys.insert(&marble.key) {
                    return Err(format!("duplicate marble key {}", marble.key));
                }
            }
            if let Some(count) = player.num_marbles {
                if !player.marbles.is_empty() && count != player.marbles.len() {
                    return Err(format!(
                        "num_marbles is {count} but {} marbles were listed",
                        player.marbles.len()
                    ));
                }
            }
            Ok(())
        }
        ServerMessage::HippoEat { id, .. }
        | ServerMessage::AddMarble { id, .. }
        | ServerMessage::BonusWinner { id }
        | ServerMessage::UpdateWinner { id }
        | ServerMessage::PlayerLose { id, .. } => require_id(id),
        ServerMessage::BeginNoseGoes { .. } => Ok(()),
        ServerMessage::EndNoseGoes {
            losers,
            loser,
            bonus_winner,
        } => {
            losers
                .iter()
                .chain(loser.iter())
                .chain(bonus_winner.iter().map(|(id, _)| id))
                .try_for_each(require_id)
        }
    }
}

fn require_id(id: &PlayerId) -> Result<(), String> {
    if id.as_str().is_empty() {
        Err("player id is empty".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::event::BonusWinner;
    use crate::protocol::MarbleKey;

    #[test]
    fn bare_string_tag_decodes_unit_event() {
        let event = decode(r#""BeginNoseGoes""#).unwrap();
        assert_eq!(event, GameEvent::EliminationRoundBegan);
    }

    #[test]
    fn begin_nose_goes_with_participants_is_accepted() {
        let event =
            decode(r#"{"BeginNoseGoes":{"duration":{"secs":10,"nanos":0},"players":["1","2"]}}"#)
                .unwrap();
        assert_eq!(event, GameEvent::EliminationRoundBegan);
    }

    #[test]
    fn hippo_eat_decodes_score_event() {
        let event = decode(r#"{"HippoEat":{"id":"7","score":12,"num_marbles":3,"marble":"m4"}}"#)
            .unwrap();
        assert_eq!(
            event,
            GameEvent::ScoreIncreased {
                player_id: PlayerId::new("7"),
                new_score: 12,
                new_item_count: Some(3),
                consumed_item_key: Some(MarbleKey::new("m4")),
            }
        );
    }

    #[test]
    fn numeric_ids_are_normalized_to_text() {
        let event = decode(r#"{"UpdateWinner":{"id":42}}"#).unwrap();
        assert_eq!(
            event,
            GameEvent::LeaderChanged {
                player_id: PlayerId::new("42")
            }
        );
    }

    #[test]
    fn end_nose_goes_merges_legacy_loser_field() {
        let event =
            decode(r#"{"EndNoseGoes":{"losers":["1"],"loser":"2","bonus_winner":["3",40]}}"#)
                .unwrap();
        assert_eq!(
            event,
            GameEvent::EliminationRoundEnded {
                loser_ids: vec![PlayerId::new("1"), PlayerId::new("2")],
                bonus_winner: Some(BonusWinner {
                    player_id: PlayerId::new("3"),
                    new_score: 40,
                }),
            }
        );
    }

    #[test]
    fn unknown_tag_is_unrecognized() {
        let err = decode(r#"{"Dance":{"id":"1"}}"#).unwrap_err();
        assert!(err.is_unrecognized());
        assert!(matches!(err, DecodeError::UnrecognizedTag(ref tag) if tag == "Dance"));
    }

    #[test]
    fn missing_field_is_malformed_not_unrecognized() {
        let err = decode(r#"{"PlayerLose":{"id":"1"}}"#).unwrap_err();
        assert!(!err.is_unrecognized());
        assert!(matches!(err, DecodeError::Malformed { ref tag, .. } if tag == "PlayerLose"));
    }

    #[test]
    fn bare_tag_for_struct_event_is_malformed() {
        let err = decode(r#""UpdateWinner""#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn empty_player_id_is_malformed() {
        let err = decode(r#"{"BonusWinner":{"id":""}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn duplicate_marble_keys_in_registration_are_malformed() {
        let text = r#"{"PlayerRegister":{"id":"1","name":"Steve","score":0,
            "marbles":[{"key":"a"},{"key":"a"}]}}"#;
        let err = decode(text).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn non_json_is_invalid_json() {
        assert!(matches!(
            decode("not json").unwrap_err(),
            DecodeError::InvalidJson(_)
        ));
    }

    #[test]
    fn wrong_shapes_are_invalid_shape() {
        for text in ["[]", "3", "true", "null", "{}", r#"{"a":1,"b":2}"#] {
            assert!(
                matches!(decode(text).unwrap_err(), DecodeError::InvalidShape(_)),
                "expected InvalidShape for {text}"
            );
        }
    }

    #[test]
    fn null_payload_counts_as_empty() {
        assert_eq!(
            decode(r#"{"BeginNoseGoes":null}"#).unwrap(),
            GameEvent::EliminationRoundBegan
        );
    }
}
