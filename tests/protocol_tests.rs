#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire compatibility tests for the hippo client.
//!
//! The fixtures below are the literal frames the game server puts on its
//! player and host WebSocket streams, plus the HTTP action payloads.

use std::time::Duration;

use hippo_client::codec::{self, DecodeError};
use hippo_client::event::{BonusWinner, GameEvent};
use hippo_client::protocol::{
    FeedRequest, FeedResponse, MarbleKey, NoseGoesOutcome, PlayerId, PlayersResponse,
    RegisteredPlayer, ServerMessage,
};

// ════════════════════════════════════════════════════════════════════
// Host stream fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn player_register_fixture() {
    let json = r#"{"PlayerRegister":{"id":"3","name":"Hungry Harold","score":0}}"#;
    let GameEvent::PlayerRegistered { player } = codec::decode(json).unwrap() else {
        panic!("expected PlayerRegistered");
    };
    assert_eq!(player.id, PlayerId::new("3"));
    assert_eq!(player.name, "Hungry Harold");
    assert!(player.marbles.is_empty());
    assert!(!player.has_crown);
}

#[test]
fn player_register_with_marbles_fixture() {
    let json = r##"{"PlayerRegister":{
        "id":"4","name":"Wally","score":2,"num_marbles":2,"has_crown":true,
        "marbles":[
            {"key":"a1","color":"#ff0000","angle":0.25,"radius":40.0},
            {"key":"a2","color":"#00ff00","angle":3.1,"radius":55.5}
        ]}}"##;
    let GameEvent::PlayerRegistered { player } = codec::decode(json).unwrap() else {
        panic!("expected PlayerRegistered");
    };
    assert_eq!(player.num_marbles, Some(2));
    assert_eq!(player.marbles[1].key, MarbleKey::new("a2"));
    assert!((player.marbles[1].radius - 55.5).abs() < f64::EPSILON);
}

#[test]
fn numeric_ids_are_normalized_to_text() {
    let json = r#"{"HippoEat":{"id":17,"score":4,"num_marbles":0}}"#;
    let event = codec::decode(json).unwrap();
    assert_eq!(
        event,
        GameEvent::ScoreIncreased {
            player_id: PlayerId::new("17"),
            new_score: 4,
            new_item_count: Some(0),
            consumed_item_key: None,
        }
    );
}

#[test]
fn host_hippo_eat_without_count_fixture() {
    let json = r#"{"HippoEat":{"id":"1","score":5}}"#;
    let event = codec::decode(json).unwrap();
    assert_eq!(
        event,
        GameEvent::ScoreIncreased {
            player_id: PlayerId::new("1"),
            new_score: 5,
            new_item_count: None,
            consumed_item_key: None,
        }
    );
}

#[test]
fn hippo_eat_with_consumed_marble_fixture() {
    let json = r#"{"HippoEat":{"id":"2","score":9,"num_marbles":3,"marble":"m-77"}}"#;
    let GameEvent::ScoreIncreased {
        consumed_item_key, ..
    } = codec::decode(json).unwrap()
    else {
        panic!("expected ScoreIncreased");
    };
    assert_eq!(consumed_item_key, Some(MarbleKey::new("m-77")));
}

#[test]
fn add_marble_fixture() {
    let json = r#"{"AddMarble":{"id":"2","num_marbles":1,
        "marble":{"key":"k","color":"blue","angle":1.0,"radius":2.0}}}"#;
    let GameEvent::ItemAdded {
        player_id,
        item,
        new_item_count,
    } = codec::decode(json).unwrap()
    else {
        panic!("expected ItemAdded");
    };
    assert_eq!(player_id, PlayerId::new("2"));
    assert_eq!(item.color, "blue");
    assert_eq!(new_item_count, 1);
}

#[test]
fn begin_nose_goes_host_fixture_carries_ignored_extras() {
    let json = r#"{"BeginNoseGoes":{"duration":{"secs":5,"nanos":0},"players":["1","2"]}}"#;
    let msg = codec::decode_message(json).unwrap();
    assert_eq!(
        msg,
        ServerMessage::BeginNoseGoes {
            duration: Some(Duration::from_secs(5)),
            players: vec![PlayerId::new("1"), PlayerId::new("2")],
        }
    );
    assert_eq!(GameEvent::from(msg), GameEvent::EliminationRoundBegan);
}

#[test]
fn end_nose_goes_fixture() {
    let json = r#"{"EndNoseGoes":{"losers":["5","6"],"bonus_winner":["2",14]}}"#;
    assert_eq!(
        codec::decode(json).unwrap(),
        GameEvent::EliminationRoundEnded {
            loser_ids: vec![PlayerId::new("5"), PlayerId::new("6")],
            bonus_winner: Some(BonusWinner {
                player_id: PlayerId::new("2"),
                new_score: 14,
            }),
        }
    );
}

#[test]
fn legacy_single_loser_is_merged() {
    let json = r#"{"EndNoseGoes":{"loser":"8"}}"#;
    assert_eq!(
        codec::decode(json).unwrap(),
        GameEvent::EliminationRoundEnded {
            loser_ids: vec![PlayerId::new("8")],
            bonus_winner: None,
        }
    );
}

#[test]
fn bonus_winner_and_update_winner_fixtures() {
    assert_eq!(
        codec::decode(r#"{"BonusWinner":{"id":"1"}}"#).unwrap(),
        GameEvent::BonusAwarded {
            player_id: PlayerId::new("1")
        }
    );
    assert_eq!(
        codec::decode(r#"{"UpdateWinner":{"id":"1"}}"#).unwrap(),
        GameEvent::LeaderChanged {
            player_id: PlayerId::new("1")
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Player stream fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn bare_string_tags_decode() {
    assert_eq!(
        codec::decode(r#""BeginNoseGoes""#).unwrap(),
        GameEvent::EliminationRoundBegan
    );
    assert_eq!(
        codec::decode(r#""EndNoseGoes""#).unwrap(),
        GameEvent::EliminationRoundEnded {
            loser_ids: vec![],
            bonus_winner: None,
        }
    );
}

#[test]
fn player_lose_fixture() {
    assert_eq!(
        codec::decode(r#"{"PlayerLose":{"id":"12","score":31}}"#).unwrap(),
        GameEvent::PlayerRemoved {
            player_id: PlayerId::new("12"),
            final_score: 31,
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Decode failures
// ════════════════════════════════════════════════════════════════════

#[test]
fn unknown_tag_is_reported_as_drift() {
    let err = codec::decode(r#"{"HippoDance":{"id":"1"}}"#).unwrap_err();
    assert!(err.is_unrecognized());
    assert!(matches!(err, DecodeError::UnrecognizedTag(tag) if tag == "HippoDance"));

    let err = codec::decode(r#""Intermission""#).unwrap_err();
    assert!(err.is_unrecognized());
}

#[test]
fn missing_required_field_is_malformed() {
    let err = codec::decode(r#"{"PlayerLose":{"id":"12"}}"#).unwrap_err();
    assert!(!err.is_unrecognized());
    assert!(matches!(err, DecodeError::Malformed { tag, .. } if tag == "PlayerLose"));
}

#[test]
fn negative_score_is_malformed() {
    let err = codec::decode(r#"{"HippoEat":{"id":"1","score":-3,"num_marbles":0}}"#).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { .. }));
}

#[test]
fn non_messages_are_rejected_by_shape() {
    for text in ["[]", "42", "true", "null", "{}", r#"{"a":1,"b":2}"#] {
        let err = codec::decode(text).unwrap_err();
        assert!(
            matches!(err, DecodeError::InvalidShape(_)),
            "{text} gave {err:?}"
        );
    }
    assert!(matches!(
        codec::decode("{not json").unwrap_err(),
        DecodeError::InvalidJson(_)
    ));
}

// ════════════════════════════════════════════════════════════════════
// HTTP payloads
// ════════════════════════════════════════════════════════════════════

#[test]
fn register_response_fixture() {
    let json = r#"{"id":"9","name":"Sir Chomps","score":0,"has_crown":false}"#;
    let player: RegisteredPlayer = serde_json::from_str(json).unwrap();
    assert_eq!(player.id, PlayerId::new("9"));
    assert_eq!(player.name, "Sir Chomps");
}

#[test]
fn feed_payloads() {
    let body = serde_json::to_string(&FeedRequest {
        id: PlayerId::new("9"),
    })
    .unwrap();
    assert_eq!(body, r#"{"id":"9"}"#);

    let res: FeedResponse = serde_json::from_str(r#"{"score":12}"#).unwrap();
    assert_eq!(res.score, 12);
}

#[test]
fn nose_goes_outcomes_are_bare_strings() {
    let survived: NoseGoesOutcome = serde_json::from_str(r#""Survived""#).unwrap();
    let died: NoseGoesOutcome = serde_json::from_str(r#""Died""#).unwrap();
    assert_eq!(survived, NoseGoesOutcome::Survived);
    assert_eq!(died, NoseGoesOutcome::Died);
    assert!(serde_json::from_str::<NoseGoesOutcome>(r#""Maybe""#).is_err());
}

#[test]
fn roster_response_fixture() {
    let json = r#"{"players":[
        {"id":"1","name":"A","score":3,"has_crown":true},
        {"id":"2","name":"B","score":1,"has_crown":false}
    ]}"#;
    let roster: PlayersResponse = serde_json::from_str(json).unwrap();
    assert_eq!(roster.players.len(), 2);
    assert!(roster.players[0].has_crown);
}
