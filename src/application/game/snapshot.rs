//! Per-recipient room snapshots.
//!
//! One room produces a different snapshot for every viewer: only the
//! requesting pid sees its own hand, Yaniv eligibility, draw options, and
//! any armed slamdown. Snapshots are rebuilt from scratch on every push —
//! never diffed or fingerprinted.

use serde::Serialize;

use crate::domain::entities::game::{Game, RoundResult, YANIV_LIMIT};
use crate::domain::entities::room::{Member, Room, RoomStatus, TurnRecord};
use crate::domain::value_objects::card::{Card, CardView};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: String,
    pub status: RoomStatus,
    pub members: Vec<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<GameView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_turn: Option<TurnRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_round: Option<RoundResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_room: Option<String>,
    pub options: OptionsView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsView {
    pub slamdowns_allowed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub players: Vec<PlayerView>,
    pub discard_top: Vec<CardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_options: Option<Vec<CardView>>,
    pub current_player_name: String,
    pub is_my_turn: bool,
    pub deck_size: usize,
    pub can_slamdown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slamdown_card: Option<CardView>,
    pub slamdowns_allowed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub name: String,
    pub score: u16,
    pub hand_count: usize,
    pub is_ai: bool,
    pub is_current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<CardView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_yaniv: Option<bool>,
}

/// Build the snapshot one viewer is allowed to see.
pub fn room_snapshot(room: &Room, viewer: Option<&str>) -> RoomSnapshot {
    RoomSnapshot {
        code: room.code.clone(),
        status: room.status,
        members: room.members.clone(),
        game: room.game.as_ref().map(|game| game_view(game, viewer)),
        winner: room.winner.clone(),
        last_turn: room.last_turn.clone(),
        last_round: room.last_round.clone(),
        next_room: room.next_room.clone(),
        options: OptionsView {
            slamdowns_allowed: room.options.slamdowns_allowed,
        },
    }
}

fn game_view(game: &Game, viewer: Option<&str>) -> GameView {
    let current = game.current_player_index;
    let current_pid = game.players.get(current).map(|p| p.pid.as_str());
    let is_my_turn = viewer.is_some() && viewer == current_pid;

    let players = game
        .players
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let is_self = viewer == Some(p.pid.as_str());
            PlayerView {
                name: p.name.clone(),
                score: p.score,
                hand_count: p.hand.len(),
                is_ai: p.is_ai(),
                is_current: i == current,
                pid: is_self.then(|| p.pid.clone()),
                hand: is_self.then(|| {
                    let mut hand = p.hand.to_vec();
                    hand.sort_unstable_by_key(Card::id);
                    hand.into_iter().map(CardView::from).collect()
                }),
                is_self: is_self.then_some(true),
                can_yaniv: is_self.then(|| p.hand_value() <= YANIV_LIMIT),
            }
        })
        .collect();

    let viewer_is_seated = viewer
        .map(|pid| game.players.iter().any(|p| p.pid == pid))
        .unwrap_or(false);
    let slamdown_pid = game
        .slamdown_player
        .and_then(|idx| game.players.get(idx))
        .map(|p| p.pid.as_str());
    let can_slamdown = viewer.is_some() && viewer == slamdown_pid && game.slamdown_card.is_some();

    GameView {
        players,
        discard_top: game.last_discard.iter().copied().map(CardView::from).collect(),
        draw_options: viewer_is_seated
            .then(|| game.draw_options().into_iter().map(CardView::from).collect()),
        current_player_name: game
            .players
            .get(current)
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        is_my_turn,
        deck_size: game.deck.len(),
        can_slamdown,
        slamdown_card: can_slamdown.then(|| game.slamdown_card.map(CardView::from)).flatten(),
        slamdowns_allowed: game.slamdowns_allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::player::Player;
    use crate::domain::entities::room::RoomOptions;

    fn playing_room() -> Room {
        let mut room = Room::new("abcde");
        room.members = vec![
            Member {
                pid: "p1".to_string(),
                name: "Ada".to_string(),
                is_ai: false,
            },
            Member {
                pid: "p2".to_string(),
                name: "Ben".to_string(),
                is_ai: false,
            },
        ];
        room.status = RoomStatus::Playing;
        room.options = RoomOptions {
            slamdowns_allowed: false,
        };
        let players = vec![Player::human("p1", "Ada"), Player::human("p2", "Ben")];
        let mut game = Game::new(players, false, Some(8));
        game.start_game();
        room.game = Some(game);
        room
    }

    #[test]
    fn test_hand_only_visible_to_self() {
        let room = playing_room();
        let snapshot = room_snapshot(&room, Some("p1"));
        let game = snapshot.game.unwrap();

        let me = game.players.iter().find(|p| p.name == "Ada").unwrap();
        let other = game.players.iter().find(|p| p.name == "Ben").unwrap();
        assert!(me.hand.is_some());
        assert_eq!(me.is_self, Some(true));
        assert!(me.can_yaniv.is_some());
        assert!(other.hand.is_none());
        assert!(other.pid.is_none());
        assert!(other.is_self.is_none());
        assert_eq!(other.hand_count, 5);
    }

    #[test]
    fn test_anonymous_viewer_sees_no_private_fields() {
        let room = playing_room();
        let snapshot = room_snapshot(&room, None);
        let game = snapshot.game.unwrap();
        assert!(game.draw_options.is_none());
        assert!(!game.is_my_turn);
        assert!(game.players.iter().all(|p| p.hand.is_none()));
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let room = playing_room();
        let json = serde_json::to_value(room_snapshot(&room, Some("p1"))).unwrap();
        assert_eq!(json["code"], "abcde");
        assert_eq!(json["status"], "playing");
        assert!(json["game"]["discardTop"].is_array());
        assert!(json["game"]["deckSize"].is_number());
        assert!(json["options"]["slamdownsAllowed"].is_boolean());
        // Absent optionals are omitted, not null.
        assert!(json.get("winner").is_none());
    }

    #[test]
    fn test_is_my_turn_tracks_current_player() {
        let room = playing_room();
        let current_pid = {
            let game = room.game.as_ref().unwrap();
            game.players[game.current_player_index].pid.clone()
        };
        let snapshot = room_snapshot(&room, Some(&current_pid));
        assert!(snapshot.game.unwrap().is_my_turn);
    }
}
