//! Room entity: membership, lifecycle, and per-round client bookkeeping.

use serde::{Deserialize, Serialize};

use crate::domain::entities::game::{Game, RoundResult};
use crate::domain::value_objects::card::CardView;

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "waiting" => Some(RoomStatus::Waiting),
            "playing" => Some(RoomStatus::Playing),
            "finished" => Some(RoomStatus::Finished),
            _ => None,
        }
    }
}

/// A seat in the room, in join order. The first member is the creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub pid: String,
    pub name: String,
    pub is_ai: bool,
}

/// Room-level game options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOptions {
    pub slamdowns_allowed: bool,
}

impl Default for RoomOptions {
    fn default() -> Self {
        RoomOptions {
            slamdowns_allowed: false,
        }
    }
}

/// Where the most recent turn drew from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawKind {
    Deck,
    Pile,
    Slamdown,
}

/// The most recent play, kept for client display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecord {
    pub actor: String,
    pub discarded: Vec<CardView>,
    pub draw_source: DrawKind,
    /// Revealed only for pile draws.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawn: Option<CardView>,
}

/// Authoritative per-room state. Owned exclusively by the registry slot;
/// all mutation happens under the room's lock.
pub struct Room {
    pub code: String,
    pub status: RoomStatus,
    pub members: Vec<Member>,
    pub game: Option<Game>,
    pub winner: Option<String>,
    pub last_turn: Option<TurnRecord>,
    pub last_round: Option<RoundResult>,
    pub round_banner_turns_left: u32,
    pub options: RoomOptions,
    /// Code of the rematch room once one exists.
    pub next_room: Option<String>,
    /// Cooperative single-worker guard for the AI drain loop.
    pub ai_worker_active: bool,
    pub created_at: i64,
}

impl Room {
    pub fn new(code: impl Into<String>) -> Room {
        Room {
            code: code.into(),
            status: RoomStatus::Waiting,
            members: Vec::new(),
            game: None,
            winner: None,
            last_turn: None,
            last_round: None,
            round_banner_turns_left: 0,
            options: RoomOptions::default(),
            next_room: None,
            ai_worker_active: false,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// The first seat owns the room.
    pub fn creator_pid(&self) -> Option<&str> {
        self.members.first().map(|m| m.pid.as_str())
    }

    pub fn member(&self, pid: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.pid == pid)
    }

    pub fn has_ai_member(&self) -> bool {
        self.members.iter().any(|m| m.is_ai)
    }

    pub fn can_start(&self) -> bool {
        self.status == RoomStatus::Waiting && self.members.len() >= 2
    }

    /// Slamdowns only ever apply to all-human rooms.
    pub fn effective_slamdowns(&self) -> bool {
        self.options.slamdowns_allowed && !self.has_ai_member()
    }

    /// Record a turn and age the round banner by one turn.
    pub fn note_turn(&mut self, record: TurnRecord) {
        self.tick_round_banner();
        self.last_turn = Some(record);
    }

    pub fn tick_round_banner(&mut self) {
        if self.round_banner_turns_left > 0 {
            self.round_banner_turns_left -= 1;
            if self.round_banner_turns_left == 0 {
                self.last_round = None;
            }
        }
    }

    /// A round just ended: show the banner for one orbit of the table and
    /// drop the stale turn record.
    pub fn note_round(&mut self, result: RoundResult) {
        self.last_round = Some(result);
        self.last_turn = None;
        self.round_banner_turns_left = self
            .game
            .as_ref()
            .map(|g| g.players.len() as u32)
            .unwrap_or(self.members.len() as u32);
    }
}

/// The shareable room code alphabet: five lowercase letters.
pub fn generate_room_code() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..5)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(pid: &str, is_ai: bool) -> Member {
        Member {
            pid: pid.to_string(),
            name: pid.to_string(),
            is_ai,
        }
    }

    #[test]
    fn test_room_code_shape() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), 5);
            assert!(code.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_creator_is_first_member() {
        let mut room = Room::new("abcde");
        room.members.push(member("p1", false));
        room.members.push(member("p2", false));
        assert_eq!(room.creator_pid(), Some("p1"));
    }

    #[test]
    fn test_can_start_needs_two_members() {
        let mut room = Room::new("abcde");
        room.members.push(member("p1", false));
        assert!(!room.can_start());
        room.members.push(member("p2", false));
        assert!(room.can_start());
        room.status = RoomStatus::Playing;
        assert!(!room.can_start());
    }

    #[test]
    fn test_slamdowns_collapse_with_ai() {
        let mut room = Room::new("abcde");
        room.options.slamdowns_allowed = true;
        room.members.push(member("p1", false));
        assert!(room.effective_slamdowns());
        room.members.push(member("b1", true));
        assert!(!room.effective_slamdowns());
    }

    #[test]
    fn test_round_banner_expires_last_round() {
        let mut room = Room::new("abcde");
        room.members.push(member("p1", false));
        room.members.push(member("p2", false));
        room.note_round(RoundResult {
            declarer: "p1".to_string(),
            declarer_hand_value: 2,
            assaf: None,
            resets: vec![],
            eliminations: vec![],
            scores: vec![],
        });
        assert_eq!(room.round_banner_turns_left, 2);
        assert!(room.last_turn.is_none());

        room.tick_round_banner();
        assert!(room.last_round.is_some());
        room.tick_round_banner();
        assert!(room.last_round.is_none());
    }
}
