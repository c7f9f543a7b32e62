//! Seated players.
//!
//! A player is either human or AI. Only the AI variant carries policy state;
//! everything the server persists about the distinction is the `isAi` flag.

use smallvec::SmallVec;

use crate::domain::ai::AiBrain;
use crate::domain::value_objects::card::{hand_value, Card};

/// Maximum rendered name length.
pub const MAX_NAME_LEN: usize = 20;

/// Human or AI seat.
pub enum PlayerKind {
    Human,
    Ai(AiBrain),
}

/// A seated player with their hand and running score.
pub struct Player {
    pub pid: String,
    pub name: String,
    pub score: u16,
    pub hand: SmallVec<[Card; 10]>,
    pub kind: PlayerKind,
}

impl Player {
    pub fn human(pid: impl Into<String>, name: impl Into<String>) -> Player {
        Player {
            pid: pid.into(),
            name: clamp_name(name.into()),
            score: 0,
            hand: SmallVec::new(),
            kind: PlayerKind::Human,
        }
    }

    pub fn ai(pid: impl Into<String>, name: impl Into<String>) -> Player {
        Player {
            pid: pid.into(),
            name: clamp_name(name.into()),
            score: 0,
            hand: SmallVec::new(),
            kind: PlayerKind::Ai(AiBrain::new()),
        }
    }

    #[inline]
    pub fn is_ai(&self) -> bool {
        matches!(self.kind, PlayerKind::Ai(_))
    }

    pub fn hand_value(&self) -> u16 {
        hand_value(&self.hand)
    }

    /// Stable client render order.
    pub fn sort_hand(&mut self) {
        self.hand.sort_unstable_by_key(Card::id);
    }

    pub fn brain(&self) -> Option<&AiBrain> {
        match &self.kind {
            PlayerKind::Ai(brain) => Some(brain),
            PlayerKind::Human => None,
        }
    }
}

/// Trim and cap a display name.
pub fn clamp_name(name: String) -> String {
    let trimmed = name.trim();
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("score", &self.score)
            .field("hand", &self.hand)
            .field("isAi", &self.is_ai())
            .finish()
    }
}
