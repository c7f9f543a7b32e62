//! Durable room snapshots over SQLite.
//!
//! Write-through: every mutation upserts the room, its members, and the
//! serialized game. The in-memory registry stays authoritative; store
//! failures are logged and otherwise ignored. With no `DATABASE_URL` (or an
//! unreachable one) the server runs fully in memory.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::entities::game::{Game, GameSnapshot, RoundResult};
use crate::domain::entities::room::{Member, Room, RoomOptions, RoomStatus, TurnRecord};

/// Playing rooms older than this are finished at boot.
const STALE_PLAYING_SECS: i64 = 7 * 24 * 60 * 60;
/// Waiting rooms older than this are deleted at boot.
const STALE_WAITING_SECS: i64 = 12 * 60 * 60;

pub struct RoomStore {
    pool: Option<SqlitePool>,
}

impl RoomStore {
    /// Connect if configured; degrade to memory-only otherwise. The
    /// degraded path logs exactly once.
    pub async fn connect() -> RoomStore {
        let Some(raw) = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()) else {
            tracing::info!("DATABASE_URL not set; running in memory only");
            return RoomStore { pool: None };
        };
        let url = if raw.starts_with("sqlite:") {
            raw
        } else {
            format!("sqlite:{}", raw)
        };

        match SqlitePool::connect(&url).await {
            Ok(pool) => match init_schema(&pool).await {
                Ok(()) => {
                    tracing::info!("persistence ready at {}", url);
                    RoomStore { pool: Some(pool) }
                }
                Err(e) => {
                    tracing::warn!("schema init failed ({}); running in memory only", e);
                    RoomStore { pool: None }
                }
            },
            Err(e) => {
                tracing::warn!("persistence unavailable ({}); running in memory only", e);
                RoomStore { pool: None }
            }
        }
    }

    #[cfg(test)]
    pub fn disabled() -> RoomStore {
        RoomStore { pool: None }
    }

    pub fn is_degraded(&self) -> bool {
        self.pool.is_none()
    }

    /// Write-through snapshot. Best effort: the in-memory room is the
    /// authority, so failures only get a log line.
    pub async fn save_room(&self, room: &Room) {
        let Some(pool) = &self.pool else { return };
        if let Err(e) = save_room_tx(pool, room).await {
            tracing::warn!("failed to persist room {}: {}", room.code, e);
        }
    }

    pub async fn delete_room(&self, code: &str) {
        let Some(pool) = &self.pool else { return };
        if let Err(e) = delete_room_tx(pool, code).await {
            tracing::warn!("failed to delete room {}: {}", code, e);
        }
    }

    /// Boot recovery: age out stale rooms, then load the survivors.
    pub async fn recover(&self) -> Vec<Room> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };
        match recover_tx(pool).await {
            Ok(rooms) => {
                tracing::info!("recovered {} rooms from storage", rooms.len());
                rooms
            }
            Err(e) => {
                tracing::warn!("room recovery failed ({}); starting empty", e);
                Vec::new()
            }
        }
    }
}

async fn init_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rooms (
            code        TEXT PRIMARY KEY,
            status      TEXT NOT NULL,
            winner      TEXT,
            created_at  INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            code    TEXT NOT NULL,
            pid     TEXT NOT NULL,
            name    TEXT NOT NULL,
            is_ai   INTEGER NOT NULL,
            seat    INTEGER NOT NULL,
            PRIMARY KEY (code, pid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_state (
            code                    TEXT PRIMARY KEY,
            game_json               TEXT,
            last_round              TEXT,
            last_turn               TEXT,
            round_banner_turns_left INTEGER NOT NULL DEFAULT 0,
            options                 TEXT NOT NULL,
            next_room               TEXT,
            updated_at              INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn save_room_tx(pool: &SqlitePool, room: &Room) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rooms (code, status, winner, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET status = excluded.status, winner = excluded.winner
        "#,
    )
    .bind(&room.code)
    .bind(room.status.as_str())
    .bind(&room.winner)
    .bind(room.created_at)
    .execute(pool)
    .await?;

    // Members only ever accumulate here; removal happens with room delete.
    for (seat, member) in room.members.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO members (code, pid, name, is_ai, seat)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(code, pid) DO UPDATE SET
                name = excluded.name, is_ai = excluded.is_ai, seat = excluded.seat
            "#,
        )
        .bind(&room.code)
        .bind(&member.pid)
        .bind(&member.name)
        .bind(member.is_ai as i32)
        .bind(seat as i32)
        .execute(pool)
        .await?;
    }

    let game_json = match &room.game {
        Some(game) => Some(
            serde_json::to_string(&game.snapshot())
                .map_err(|e| sqlx::Error::Protocol(e.to_string()))?,
        ),
        None => None,
    };
    let last_round = room
        .last_round
        .as_ref()
        .and_then(|r| serde_json::to_string(r).ok());
    let last_turn = room
        .last_turn
        .as_ref()
        .and_then(|t| serde_json::to_string(t).ok());
    let options = serde_json::to_string(&room.options)
        .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO game_state
            (code, game_json, last_round, last_turn, round_banner_turns_left,
             options, next_room, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET
            game_json = excluded.game_json,
            last_round = excluded.last_round,
            last_turn = excluded.last_turn,
            round_banner_turns_left = excluded.round_banner_turns_left,
            options = excluded.options,
            next_room = excluded.next_room,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&room.code)
    .bind(game_json)
    .bind(last_round)
    .bind(last_turn)
    .bind(room.round_banner_turns_left as i64)
    .bind(options)
    .bind(&room.next_room)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

async fn delete_room_tx(pool: &SqlitePool, code: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM members WHERE code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM game_state WHERE code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM rooms WHERE code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    Ok(())
}

async fn recover_tx(pool: &SqlitePool) -> sqlx::Result<Vec<Room>> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query("UPDATE rooms SET status = 'finished' WHERE status = 'playing' AND created_at < ?")
        .bind(now - STALE_PLAYING_SECS)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM rooms WHERE status = 'waiting' AND created_at < ?")
        .bind(now - STALE_WAITING_SECS)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM members WHERE code NOT IN (SELECT code FROM rooms)")
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM game_state WHERE code NOT IN (SELECT code FROM rooms)")
        .execute(pool)
        .await?;

    let room_rows = sqlx::query("SELECT * FROM rooms").fetch_all(pool).await?;
    let mut rooms = Vec::with_capacity(room_rows.len());
    for row in &room_rows {
        match load_room(pool, row).await {
            Ok(room) => rooms.push(room),
            Err(e) => {
                let code: String = row.get("code");
                tracing::warn!("skipping unreadable room {}: {}", code, e);
            }
        }
    }
    Ok(rooms)
}

async fn load_room(pool: &SqlitePool, row: &SqliteRow) -> sqlx::Result<Room> {
    let code: String = row.get("code");
    let status_str: String = row.get("status");

    let member_rows = sqlx::query("SELECT * FROM members WHERE code = ? ORDER BY seat")
        .bind(&code)
        .fetch_all(pool)
        .await?;
    let members: Vec<Member> = member_rows
        .iter()
        .map(|m| Member {
            pid: m.get("pid"),
            name: m.get("name"),
            is_ai: m.get::<i32, _>("is_ai") != 0,
        })
        .collect();

    let state_row = sqlx::query("SELECT * FROM game_state WHERE code = ?")
        .bind(&code)
        .fetch_optional(pool)
        .await?;

    let mut room = Room::new(code);
    room.status = RoomStatus::from_str(&status_str).unwrap_or(RoomStatus::Waiting);
    room.winner = row.get("winner");
    room.created_at = row.get("created_at");
    room.members = members;

    if let Some(state) = state_row {
        let game_json: Option<String> = state.get("game_json");
        room.game = game_json
            .and_then(|json| serde_json::from_str::<GameSnapshot>(&json).ok())
            .map(|snap| Game::from_snapshot(snap, None));
        let last_round: Option<String> = state.get("last_round");
        room.last_round = last_round.and_then(|json| serde_json::from_str::<RoundResult>(&json).ok());
        let last_turn: Option<String> = state.get("last_turn");
        room.last_turn = last_turn.and_then(|json| serde_json::from_str::<TurnRecord>(&json).ok());
        room.round_banner_turns_left = state.get::<i64, _>("round_banner_turns_left") as u32;
        let options: String = state.get("options");
        room.options = serde_json::from_str::<RoomOptions>(&options).unwrap_or_default();
        room.next_room = state.get("next_room");
    }

    Ok(room)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::player::Player;

    async fn memory_store() -> RoomStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        RoomStore { pool: Some(pool) }
    }

    fn playing_room(code: &str) -> Room {
        let mut room = Room::new(code);
        room.members = vec![
            Member {
                pid: "p1".to_string(),
                name: "Ada".to_string(),
                is_ai: false,
            },
            Member {
                pid: "b1".to_string(),
                name: "CPU 1".to_string(),
                is_ai: true,
            },
        ];
        room.status = RoomStatus::Playing;
        let players = vec![Player::human("p1", "Ada"), Player::ai("b1", "CPU 1")];
        let mut game = Game::new(players, false, Some(1));
        game.start_game();
        room.game = Some(game);
        room
    }

    #[tokio::test]
    async fn test_save_and_recover_round_trip() {
        let store = memory_store().await;
        let room = playing_room("abcde");
        store.save_room(&room).await;

        let recovered = store.recover().await;
        assert_eq!(recovered.len(), 1);
        let loaded = &recovered[0];
        assert_eq!(loaded.code, "abcde");
        assert_eq!(loaded.status, RoomStatus::Playing);
        assert_eq!(loaded.members.len(), 2);
        assert!(loaded.members[1].is_ai);

        let game = loaded.game.as_ref().unwrap();
        // Deck rebuilt to exactly the missing cards.
        assert_eq!(game.card_census(), (0..54).collect::<Vec<u8>>());
        let original = room.game.as_ref().unwrap();
        assert_eq!(game.last_discard, original.last_discard);
        assert_eq!(game.current_player_index, original.current_player_index);
    }

    #[tokio::test]
    async fn test_stale_waiting_room_is_deleted() {
        let store = memory_store().await;
        let mut room = Room::new("stale");
        room.created_at = chrono::Utc::now().timestamp() - STALE_WAITING_SECS - 60;
        store.save_room(&room).await;

        let recovered = store.recover().await;
        assert!(recovered.is_empty());
    }

    #[tokio::test]
    async fn test_stale_playing_room_is_finished() {
        let store = memory_store().await;
        let mut room = playing_room("oldie");
        room.created_at = chrono::Utc::now().timestamp() - STALE_PLAYING_SECS - 60;
        store.save_room(&room).await;

        let recovered = store.recover().await;
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].status, RoomStatus::Finished);
    }

    #[tokio::test]
    async fn test_degraded_store_is_silent() {
        let store = RoomStore::disabled();
        assert!(store.is_degraded());
        store.save_room(&Room::new("abcde")).await;
        assert!(store.recover().await.is_empty());
    }
}
