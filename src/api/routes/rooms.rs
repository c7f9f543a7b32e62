//! Room lifecycle endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiJson};
use crate::application::ai_worker;
use crate::application::game::snapshot::{room_snapshot, RoomSnapshot};
use crate::application::rooms::{
    CreateRoom, CreateRoomError, CreateRoomInput, JoinRoom, JoinRoomError, JoinRoomInput,
    LeaveRoom, LeaveRoomError, LeaveRoomInput, PlayAgain, PlayAgainError, PlayAgainInput,
    SetOptions, SetOptionsError, SetOptionsInput, StartGame, StartGameError, StartGameInput,
};
use crate::infrastructure::app_state::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pid: Option<String>,
    #[serde(default)]
    pub ai_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub code: String,
    pub pid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub code: String,
    #[serde(default)]
    pub pid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub code: String,
    pub pid: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsRequest {
    pub code: String,
    pub pid: String,
    pub slamdowns_allowed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub ok: bool,
    pub options: OptionsBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsBody {
    pub slamdowns_allowed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub code: String,
    pub pid: String,
    #[serde(default)]
    pub slamdowns_allowed: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAgainRequest {
    pub code: String,
    pub pid: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAgainResponse {
    pub next_room: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(default)]
    pub pid: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /api/create
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateRequest>,
) -> Result<Json<CreateResponse>, ApiError> {
    let use_case = CreateRoom::new(state);
    let result = use_case
        .execute(CreateRoomInput {
            name: body.name.unwrap_or_default(),
            pid: body.pid,
            ai_count: body.ai_count.unwrap_or(0) as usize,
        })
        .await
        .map_err(|e| match e {
            CreateRoomError::Validation(_) => ApiError::bad_request(e.to_string()),
        })?;

    Ok(Json(CreateResponse {
        code: result.code,
        pid: result.pid,
    }))
}

/// POST /api/join
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<JoinRequest>,
) -> Result<Json<CreateResponse>, ApiError> {
    let use_case = JoinRoom::new(state);
    let result = use_case
        .execute(JoinRoomInput {
            code: body.code,
            pid: body.pid,
            name: body.name.unwrap_or_default(),
        })
        .await
        .map_err(|e| match e {
            JoinRoomError::RoomNotFound => ApiError::not_found(e.to_string()),
            JoinRoomError::AlreadyStarted | JoinRoomError::RoomFull => {
                ApiError::bad_request(e.to_string())
            }
            JoinRoomError::Validation(_) => ApiError::bad_request(e.to_string()),
        })?;

    Ok(Json(CreateResponse {
        code: result.code,
        pid: result.pid,
    }))
}

/// POST /api/leave
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LeaveRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let use_case = LeaveRoom::new(state);
    use_case
        .execute(LeaveRoomInput {
            code: body.code,
            pid: body.pid,
        })
        .await
        .map_err(|e| match e {
            LeaveRoomError::RoomNotFound => ApiError::not_found(e.to_string()),
            LeaveRoomError::NotAMember => ApiError::forbidden(e.to_string()),
            LeaveRoomError::GameInProgress => ApiError::bad_request(e.to_string()),
        })?;

    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/room/:code?pid=
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let code = code.trim().to_lowercase();
    let slot = state
        .rooms
        .get(&code)
        .ok_or_else(|| ApiError::not_found("room not found"))?;
    let room = slot.lock().await;
    Ok(Json(room_snapshot(&room, query.pid.as_deref())))
}

/// POST /api/options
pub async fn set_options(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<OptionsRequest>,
) -> Result<Json<OptionsResponse>, ApiError> {
    let use_case = SetOptions::new(state);
    let result = use_case
        .execute(SetOptionsInput {
            code: body.code,
            pid: body.pid,
            slamdowns_allowed: body.slamdowns_allowed,
        })
        .await
        .map_err(|e| match e {
            SetOptionsError::RoomNotFound => ApiError::not_found(e.to_string()),
            SetOptionsError::NotAMember | SetOptionsError::NotCreator => {
                ApiError::bad_request(e.to_string())
            }
            SetOptionsError::AlreadyStarted => ApiError::bad_request(e.to_string()),
        })?;

    Ok(Json(OptionsResponse {
        ok: true,
        options: OptionsBody {
            slamdowns_allowed: result.options.slamdowns_allowed,
        },
    }))
}

/// POST /api/start
pub async fn start_room(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<StartRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let code = body.code.trim().to_lowercase();
    let use_case = StartGame::new(state.clone());
    let result = use_case
        .execute(StartGameInput {
            code: code.clone(),
            pid: body.pid,
            slamdowns_allowed: body.slamdowns_allowed,
        })
        .await
        .map_err(|e| match e {
            StartGameError::RoomNotFound => ApiError::not_found(e.to_string()),
            StartGameError::NotAMember
            | StartGameError::NotCreator
            | StartGameError::NotEnoughPlayers
            | StartGameError::AlreadyStarted => ApiError::bad_request(e.to_string()),
        })?;

    if result.ai_turn {
        ai_worker::kick(state, code);
    }

    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/playAgain
pub async fn play_again(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<PlayAgainRequest>,
) -> Result<Json<PlayAgainResponse>, ApiError> {
    let use_case = PlayAgain::new(state);
    let result = use_case
        .execute(PlayAgainInput {
            code: body.code,
            pid: body.pid,
        })
        .await
        .map_err(|e| match e {
            PlayAgainError::RoomNotFound => ApiError::not_found(e.to_string()),
            PlayAgainError::NotAMember => ApiError::forbidden(e.to_string()),
            PlayAgainError::NotFinished => ApiError::bad_request(e.to_string()),
        })?;

    Ok(Json(PlayAgainResponse {
        next_room: result.next_room,
    }))
}
