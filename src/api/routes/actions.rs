//! The turn action endpoint: play, declare Yaniv, or slam down.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::{ApiError, ApiJson};
use crate::api::routes::rooms::OkResponse;
use crate::application::ai_worker;
use crate::application::game::{
    ActionKind, DrawRequest, SubmitAction, SubmitActionError, SubmitActionInput,
};
use crate::infrastructure::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub code: String,
    pub pid: String,
    #[serde(default)]
    pub discard: Option<Vec<u8>>,
    #[serde(default)]
    pub draw: Option<Value>,
    #[serde(default)]
    pub declare_yaniv: bool,
    #[serde(default)]
    pub declare_slamdown: bool,
}

/// POST /api/action
pub async fn submit_action(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ActionRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let code = body.code.trim().to_lowercase();

    let kind = if body.declare_yaniv {
        ActionKind::DeclareYaniv
    } else if body.declare_slamdown {
        ActionKind::DeclareSlamdown
    } else {
        let discard = body
            .discard
            .ok_or_else(|| ApiError::bad_request("discard is required"))?;
        let draw = body
            .draw
            .ok_or_else(|| ApiError::bad_request("draw is required"))?;
        ActionKind::Play {
            discard,
            draw: parse_draw(draw)?,
        }
    };

    let use_case = SubmitAction::new(state.clone());
    let result = use_case
        .execute(SubmitActionInput {
            code: code.clone(),
            pid: body.pid,
            kind,
        })
        .await
        .map_err(|e| match e {
            SubmitActionError::RoomNotFound => ApiError::not_found(e.to_string()),
            SubmitActionError::NotSeated => ApiError::forbidden(e.to_string()),
            SubmitActionError::NotPlaying
            | SubmitActionError::NotYourTurn
            | SubmitActionError::Validation(_)
            | SubmitActionError::Illegal(_) => ApiError::bad_request(e.to_string()),
        })?;

    if result.ai_turn {
        ai_worker::kick(state, code);
    }

    Ok(Json(OkResponse { ok: true }))
}

/// `draw` is either the string `"deck"` or a pile option index.
fn parse_draw(value: Value) -> Result<DrawRequest, ApiError> {
    match value {
        Value::String(s) if s == "deck" => Ok(DrawRequest::Deck),
        Value::Number(n) => n
            .as_u64()
            .map(|i| DrawRequest::Pile(i as usize))
            .ok_or_else(|| ApiError::bad_request("draw must be \"deck\" or a pile index")),
        _ => Err(ApiError::bad_request("draw must be \"deck\" or a pile index")),
    }
}
