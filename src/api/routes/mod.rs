pub mod actions;
pub mod health;
pub mod rooms;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::sse;
use crate::infrastructure::app_state::AppState;

/// The `/api` surface.
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(rooms::create_room))
        .route("/join", post(rooms::join_room))
        .route("/leave", post(rooms::leave_room))
        .route("/room/:code", get(rooms::get_room))
        .route("/options", post(rooms::set_options))
        .route("/start", post(rooms::start_room))
        .route("/action", post(actions::submit_action))
        .route("/playAgain", post(rooms::play_again))
        .route("/events/:code/:pid", get(sse::events_handler))
        .route("/health", get(health::health_handler))
        .with_state(state)
}
