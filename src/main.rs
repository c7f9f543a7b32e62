use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod application;
mod domain;
mod infrastructure;

use crate::application::ai_worker;
use crate::domain::entities::room::RoomStatus;
use crate::infrastructure::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yaniv_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize application state (connects storage and recovers rooms)
    let state = AppState::new().await?;
    let state = Arc::new(state);

    // Recovered rooms stuck on an AI turn need their worker restarted.
    for code in state.rooms.codes() {
        let Some(slot) = state.rooms.get(&code) else {
            continue;
        };
        let needs_worker = {
            let room = slot.lock().await;
            room.status == RoomStatus::Playing
                && room
                    .game
                    .as_ref()
                    .map(|g| g.current_player().is_ai())
                    .unwrap_or(false)
        };
        if needs_worker {
            ai_worker::kick(state.clone(), code);
        }
    }

    // Build router
    let app = Router::new()
        .nest("/api", api::routes::create_api_router(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Get port from environment or use default
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5174);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting Yaniv backend on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
