//! HTTP and WebSocket surface for the monitoring service.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Service liveness and connection counts
//! - `POST /api/analysis/risk` - One-shot risk assessment
//! - `GET /api/users/:user_id/thresholds` - Read alert thresholds
//! - `PUT /api/users/:user_id/thresholds` - Replace alert thresholds
//! - `WS /ws?userId=N` - Inbound signal feed and outbound realtime
//!   messages for one user

pub mod dto;
pub mod error;
pub mod handlers;
pub mod state;
pub mod websocket;

use axum::{
    routing::get,
    Router,
};

pub use error::ApiError;
pub use state::AppState;

/// Create the service router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/analysis/risk", axum::routing::post(handlers::analyze_risk))
        .route(
            "/api/users/:user_id/thresholds",
            get(handlers::get_thresholds).put(handlers::put_thresholds),
        )
        .route("/ws", get(websocket::ws_handler))
        .with_state(state)
}
