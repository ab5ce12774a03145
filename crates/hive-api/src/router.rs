//! Axum router construction.
//!
//! Assembles the management API and the sector `WebSocket` endpoint into a
//! single [`Router`] with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router.
///
/// The router includes:
/// - `GET /` -- plain-text status banner
/// - `GET /ws/hive/{hive_id}/sector/{sector_id}` -- sector relay socket
/// - `GET|POST /api/hive` -- hives
/// - `GET|POST /api/hive/{hive_id}/sector` -- sectors of a hive
/// - `DELETE /api/hive/{hive_id}/sector/{sector_id}` -- remove a sector
/// - `GET|DELETE /api/hive/{hive_id}/faction` -- factions of a hive
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        // Sector connections
        .route("/ws/hive/{hive_id}/sector/{sector_id}", get(ws::ws_sector))
        // Management API
        .route(
            "/api/hive",
            get(handlers::list_hives).post(handlers::create_hive),
        )
        .route(
            "/api/hive/{hive_id}/sector",
            get(handlers::list_sectors).post(handlers::create_sector),
        )
        .route(
            "/api/hive/{hive_id}/sector/{sector_id}",
            delete(handlers::delete_sector),
        )
        .route(
            "/api/hive/{hive_id}/faction",
            get(handlers::list_factions).delete(handlers::delete_factions),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
