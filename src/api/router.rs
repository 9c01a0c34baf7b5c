//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. CORS is open (the platform's mobile and
//! web clients call from arbitrary origins) and every request is traced.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/emergency/trigger", post(endpoints::emergency::trigger))
        .route("/emergency/:id/status", get(endpoints::emergency::status))
        .route("/emergency/:id/resolve", put(endpoints::emergency::resolve))
        .route(
            "/emergency/:id/step-complete",
            post(endpoints::emergency::step_complete),
        )
        .route("/emergency/history", get(endpoints::emergency::history))
        .route(
            "/emergency/analytics/stats",
            get(endpoints::emergency::analytics_stats),
        )
        .route("/notify/sms", post(endpoints::notify::send_sms))
        .route("/notify/push", post(endpoints::notify::send_push))
        .route(
            "/notify/status/:emergency_id",
            get(endpoints::notify::notification_status),
        )
        .route("/notify/retry/:emergency_id", post(endpoints::notify::retry))
        .route(
            "/contacts",
            post(endpoints::contacts::create).get(endpoints::contacts::list),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
