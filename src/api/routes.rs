//! API Routes
//!
//! Configures the Axum router: the `/_flix` sidecar surface plus a fallback
//! that routes everything else through the interception agent.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    auth_handler, calendar_handler, delete_entry_handler, detail_handler, entry_handler,
    health_handler, invalidate_handler, list_handler, proxy_handler, push_handler,
    save_entry_handler, shared_entry_handler, stats_handler, sync_handler, sync_tag_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_flix/health` - Health check
/// - `GET /_flix/stats` - Cache and store statistics
/// - `GET /_flix/movies/:resource` - Paged list through the Response Cache
/// - `GET /_flix/movies/:resource/:sub` - Movie sub-resource (`:resource` is the movie id) through the Detail Cache
/// - `POST /_flix/movies/sync` - Backend sync, then invalidate
/// - `POST /_flix/invalidate` - Drop every in-memory cache entry
/// - `GET /_flix/calendar/:year/:month` - Load a month bucket
/// - `GET|POST|DELETE /_flix/calendar/entry` - Single entry read and calendar writes
/// - `GET /_flix/calendar/share/:uuid` - Shared entry
/// - `POST /_flix/auth` - Publish auth status
/// - `POST /_flix/sync/:tag`, `POST /_flix/push` - Agent sync and push hooks
/// - anything else - Interception agent
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_flix/health", get(health_handler))
        .route("/_flix/stats", get(stats_handler))
        .route("/_flix/movies/sync", post(sync_handler))
        .route("/_flix/movies/:resource", get(list_handler))
        .route("/_flix/movies/:resource/:sub", get(detail_handler))
        .route("/_flix/invalidate", post(invalidate_handler))
        .route(
            "/_flix/calendar/entry",
            get(entry_handler)
                .post(save_entry_handler)
                .delete(delete_entry_handler),
        )
        .route("/_flix/calendar/share/:uuid", get(shared_entry_handler))
        .route("/_flix/calendar/:year/:month", get(calendar_handler))
        .route("/_flix/auth", post(auth_handler))
        .route("/_flix/sync/:tag", post(sync_tag_handler))
        .route("/_flix/push", post(push_handler))
        .fallback(proxy_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
