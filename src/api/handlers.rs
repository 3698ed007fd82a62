//! API Handlers
//!
//! The `/_flix` sidecar endpoints, plus the fallback that hands every other
//! request to the interception agent.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};
use url::Url;

use crate::auth::{AuthGate, AuthStatus, SessionStore};
use crate::cache::{CacheManager, ResourceKind, SubResource};
use crate::calendar::{BucketKey, LoadCoordinator};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    AuthStatusRequest, AuthStatusResponse, BucketResponse, CalendarEntry, CalendarQuery,
    DateQuery, HealthResponse, ListQuery, MessageResponse, SaveEntryRequest, StatsResponse,
};
use crate::proxy::{Fetcher, InterceptedRequest, InterceptionAgent, Notification};
use crate::remote::ApiClient;
use crate::store::ResponseStores;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<InterceptionAgent>,
    pub client: ApiClient,
    pub manager: CacheManager,
    pub coordinator: LoadCoordinator,
    pub session: Arc<SessionStore>,
    /// Latest auth status; the auth watcher task forwards changes
    pub auth_tx: Arc<watch::Sender<AuthStatus>>,
}

impl AppState {
    /// Wires agent, client, caches and coordinator together.
    ///
    /// # Arguments
    /// * `stores` - Persistent stores owned by the agent
    /// * `fetcher` - Network access used by the agent
    /// * `session` - Stored credential shared by client and coordinator
    /// * `clock` - Time source for the in-memory caches
    pub fn build(
        config: &Config,
        stores: ResponseStores,
        fetcher: Arc<dyn Fetcher>,
        session: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let agent = Arc::new(InterceptionAgent::new(stores, fetcher, config)?);
        Ok(Self::with_agent(config, agent, session, clock))
    }

    pub fn with_agent(
        config: &Config,
        agent: Arc<InterceptionAgent>,
        session: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let client = ApiClient::new(Arc::clone(&agent), Arc::clone(&session));
        let manager = CacheManager::new(Arc::new(client.clone()), clock, config);
        let coordinator = LoadCoordinator::new(Arc::new(client.clone()), Arc::clone(&session));
        let (auth_tx, _) = watch::channel(AuthStatus::default());

        Self {
            agent,
            client,
            manager,
            coordinator,
            session,
            auth_tx: Arc::new(auth_tx),
        }
    }
}

// == Status ==
/// Handler for GET /_flix/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.agent.lifecycle()))
}

/// Handler for GET /_flix/stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let caches = state.manager.stats();
    Ok(Json(StatsResponse::new(
        caches.responses,
        caches.details,
        state.agent.stores().counts()?,
    )))
}

// == Movies ==
/// Handler for GET /_flix/movies/:kind
pub async fn list_handler(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let kind = ResourceKind::parse(&kind, query.q.as_deref())?;
    let payload = state
        .manager
        .list(kind, query.page, query.size, query.refresh)
        .await?;
    Ok(Json(payload))
}

/// Handler for GET /_flix/movies/:id/:sub
pub async fn detail_handler(
    State(state): State<AppState>,
    Path((id, sub)): Path<(u64, String)>,
) -> Result<Json<Value>> {
    let sub: SubResource = sub.parse()?;
    Ok(Json(state.manager.detail(id, sub).await?))
}

/// Handler for POST /_flix/movies/sync
pub async fn sync_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    Ok(Json(state.manager.sync_movies().await?))
}

/// Handler for POST /_flix/invalidate
pub async fn invalidate_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.manager.invalidate_all();
    Json(MessageResponse::new("caches invalidated"))
}

// == Calendar ==
/// Handler for GET /_flix/calendar/:year/:month
pub async fn calendar_handler(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<BucketResponse>> {
    let bucket = BucketKey::new(year, month)?;
    let outcome = state.coordinator.load(bucket, query.force).await;
    let snapshot = state.coordinator.snapshot(bucket);
    Ok(Json(BucketResponse::new(&outcome, snapshot)))
}

/// Handler for GET /_flix/calendar/entry?date=
///
/// Answered from the loaded bucket when possible, otherwise from the remote API.
pub async fn entry_handler(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<CalendarEntry>> {
    if let Some(entry) = state.coordinator.entry_for_date(query.date) {
        return Ok(Json(entry));
    }
    state
        .client
        .calendar_entry(query.date)
        .await?
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("no entry for {}", query.date)))
}

/// Handler for GET /_flix/calendar/share/:uuid
pub async fn shared_entry_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<CalendarEntry>> {
    Ok(Json(state.client.shared_entry(&uuid).await?))
}

/// Handler for POST /_flix/calendar/entry
pub async fn save_entry_handler(
    State(state): State<AppState>,
    Json(req): Json<SaveEntryRequest>,
) -> Result<Json<CalendarEntry>> {
    Ok(Json(state.coordinator.save_entry(req).await?))
}

/// Handler for DELETE /_flix/calendar/entry?date=
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Json<MessageResponse>> {
    state.coordinator.delete_entry(query.date).await?;
    Ok(Json(MessageResponse::new(format!(
        "entry for {} deleted",
        query.date
    ))))
}

// == Auth ==
/// Handler for POST /_flix/auth
///
/// Stores or clears the credential, then publishes the status for the
/// auth watcher.
pub async fn auth_handler(
    State(state): State<AppState>,
    Json(req): Json<AuthStatusRequest>,
) -> Result<Json<AuthStatusResponse>> {
    match (req.status, req.access_token.as_deref()) {
        (AuthStatus::LoggedOut, _) => state.session.clear()?,
        (_, Some(token)) => state.session.set_token(token)?,
        _ => {}
    }

    state.auth_tx.send_replace(req.status);
    info!(status = ?req.status, "auth status updated");

    let gate = AuthGate::new(req.status.is_ready(), state.session.has_token());
    Ok(Json(AuthStatusResponse {
        status: req.status,
        gate_open: gate.allows(),
    }))
}

// == Agent Hooks ==
/// Handler for POST /_flix/sync/:tag
pub async fn sync_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<MessageResponse> {
    let message = if state.agent.sync(&tag) {
        format!("sync '{tag}' acknowledged")
    } else {
        format!("sync '{tag}' ignored")
    };
    Json(MessageResponse::new(message))
}

/// Handler for POST /_flix/push
pub async fn push_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Notification>> {
    state
        .agent
        .push(&body)
        .map(Json)
        .ok_or_else(|| CacheError::InvalidRequest("malformed push payload".to_string()))
}

// == Proxy ==
/// Places the request target on the app origin.
///
/// Only the path and query are taken from the request, so a target such as
/// `//other.host/x.png` stays a path on the app origin.
fn same_origin_url(origin: &Url, uri: &Uri) -> Url {
    let mut url = origin.clone();
    url.set_path(uri.path());
    url.set_query(uri.query());
    url
}

/// Fallback handler: every request not under `/_flix` goes through the agent.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = same_origin_url(state.agent.app_origin(), &uri);
    let request = InterceptedRequest::from_parts(method, url, headers, body.to_vec());
    match state.agent.handle_fetch(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            warn!(error = %e, "passthrough request failed");
            e.into_response()
        }
    }
}
