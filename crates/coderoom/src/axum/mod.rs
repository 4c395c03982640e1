//! HTTP and WebSocket transport for the room service.
//!
//! Identity arrives pre-resolved in `x-user-type` / `x-user-id` /
//! `x-user-email` headers set by the gateway; this layer only turns them
//! into an [`IdentityContext`] and never verifies anything itself.

use std::sync::Arc;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::error::RoomError;
use crate::hub::RealtimeHub;
use crate::model::{CreateRoom, IdentityContext, Member, Room, RoomPatch, ShareRequest};
use crate::service::{RoomListing, RoomService};

pub mod handler;

pub use handler::ConnectionHandler;

/// Shared state for the transport layer
#[derive(Clone)]
pub struct AppState {
    service: Arc<RoomService>,
    hub: Arc<RealtimeHub>,
}

impl AppState {
    pub fn new(service: Arc<RoomService>, hub: Arc<RealtimeHub>) -> Self {
        Self { service, hub }
    }

    pub fn service(&self) -> &Arc<RoomService> {
        &self.service
    }

    pub fn hub(&self) -> &Arc<RealtimeHub> {
        &self.hub
    }
}

/// Build the room router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(create_room).get(list_rooms))
        .route(
            "/rooms/{id}",
            get(get_room).patch(update_room).delete(delete_room),
        )
        .route("/rooms/{id}/share", patch(share_room))
        .route("/rooms/ws", get(room_ws))
        .with_state(state)
}

/// Build an identity from the gateway's headers
///
/// Anything other than an authenticated user with an id is a guest; a
/// guest may still carry an email for display purposes.
pub fn identity_from_headers(headers: &HeaderMap) -> IdentityContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let email = header("x-user-email");
    match (header("x-user-type").as_deref(), header("x-user-id")) {
        (Some("auth"), Some(user_id)) => IdentityContext::Auth { user_id, email },
        _ => IdentityContext::Guest { email },
    }
}

/// `RoomError` carried out of a handler, mapped onto an HTTP response
struct ApiError(RoomError);

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RoomError::NotFound { .. } => StatusCode::NOT_FOUND,
            RoomError::Validation { .. } => StatusCode::BAD_REQUEST,
            RoomError::Forbidden { .. } => StatusCode::FORBIDDEN,
            RoomError::UpstreamStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Upstream store failure: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
struct ShareResponse {
    success: bool,
    members: Vec<Member>,
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRoom>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let identity = identity_from_headers(&headers);
    let room = state.service.create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Room>, ApiError> {
    let identity = identity_from_headers(&headers);
    Ok(Json(state.service.get(&id, &identity).await?))
}

async fn update_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<RoomPatch>,
) -> Result<Json<Room>, ApiError> {
    let identity = identity_from_headers(&headers);
    Ok(Json(state.service.update(&id, &patch, &identity).await?))
}

async fn share_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, ApiError> {
    let identity = identity_from_headers(&headers);
    let members = state.service.share(&id, &request, &identity).await?;
    Ok(Json(ShareResponse {
        success: true,
        members,
    }))
}

async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoomListing>, ApiError> {
    let identity = identity_from_headers(&headers);
    Ok(Json(state.service.list(&identity).await?))
}

async fn delete_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let identity = identity_from_headers(&headers);
    state.service.delete(&id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// WebSocket upgrade for the live editing relay
///
/// The connection's display identity comes from `x-user-email`, defaulting
/// to "Guest". This path never touches the stores.
async fn room_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let display_name = identity_from_headers(&headers).display_name().to_string();
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| ConnectionHandler::new(socket, hub, display_name).handle())
}
