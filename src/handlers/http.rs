//! HTTP 핸들러

use crate::auth::now_secs;
use crate::error::RoomError;
use crate::rooms::Media;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// 방 생성 요청 본문
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub unique_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let status = match &self {
            RoomError::DuplicateName(_) | RoomError::IncorrectPassword => StatusCode::BAD_REQUEST,
            RoomError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            RoomError::AlreadyInRoom(_) | RoomError::RoomFull(_) => StatusCode::CONFLICT,
            RoomError::NotAuthorized => StatusCode::FORBIDDEN,
            RoomError::Store(_) | RoomError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            RoomError::DuplicateName(_) => "Room already exists".to_string(),
            e if e.is_user_facing() => e.to_string(),
            e => {
                tracing::error!(error = %e, "Request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}

pub async fn index_handler() -> Html<&'static str> {
    Html("<h1>Filmst Room Server</h1><p>WebSocket endpoint: /ws?token=...</p>")
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "filmst-room-server",
        "rooms": state.service.room_count(),
        "connections": state.gateway.len(),
        "bound_connections": state.service.bound_connection_count(),
        "timestamp": now_secs()
    }))
}

/// `Authorization: Bearer <token>` 에서 user_id 추출
pub fn bearer_user(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    state.auth.validate_token(token)
}

/// 방 생성 (요청자가 호스트)
pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateRoomRequest>,
) -> Response {
    let Some(host_id) = bearer_user(&state, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let unique_name = request.unique_name.trim();
    if unique_name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "unique_name is required" })),
        )
            .into_response();
    }

    match state
        .service
        .create_room(
            &host_id,
            request.name.trim(),
            unique_name,
            &request.password,
            request.media,
        )
        .await
    {
        Ok(room_id) => Json(serde_json::json!({ "room_id": room_id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// 방 상태 조회
pub async fn room_handler(
    State(state): State<Arc<AppState>>,
    Path(unique_name): Path<String>,
) -> Response {
    match state.service.snapshot(&unique_name).await {
        Some(snapshot) => Json(serde_json::json!({
            "unique_name": snapshot.unique_name,
            "host_id": snapshot.host_id,
            "members": snapshot.members,
            "connections": snapshot.connection_count,
            "phase": snapshot.phase,
            "position_ms": u64::try_from(snapshot.position.as_millis()).unwrap_or(u64::MAX),
        }))
        .into_response(),
        None => RoomError::RoomNotFound(unique_name).into_response(),
    }
}

/// 방 삭제 (호스트 전용)
pub async fn delete_room_handler(
    State(state): State<Arc<AppState>>,
    Path(unique_name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Some(user_id) = bearer_user(&state, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match state.service.remove_room(&user_id, &unique_name).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
