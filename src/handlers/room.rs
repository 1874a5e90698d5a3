//! 방 관리 핸들러

use super::connection::send_error;
use crate::error::RoomError;
use crate::gateway::RealtimeGateway;
use crate::protocol::ServerMessage;
use crate::rooms::Media;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// 방 입장 처리
pub async fn handle_sign_in(
    state: Arc<AppState>,
    user_id: &str,
    connection_id: &str,
    unique_name: &str,
    password: &str,
) {
    let unique_name = unique_name.trim();
    if let Err(e) = state
        .service
        .sign_in(user_id, connection_id, unique_name, password)
        .await
    {
        tracing::info!(connection_id = %connection_id, room = %unique_name, error = %e, "Sign in rejected");
        send_error(&state, connection_id, &e);
    }
}

/// 방 나가기 처리
pub async fn handle_sign_out(state: Arc<AppState>, connection_id: &str) {
    state.service.sign_out(connection_id).await;
    state.gateway.send_to(connection_id, ServerMessage::SignedOut);
}

/// 미디어 확인 처리. 이번 확인으로 모두 준비되면 방 전체에 알린다.
pub async fn handle_check_media(
    state: Arc<AppState>,
    connection_id: &str,
    unique_name: &str,
    media: &[Media],
) {
    let missing = match state.service.check_media(unique_name, connection_id, media).await {
        Ok(missing) => missing,
        Err(e) => {
            send_error(&state, connection_id, &e);
            return;
        }
    };

    let complete = missing.is_empty();
    state.gateway.send_to(
        connection_id,
        ServerMessage::MissingMedia {
            unique_name: unique_name.to_string(),
            missing,
        },
    );

    let is_member = state.service.room_of(connection_id).as_deref() == Some(unique_name);
    if !complete || !is_member {
        return;
    }

    // 호스트에게 멤버별 준비 진행 상황 전달
    let hosts = state.service.host_connections(unique_name).await;
    state.gateway.broadcast(
        &hosts,
        ServerMessage::MemberReady {
            unique_name: unique_name.to_string(),
            connection_id: connection_id.to_string(),
        },
    );

    if state.service.is_ready(unique_name).await {
        let members = state.service.connections_in_room(unique_name);
        tracing::info!(room = %unique_name, members = members.len(), "All members ready");
        state.gateway.broadcast(
            &members,
            ServerMessage::AllReady {
                unique_name: unique_name.to_string(),
            },
        );
    }
}

/// 준비 상태 조회
pub async fn handle_is_ready(state: Arc<AppState>, connection_id: &str, unique_name: &str) {
    let ready = state.service.is_ready(unique_name).await;
    let phase = state.service.phase(unique_name).await;

    match phase {
        Some(phase) => state.gateway.send_to(
            connection_id,
            ServerMessage::ReadyState {
                unique_name: unique_name.to_string(),
                ready,
                phase,
            },
        ),
        None => send_error(
            &state,
            connection_id,
            &RoomError::RoomNotFound(unique_name.to_string()),
        ),
    }
}

/// 재생 위치 갱신 처리 (호스트 전용)
pub async fn handle_update_position(
    state: Arc<AppState>,
    connection_id: &str,
    unique_name: &str,
    position_ms: u64,
) {
    let offset = Duration::from_millis(position_ms);
    if let Err(e) = state
        .service
        .update_position(connection_id, unique_name, offset)
        .await
    {
        send_error(&state, connection_id, &e);
    }
}
