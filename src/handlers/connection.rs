//! 연결 핸들러

use crate::error::RoomError;
use crate::gateway::RealtimeGateway;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 새 연결 처리
pub async fn handle_connection(
    state: Arc<AppState>,
    user_id: &str,
    sender: UnboundedSender<ServerMessage>,
) -> String {
    let connection_id = Uuid::new_v4().to_string();

    state.gateway.register(&connection_id, sender.clone());

    let _ = sender.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
        user_id: user_id.to_string(),
    });

    tracing::info!(connection_id = %connection_id, user_id = %user_id, "New connection established");
    connection_id
}

/// 연결 해제 처리. 방에 있었다면 퇴장시킨다.
pub async fn handle_disconnect(state: Arc<AppState>, connection_id: &str) {
    state.service.sign_out(connection_id).await;
    state.gateway.unregister(connection_id);
    tracing::info!(connection_id = %connection_id, "Connection closed");
}

/// Heartbeat 처리
pub fn handle_heartbeat(sender: &UnboundedSender<ServerMessage>) {
    let _ = sender.send(ServerMessage::HeartbeatAck);
}

/// 에러를 요청한 연결에만 전달
pub fn send_error(state: &AppState, connection_id: &str, error: &RoomError) {
    let message = if error.is_user_facing() {
        error.to_string()
    } else {
        tracing::error!(connection_id = %connection_id, error = %error, "Internal error");
        "internal server error".to_string()
    };

    state.gateway.send_to(
        connection_id,
        ServerMessage::Error {
            code: error.code().to_string(),
            message,
        },
    );
}
