//! 채팅 핸들러

use super::connection::send_error;
use crate::state::AppState;
use std::sync::Arc;

/// 채팅 메시지 최대 길이 (문자 수)
const MAX_MESSAGE_CHARS: usize = 2000;

/// 메시지 전송 처리
pub async fn handle_send_message(state: Arc<AppState>, connection_id: &str, text: &str) {
    let text: String = text.chars().take(MAX_MESSAGE_CHARS).collect();

    if let Err(e) = state.service.send_message(connection_id, &text).await {
        tracing::debug!(connection_id = %connection_id, error = %e, "Chat message rejected");
        send_error(&state, connection_id, &e);
    }
}
