//! 실시간 전달 채널

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

/// 연결된 클라이언트로 이벤트를 내보내는 통로
pub trait RealtimeGateway: Send + Sync {
    fn broadcast(&self, connection_ids: &[String], message: ServerMessage);
    fn send_to(&self, connection_id: &str, message: ServerMessage);
}

/// WebSocket 연결별 송신 채널 (connection_id -> sender)
#[derive(Default)]
pub struct WsGateway {
    peers: DashMap<String, UnboundedSender<ServerMessage>>,
}

impl WsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: &str, sender: UnboundedSender<ServerMessage>) {
        self.peers.insert(connection_id.to_string(), sender);
    }

    pub fn unregister(&self, connection_id: &str) {
        self.peers.remove(connection_id);
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }
}

impl RealtimeGateway for WsGateway {
    fn broadcast(&self, connection_ids: &[String], message: ServerMessage) {
        for connection_id in connection_ids {
            self.send_to(connection_id, message.clone());
        }
    }

    fn send_to(&self, connection_id: &str, message: ServerMessage) {
        if let Some(sender) = self.peers.get(connection_id) {
            if let Err(e) = sender.send(message) {
                tracing::warn!(connection_id = %connection_id, error = %e, "Failed to deliver message");
            }
        }
    }
}
