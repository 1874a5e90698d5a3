//! 클라이언트-서버 메시지 프로토콜 정의

use crate::rooms::{Media, RoomPhase};
use crate::store::MessageRecord;
use serde::{Deserialize, Serialize};

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    // Connection
    Heartbeat,

    // Room Membership
    SignIn {
        unique_name: String,
        #[serde(default)]
        password: String,
    },
    SignOut,

    // Media Negotiation
    CheckMedia {
        unique_name: String,
        media: Vec<Media>,
    },
    IsReady {
        unique_name: String,
    },

    // Playback
    UpdatePosition {
        unique_name: String,
        position_ms: u64,
    },

    // Chat
    SendMessage {
        text: String,
    },
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    // Connection
    Connected { connection_id: String, user_id: String },
    HeartbeatAck,
    Error { code: String, message: String },

    // Room Events
    SignedIn {
        unique_name: String,
        name: String,
        connection_id: String,
        host_id: String,
        member_count: usize,
        position_ms: u64,
        media: Vec<Media>,
    },
    SignedOut,
    MemberJoined {
        unique_name: String,
        user_id: String,
        connection_id: String,
        member_count: usize,
    },
    MemberLeft {
        unique_name: String,
        user_id: String,
        connection_id: String,
        member_count: usize,
    },
    RoomClosed {
        unique_name: String,
    },

    // Media Negotiation
    MissingMedia {
        unique_name: String,
        missing: Vec<Media>,
    },
    ReadyState {
        unique_name: String,
        ready: bool,
        phase: RoomPhase,
    },
    MemberReady {
        unique_name: String,
        connection_id: String,
    },
    AllReady {
        unique_name: String,
    },

    // Playback
    PositionUpdated {
        unique_name: String,
        position_ms: u64,
    },

    // Chat
    ChatMessage {
        unique_name: String,
        user_id: String,
        text: String,
        sent_at: u64,
    },
    History {
        unique_name: String,
        messages: Vec<ChatEntry>,
    },
}

/// 히스토리 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub user_id: String,
    pub text: String,
    pub sent_at: u64,
}

impl From<MessageRecord> for ChatEntry {
    fn from(record: MessageRecord) -> Self {
        Self {
            user_id: record.user_id,
            text: record.text,
            sent_at: record.sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_uses_type_payload_envelope() {
        let raw = r#"{"type":"CheckMedia","payload":{"unique_name":"R1U","media":[{"name":"a.mp4","size":100}]}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ClientMessage::CheckMedia { unique_name, media } => {
                assert_eq!(unique_name, "R1U");
                assert_eq!(media, vec![Media::new("a.mp4", 100)]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn sign_in_password_defaults_to_empty() {
        let raw = r#"{"type":"SignIn","payload":{"unique_name":"R1U"}}"#;
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert!(matches!(msg, ClientMessage::SignIn { password, .. } if password.is_empty()));
    }

    #[test]
    fn unit_variants_have_no_payload() {
        let json = serde_json::to_value(ServerMessage::HeartbeatAck).unwrap();
        assert_eq!(json, serde_json::json!({"type": "HeartbeatAck"}));

        let heartbeat: ClientMessage = serde_json::from_str(r#"{"type":"Heartbeat"}"#).unwrap();
        assert!(matches!(heartbeat, ClientMessage::Heartbeat));
    }
}
