//! 영속 저장소 인터페이스와 인메모리 구현

use crate::rooms::Media;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// 저장되는 방 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub unique_name: String,
    pub host_id: String,
    pub password_hash: Option<String>,
    pub media: Vec<Media>,
}

/// 저장되는 채팅 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub room: String,
    pub user_id: String,
    pub text: String,
    pub sent_at: u64,
}

/// 방/메시지 영속 저장소
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn save_room(&self, room: &RoomRecord) -> Result<(), StoreError>;
    async fn load_room_by_unique_name(
        &self,
        unique_name: &str,
    ) -> Result<Option<RoomRecord>, StoreError>;
    async fn delete_room(&self, unique_name: &str) -> Result<(), StoreError>;
    async fn save_message(&self, message: &MessageRecord) -> Result<(), StoreError>;
    /// 오래된 순서로 반환
    async fn load_messages_for_room(&self, room: &str) -> Result<Vec<MessageRecord>, StoreError>;
}

/// 프로세스 내 저장소. 방을 지우면 그 방의 메시지도 함께 지운다.
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<String, RoomRecord>,
    messages: DashMap<String, Vec<MessageRecord>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 장애 상황 재현용
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn save_room(&self, room: &RoomRecord) -> Result<(), StoreError> {
        self.check()?;
        self.rooms.insert(room.unique_name.clone(), room.clone());
        Ok(())
    }

    async fn load_room_by_unique_name(
        &self,
        unique_name: &str,
    ) -> Result<Option<RoomRecord>, StoreError> {
        self.check()?;
        Ok(self.rooms.get(unique_name).map(|r| r.value().clone()))
    }

    async fn delete_room(&self, unique_name: &str) -> Result<(), StoreError> {
        self.check()?;
        self.rooms.remove(unique_name);
        self.messages.remove(unique_name);
        Ok(())
    }

    async fn save_message(&self, message: &MessageRecord) -> Result<(), StoreError> {
        self.check()?;
        self.messages
            .entry(message.room.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn load_messages_for_room(&self, room: &str) -> Result<Vec<MessageRecord>, StoreError> {
        self.check()?;
        Ok(self
            .messages
            .get(room)
            .map(|m| m.value().clone())
            .unwrap_or_default())
    }
}
