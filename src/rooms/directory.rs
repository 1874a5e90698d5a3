//! 활성 방 디렉터리

use super::room::{Media, Room};
use crate::error::RoomError;
use crate::store::{DurableStore, RoomRecord};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// 새 방 생성 요청
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub unique_name: String,
    pub host_id: String,
    pub password_hash: Option<String>,
    pub media: Vec<Media>,
}

/// unique_name -> Room
pub struct RoomDirectory {
    rooms: DashMap<String, Arc<Room>>,
    store: Arc<dyn DurableStore>,
    /// 이름 중복 확인과 등록을 묶는 디렉터리 전역 락
    create_lock: Mutex<()>,
}

impl RoomDirectory {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            rooms: DashMap::new(),
            store,
            create_lock: Mutex::new(()),
        }
    }

    /// 저장소에 먼저 기록한 뒤 인덱스에 공개한다
    pub async fn create(&self, new_room: NewRoom) -> Result<Arc<Room>, RoomError> {
        let _guard = self.create_lock.lock().await;

        if self.rooms.contains_key(&new_room.unique_name)
            || self
                .store
                .load_room_by_unique_name(&new_room.unique_name)
                .await?
                .is_some()
        {
            tracing::warn!(room = %new_room.unique_name, "Duplicate room name rejected");
            return Err(RoomError::DuplicateName(new_room.unique_name));
        }

        let record = RoomRecord {
            id: Uuid::new_v4().to_string(),
            name: new_room.name,
            unique_name: new_room.unique_name,
            host_id: new_room.host_id,
            password_hash: new_room.password_hash,
            media: new_room.media,
        };
        self.store.save_room(&record).await?;

        let room = Arc::new(Room::from_record(record));
        self.rooms.insert(room.unique_name.clone(), room.clone());

        tracing::info!(
            room = %room.unique_name,
            room_id = %room.id,
            host = %room.host_id,
            "Room created"
        );
        Ok(room)
    }

    pub fn find(&self, unique_name: &str) -> Option<Arc<Room>> {
        self.rooms.get(unique_name).map(|r| r.value().clone())
    }

    /// 인덱스에서만 제거 (방 락을 잡은 상태에서 사용)
    pub fn evict(&self, unique_name: &str) -> Option<Arc<Room>> {
        self.rooms.remove(unique_name).map(|(_, room)| room)
    }

    /// 인덱스와 저장소 레코드 모두 제거
    pub async fn remove(&self, unique_name: &str) -> Result<Option<Arc<Room>>, RoomError> {
        let evicted = self.evict(unique_name);
        self.store.delete_room(unique_name).await?;
        tracing::info!(room = %unique_name, "Room deleted");
        Ok(evicted)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn new_room(unique_name: &str) -> NewRoom {
        NewRoom {
            name: "Room".to_string(),
            unique_name: unique_name.to_string(),
            host_id: "host".to_string(),
            password_hash: None,
            media: vec![Media::new("a.mp4", 100)],
        }
    }

    #[tokio::test]
    async fn second_create_with_same_name_fails() {
        let directory = RoomDirectory::new(Arc::new(MemoryStore::new()));
        let first = directory.create(new_room("R1U")).await.unwrap();

        let mut again = new_room("R1U");
        again.host_id = "someone-else".to_string();
        let err = directory.create(again).await.err();

        assert!(matches!(err, Some(RoomError::DuplicateName(_))));
        assert_eq!(directory.len(), 1);
        let kept = directory.find("R1U").unwrap();
        assert_eq!(kept.id, first.id);
        assert_eq!(kept.host_id, "host");
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let directory = RoomDirectory::new(Arc::new(MemoryStore::new()));
        directory.create(new_room("room")).await.unwrap();
        directory.create(new_room("Room")).await.unwrap();
        assert_eq!(directory.len(), 2);
    }

    #[tokio::test]
    async fn stored_room_blocks_reuse_of_name() {
        let store = Arc::new(MemoryStore::new());
        let directory = RoomDirectory::new(store.clone());
        directory.create(new_room("R1U")).await.unwrap();
        directory.evict("R1U");

        let err = directory.create(new_room("R1U")).await.err();
        assert!(matches!(err, Some(RoomError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn remove_frees_the_name() {
        let directory = RoomDirectory::new(Arc::new(MemoryStore::new()));
        directory.create(new_room("R1U")).await.unwrap();

        assert!(directory.remove("R1U").await.unwrap().is_some());
        assert!(directory.find("R1U").is_none());
        assert!(directory.create(new_room("R1U")).await.is_ok());
    }

    #[tokio::test]
    async fn failed_save_publishes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let directory = RoomDirectory::new(store.clone());
        store.set_unavailable(true);

        let err = directory.create(new_room("R1U")).await.err();
        assert!(matches!(err, Some(RoomError::Store(_))));
        assert!(directory.find("R1U").is_none());
    }

    #[tokio::test]
    async fn concurrent_creates_yield_one_room() {
        let directory = Arc::new(RoomDirectory::new(Arc::new(MemoryStore::new())));
        let mut handles = Vec::new();
        for i in 0..8 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                let mut room = new_room("R1U");
                room.host_id = format!("host-{i}");
                directory.create(room).await.is_ok()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(directory.len(), 1);
    }
}
