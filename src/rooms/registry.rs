//! 연결 -> (사용자, 방) 매핑

use super::room::{ConnectionId, UserId};
use crate::error::RoomError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub user_id: UserId,
    pub room: String,
}

/// 연결별 방 바인딩. 키 단위로 원자적이다.
#[derive(Default)]
pub struct ConnectionRegistry {
    bindings: DashMap<ConnectionId, Binding>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이미 다른 방에 묶인 연결은 먼저 나가야 한다
    pub fn bind(&self, connection_id: &str, user_id: &str, room: &str) -> Result<(), RoomError> {
        match self.bindings.entry(connection_id.to_string()) {
            Entry::Occupied(existing) => Err(RoomError::AlreadyInRoom(existing.get().room.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Binding {
                    user_id: user_id.to_string(),
                    room: room.to_string(),
                });
                Ok(())
            }
        }
    }

    pub fn unbind(&self, connection_id: &str) -> Option<Binding> {
        self.bindings.remove(connection_id).map(|(_, binding)| binding)
    }

    /// 해당 방에 묶여 있을 때만 해제
    pub fn unbind_from(&self, connection_id: &str, room: &str) -> Option<Binding> {
        self.bindings
            .remove_if(connection_id, |_, binding| binding.room == room)
            .map(|(_, binding)| binding)
    }

    pub fn binding(&self, connection_id: &str) -> Option<Binding> {
        self.bindings.get(connection_id).map(|b| b.value().clone())
    }

    pub fn room_of(&self, connection_id: &str) -> Option<String> {
        self.bindings.get(connection_id).map(|b| b.room.clone())
    }

    pub fn connections_in_room(&self, room: &str) -> HashSet<ConnectionId> {
        self.bindings
            .iter()
            .filter(|entry| entry.room == room)
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}
