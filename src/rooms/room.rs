//! 방 상태 정의

use super::readiness::MediaReadiness;
use crate::store::RoomRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

pub type ConnectionId = String;
pub type UserId = String;

/// 방에 필요한 미디어 파일
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Media {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Media {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            hash: None,
        }
    }

    /// 클라이언트가 보고한 파일이 이 항목을 충족하는지.
    /// 해시가 지정된 항목은 해시까지 같아야 한다.
    pub fn is_satisfied_by(&self, reported: &Media) -> bool {
        self.name == reported.name
            && self.size == reported.size
            && match &self.hash {
                Some(hash) => reported.hash.as_ref() == Some(hash),
                None => true,
            }
    }
}

/// 매니페스트 순서대로 누락된 항목 반환
pub fn missing_media(required: &[Media], reported: &[Media]) -> Vec<Media> {
    required
        .iter()
        .filter(|m| !reported.iter().any(|r| m.is_satisfied_by(r)))
        .cloned()
        .collect()
}

/// 방 진행 단계 (저장하지 않고 세션 상태에서 계산)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Forming,
    WaitingForMedia,
    ReadyToPlay,
    Playing,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistState {
    pub track_current_time: Duration,
    /// 호스트가 재생 위치를 한 번이라도 지정했는지
    pub playing: bool,
}

/// 방 락 안에서만 변경되는 상태
#[derive(Debug, Default)]
pub struct RoomSession {
    /// connection_id -> user_id
    pub members: HashMap<ConnectionId, UserId>,
    pub readiness: MediaReadiness,
    pub playlist: PlaylistState,
    /// 호스트가 떠나 디렉터리에서 빠진 방
    pub closed: bool,
}

impl RoomSession {
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.members.keys().cloned().collect()
    }

    pub fn connections_except(&self, connection_id: &str) -> Vec<ConnectionId> {
        self.members
            .keys()
            .filter(|c| c.as_str() != connection_id)
            .cloned()
            .collect()
    }

    pub fn member_ids(&self) -> BTreeSet<UserId> {
        self.members.values().cloned().collect()
    }

    pub fn connections_of(&self, user_id: &str) -> Vec<ConnectionId> {
        self.members
            .iter()
            .filter(|(_, u)| u.as_str() == user_id)
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub fn phase(&self) -> RoomPhase {
        if self.members.is_empty() {
            RoomPhase::Forming
        } else if self.playlist.playing {
            RoomPhase::Playing
        } else if self.readiness.is_all_ready() {
            RoomPhase::ReadyToPlay
        } else {
            RoomPhase::WaitingForMedia
        }
    }
}

/// 활성 방
pub struct Room {
    pub id: String,
    pub name: String,
    pub unique_name: String,
    pub host_id: UserId,
    pub password_hash: Option<String>,
    pub media: Vec<Media>,
    session: Mutex<RoomSession>,
}

impl Room {
    pub fn from_record(record: RoomRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            unique_name: record.unique_name,
            host_id: record.host_id,
            password_hash: record.password_hash,
            media: record.media,
            session: Mutex::new(RoomSession::default()),
        }
    }

    /// 방 단위 임계 구역
    pub async fn lock(&self) -> MutexGuard<'_, RoomSession> {
        self.session.lock().await
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        let session = self.lock().await;
        RoomSnapshot {
            unique_name: self.unique_name.clone(),
            host_id: self.host_id.clone(),
            members: session.member_ids().into_iter().collect(),
            connection_count: session.members.len(),
            phase: session.phase(),
            position: session.playlist.track_current_time,
        }
    }
}

/// 방 상태 사본
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub unique_name: String,
    pub host_id: UserId,
    /// 정렬된 user_id 목록
    pub members: Vec<UserId>,
    pub connection_count: usize,
    pub phase: RoomPhase,
    pub position: Duration,
}
