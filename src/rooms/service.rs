//! 방 세션 코디네이션
//!
//! 방 생성, 입장/퇴장, 미디어 확인, 재생 위치 동기화, 채팅을 처리한다.
//! 방 상태 변경은 모두 방 락 안에서 검증을 끝낸 뒤에 적용하고,
//! 저장소 I/O와 브로드캐스트는 락을 놓은 뒤에 수행한다.

use super::directory::{NewRoom, RoomDirectory};
use super::registry::ConnectionRegistry;
use super::room::{missing_media, ConnectionId, Media, Room, RoomPhase, RoomSession, RoomSnapshot};
use crate::auth::{now_secs, AuthProvider};
use crate::config::RoomConfig;
use crate::error::RoomError;
use crate::gateway::RealtimeGateway;
use crate::protocol::{ChatEntry, ServerMessage};
use crate::store::{DurableStore, MessageRecord};
use std::sync::Arc;
use std::time::Duration;

/// 퇴장 처리 결과
enum Departure {
    /// 이미 방에서 빠진 연결
    Gone,
    Left {
        user_id: String,
        remaining: Vec<ConnectionId>,
    },
    Closed {
        evicted: Vec<ConnectionId>,
    },
}

pub struct RoomSessionService {
    directory: RoomDirectory,
    registry: ConnectionRegistry,
    store: Arc<dyn DurableStore>,
    auth: Arc<dyn AuthProvider>,
    gateway: Arc<dyn RealtimeGateway>,
    config: RoomConfig,
}

impl RoomSessionService {
    pub fn new(
        store: Arc<dyn DurableStore>,
        auth: Arc<dyn AuthProvider>,
        gateway: Arc<dyn RealtimeGateway>,
        config: RoomConfig,
    ) -> Self {
        Self {
            directory: RoomDirectory::new(store.clone()),
            registry: ConnectionRegistry::new(),
            store,
            auth,
            gateway,
            config,
        }
    }

    /// 방 생성. 빈 비밀번호는 비밀번호 없는 방.
    pub async fn create_room(
        &self,
        host_id: &str,
        name: &str,
        unique_name: &str,
        password: &str,
        media: Vec<Media>,
    ) -> Result<String, RoomError> {
        let password_hash = if password.is_empty() {
            None
        } else {
            Some(self.auth.hash_password(password)?)
        };

        let room = self
            .directory
            .create(NewRoom {
                name: name.to_string(),
                unique_name: unique_name.to_string(),
                host_id: host_id.to_string(),
                password_hash,
                media,
            })
            .await?;

        Ok(room.id.clone())
    }

    /// 방 입장
    pub async fn sign_in(
        &self,
        user_id: &str,
        connection_id: &str,
        unique_name: &str,
        password: &str,
    ) -> Result<(), RoomError> {
        let room = self.find(unique_name)?;

        if let Some(hash) = &room.password_hash {
            if !self.auth.verify_password(password, hash) {
                tracing::warn!(
                    room = %room.unique_name,
                    connection_id = %connection_id,
                    "Incorrect room password"
                );
                return Err(RoomError::IncorrectPassword);
            }
        }

        let (others, member_count, position) = {
            let mut session = room.lock().await;
            if session.closed {
                return Err(RoomError::RoomNotFound(room.unique_name.clone()));
            }
            let max_size = self.config.max_size;
            if max_size > 0 && session.members.len() >= max_size {
                tracing::warn!(room = %room.unique_name, "Room full, rejected sign in");
                return Err(RoomError::RoomFull(room.unique_name.clone()));
            }

            // 바인딩이 마지막 검증이자 첫 변경
            self.registry.bind(connection_id, user_id, &room.unique_name)?;
            session
                .members
                .insert(connection_id.to_string(), user_id.to_string());
            session.readiness.reset([connection_id.to_string()]);

            (
                session.connections_except(connection_id),
                session.members.len(),
                session.playlist.track_current_time,
            )
        };

        tracing::info!(
            room = %room.unique_name,
            user_id = %user_id,
            connection_id = %connection_id,
            member_count = member_count,
            "User signed in"
        );

        self.gateway.send_to(
            connection_id,
            ServerMessage::SignedIn {
                unique_name: room.unique_name.clone(),
                name: room.name.clone(),
                connection_id: connection_id.to_string(),
                host_id: room.host_id.clone(),
                member_count,
                position_ms: as_millis(position),
                media: room.media.clone(),
            },
        );
        self.gateway.broadcast(
            &others,
            ServerMessage::MemberJoined {
                unique_name: room.unique_name.clone(),
                user_id: user_id.to_string(),
                connection_id: connection_id.to_string(),
                member_count,
            },
        );

        // 입장은 이미 확정됐으므로 히스토리 실패는 기록만 한다
        match self.history(&room.unique_name).await {
            Ok(messages) => self.gateway.send_to(
                connection_id,
                ServerMessage::History {
                    unique_name: room.unique_name.clone(),
                    messages,
                },
            ),
            Err(e) => {
                tracing::warn!(room = %room.unique_name, error = %e, "Failed to load chat history")
            }
        }

        Ok(())
    }

    /// 방 퇴장. 묶여 있지 않은 연결이면 아무 일도 하지 않는다.
    pub async fn sign_out(&self, connection_id: &str) {
        let Some(binding) = self.registry.binding(connection_id) else {
            return;
        };
        let Some(room) = self.directory.find(&binding.room) else {
            self.registry.unbind_from(connection_id, &binding.room);
            return;
        };

        let departure = {
            let mut session = room.lock().await;
            // 바인딩 해제와 멤버 제거는 같은 방 락 안에서만 일어난다
            let Some(binding) = self.registry.unbind_from(connection_id, &room.unique_name) else {
                return;
            };
            if session.members.remove(connection_id).is_none() {
                Departure::Gone
            } else {
                session.readiness.drop_connection(connection_id);

                let host_gone = room.is_host(&binding.user_id)
                    && session.connections_of(&binding.user_id).is_empty();
                if host_gone {
                    Departure::Closed {
                        evicted: self.close_locked(&room, &mut session),
                    }
                } else {
                    Departure::Left {
                        user_id: binding.user_id.clone(),
                        remaining: session.connections(),
                    }
                }
            }
        };

        match departure {
            Departure::Gone => {}
            Departure::Left { user_id, remaining } => {
                tracing::info!(
                    room = %room.unique_name,
                    user_id = %user_id,
                    connection_id = %connection_id,
                    remaining = remaining.len(),
                    "User left room"
                );
                let member_count = remaining.len();
                self.gateway.broadcast(
                    &remaining,
                    ServerMessage::MemberLeft {
                        unique_name: room.unique_name.clone(),
                        user_id,
                        connection_id: connection_id.to_string(),
                        member_count,
                    },
                );
            }
            Departure::Closed { evicted } => {
                tracing::info!(
                    room = %room.unique_name,
                    evicted = evicted.len(),
                    "Host left, room closed"
                );
                self.finish_close(&room, &evicted).await;
            }
        }
    }

    /// 호스트가 방을 명시적으로 닫는다. 남은 멤버는 모두 방에서 내보낸다.
    pub async fn remove_room(
        &self,
        requester_id: &str,
        unique_name: &str,
    ) -> Result<(), RoomError> {
        let room = self.find(unique_name)?;
        if !room.is_host(requester_id) {
            return Err(RoomError::NotAuthorized);
        }
        let evicted = {
            let mut session = room.lock().await;
            if session.closed {
                return Err(RoomError::RoomNotFound(room.unique_name.clone()));
            }
            self.close_locked(&room, &mut session)
        };
        tracing::info!(room = %room.unique_name, evicted = evicted.len(), "Room removed");
        self.finish_close(&room, &evicted).await;
        Ok(())
    }

    /// 락 안에서 방을 닫고 내보낸 연결 목록을 반환
    fn close_locked(&self, room: &Room, session: &mut RoomSession) -> Vec<ConnectionId> {
        session.closed = true;
        self.directory.evict(&room.unique_name);

        let mut evicted: Vec<ConnectionId> = session.members.drain().map(|(c, _)| c).collect();
        for connection_id in self.registry.connections_in_room(&room.unique_name) {
            if !evicted.contains(&connection_id) {
                evicted.push(connection_id);
            }
        }
        for connection_id in &evicted {
            self.registry.unbind_from(connection_id, &room.unique_name);
            session.readiness.drop_connection(connection_id);
        }
        evicted
    }

    async fn finish_close(&self, room: &Room, evicted: &[ConnectionId]) {
        self.gateway.broadcast(
            evicted,
            ServerMessage::RoomClosed {
                unique_name: room.unique_name.clone(),
            },
        );
        // 인덱스에서는 이미 빠졌으므로 저장소 레코드만 지워진다
        if let Err(e) = self.directory.remove(&room.unique_name).await {
            tracing::error!(room = %room.unique_name, error = %e, "Failed to delete room record");
        }
    }

    /// 누락된 미디어 반환. 모두 갖췄으면 해당 연결을 준비 완료로 표시.
    pub async fn check_media(
        &self,
        unique_name: &str,
        connection_id: &str,
        media: &[Media],
    ) -> Result<Vec<Media>, RoomError> {
        let room = self.find(unique_name)?;
        let missing = missing_media(&room.media, media);

        if missing.is_empty() {
            let marked = room.lock().await.readiness.mark_ready(connection_id);
            if marked {
                tracing::debug!(room = %room.unique_name, connection_id = %connection_id, "Media confirmed");
            } else {
                tracing::debug!(
                    room = %room.unique_name,
                    connection_id = %connection_id,
                    "Media check from non-member, readiness unchanged"
                );
            }
        }

        Ok(missing)
    }

    /// 모든 멤버가 미디어를 확인했는지. 없는 방은 false.
    pub async fn is_ready(&self, unique_name: &str) -> bool {
        match self.directory.find(unique_name) {
            Some(room) => room.lock().await.readiness.is_all_ready(),
            None => false,
        }
    }

    /// 호스트 전용 재생 위치 갱신 (마지막 쓰기 우선)
    pub async fn update_position(
        &self,
        connection_id: &str,
        unique_name: &str,
        offset: Duration,
    ) -> Result<(), RoomError> {
        let room = self.find(unique_name)?;

        let authorized = self.registry.binding(connection_id).is_some_and(|binding| {
            binding.room == room.unique_name && room.is_host(&binding.user_id)
        });
        if !authorized {
            tracing::warn!(
                room = %room.unique_name,
                connection_id = %connection_id,
                "Rejected position update from non-host"
            );
            return Err(RoomError::NotAuthorized);
        }

        let targets = {
            let mut session = room.lock().await;
            if session.closed {
                return Err(RoomError::RoomNotFound(room.unique_name.clone()));
            }
            if !session.members.contains_key(connection_id) {
                return Err(RoomError::NotAuthorized);
            }
            session.playlist.track_current_time = offset;
            session.playlist.playing = true;
            session.connections()
        };

        tracing::debug!(room = %room.unique_name, position_ms = as_millis(offset), "Position updated");

        self.gateway.broadcast(
            &targets,
            ServerMessage::PositionUpdated {
                unique_name: room.unique_name.clone(),
                position_ms: as_millis(offset),
            },
        );
        Ok(())
    }

    /// 채팅 메시지 저장 후 브로드캐스트
    pub async fn send_message(&self, connection_id: &str, text: &str) -> Result<(), RoomError> {
        let binding = self
            .registry
            .binding(connection_id)
            .ok_or(RoomError::NotAuthorized)?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let record = MessageRecord {
            room: binding.room,
            user_id: binding.user_id,
            text: text.to_string(),
            sent_at: now_secs(),
        };
        self.store.save_message(&record).await?;

        let Some(room) = self.directory.find(&record.room) else {
            return Ok(());
        };
        let targets = room.lock().await.connections();

        self.gateway.broadcast(
            &targets,
            ServerMessage::ChatMessage {
                unique_name: record.room,
                user_id: record.user_id,
                text: record.text,
                sent_at: record.sent_at,
            },
        );
        Ok(())
    }

    /// 최근 채팅 기록 (오래된 순)
    pub async fn history(&self, unique_name: &str) -> Result<Vec<ChatEntry>, RoomError> {
        let mut messages = self.store.load_messages_for_room(unique_name).await?;
        let limit = self.config.history_limit;
        if messages.len() > limit {
            let excess = messages.len() - limit;
            messages.drain(..excess);
        }
        Ok(messages.into_iter().map(ChatEntry::from).collect())
    }

    pub async fn phase(&self, unique_name: &str) -> Option<RoomPhase> {
        let room = self.directory.find(unique_name)?;
        let phase = room.lock().await.phase();
        Some(phase)
    }

    pub async fn host_connections(&self, unique_name: &str) -> Vec<ConnectionId> {
        match self.directory.find(unique_name) {
            Some(room) => room.lock().await.connections_of(&room.host_id),
            None => Vec::new(),
        }
    }

    pub async fn snapshot(&self, unique_name: &str) -> Option<RoomSnapshot> {
        let room = self.directory.find(unique_name)?;
        Some(room.snapshot().await)
    }

    pub fn room_of(&self, connection_id: &str) -> Option<String> {
        self.registry.room_of(connection_id)
    }

    pub fn connections_in_room(&self, unique_name: &str) -> Vec<ConnectionId> {
        self.registry
            .connections_in_room(unique_name)
            .into_iter()
            .collect()
    }

    pub fn room_count(&self) -> usize {
        self.directory.len()
    }

    pub fn bound_connection_count(&self) -> usize {
        self.registry.len()
    }

    fn find(&self, unique_name: &str) -> Result<Arc<Room>, RoomError> {
        self.directory
            .find(unique_name)
            .ok_or_else(|| RoomError::RoomNotFound(unique_name.to_string()))
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
