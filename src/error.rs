//! 방 세션 에러 정의

use crate::store::StoreError;
use thiserror::Error;

/// 방 세션 처리 중 발생하는 에러
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room '{0}' already exists")]
    DuplicateName(String),
    #[error("room '{0}' not found")]
    RoomNotFound(String),
    #[error("incorrect password")]
    IncorrectPassword,
    #[error("connection is already bound to room '{0}'")]
    AlreadyInRoom(String),
    #[error("only the host may do this")]
    NotAuthorized,
    #[error("room '{0}' is full")]
    RoomFull(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// WebSocket Error 프레임에 실리는 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "duplicate_name",
            Self::RoomNotFound(_) => "room_not_found",
            Self::IncorrectPassword => "incorrect_password",
            Self::AlreadyInRoom(_) => "already_in_room",
            Self::NotAuthorized => "not_authorized",
            Self::RoomFull(_) => "room_full",
            Self::Store(_) | Self::Internal(_) => "internal",
        }
    }

    /// 사용자에게 그대로 보여줄 수 있는 에러인지
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Internal(_))
    }
}
