//! 방 세션 모듈

pub mod directory;
pub mod readiness;
pub mod registry;
pub mod room;
pub mod service;

pub use room::{Media, RoomPhase};
pub use service::RoomSessionService;
