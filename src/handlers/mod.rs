//! 핸들러 모듈

pub mod chat;
pub mod connection;
pub mod http;
pub mod room;

pub use chat::*;
pub use connection::*;
pub use http::*;
pub use room::*;
