//! 애플리케이션 상태 관리

use crate::auth::{AuthProvider, HmacAuthProvider};
use crate::config::Config;
use crate::gateway::WsGateway;
use crate::rooms::RoomSessionService;
use crate::store::{DurableStore, MemoryStore};
use std::sync::Arc;

/// 전역 애플리케이션 상태. 시작 시 한 번 만들어 모든 연결이 공유한다.
pub struct AppState {
    pub service: RoomSessionService,
    /// 연결별 송신 채널
    pub gateway: Arc<WsGateway>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
        let gateway = Arc::new(WsGateway::new());
        let auth: Arc<dyn AuthProvider> = Arc::new(HmacAuthProvider::new(&config.auth));
        let service = RoomSessionService::new(
            store,
            auth.clone(),
            gateway.clone(),
            config.room.clone(),
        );

        Self {
            service,
            gateway,
            auth,
        }
    }
}
