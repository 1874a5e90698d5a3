//! 환경 변수 기반 설정 관리

use std::env;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub room: RoomConfig,
    pub auth: AuthConfig,
    pub log_level: String,
}

/// 방 설정
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// 0이면 인원 제한 없음
    pub max_size: usize,
    pub history_limit: usize,
}

/// 인증 설정
#[derive(Clone)]
pub struct AuthConfig {
    /// 비어 있으면 프로세스 시작 시 임의 값으로 대체됨
    pub secret: String,
    pub token_ttl: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            history_limit: 50,
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "5600".to_string())
                .parse()
                .unwrap_or(5600),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            room: RoomConfig {
                max_size: env::var("MAX_ROOM_SIZE")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()
                    .unwrap_or(16),
                history_limit: env::var("CHAT_HISTORY_LIMIT")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .unwrap_or(50),
            },
            auth: AuthConfig {
                secret: env::var("AUTH_SECRET").unwrap_or_default(),
                token_ttl: env::var("AUTH_TOKEN_TTL")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .unwrap_or(86400),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// 모든 오리진 허용 여부
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origins(origins: &[&str]) -> Config {
        Config {
            port: 5600,
            host: "127.0.0.1".to_string(),
            cors_origins: origins.iter().map(|o| o.to_string()).collect(),
            room: RoomConfig::default(),
            auth: AuthConfig {
                secret: "secret".to_string(),
                token_ttl: 60,
            },
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn wildcard_or_empty_origins_allow_any() {
        assert!(config_with_origins(&["*"]).allows_any_origin());
        assert!(config_with_origins(&[]).allows_any_origin());
        assert!(!config_with_origins(&["http://localhost:3500"]).allows_any_origin());
    }

    #[test]
    fn auth_config_debug_hides_secret() {
        let rendered = format!("{:?}", config_with_origins(&["*"]).auth);
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}
