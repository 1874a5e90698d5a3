//! 방 비밀번호 해시 (Argon2) 및 신원 토큰 (HMAC-SHA1)

use crate::config::AuthConfig;
use crate::error::RoomError;
use argon2::{
    password_hash::{PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha1 = Hmac<Sha1>;

/// 인증 기능
pub trait AuthProvider: Send + Sync {
    /// 방 비밀번호 해시. 솔트가 매번 새로 만들어진다.
    fn hash_password(&self, password: &str) -> Result<String, RoomError>;
    fn verify_password(&self, password: &str, hash: &str) -> bool;
    fn issue_token(&self, user_id: &str) -> Result<String, RoomError>;
    /// 유효하면 user_id 반환
    fn validate_token(&self, token: &str) -> Option<String>;
}

/// 서버 비밀키 기반 인증
pub struct HmacAuthProvider {
    secret: Vec<u8>,
    token_ttl: u64,
    argon: Argon2<'static>,
}

impl HmacAuthProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            token_ttl: config.token_ttl,
            argon: Argon2::default(),
        }
    }

    fn mac(&self, parts: &[&str]) -> Result<HmacSha1, RoomError> {
        let mut mac = HmacSha1::new_from_slice(&self.secret)
            .map_err(|e| RoomError::Internal(e.to_string()))?;
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                mac.update(b":");
            }
            mac.update(part.as_bytes());
        }
        Ok(mac)
    }

    fn verify(&self, parts: &[&str], encoded: &str) -> bool {
        let Ok(expected) = BASE64.decode(encoded) else {
            return false;
        };
        match self.mac(parts) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

impl AuthProvider for HmacAuthProvider {
    fn hash_password(&self, password: &str) -> Result<String, RoomError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| RoomError::Internal(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(stored) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon
            .verify_password(password.as_bytes(), &stored)
            .is_ok()
    }

    /// 토큰 형식: `{user_id}:{expiry}:{nonce}:{signature}`
    fn issue_token(&self, user_id: &str) -> Result<String, RoomError> {
        let expiry = (now_secs() + self.token_ttl).to_string();
        let nonce = format!("{:x}", rand::random::<u64>());
        let mac = self.mac(&["token", user_id, &expiry, &nonce])?;
        let signature = BASE64.encode(mac.finalize().into_bytes());
        Ok(format!("{}:{}:{}:{}", user_id, expiry, nonce, signature))
    }

    fn validate_token(&self, token: &str) -> Option<String> {
        // user_id 안에 ':'가 있을 수 있으므로 뒤에서부터 자른다
        let mut parts = token.rsplitn(4, ':');
        let signature = parts.next()?;
        let nonce = parts.next()?;
        let expiry = parts.next()?;
        let user_id = parts.next()?;

        if user_id.is_empty() {
            return None;
        }
        let expiry_time: u64 = expiry.parse().ok()?;
        if expiry_time <= now_secs() {
            return None;
        }
        if !self.verify(&["token", user_id, expiry, nonce], signature) {
            return None;
        }
        Some(user_id.to_string())
    }
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// AUTH_SECRET 미설정 시 사용할 임의 비밀키
pub fn random_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    BASE64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(ttl: u64) -> HmacAuthProvider {
        HmacAuthProvider::new(&AuthConfig {
            secret: "test-secret".to_string(),
            token_ttl: ttl,
        })
    }

    #[test]
    fn password_hash_verifies_only_the_same_password() {
        let auth = provider(60);
        let hash = auth.hash_password("hunter2").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(auth.verify_password("hunter2", &hash));
        assert!(!auth.verify_password("hunter3", &hash));
        assert!(!auth.verify_password("hunter2", "not a phc string"));
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        let auth = provider(60);
        let first = auth.hash_password("hunter2").unwrap();
        let second = auth.hash_password("hunter2").unwrap();

        assert_ne!(first, second);
        assert!(auth.verify_password("hunter2", &second));
    }

    #[test]
    fn token_round_trips_user_id() {
        let auth = provider(60);
        let token = auth.issue_token("user:42").unwrap();
        assert_eq!(auth.validate_token(&token).as_deref(), Some("user:42"));
    }

    #[test]
    fn tampered_or_foreign_tokens_are_rejected() {
        let auth = provider(60);
        let token = auth.issue_token("alice").unwrap();
        let forged = token.replacen("alice", "mallory", 1);
        assert!(auth.validate_token(&forged).is_none());

        let other = HmacAuthProvider::new(&AuthConfig {
            secret: "other-secret".to_string(),
            token_ttl: 60,
        });
        assert!(other.validate_token(&token).is_none());
        assert!(auth.validate_token("garbage").is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = provider(0);
        let token = auth.issue_token("alice").unwrap();
        assert!(auth.validate_token(&token).is_none());
    }
}
