//! 密码哈希
//!
//! 新哈希一律使用 Argon2id（PHC 字符串）；旧系统种子数据中的 bcrypt 哈希只做校验。

use std::fmt;
use std::str::FromStr;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
};
use rand::{RngCore, rngs::OsRng};
use warden_errors::{AppError, AppResult};

const SALT_LEN: usize = 16;

/// `burn` 使用的固定盐
const BURN_SALT: &str = "d2FyZGVuLWJ1cm4tc2FsdA";

/// Argon2id 成本参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// 已哈希的密码
///
/// Debug/Display 均不输出内容。
#[derive(Clone, PartialEq, Eq)]
pub struct HashedSecret(String);

impl HashedSecret {
    /// 从存储中读取的哈希字符串
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_legacy_bcrypt(&self) -> bool {
        ["$2a$", "$2b$", "$2y$"]
            .iter()
            .any(|prefix| self.0.starts_with(prefix))
    }

    /// 是否为可校验的格式（PHC 字符串或 bcrypt）
    pub fn is_recognized(&self) -> bool {
        if self.is_legacy_bcrypt() {
            return bcrypt::HashParts::from_str(&self.0).is_ok();
        }
        PasswordHash::new(&self.0).is_ok()
    }
}

impl fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedSecret([REDACTED])")
    }
}

impl fmt::Display for HashedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// 密码哈希器
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> AppResult<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AppError::config(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// 生成新的加盐哈希
    pub fn hash(&self, plaintext: &str) -> AppResult<HashedSecret> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| AppError::hashing(format!("entropy source unavailable: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::hashing(e.to_string()))?;

        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::hashing(e.to_string()))?;

        Ok(HashedSecret(hash.to_string()))
    }

    /// 常数时间校验，存储的哈希格式错误时返回 false
    pub fn verify(&self, plaintext: &str, hashed: &HashedSecret) -> bool {
        if hashed.is_legacy_bcrypt() {
            return bcrypt::verify(plaintext, hashed.as_str()).unwrap_or(false);
        }

        match PasswordHash::new(hashed.as_str()) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// 做一次结果被丢弃的哈希，使"账户不存在"与"密码错误"耗时一致
    ///
    /// 始终按 Argon2id 计费。旧 bcrypt 哈希在首次登录成功后会被替换，
    /// 替换前该账户的耗时与 burn 不一致。
    pub fn burn(&self, plaintext: &str) {
        if let Ok(salt) = SaltString::from_b64(BURN_SALT) {
            let _ = self.argon2.hash_password(plaintext.as_bytes(), &salt);
        }
    }

    /// 在阻塞线程池中执行 `hash`
    pub async fn spawn_hash(&self, plaintext: String) -> AppResult<HashedSecret> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::hashing(format!("hashing task failed: {e}")))?
    }

    /// 在阻塞线程池中执行 `verify`
    pub async fn spawn_verify(&self, plaintext: String, hashed: HashedSecret) -> bool {
        let hasher = self.clone();
        match tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hashed)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }

    /// 在阻塞线程池中执行 `burn`
    pub async fn spawn_burn(&self, plaintext: String) {
        let hasher = self.clone();
        let _ = tokio::task::spawn_blocking(move || hasher.burn(&plaintext)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_ADMIN_HASH: &str = "$2a$10$jqtfUwulMw6xqGUA.IsjkuAooNkAjPT3FJ9rRiUoSTsUpNTD8McxC";

    fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap_hasher();
        let hashed = hasher.hash("SecurePass123!").unwrap();

        assert!(hashed.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("SecurePass123!", &hashed));
        assert!(!hasher.verify("SecurePass123?", &hashed));
        assert!(!hasher.verify("", &hashed));
    }

    #[test]
    fn test_same_password_gets_fresh_salt() {
        let hasher = cheap_hasher();
        let a = hasher.hash("repeat").unwrap();
        let b = hasher.hash("repeat").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_uses_params_from_stored_hash() {
        let stored = cheap_hasher().hash("portable").unwrap();
        let stronger = PasswordHasher::new(HashCost {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(stronger.verify("portable", &stored));
    }

    #[test]
    fn test_legacy_bcrypt_hash() {
        let hasher = cheap_hasher();
        let seed = HashedSecret::from_hash(SEED_ADMIN_HASH);

        assert!(seed.is_legacy_bcrypt());
        assert!(hasher.verify("foobar", &seed));
        assert!(!hasher.verify("wrong", &seed));
    }

    #[test]
    fn test_malformed_hash_is_false() {
        let hasher = cheap_hasher();
        assert!(!hasher.verify("foobar", &HashedSecret::from_hash("not-a-hash")));
        assert!(!hasher.verify("foobar", &HashedSecret::from_hash("$2a$10$short")));
        assert!(!hasher.verify("foobar", &HashedSecret::from_hash("")));
    }

    #[test]
    fn test_recognized_formats() {
        let hasher = cheap_hasher();
        assert!(hasher.hash("x").unwrap().is_recognized());
        assert!(HashedSecret::from_hash(SEED_ADMIN_HASH).is_recognized());
        assert!(!HashedSecret::from_hash("$2a$10$short").is_recognized());
        assert!(!HashedSecret::from_hash("plaintext").is_recognized());
    }

    #[test]
    fn test_hashed_secret_is_redacted() {
        let hashed = cheap_hasher().hash("hidden").unwrap();
        assert_eq!(format!("{:?}", hashed), "HashedSecret([REDACTED])");
        assert_eq!(hashed.to_string(), "[REDACTED]");
    }

    #[test]
    fn test_invalid_cost_is_config_error() {
        let result = PasswordHasher::new(HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_spawn_roundtrip() {
        let hasher = cheap_hasher();
        let hashed = hasher.spawn_hash("off-thread".to_string()).await.unwrap();

        assert!(hasher.spawn_verify("off-thread".to_string(), hashed.clone()).await);
        assert!(!hasher.spawn_verify("on-thread".to_string(), hashed).await);
        hasher.spawn_burn("anything".to_string()).await;
    }
}
