//! 邮箱验证链接

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use warden_errors::{AppError, AppResult};

const LINK_BYTES: usize = 32;

/// 验证链接中的明文 hash，只发给用户，不落库
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationLink(String);

impl VerificationLink {
    /// 32 字节随机数的十六进制
    pub fn generate() -> AppResult<Self> {
        let mut bytes = [0u8; LINK_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::internal(format!("entropy source unavailable: {e}")))?;
        Ok(Self(hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> LinkDigest {
        LinkDigest::of(&self.0)
    }
}

impl fmt::Debug for VerificationLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationLink([REDACTED])")
    }
}

/// 存储用的 SHA-256 摘要
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkDigest(String);

impl LinkDigest {
    pub fn of(plaintext: &str) -> Self {
        Self(hex::encode(Sha256::digest(plaintext.as_bytes())))
    }

    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
