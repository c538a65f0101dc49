//! 凭证

use warden_auth_core::HashedSecret;
use warden_errors::{AppError, AppResult};

use super::{LinkDigest, Principal};

/// 密码最大字节数
pub const MAX_PASSWORD_BYTES: usize = 128;

/// 按邮箱和 scope 查到的凭证，连同所属主体
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub principal: Principal,
    pub password_hash: HashedSecret,
}

/// 一次原子写入的新账户
///
/// 没有 `password_hash` 的账户不能登录，没有 `verification` 的账户不发验证链接。
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub principal: Principal,
    pub password_hash: Option<HashedSecret>,
    pub verification: Option<LinkDigest>,
}

/// 密码基本约束
pub fn validate_password(plaintext: &str) -> AppResult<()> {
    if plaintext.is_empty() {
        return Err(AppError::validation("password must not be empty"));
    }
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::validation(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_bounds() {
        assert!(validate_password("").is_err());
        assert!(validate_password("x").is_ok());
        assert!(validate_password(&"a".repeat(MAX_PASSWORD_BYTES)).is_ok());
        assert!(validate_password(&"a".repeat(MAX_PASSWORD_BYTES + 1)).is_err());
    }

    #[test]
    fn test_limit_counts_bytes_not_chars() {
        // 每个字符 3 字节
        let password = "密".repeat(43);
        assert!(matches!(validate_password(&password), Err(AppError::Validation(_))));
    }
}
