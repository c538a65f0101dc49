//! Email 值对象

use std::fmt;

use email_address::EmailAddress;
use warden_errors::AppError;

/// Email 值对象
///
/// 写入时统一 trim + 小写，查找时按原样精确匹配。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// 规范化并校验格式
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let normalized = raw.trim().to_lowercase();
        if !EmailAddress::is_valid(&normalized) {
            return Err(EmailError::InvalidFormat(raw.trim().to_string()));
        }
        Ok(Self(normalized))
    }

    /// 从存储中读取的值，已在写入时规范化
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Email 错误
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

impl From<EmailError> for AppError {
    fn from(error: EmailError) -> Self {
        AppError::validation(error.to_string())
    }
}
