//! warden-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 邮箱或密码错误。刻意不区分"邮箱不存在"，防止账户枚举
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Token is missing required claims")]
    IncompleteToken,

    #[error("Token signature is invalid: {0}")]
    SignatureInvalid(String),

    #[error("Token has expired")]
    Expired,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Account already exists")]
    DuplicateAccount,

    #[error("This verification link is expired")]
    LinkExpired,

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn signature_invalid(msg: impl Into<String>) -> Self {
        Self::SignatureInvalid(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn hashing(msg: impl Into<String>) -> Self {
        Self::HashingError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials => 401,
            Self::IncompleteToken => 401,
            Self::SignatureInvalid(_) => 401,
            Self::Expired => 401,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::DuplicateAccount => 409,
            Self::LinkExpired => 409,
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::HashingError(_) => 500,
            Self::Database(_) => 500,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// 是否为基础设施错误（细节不能暴露给客户端）
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::HashingError(_) | Self::Database(_) | Self::Config(_) | Self::Internal(_)
        )
    }

    /// 用于指标标签的稳定名称
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::IncompleteToken => "incomplete_token",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::Expired => "expired",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::DuplicateAccount => "duplicate_account",
            Self::LinkExpired => "link_expired",
            Self::HashingError(_) => "hashing_error",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// 转换为 Problem Details
    ///
    /// 基础设施错误只返回通用描述，原始错误留在日志里。
    pub fn to_problem_details(&self) -> ProblemDetails {
        let detail = if self.is_infrastructure() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        ProblemDetails {
            r#type: format!("https://api.warden.dev/problems/{}", self.kind().replace('_', "-")),
            title: self.problem_title().to_string(),
            status: self.status_code(),
            detail,
            instance: None,
        }
    }

    fn problem_title(&self) -> &'static str {
        match self.status_code() {
            400 => "Validation Error",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Resource Not Found",
            409 => "Conflict",
            _ => "Internal Server Error",
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidCredentials.status_code(), 401);
        assert_eq!(AppError::IncompleteToken.status_code(), 401);
        assert_eq!(AppError::Expired.status_code(), 401);
        assert_eq!(AppError::forbidden("nope").status_code(), 403);
        assert_eq!(AppError::DuplicateAccount.status_code(), 409);
        assert_eq!(AppError::LinkExpired.status_code(), 409);
        assert_eq!(AppError::hashing("entropy").status_code(), 500);
    }

    #[test]
    fn test_infrastructure_detail_is_redacted() {
        let err = AppError::database("connection refused to 10.0.0.3:5432");
        let problem = err.to_problem_details();
        assert_eq!(problem.status, 500);
        assert!(!problem.detail.contains("10.0.0.3"));
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let problem = AppError::InvalidCredentials.to_problem_details();
        assert_eq!(problem.detail, "Incorrect email or password");
        assert_eq!(problem.r#type, "https://api.warden.dev/problems/invalid-credentials");
    }

    #[test]
    fn test_problem_details_skips_empty_instance() {
        let json = serde_json::to_value(AppError::LinkExpired.to_problem_details()).unwrap();
        assert!(json.get("instance").is_none());
        assert_eq!(json["status"], 409);
    }
}
