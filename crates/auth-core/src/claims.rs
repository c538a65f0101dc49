//! JWT Claims

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use warden_common::{Scope, UserId};
use warden_errors::{AppError, AppResult};

/// token 所代表的主体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub id: UserId,
    pub email: String,
    pub scope: Scope,
}

/// 签发时写入的 claims
#[derive(Debug, Serialize)]
pub(crate) struct SessionClaims<'a> {
    pub id: String,
    pub email: &'a str,
    pub scope: &'static str,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// 未经签名校验的 claims
///
/// 只能用于低信任度的信息提取，不能据此授权。
/// 类型不符的字段按缺失处理。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub iat: Option<i64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub exp: Option<i64>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_i64())
}

impl UnverifiedClaims {
    /// 结构完整性检查：`id`、`email`、`scope` 必须存在且非空
    ///
    /// 与签名状态无关。`id` 必须是 UUID，`scope` 必须属于封闭集合。
    pub fn verify(&self) -> AppResult<TokenSubject> {
        let id = non_empty(&self.id).ok_or(AppError::IncompleteToken)?;
        let email = non_empty(&self.email).ok_or(AppError::IncompleteToken)?;
        let scope = non_empty(&self.scope).ok_or(AppError::IncompleteToken)?;

        let id = UserId::from_string(id).map_err(|_| AppError::IncompleteToken)?;
        let scope = scope.parse::<Scope>().map_err(|_| AppError::IncompleteToken)?;

        Ok(TokenSubject {
            id,
            email: email.to_string(),
            scope,
        })
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 已通过签名、过期时间和完整性校验的 claims
///
/// 只有 [`crate::TokenService::authenticate`] 能构造。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    subject: TokenSubject,
    issued_at: i64,
    expires_at: i64,
}

impl VerifiedClaims {
    pub(crate) fn new(subject: TokenSubject, issued_at: i64, expires_at: i64) -> Self {
        Self {
            subject,
            issued_at,
            expires_at,
        }
    }

    pub fn subject(&self) -> &TokenSubject {
        &self.subject
    }

    pub fn into_subject(self) -> TokenSubject {
        self.subject
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}
