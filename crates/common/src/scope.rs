//! 权限范围（Scope）
//!
//! 封闭集合：`user` 与 `admin`。`admin` 是 `user` 的超集。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 用户权限范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Admin,
}

impl Scope {
    /// 所有已知的 scope
    pub const ALL: [Scope; 2] = [Scope::User, Scope::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// 凭证查找时使用的逻辑分区名
    ///
    /// 每个 scope 对应独立的主体池，密码不能跨 scope 认证。
    pub fn partition(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Admin => "admins",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// 当前 scope 是否满足 `required`（admin 满足一切）
    pub fn satisfies(&self, required: Scope) -> bool {
        self.is_admin() || *self == required
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知 scope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown scope: {0}")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}
