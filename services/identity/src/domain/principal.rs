//! 主体（账户）实体

use warden_common::{Scope, UserId};

use super::Email;

/// 主体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub email: Email,
    pub scope: Scope,
    /// 邮箱验证完成前为 false
    pub active: bool,
}

impl Principal {
    /// 新建待验证主体
    pub fn pending(email: Email, scope: Scope) -> Self {
        Self {
            id: UserId::new(),
            email,
            scope,
            active: false,
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }
}

/// 主体的可变更字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalUpdate {
    pub email: Option<String>,
    pub scope: Option<Scope>,
}

impl PrincipalUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.scope.is_none()
    }
}
