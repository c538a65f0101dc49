//! 验证链接通知

use async_trait::async_trait;
use warden_errors::AppResult;

use super::{Email, VerificationLink};

/// 把验证链接送达用户
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationNotifier: Send + Sync {
    async fn send_verification(&self, email: &Email, link: &VerificationLink) -> AppResult<()>;
}
