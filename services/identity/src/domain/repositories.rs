//! Repository traits

use async_trait::async_trait;
use warden_auth_core::HashedSecret;
use warden_common::{Scope, UserId};
use warden_errors::AppResult;

use super::{LinkDigest, NewAccount, Principal, StoredCredential};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<Principal>>;

    /// 原子写入主体、凭证和验证 token，邮箱冲突返回 `DuplicateAccount`
    async fn create(&self, account: &NewAccount) -> AppResult<()>;

    /// 更新邮箱和 scope，邮箱冲突返回 `DuplicateAccount`
    async fn update(&self, principal: &Principal) -> AppResult<()>;

    /// 删除主体（级联删除凭证和验证 token），不存在时返回 false
    async fn delete(&self, id: &UserId) -> AppResult<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// 在 scope 对应的分区中按邮箱精确查找，不过滤未激活主体
    async fn find_by_email_and_scope(
        &self,
        email: &str,
        scope: Scope,
    ) -> AppResult<Option<StoredCredential>>;

    /// 替换主体的密码哈希，主体没有凭证时返回 `NotFound`
    async fn replace_hash(&self, owner_id: &UserId, hash: &HashedSecret) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationRepository: Send + Sync {
    async fn insert(&self, owner_id: &UserId, digest: &LinkDigest) -> AppResult<()>;

    async fn find_owner(&self, digest: &LinkDigest) -> AppResult<Option<UserId>>;

    /// 同一事务内删除 owner 的全部 token 并激活主体
    ///
    /// 没有删除任何行（已被消费）时回滚并返回 false。
    async fn consume_and_activate(&self, owner_id: &UserId) -> AppResult<bool>;
}
