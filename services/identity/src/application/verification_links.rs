//! 验证链接存储

use std::sync::Arc;

use warden_common::UserId;
use warden_errors::{AppError, AppResult};

use crate::domain::{LinkDigest, VerificationLink, VerificationRepository};

/// 一次性验证链接
///
/// 只持久化摘要；明文只在 `issue` 的返回值中出现一次。
#[derive(Clone)]
pub struct VerificationLinkStore {
    repo: Arc<dyn VerificationRepository>,
}

impl VerificationLinkStore {
    pub fn new(repo: Arc<dyn VerificationRepository>) -> Self {
        Self { repo }
    }

    /// 为已存在的主体生成并保存新链接
    pub async fn issue(&self, owner_id: &UserId) -> AppResult<VerificationLink> {
        let link = VerificationLink::generate()?;
        self.repo.insert(owner_id, &link.digest()).await?;
        Ok(link)
    }

    /// 明文 hash -> 主体 ID，未知或已消费返回 `LinkExpired`
    pub async fn resolve(&self, hash: &str) -> AppResult<UserId> {
        self.repo
            .find_owner(&LinkDigest::of(hash))
            .await?
            .ok_or(AppError::LinkExpired)
    }

    /// 删除 owner 的全部链接并激活主体
    pub async fn consume(&self, owner_id: &UserId) -> AppResult<()> {
        if self.repo.consume_and_activate(owner_id).await? {
            Ok(())
        } else {
            Err(AppError::LinkExpired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MockVerificationRepository;

    #[tokio::test]
    async fn test_issue_stores_digest_not_plaintext() {
        let owner = UserId::new();
        let mut repo = MockVerificationRepository::new();
        repo.expect_insert()
            .times(1)
            .withf(move |id, digest| *id == owner && digest.as_str().len() == 64)
            .returning(|_, _| Ok(()));

        let store = VerificationLinkStore::new(Arc::new(repo));
        let link = store.issue(&owner).await.unwrap();
        assert_eq!(link.as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_resolve_hashes_input() {
        let owner = UserId::new();
        let link = VerificationLink::generate().unwrap();
        let expected = link.digest();

        let mut repo = MockVerificationRepository::new();
        repo.expect_find_owner()
            .returning(move |digest| Ok((*digest == expected).then_some(owner)));

        let store = VerificationLinkStore::new(Arc::new(repo));
        assert_eq!(store.resolve(link.as_str()).await.unwrap(), owner);
        assert!(matches!(store.resolve("unknown").await, Err(AppError::LinkExpired)));
    }

    #[tokio::test]
    async fn test_consume_lost_race_is_link_expired() {
        let mut repo = MockVerificationRepository::new();
        repo.expect_consume_and_activate().returning(|_| Ok(false));

        let store = VerificationLinkStore::new(Arc::new(repo));
        assert!(matches!(store.consume(&UserId::new()).await, Err(AppError::LinkExpired)));
    }
}
