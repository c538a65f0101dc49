//! 凭证查找

use std::sync::Arc;

use tracing::debug;
use warden_auth_core::HashedSecret;
use warden_common::{Scope, UserId};
use warden_errors::AppResult;

use crate::domain::{CredentialRepository, StoredCredential};

/// 按邮箱和 scope 查找可用于登录的凭证
///
/// 主体不存在、未激活、没有凭证三种情况对调用方都是 `None`。
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn CredentialRepository>,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn CredentialRepository>) -> Self {
        Self { repo }
    }

    pub async fn find_by_email_and_scope(
        &self,
        email: &str,
        scope: Scope,
    ) -> AppResult<Option<StoredCredential>> {
        match self.repo.find_by_email_and_scope(email, scope).await? {
            Some(credential) if !credential.principal.active => {
                debug!(
                    user_id = %credential.principal.id,
                    partition = scope.partition(),
                    "Credential belongs to an inactive principal"
                );
                Ok(None)
            }
            found => Ok(found),
        }
    }

    pub async fn replace_hash(&self, owner_id: &UserId, hash: &HashedSecret) -> AppResult<()> {
        self.repo.replace_hash(owner_id, hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Email, MockCredentialRepository, Principal};

    fn credential(active: bool) -> StoredCredential {
        let mut principal = Principal::pending(Email::parse("a@b.com").unwrap(), Scope::User);
        principal.active = active;
        StoredCredential {
            principal,
            password_hash: HashedSecret::from_hash("$argon2id$stub"),
        }
    }

    fn store_returning(found: Option<StoredCredential>) -> CredentialStore {
        let mut repo = MockCredentialRepository::new();
        repo.expect_find_by_email_and_scope()
            .times(1)
            .returning(move |_, _| Ok(found.clone()));
        CredentialStore::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_active_principal_is_returned() {
        let store = store_returning(Some(credential(true)));
        assert!(store.find_by_email_and_scope("a@b.com", Scope::User).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_inactive_principal_is_hidden() {
        let store = store_returning(Some(credential(false)));
        assert!(store.find_by_email_and_scope("a@b.com", Scope::User).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_principal() {
        let store = store_returning(None);
        assert!(store.find_by_email_and_scope("a@b.com", Scope::User).await.unwrap().is_none());
    }
}
