//! 内存存储
//!
//! 单个写锁内完成多表写入，语义与 PostgreSQL 事务一致。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_auth_core::HashedSecret;
use warden_common::{Scope, UserId};
use warden_errors::{AppError, AppResult};

use crate::domain::{
    CredentialRepository, LinkDigest, NewAccount, Principal, PrincipalRepository,
    StoredCredential, VerificationRepository,
};

#[derive(Debug, Default)]
struct Tables {
    principals: HashMap<UserId, Principal>,
    credentials: HashMap<UserId, HashedSecret>,
    /// digest -> owner
    verifications: HashMap<LinkDigest, UserId>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<&UserId>) -> bool {
        self.principals
            .values()
            .any(|p| p.email.as_str() == email && Some(&p.id) != except)
    }
}

/// 内存存储，同时实现三个 repository
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<Principal>> {
        Ok(self.tables.read().await.principals.get(id).cloned())
    }

    async fn create(&self, account: &NewAccount) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let principal = &account.principal;

        if tables.email_taken(principal.email.as_str(), None) {
            return Err(AppError::DuplicateAccount);
        }
        if tables.principals.contains_key(&principal.id) {
            return Err(AppError::internal("principal id collision"));
        }

        tables.principals.insert(principal.id, principal.clone());
        if let Some(hash) = &account.password_hash {
            tables.credentials.insert(principal.id, hash.clone());
        }
        if let Some(digest) = &account.verification {
            tables.verifications.insert(digest.clone(), principal.id);
        }
        Ok(())
    }

    async fn update(&self, principal: &Principal) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        if tables.email_taken(principal.email.as_str(), Some(&principal.id)) {
            return Err(AppError::DuplicateAccount);
        }
        match tables.principals.get_mut(&principal.id) {
            Some(stored) => {
                stored.email = principal.email.clone();
                stored.scope = principal.scope;
                Ok(())
            }
            None => Err(AppError::not_found(format!("principal {}", principal.id))),
        }
    }

    async fn delete(&self, id: &UserId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.principals.remove(id).is_none() {
            return Ok(false);
        }
        tables.credentials.remove(id);
        tables.verifications.retain(|_, owner| owner != id);
        Ok(true)
    }
}

#[async_trait]
impl CredentialRepository for InMemoryStore {
    async fn find_by_email_and_scope(
        &self,
        email: &str,
        scope: Scope,
    ) -> AppResult<Option<StoredCredential>> {
        let tables = self.tables.read().await;

        let found = tables
            .principals
            .values()
            .filter(|p| p.scope.partition() == scope.partition())
            .find(|p| p.email.as_str() == email)
            .and_then(|p| {
                tables.credentials.get(&p.id).map(|hash| StoredCredential {
                    principal: p.clone(),
                    password_hash: hash.clone(),
                })
            });
        Ok(found)
    }

    async fn replace_hash(&self, owner_id: &UserId, hash: &HashedSecret) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        match tables.credentials.get_mut(owner_id) {
            Some(stored) => {
                *stored = hash.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!("credential of {}", owner_id))),
        }
    }
}

#[async_trait]
impl VerificationRepository for InMemoryStore {
    async fn insert(&self, owner_id: &UserId, digest: &LinkDigest) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.principals.contains_key(owner_id) {
            return Err(AppError::not_found(format!("principal {}", owner_id)));
        }
        tables.verifications.insert(digest.clone(), *owner_id);
        Ok(())
    }

    async fn find_owner(&self, digest: &LinkDigest) -> AppResult<Option<UserId>> {
        Ok(self.tables.read().await.verifications.get(digest).copied())
    }

    async fn consume_and_activate(&self, owner_id: &UserId) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        if !tables.principals.contains_key(owner_id) {
            return Ok(false);
        }
        let before = tables.verifications.len();
        tables.verifications.retain(|_, owner| owner != owner_id);
        if tables.verifications.len() == before {
            return Ok(false);
        }

        if let Some(principal) = tables.principals.get_mut(owner_id) {
            principal.activate();
        }
        Ok(true)
    }
}
