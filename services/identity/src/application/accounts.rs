//! 账户服务
//!
//! 注册状态机：`Pending -> EmailUnverified -> Active`

use std::sync::Arc;

use tracing::{info, warn};
use warden_auth_core::{HashedSecret, PasswordHasher};
use warden_common::{Scope, UserId};
use warden_errors::{AppError, AppResult};

use super::{AuthGateway, AuthorizedPrincipal, VerificationLinkStore};
use crate::domain::{
    Email, NewAccount, Principal, PrincipalRepository, PrincipalUpdate, VerificationLink,
    VerificationNotifier, validate_password,
};
use crate::infrastructure::metrics;

/// 开通账户时的登录凭证
#[derive(Clone)]
pub enum ProvisionCredential {
    Password(String),
    /// 预先计算的哈希，只接受可校验的格式
    Hash(HashedSecret),
}

/// 管理员开通账户
#[derive(Clone)]
pub struct ProvisionAccount {
    pub email: String,
    pub scope: Scope,
    /// 为空时账户不能用密码登录
    pub credential: Option<ProvisionCredential>,
    /// 为 true 时跳过邮箱验证
    pub active: bool,
}

pub struct AccountService {
    principals: Arc<dyn PrincipalRepository>,
    links: VerificationLinkStore,
    hasher: PasswordHasher,
    notifier: Arc<dyn VerificationNotifier>,
}

impl AccountService {
    pub fn new(
        principals: Arc<dyn PrincipalRepository>,
        links: VerificationLinkStore,
        hasher: PasswordHasher,
        notifier: Arc<dyn VerificationNotifier>,
    ) -> Self {
        Self {
            principals,
            links,
            hasher,
            notifier,
        }
    }

    /// 自助注册，账户创建后处于未激活状态
    pub async fn register(&self, email: &str, password: &str) -> AppResult<Principal> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = self.hasher.spawn_hash(password.to_string()).await?;
        let link = VerificationLink::generate()?;
        let principal = Principal::pending(email, Scope::User);

        self.create(NewAccount {
            principal: principal.clone(),
            password_hash: Some(password_hash),
            verification: Some(link.digest()),
        })
        .await?;

        metrics::record_account_registered();
        info!(user_id = %principal.id, "Account registered, awaiting verification");

        self.notify(principal.email.clone(), link);
        Ok(principal)
    }

    /// 管理员开通账户
    pub async fn provision(&self, request: ProvisionAccount) -> AppResult<Principal> {
        let email = Email::parse(&request.email)?;
        let password_hash = match request.credential {
            Some(ProvisionCredential::Password(password)) => {
                validate_password(&password)?;
                Some(self.hasher.spawn_hash(password).await?)
            }
            Some(ProvisionCredential::Hash(hash)) => {
                if !hash.is_recognized() {
                    return Err(AppError::validation("unsupported password hash format"));
                }
                Some(hash)
            }
            None => None,
        };

        let mut principal = Principal::pending(email, request.scope);
        let link = if request.active {
            principal.activate();
            None
        } else {
            Some(VerificationLink::generate()?)
        };

        self.create(NewAccount {
            principal: principal.clone(),
            password_hash,
            verification: link.as_ref().map(VerificationLink::digest),
        })
        .await?;

        info!(
            user_id = %principal.id,
            scope = %principal.scope,
            active = principal.active,
            "Account provisioned"
        );

        if let Some(link) = link {
            self.notify(principal.email.clone(), link);
        }
        Ok(principal)
    }

    /// 消费验证链接并激活账户
    pub async fn verify(&self, hash: &str) -> AppResult<Principal> {
        let owner = self.links.resolve(hash).await?;
        self.links.consume(&owner).await?;

        let principal = self
            .principals
            .find_by_id(&owner)
            .await?
            .ok_or_else(|| AppError::not_found(format!("principal {owner}")))?;

        metrics::record_account_verified();
        info!(user_id = %principal.id, "Account activated");
        Ok(principal)
    }

    /// 为未激活账户重新发送验证链接
    pub async fn resend_verification(
        &self,
        actor: &AuthorizedPrincipal,
        target: UserId,
    ) -> AppResult<()> {
        AuthGateway::authorize_target(actor, &target)?;

        let principal = self.find(&target).await?;
        if principal.active {
            return Err(AppError::validation("account is already active"));
        }

        let link = self.links.issue(&principal.id).await?;
        info!(user_id = %principal.id, "Verification link reissued");
        self.notify(principal.email, link);
        Ok(())
    }

    /// 修改账户；非 admin 只能改自己，且不能改 scope
    pub async fn update(
        &self,
        actor: &AuthorizedPrincipal,
        target: UserId,
        update: PrincipalUpdate,
    ) -> AppResult<Principal> {
        AuthGateway::authorize_target(actor, &target)?;
        let update = AuthGateway::filter_update(actor, update);

        let mut principal = self.find(&target).await?;
        if update.is_empty() {
            return Ok(principal);
        }
        if let Some(email) = update.email {
            principal.email = Email::parse(&email)?;
        }
        if let Some(scope) = update.scope {
            principal.scope = scope;
        }

        self.principals.update(&principal).await?;
        info!(user_id = %principal.id, actor = %actor.id(), "Account updated");
        Ok(principal)
    }

    /// 删除账户；非 admin 只能删自己
    pub async fn delete(&self, actor: &AuthorizedPrincipal, target: UserId) -> AppResult<()> {
        AuthGateway::authorize_target(actor, &target)?;

        if !self.principals.delete(&target).await? {
            return Err(AppError::not_found(format!("principal {target}")));
        }
        info!(user_id = %target, actor = %actor.id(), "Account deleted");
        Ok(())
    }

    async fn find(&self, id: &UserId) -> AppResult<Principal> {
        self.principals
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("principal {id}")))
    }

    async fn create(&self, account: NewAccount) -> AppResult<()> {
        self.principals.create(&account).await.inspect_err(|e| {
            if matches!(e, AppError::DuplicateAccount) {
                warn!(email = %account.principal.email, "Account already exists");
            }
        })
    }

    /// 投递失败只记日志，不影响调用方
    fn notify(&self, email: Email, link: VerificationLink) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send_verification(&email, &link).await {
                warn!(email = %email, error = %e, "Verification notification failed");
            }
        });
    }
}
