//! 认证网关
//!
//! 请求授权状态机：
//! `Unauthenticated -> TokenExtracted -> ClaimsValidated -> Authorized`，任一步失败即 `Rejected`。

use std::sync::Arc;

use tracing::{debug, info, warn};
use warden_auth_core::{
    PasswordHasher, TokenService, TokenSubject, TtlPolicy, VerifiedClaims, strip_bearer,
};
use warden_common::{Scope, UserId};
use warden_errors::{AppError, AppResult};

use super::CredentialStore;
use crate::domain::PrincipalUpdate;
use crate::infrastructure::metrics;

/// 已授权主体
///
/// 只能从 [`VerifiedClaims`] 构造，下游 handler 据此做权限判断。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedPrincipal {
    id: UserId,
    email: String,
    scope: Scope,
}

impl AuthorizedPrincipal {
    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_admin(&self) -> bool {
        self.scope.is_admin()
    }
}

impl From<VerifiedClaims> for AuthorizedPrincipal {
    fn from(claims: VerifiedClaims) -> Self {
        let subject = claims.into_subject();
        Self {
            id: subject.id,
            email: subject.email,
            scope: subject.scope,
        }
    }
}

/// 登录签发的 token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub scope: Scope,
    pub expires_in: i64,
}

pub struct AuthGateway {
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    credentials: CredentialStore,
    enabled_scopes: Vec<Scope>,
}

impl AuthGateway {
    pub fn new(
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
        credentials: CredentialStore,
        enabled_scopes: Vec<Scope>,
    ) -> Self {
        Self {
            tokens,
            hasher,
            credentials,
            enabled_scopes,
        }
    }

    pub fn is_scope_enabled(&self, scope: Scope) -> bool {
        self.enabled_scopes.contains(&scope)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// 密码登录
    ///
    /// 账户不存在、未激活、无凭证、密码错误一律返回 `InvalidCredentials`。
    pub async fn login(&self, scope: Scope, email: &str, password: &str) -> AppResult<IssuedToken> {
        if !self.is_scope_enabled(scope) {
            return Err(AppError::not_found(format!("scope {scope} is not enabled")));
        }

        let Some(credential) = self.credentials.find_by_email_and_scope(email, scope).await? else {
            self.hasher.spawn_burn(password.to_string()).await;
            return Err(self.reject_login(scope));
        };

        let legacy = credential.password_hash.is_legacy_bcrypt();
        let matched = self
            .hasher
            .spawn_verify(password.to_string(), credential.password_hash)
            .await;
        if !matched {
            return Err(self.reject_login(scope));
        }

        let principal = credential.principal;
        if legacy {
            self.upgrade_legacy_hash(&principal.id, password).await;
        }
        let subject = TokenSubject {
            id: principal.id,
            email: principal.email.as_str().to_string(),
            scope: principal.scope,
        };
        let token = self.tokens.issue(&subject, TtlPolicy::Default)?;

        metrics::record_login(scope, "success");
        info!(user_id = %principal.id, scope = %principal.scope, "Login succeeded");

        Ok(IssuedToken {
            token,
            scope: principal.scope,
            expires_in: self.tokens.expires_in(),
        })
    }

    /// 登录成功后把 bcrypt 哈希换成 Argon2id，失败不影响本次登录
    async fn upgrade_legacy_hash(&self, owner_id: &UserId, password: &str) {
        let upgraded = match self.hasher.spawn_hash(password.to_string()).await {
            Ok(hash) => self.credentials.replace_hash(owner_id, &hash).await,
            Err(e) => Err(e),
        };
        match upgraded {
            Ok(()) => info!(user_id = %owner_id, "Legacy bcrypt hash upgraded to Argon2id"),
            Err(e) => warn!(user_id = %owner_id, error = %e, "Failed to upgrade legacy hash"),
        }
    }

    fn reject_login(&self, scope: Scope) -> AppError {
        metrics::record_login(scope, "rejected");
        warn!(scope = %scope, "Login rejected");
        AppError::InvalidCredentials
    }

    /// 校验 Authorization 头并检查 scope（admin 满足一切 scope）
    pub fn authorize(&self, header: Option<&str>, required: Scope) -> AppResult<AuthorizedPrincipal> {
        let result = self.run_authorization(header, required);
        if let Err(e) = &result {
            metrics::record_authorize_rejected(e.kind());
            warn!(reason = e.kind(), required = %required, "Request authorization rejected");
        }
        result
    }

    fn run_authorization(
        &self,
        header: Option<&str>,
        required: Scope,
    ) -> AppResult<AuthorizedPrincipal> {
        let raw = header
            .map(strip_bearer)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
        let claims = self
            .tokens
            .decode(raw)
            .ok_or_else(|| AppError::unauthorized("malformed token"))?;
        debug!("Token extracted");

        self.tokens.verify(&claims)?;
        debug!("Token claims complete");

        let verified = self.tokens.authenticate(raw)?;
        if !verified.subject().scope.satisfies(required) {
            return Err(AppError::unauthorized(format!("scope {required} required")));
        }

        let principal = AuthorizedPrincipal::from(verified);
        debug!(user_id = %principal.id, scope = %principal.scope, "Request authorized");
        Ok(principal)
    }

    /// 非 admin 只能操作自己的账户
    pub fn authorize_target(principal: &AuthorizedPrincipal, target: &UserId) -> AppResult<()> {
        if principal.is_admin() || principal.id() == target {
            Ok(())
        } else {
            Err(AppError::forbidden("unprivileged users may only act on own id"))
        }
    }

    /// 非 admin 提交的 scope 变更被静默丢弃
    pub fn filter_update(principal: &AuthorizedPrincipal, mut update: PrincipalUpdate) -> PrincipalUpdate {
        if !principal.is_admin() && update.scope.take().is_some() {
            debug!(user_id = %principal.id, "Dropped scope change from non-admin");
        }
        update
    }
}
