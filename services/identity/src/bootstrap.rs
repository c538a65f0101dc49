//! 服务装配

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use tracing::info;
use warden_adapter_email::{EmailClient, EmailTemplate};
use warden_adapter_postgres::{PostgresConfig, check_connection, create_pool};
use warden_auth_core::{HashCost, HashedSecret, PasswordHasher, TokenService};
use warden_common::Scope;
use warden_config::{AppConfig, DatabaseConfig, NotifierKind, StorageBackend};
use warden_errors::{AppError, AppResult};

use crate::api::AppState;
use crate::application::{
    AccountService, AuthGateway, CredentialStore, ProvisionAccount, ProvisionCredential,
    VerificationLinkStore,
};
use crate::domain::{
    CredentialRepository, PrincipalRepository, VerificationNotifier, VerificationRepository,
};
use crate::infrastructure::notifier::{LoggingNotifier, SmtpNotifier};
use crate::infrastructure::persistence::{
    InMemoryStore, PostgresCredentialRepository, PostgresPrincipalRepository,
    PostgresVerificationRepository, apply_schema,
};

/// 三个 repository 的具体实现
#[derive(Clone)]
pub struct Repositories {
    pub principals: Arc<dyn PrincipalRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
    pub verifications: Arc<dyn VerificationRepository>,
}

impl Repositories {
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            principals: store.clone(),
            credentials: store.clone(),
            verifications: store,
        }
    }

    pub async fn postgres(database: &DatabaseConfig) -> AppResult<Self> {
        let pool = create_pool(&PostgresConfig::from(database)).await?;
        check_connection(&pool).await?;
        apply_schema(&pool).await?;

        Ok(Self {
            principals: Arc::new(PostgresPrincipalRepository::new(pool.clone())),
            credentials: Arc::new(PostgresCredentialRepository::new(pool.clone())),
            verifications: Arc::new(PostgresVerificationRepository::new(pool)),
        })
    }

    /// 按 `storage.backend` 选择实现
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on restart");
                Ok(Self::in_memory(Arc::new(InMemoryStore::new())))
            }
            StorageBackend::Postgres => {
                let database = config
                    .database
                    .as_ref()
                    .ok_or_else(|| AppError::config("database section is required"))?;
                Self::postgres(database).await
            }
        }
    }
}

/// 由配置构建 token 服务（密钥只在这里读取一次）
pub fn token_service(config: &AppConfig) -> AppResult<TokenService> {
    TokenService::new(
        config.jwt.secret.expose_secret(),
        &config.jwt.algorithm,
        config.jwt.expires_in,
    )
}

pub fn password_hasher(config: &AppConfig) -> AppResult<PasswordHasher> {
    PasswordHasher::new(HashCost {
        memory_kib: config.hashing.memory_kib,
        iterations: config.hashing.iterations,
        parallelism: config.hashing.parallelism,
    })
}

/// 按 `notifier.kind` 选择验证链接的投递方式
pub fn build_notifier(config: &AppConfig) -> AppResult<Arc<dyn VerificationNotifier>> {
    let verify_url = config.notifier.verify_url.clone();
    match config.notifier.kind {
        NotifierKind::Log => Ok(Arc::new(LoggingNotifier::new(
            verify_url,
            !config.is_production(),
        ))),
        NotifierKind::Smtp => {
            let email = config
                .email
                .clone()
                .ok_or_else(|| AppError::config("email section is required"))?;
            info!(smtp_host = %email.smtp_host, "Using SMTP notifier");
            Ok(Arc::new(SmtpNotifier::new(
                Arc::new(EmailClient::new(email)),
                EmailTemplate::builtin()?,
                verify_url,
            )))
        }
    }
}

/// 写入 `bootstrap_admin` 配置的管理员，邮箱已存在时跳过
pub async fn seed_admin(config: &AppConfig, accounts: &AccountService) -> AppResult<()> {
    let Some(admin) = &config.bootstrap_admin else {
        return Ok(());
    };

    let credential = match (&admin.password, &admin.password_hash) {
        (Some(password), _) => ProvisionCredential::Password(password.expose_secret().clone()),
        (None, Some(hash)) => ProvisionCredential::Hash(HashedSecret::from_hash(hash.clone())),
        (None, None) => {
            return Err(AppError::config(
                "bootstrap_admin needs a password or password_hash",
            ));
        }
    };

    let request = ProvisionAccount {
        email: admin.email.clone(),
        scope: Scope::Admin,
        credential: Some(credential),
        active: true,
    };
    match accounts.provision(request).await {
        Ok(principal) => {
            info!(user_id = %principal.id, "Bootstrap admin created");
            Ok(())
        }
        Err(AppError::DuplicateAccount) => {
            info!("Bootstrap admin already present");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// 组装路由状态
pub fn build_state(
    config: &AppConfig,
    repositories: Repositories,
    notifier: Arc<dyn VerificationNotifier>,
    metrics: Option<PrometheusHandle>,
) -> AppResult<AppState> {
    let tokens = Arc::new(token_service(config)?);
    let hasher = password_hasher(config)?;

    let gateway = AuthGateway::new(
        tokens,
        hasher.clone(),
        CredentialStore::new(repositories.credentials),
        config.auth.scopes.clone(),
    );
    let accounts = AccountService::new(
        repositories.principals,
        VerificationLinkStore::new(repositories.verifications),
        hasher,
        notifier,
    );

    Ok(AppState {
        gateway: Arc::new(gateway),
        accounts: Arc::new(accounts),
        metrics,
    })
}
