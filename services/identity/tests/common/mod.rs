//! 集成测试公共设施

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::Secret;
use tokio::sync::mpsc;
use warden_auth_core::HashedSecret;
use warden_common::{Scope, UserId};
use warden_config::{
    AppConfig, AuthConfig, HashingConfig, JwtConfig, NotifierConfig, ServerConfig, StorageBackend,
    StorageConfig, TelemetryConfig,
};
use warden_errors::AppResult;
use warden_identity::api::AppState;
use warden_identity::bootstrap::{self, Repositories};
use warden_identity::domain::{
    Email, NewAccount, Principal, PrincipalRepository, VerificationLink, VerificationNotifier,
};
use warden_identity::infrastructure::persistence::InMemoryStore;

/// 旧系统种子数据中的管理员（密码 foobar）
pub const SEED_ADMIN_EMAIL: &str = "foo@bar.com";
pub const SEED_ADMIN_PASSWORD: &str = "foobar";
pub const SEED_ADMIN_HASH: &str = "$2a$10$jqtfUwulMw6xqGUA.IsjkuAooNkAjPT3FJ9rRiUoSTsUpNTD8McxC";

pub fn test_config() -> AppConfig {
    AppConfig {
        app_name: "warden-test".to_string(),
        app_env: "test".to_string(),
        database: None,
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret".to_string()),
            algorithm: "HS256".to_string(),
            expires_in: 3600,
        },
        auth: AuthConfig::default(),
        hashing: HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        server: ServerConfig::default(),
        telemetry: TelemetryConfig::default(),
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        notifier: NotifierConfig::default(),
        email: None,
        bootstrap_admin: None,
    }
}

/// 把验证链接转发到 channel，代替邮件
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<(String, String)>,
}

#[async_trait]
impl VerificationNotifier for ChannelNotifier {
    async fn send_verification(&self, email: &Email, link: &VerificationLink) -> AppResult<()> {
        let _ = self
            .tx
            .send((email.as_str().to_string(), link.as_str().to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub links: mpsc::UnboundedReceiver<(String, String)>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let (tx, links) = mpsc::unbounded_channel();
        let state = bootstrap::build_state(
            &config,
            Repositories::in_memory(store.clone()),
            Arc::new(ChannelNotifier { tx }),
            None,
        )
        .unwrap();

        Self { state, store, links }
    }

    /// 写入带 bcrypt 哈希的已激活管理员
    pub async fn seed_admin(&self) -> UserId {
        let mut principal = Principal::pending(Email::parse(SEED_ADMIN_EMAIL).unwrap(), Scope::Admin);
        principal.activate();
        let id = principal.id;

        self.store
            .create(&NewAccount {
                principal,
                password_hash: Some(HashedSecret::from_hash(SEED_ADMIN_HASH)),
                verification: None,
            })
            .await
            .unwrap();
        id
    }

    /// 等待下一封验证邮件，返回 (email, 明文 hash)
    pub async fn next_link(&mut self) -> (String, String) {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.links.recv())
            .await
            .expect("verification link was not sent")
            .expect("notifier channel closed")
    }
}
