//! warden-config - 配置加载库
//!
//! 加载顺序（后者覆盖前者）：
//! 1. `{config_dir}/default.toml`
//! 2. `{config_dir}/{APP_ENV}.toml`
//! 3. `WARDEN_` 前缀的环境变量，`__` 分隔层级，例如 `WARDEN_JWT__SECRET`

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;
use warden_common::Scope;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// 签名密钥，进程启动时加载一次
    pub secret: Secret<String>,
    /// 签名算法，仅支持 HMAC 系列
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// token 有效期（秒）
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

/// 认证配置
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// 启用的 scope，未知名称在反序列化时即失败
    #[serde(default = "default_scopes")]
    pub scopes: Vec<Scope>,
}

fn default_scopes() -> Vec<Scope> {
    Scope::ALL.to_vec()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
        }
    }
}

impl AuthConfig {
    pub fn is_enabled(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

/// 密码哈希参数（Argon2id）
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 生产环境输出 JSON 日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// 验证邮件投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// 只写日志，非生产环境会把链接写进日志
    #[default]
    Log,
    Smtp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub kind: NotifierKind,
    /// 验证链接前缀，明文 hash 拼在后面
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
}

fn default_verify_url() -> String {
    "http://localhost:8080/users/verify".to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::default(),
            verify_url: default_verify_url(),
        }
    }
}

/// SMTP 配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// 为空时不做 SMTP 认证
    #[serde(default)]
    pub username: String,
    #[serde(default = "empty_secret")]
    pub password: Secret<String>,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_smtp_port() -> u16 {
    587
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_from_name() -> String {
    "Warden".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// 启动时写入的管理员账户，已存在则跳过
///
/// `password` 与 `password_hash` 二选一。
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdminConfig {
    pub email: String,
    #[serde(default)]
    pub password: Option<Secret<String>>,
    /// 预先计算的 Argon2id PHC 字符串或 bcrypt 哈希
    #[serde(default)]
    pub password_hash: Option<String>,
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    pub email: Option<EmailConfig>,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

fn default_app_name() -> String {
    "warden".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("WARDEN_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// 启动期校验，失败即拒绝启动
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("jwt.secret must not be empty".into()));
        }
        if self.jwt.expires_in <= 0 {
            return Err(ConfigError::Invalid("jwt.expires_in must be positive".into()));
        }
        if self.auth.scopes.is_empty() {
            return Err(ConfigError::Invalid("auth.scopes must enable at least one scope".into()));
        }
        if self.storage.backend == StorageBackend::Postgres && self.database.is_none() {
            return Err(ConfigError::Invalid(
                "database section is required for the postgres backend".into(),
            ));
        }
        if self.notifier.kind == NotifierKind::Smtp && self.email.is_none() {
            return Err(ConfigError::Invalid(
                "email section is required for the smtp notifier".into(),
            ));
        }
        if let Some(admin) = &self.bootstrap_admin {
            if admin.password.is_some() == admin.password_hash.is_some() {
                return Err(ConfigError::Invalid(
                    "bootstrap_admin needs exactly one of password or password_hash".into(),
                ));
            }
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}
