//! Warden Identity Service Library
//!
//! 分层结构：
//! - `domain`: 主体、凭证、验证链接、repository trait
//! - `application`: 凭证查找、验证链接、认证网关、账户服务
//! - `infrastructure`: PostgreSQL / 内存存储、通知、指标
//! - `api`: axum 路由与认证中间件

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
