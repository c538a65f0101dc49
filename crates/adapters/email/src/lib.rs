//! Email 适配器
//!
//! SMTP 发送（lettre）与验证邮件模板（tera）。

mod client;
mod template;

use async_trait::async_trait;
use warden_errors::AppResult;

pub use client::{EmailClient, EmailMessage};
pub use template::{EmailTemplate, RenderedEmail};
pub use warden_config::EmailConfig;

/// 邮件发送接口
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// 发送 HTML 邮件，附纯文本备用
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> AppResult<()>;
}
