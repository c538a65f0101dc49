//! 验证链接投递

use std::sync::Arc;

use async_trait::async_trait;
use warden_adapter_email::{EmailSender, EmailTemplate};
use warden_errors::AppResult;

use crate::domain::{Email, VerificationLink, VerificationNotifier};

/// 拼出完整的验证地址
pub fn verify_url(base: &str, link: &VerificationLink) -> String {
    format!("{}/{}", base.trim_end_matches('/'), link.as_str())
}

/// 只写日志，不真正投递
///
/// `reveal_links` 为 false（生产环境）时链接不进日志。
#[derive(Debug, Clone)]
pub struct LoggingNotifier {
    verify_url: String,
    reveal_links: bool,
}

impl LoggingNotifier {
    pub fn new(verify_url: impl Into<String>, reveal_links: bool) -> Self {
        Self {
            verify_url: verify_url.into(),
            reveal_links,
        }
    }

    fn describe(&self, link: &VerificationLink) -> Option<String> {
        self.reveal_links.then(|| verify_url(&self.verify_url, link))
    }
}

#[async_trait]
impl VerificationNotifier for LoggingNotifier {
    async fn send_verification(&self, email: &Email, link: &VerificationLink) -> AppResult<()> {
        match self.describe(link) {
            Some(url) => tracing::info!(email = %email, verify_url = %url, "Verification link ready"),
            None => tracing::info!(email = %email, "Verification link ready for delivery"),
        }
        Ok(())
    }
}

/// 通过 SMTP 发送验证邮件
pub struct SmtpNotifier {
    sender: Arc<dyn EmailSender>,
    template: EmailTemplate,
    verify_url: String,
}

impl SmtpNotifier {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        template: EmailTemplate,
        verify_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            template,
            verify_url: verify_url.into(),
        }
    }
}

#[async_trait]
impl VerificationNotifier for SmtpNotifier {
    async fn send_verification(&self, email: &Email, link: &VerificationLink) -> AppResult<()> {
        let rendered = self
            .template
            .render_verification(email.as_str(), &verify_url(&self.verify_url, link))?;

        self.sender
            .send_html_email(email.as_str(), &rendered.subject, &rendered.html, &rendered.text)
            .await
    }
}
