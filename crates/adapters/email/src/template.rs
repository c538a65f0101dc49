//! 邮件模板

use tera::{Context, Tera};
use warden_errors::{AppError, AppResult};

const VERIFICATION_HTML: &str = include_str!("../templates/verification.html");
const VERIFICATION_TXT: &str = include_str!("../templates/verification.txt");

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// 邮件模板管理器
pub struct EmailTemplate {
    tera: Tera,
}

impl EmailTemplate {
    /// 内置模板
    pub fn builtin() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("verification.html", VERIFICATION_HTML),
            ("verification.txt", VERIFICATION_TXT),
        ])
        .map_err(|e| AppError::internal(format!("Failed to load email templates: {}", e)))?;

        Ok(Self { tera })
    }

    /// 渲染账户验证邮件
    pub fn render_verification(&self, email: &str, verify_link: &str) -> AppResult<RenderedEmail> {
        let mut context = Context::new();
        context.insert("email", email);
        context.insert("verify_link", verify_link);

        let html = self.render("verification.html", &context)?;
        let text = self.render("verification.txt", &context)?;

        Ok(RenderedEmail {
            subject: "Verify your account".to_string(),
            html,
            text,
        })
    }

    fn render(&self, name: &str, context: &Context) -> AppResult<String> {
        self.tera
            .render(name, context)
            .map_err(|e| AppError::internal(format!("Failed to render template {}: {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_verification() {
        let template = EmailTemplate::builtin().unwrap();
        let email = template
            .render_verification("a@b.com", "http://localhost/users/verify/abc123")
            .unwrap();

        assert!(email.html.contains("http://localhost/users/verify/abc123"));
        assert!(email.text.contains("http://localhost/users/verify/abc123"));
        assert!(email.text.contains("a@b.com"));
    }

    #[test]
    fn test_html_escapes_address() {
        let template = EmailTemplate::builtin().unwrap();
        let email = template.render_verification("<x>@b.com", "http://l/v/1").unwrap();
        assert!(!email.html.contains("<x>"));
    }
}
