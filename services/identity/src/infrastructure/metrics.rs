//! 业务指标记录

use metrics::counter;
use warden_common::Scope;

/// 登录结果
pub fn record_login(scope: Scope, outcome: &'static str) {
    let labels = [("scope", scope.as_str()), ("outcome", outcome)];
    counter!("auth_login_total", &labels).increment(1);
}

/// 受保护请求被拒绝
pub fn record_authorize_rejected(reason: &'static str) {
    counter!("auth_authorize_rejected_total", "reason" => reason).increment(1);
}

pub fn record_account_registered() {
    counter!("accounts_registered_total").increment(1);
}

pub fn record_account_verified() {
    counter!("accounts_verified_total").increment(1);
}
