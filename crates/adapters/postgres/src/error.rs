//! sqlx 错误映射

use warden_errors::AppError;

/// PostgreSQL unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// 是否为唯一约束冲突
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// 映射为 `AppError::Database`，附带操作上下文
pub fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::database(format!("{}: {}", context, e))
}
