//! 认证中间件

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use warden_common::Scope;
use warden_errors::AppError;

use super::{ApiError, AppState};
use crate::application::AuthorizedPrincipal;

/// 当前请求的已授权主体
///
/// 必须在 auth_middleware 之后使用
pub struct CurrentPrincipal(pub AuthorizedPrincipal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizedPrincipal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| ApiError(AppError::unauthorized("missing bearer token")))
    }
}

/// 对受保护路由运行授权状态机（要求 `user` scope，admin 同样满足）
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let principal = state.gateway.authorize(auth_header, Scope::User)?;
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
