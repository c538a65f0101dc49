//! HTTP 路由

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use warden_common::{Scope, UserId};
use warden_errors::AppError;

use super::{ApiError, CurrentPrincipal, auth_middleware};
use crate::application::{AccountService, AuthGateway};
use crate::domain::{Principal, PrincipalUpdate};

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AuthGateway>,
    pub accounts: Arc<AccountService>,
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalResponse {
    pub id: String,
    pub email: String,
    pub scope: Scope,
    pub active: bool,
}

impl From<Principal> for PrincipalResponse {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            email: principal.email.as_str().to_string(),
            scope: principal.scope,
            active: principal.active,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/users/{user_id}", patch(update_user).delete(delete_user))
        .route("/users/{user_id}/verification", post(resend_verification))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/auth/{scope}", post(login))
        .route("/users", post(register))
        .route("/users/verify/{hash}", get(verify))
        .route("/metrics", get(render_metrics))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    UserId::from_string(raw)
        .map_err(|_| ApiError(AppError::validation(format!("invalid user id: {raw}"))))
}

async fn login(
    State(state): State<AppState>,
    Path(raw_scope): Path<String>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let scope = raw_scope
        .parse::<Scope>()
        .map_err(|_| AppError::not_found(format!("unknown scope {raw_scope}")))?;
    // 请求体不合法与密码错误返回同一个错误
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Login body rejected");
        AppError::InvalidCredentials
    })?;

    let issued = state.gateway.login(scope, &body.email, &body.password).await?;
    Ok(Json(TokenResponse {
        token: issued.token,
    }))
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PrincipalResponse>), ApiError> {
    let Json(body) = body.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let principal = state.accounts.register(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(principal.into())))
}

async fn verify(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let principal = state.accounts.verify(&hash).await?;
    Ok(Json(principal.into()))
}

async fn update_user(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<PrincipalResponse>, ApiError> {
    let target = parse_user_id(&user_id)?;
    let update = PrincipalUpdate {
        email: body.email,
        scope: body.scope,
    };

    let principal = state.accounts.update(&actor, target, update).await?;
    Ok(Json(principal.into()))
}

async fn delete_user(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target = parse_user_id(&user_id)?;
    state.accounts.delete(&actor, target).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resend_verification(
    State(state): State<AppState>,
    CurrentPrincipal(actor): CurrentPrincipal,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let target = parse_user_id(&user_id)?;
    state.accounts.resend_verification(&actor, target).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn render_metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .ok_or_else(|| ApiError(AppError::not_found("metrics exporter is not installed")))
}
