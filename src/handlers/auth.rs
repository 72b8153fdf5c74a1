//! 认证相关的 HTTP 处理器

use crate::{
    auth::{AuthContext, IssuedToken},
    error::AppError,
    extract::ApiJson,
    middleware::AppState,
    models::{
        auth::{LoginRequest, RegisterRequest, TokenResponse},
        user::UserResponse,
    },
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

fn token_response(issued: IssuedToken) -> TokenResponse {
    TokenResponse {
        token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
    }
}

/// 注册用户与组织
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state
        .auth_service
        .register(&req.email, &req.password, &req.org_name)
        .await?;

    Ok((StatusCode::CREATED, Json(token_response(issued))))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let issued = state
        .auth_service
        .login(&req.email, &req.password, req.org_id)
        .await?;

    Ok(Json(token_response(issued)))
}

/// 登出
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.logout(&auth_context).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 获取当前会话信息
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service.current_user(&auth_context).await?;

    Ok(Json(json!({
        "user": UserResponse::from(user),
        "org_id": auth_context.org_id,
        "role": auth_context.role,
    })))
}
