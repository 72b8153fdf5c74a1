//! 组织人员管理的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    extract::{ApiJson, ApiPath},
    middleware::AppState,
    models::membership::{InviteStaffRequest, UpdateStaffStatusRequest},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// 列出组织人员
pub async fn list_staff(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(org_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let staff = state
        .membership_service
        .list_staff(&auth_context, org_id)
        .await?;

    Ok(Json(json!({
        "staff": staff,
        "count": staff.len()
    })))
}

/// 邀请人员
pub async fn invite_staff(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(org_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<InviteStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    let member = state
        .membership_service
        .invite(&auth_context, org_id, &req.email, req.role)
        .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// 更新人员状态
pub async fn update_staff_status(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath((org_id, user_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(req): ApiJson<UpdateStaffStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .membership_service
        .update_status(&auth_context, org_id, user_id, req.status)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
