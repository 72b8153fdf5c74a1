//! 审计工作流的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    extract::{ApiJson, ApiPath},
    middleware::AppState,
    models::audit::{
        AssignStaffRequest, CreateAuditRequest, RespondAssignmentRequest, UpdateAuditStatusRequest,
    },
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

/// 创建审计
pub async fn create_audit(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiJson(req): ApiJson<CreateAuditRequest>,
) -> Result<impl IntoResponse, AppError> {
    let audit = state
        .audit_service
        .create_audit(&auth_context, &req.title)
        .await?;

    Ok((StatusCode::CREATED, Json(audit)))
}

/// 当前用户参与的审计
pub async fn list_my_audits(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let audits = state.audit_service.get_my_audits(&auth_context).await?;

    Ok(Json(json!({
        "audits": audits,
        "count": audits.len()
    })))
}

/// 审计详情
pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let audit = state.audit_service.get_audit(&auth_context, id).await?;
    Ok(Json(audit))
}

/// 更新审计状态
pub async fn update_audit_status(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAuditStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let audit = state
        .audit_service
        .update_status(&auth_context, id, req.status)
        .await?;
    Ok(Json(audit))
}

/// 分配人员
pub async fn assign_staff(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AssignStaffRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state
        .audit_service
        .assign_staff(&auth_context, id, req.user_id, req.role_in_audit)
        .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// 被分配者响应分配
pub async fn respond_to_assignment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RespondAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state
        .audit_service
        .respond_to_assignment(&auth_context, id, req.accept)
        .await?;
    Ok(Json(assignment))
}

/// 停用分配
pub async fn deactivate_assignment(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .audit_service
        .deactivate_assignment(&auth_context, id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
