//! 临时公开链接（无需登录）

use crate::{error::AppError, extract::ApiPath, middleware::AppState};
use axum::{
    extract::State,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// 通过临时链接查看审计
pub async fn get_public_audit(
    State(state): State<Arc<AppState>>,
    ApiPath(link): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let audit = state.audit_service.get_public_audit(&link).await?;
    Ok(Json(audit))
}
