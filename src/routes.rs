//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{error::AppError, handlers, middleware::AppState};

/// 请求体上限，所有请求体都是小型 JSON
const MAX_BODY_BYTES: usize = 64 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需认证）
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    // 临时公开链接，所有失败都表现为 404
    let link_routes = Router::new().route(
        "/api/v1/public/audits/{temp_link}",
        get(handlers::public::get_public_audit),
    );

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::get_current_user))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))

        // 组织人员
        .route(
            "/api/v1/organizations/{org_id}/staff",
            get(handlers::staff::list_staff).post(handlers::staff::invite_staff),
        )
        .route(
            "/api/v1/organizations/{org_id}/staff/{user_id}/status",
            put(handlers::staff::update_staff_status),
        )

        // 审计
        .route("/api/v1/audits", post(handlers::audit::create_audit))
        .route("/api/v1/audits/mine", get(handlers::audit::list_my_audits))
        .route("/api/v1/audits/{id}", get(handlers::audit::get_audit))
        .route(
            "/api/v1/audits/{id}/status",
            put(handlers::audit::update_audit_status),
        )
        .route(
            "/api/v1/audits/{id}/assignments",
            post(handlers::audit::assign_staff),
        )
        .route(
            "/api/v1/audits/{id}/assignments/me/response",
            post(handlers::audit::respond_to_assignment),
        )
        .route(
            "/api/v1/audits/{id}/assignments/{user_id}",
            delete(handlers::audit::deactivate_assignment),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.token_service.clone(),
            crate::auth::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(link_routes)
        .merge(authenticated_routes)
        .fallback(route_not_found)
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::not_found("route")
}
