//! HTTP 中间件与共享状态
//! 请求追踪、指标记录

use crate::{
    auth::TokenService,
    config::AppConfig,
    error::AppError,
    repository::Store,
    services::{AuditService, AuthService, MembershipService, PermissionService},
};
use axum::{extract::Request, http::HeaderMap, http::HeaderValue, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 所有服务共享同一个存储引擎，按能力接口注入。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub token_service: Arc<TokenService>,
    pub auth_service: Arc<AuthService>,
    pub membership_service: Arc<MembershipService>,
    pub audit_service: Arc<AuditService>,
}

impl AppState {
    /// 基于任意存储引擎组装全部服务
    pub fn new<S>(config: AppConfig, store: Arc<S>) -> Result<Self, AppError>
    where
        S: Store + 'static,
    {
        let token_service = Arc::new(TokenService::from_config(
            &config.security,
            store.clone(),
        )?);

        let permissions = PermissionService::new(store.clone());

        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            token_service.clone(),
            config.security.password_min_length,
        ));

        let membership_service = Arc::new(MembershipService::new(
            store.clone(),
            store.clone(),
            permissions.clone(),
        ));

        let audit_service = Arc::new(AuditService::new(store.clone(), store.clone(), permissions));

        Ok(Self {
            config,
            store,
            token_service,
            auth_service,
            membership_service,
            audit_service,
        })
    }
}

tokio::task_local! {
    static REQUEST_ID: String;
}

/// 当前请求的 request_id，在请求追踪中间件之外调用时为 None
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    // 公开链接是访问凭据，不能原样写进日志
    let path = redact_path(req.uri().path());

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();

        // 错误响应体中的 request_id 与响应头保持一致
        let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        metrics::counter!(
            "http_requests_total",
            "method" => metric_method(&method),
            "status" => status_class(status)
        )
        .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn redact_path(path: &str) -> String {
    match path.strip_prefix("/api/v1/public/audits/") {
        Some(_) => "/api/v1/public/audits/[redacted]".to_string(),
        None => path.to_string(),
    }
}

fn metric_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_or_generate_trace_id() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", "test-trace-123".parse().unwrap());

        let trace_id = extract_or_generate_trace_id(&headers);
        assert_eq!(trace_id, "test-trace-123");

        let headers = HeaderMap::new();
        let trace_id = extract_or_generate_trace_id(&headers);
        assert!(!trace_id.is_empty());
        assert_ne!(trace_id, "test-trace-123");
    }

    #[test]
    fn test_public_link_redacted() {
        assert_eq!(
            redact_path("/api/v1/public/audits/tl_secret"),
            "/api/v1/public/audits/[redacted]"
        );
        assert_eq!(redact_path("/api/v1/audits/mine"), "/api/v1/audits/mine");
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(201), "2xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(503), "5xx");
    }
}
