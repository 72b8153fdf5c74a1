//! 错误处理单元测试
//!
//! 测试应用错误类型的分类、状态码和响应格式

use axum::{http::StatusCode, response::IntoResponse};
use http_body_util::BodyExt;
use iso_stack::error::{AppError, ErrorKind};

// ==================== 错误分类测试 ====================

#[test]
fn test_error_kinds() {
    assert_eq!(AppError::unauthenticated("expired").kind(), ErrorKind::Unauthenticated);
    assert_eq!(AppError::Forbidden.kind(), ErrorKind::Forbidden);
    assert_eq!(AppError::not_found("audit").kind(), ErrorKind::NotFound);
    assert_eq!(AppError::conflict("email").kind(), ErrorKind::Conflict);
    assert_eq!(AppError::validation("empty title").kind(), ErrorKind::Validation);
    assert_eq!(AppError::internal_error("boom").kind(), ErrorKind::Internal);
    assert_eq!(AppError::Config("missing".to_string()).kind(), ErrorKind::Internal);
    assert_eq!(AppError::Database(sqlx::Error::PoolTimedOut).kind(), ErrorKind::Internal);
}

#[test]
fn test_error_status_codes() {
    assert_eq!(AppError::unauthenticated("x").status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
    assert_eq!(AppError::validation("x").status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        AppError::internal_error("x").status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// ==================== 消息泄露测试 ====================

#[test]
fn test_internal_details_not_exposed() {
    let errors = [
        AppError::Database(sqlx::Error::PoolTimedOut),
        AppError::Config("ISO_SECURITY__JWT_SECRET missing".to_string()),
        AppError::internal_error("connection refused at 10.0.0.5"),
        AppError::unauthenticated("token expired"),
    ];

    for error in errors {
        let message = error.user_message();
        assert!(!message.contains("10.0.0.5"));
        assert!(!message.contains("JWT_SECRET"));
        assert!(!message.contains("expired"));
        assert!(!message.to_lowercase().contains("pool"));
    }
}

#[test]
fn test_config_error_conversion() {
    let err: AppError = config::ConfigError::Message("bad".to_string()).into();
    assert!(matches!(err, AppError::Config(_)));
}

// ==================== 响应格式测试 ====================

#[tokio::test]
async fn test_error_response_body() {
    let response = AppError::not_found("audit").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(json["error"]["code"], 404);
    assert!(json["error"]["message"].is_string());
    assert!(!json["error"]["request_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_internal_error_response_hides_detail() {
    let response = AppError::internal_error("disk on fire").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!body.contains("disk on fire"));
}
