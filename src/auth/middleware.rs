//! 会话认证守卫
//!
//! 只负责认证：验证令牌签名、有效期和吊销状态，并把调用方身份挂到请求上。
//! 租户范围的授权由各个服务方法通过 [`AuthContext`] 自行判断。

use crate::{
    auth::jwt::{Claims, TokenService},
    error::AppError,
    models::membership::Role,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展，显式传入服务方法）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub org_id: Uuid,
    pub role: Role,
    /// 原始会话令牌，登出时使用
    pub token: String,
}

impl AuthContext {
    pub fn from_claims(claims: Claims, token: String) -> Self {
        Self {
            user_id: claims.sub,
            org_id: claims.org_id,
            role: claims.role,
            token,
        }
    }

    /// 调用方必须属于组织 `org_id`
    pub fn require_org(&self, org_id: Uuid) -> Result<(), AppError> {
        if self.org_id != org_id {
            tracing::warn!(
                user_id = %self.user_id,
                caller_org = %self.org_id,
                target_org = %org_id,
                "Cross-tenant access rejected"
            );
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("no session attached to request"))
    }
}

/// 从 Authorization 头提取 Bearer 令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthenticated("missing bearer token"))
}

/// 认证请求头，失败时具体原因只写日志
pub async fn authenticate(
    tokens: &TokenService,
    headers: &HeaderMap,
) -> Result<AuthContext, AppError> {
    let token = extract_token(headers)?;

    let claims = tokens.validate(&token).map_err(|reason| {
        tracing::debug!(%reason, "Session token rejected");
        AppError::Unauthenticated(reason.to_string())
    })?;

    // 查询失败时拒绝请求
    let revoked = tokens.is_revoked(&token).await.map_err(|e| {
        tracing::error!(error = %e, "Revocation lookup failed");
        AppError::internal_error("revocation lookup failed")
    })?;

    if revoked {
        tracing::info!(user_id = %claims.sub, "Revoked session token presented");
        return Err(AppError::unauthenticated("session revoked"));
    }

    Ok(AuthContext::from_claims(claims, token))
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(tokens): State<Arc<TokenService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_context = authenticate(&tokens, req.headers()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
