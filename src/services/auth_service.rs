//! 认证服务：注册、登录、登出、吊销账本维护

use crate::{
    auth::{AuthContext, IssuedToken, PasswordHasher, TokenService},
    error::AppError,
    models::{
        membership::{MemberStatus, Membership, Role},
        organization::Organization,
        user::{normalize_email, User},
    },
    repository::{CredentialStore, MembershipStore, RevocationLedger},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::{ValidateEmail, ValidateLength};

const MAX_ORG_NAME_LEN: u64 = 200;

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    memberships: Arc<dyn MembershipStore>,
    ledger: Arc<dyn RevocationLedger>,
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    password_min_length: usize,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        memberships: Arc<dyn MembershipStore>,
        ledger: Arc<dyn RevocationLedger>,
        tokens: Arc<TokenService>,
        password_min_length: usize,
    ) -> Self {
        Self {
            credentials,
            memberships,
            ledger,
            tokens,
            hasher: PasswordHasher::new(),
            password_min_length,
        }
    }

    /// 注册用户并创建其组织
    ///
    /// 组织、用户和 Consultant 成员关系在同一个原子操作中写入，
    /// 成功后直接签发该组织范围内的会话令牌。
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        org_name: &str,
    ) -> Result<IssuedToken, AppError> {
        let email = validate_email(email)?;
        PasswordHasher::validate_password_policy(password, self.password_min_length)?;

        let org_name = org_name.trim();
        if !org_name.validate_length(Some(1), Some(MAX_ORG_NAME_LEN), None) {
            return Err(AppError::validation(
                "Organization name must be between 1 and 200 characters",
            ));
        }

        if self.credentials.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("email already registered"));
        }

        let secret_hash = self.hasher.hash(password)?;
        let org = Organization::new(org_name);
        let user = User::new(&email, secret_hash);
        let membership = Membership::new(user.id, org.id, Role::Consultant, MemberStatus::Active);

        // 并发注册同一邮箱时由唯一约束兜底，仍然返回 Conflict
        self.credentials
            .create_user_with_org(&org, &user, &membership)
            .await?;

        tracing::info!(user_id = %user.id, org_id = %org.id, "User registered");

        self.tokens.issue(user.id, org.id, Role::Consultant)
    }

    /// 用户登录
    ///
    /// 未指定 `org_id` 时按主组织规则选择会话所属组织。
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        org_id: Option<Uuid>,
    ) -> Result<IssuedToken, AppError> {
        let email = normalize_email(email);

        let user = match self.credentials.find_user_by_email(&email).await? {
            Some(user) if !user.is_deleted() => user,
            other => {
                self.hasher.verify_dummy(password);
                let reason = if other.is_some() {
                    "account deleted"
                } else {
                    "unknown email"
                };
                return Err(AppError::unauthenticated(reason));
            }
        };

        self.hasher.verify(password, &user.secret_hash)?;

        let memberships = self.memberships.list_memberships_for_user(user.id).await?;
        let membership = select_session_membership(&memberships, org_id)
            .ok_or_else(|| AppError::unauthenticated("no eligible organization"))?;

        tracing::info!(user_id = %user.id, org_id = %membership.organization_id, "User logged in");

        self.tokens
            .issue(user.id, membership.organization_id, membership.default_role)
    }

    /// 登出：吊销当前会话令牌
    pub async fn logout(&self, ctx: &AuthContext) -> Result<(), AppError> {
        self.tokens.revoke(&ctx.token).await
    }

    /// 清理已过期的吊销条目，过期令牌本身已无法通过验证
    pub async fn purge_expired_revocations(&self) -> Result<u64, AppError> {
        let purged = self.ledger.purge_expired(Utc::now()).await?;
        if purged > 0 {
            tracing::info!(purged, "Expired revocations purged");
        }
        Ok(purged)
    }

    /// 当前会话用户
    pub async fn current_user(&self, ctx: &AuthContext) -> Result<User, AppError> {
        self.credentials
            .find_user_by_id(ctx.user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| AppError::not_found("user"))
    }
}

fn validate_email(email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    if !email.validate_email() {
        return Err(AppError::validation("Invalid email address"));
    }
    Ok(email)
}

/// 选择会话所属的成员关系
///
/// 显式指定的组织优先（停用的成员关系不可用）；否则按
/// Active 优先、加入时间最早、组织 ID 最小的顺序选择。
pub fn select_session_membership(
    memberships: &[Membership],
    org_id: Option<Uuid>,
) -> Option<&Membership> {
    let mut eligible = memberships
        .iter()
        .filter(|m| m.status != MemberStatus::Inactive);

    match org_id {
        Some(org_id) => eligible.find(|m| m.organization_id == org_id),
        None => eligible.min_by_key(|m| {
            (
                m.status != MemberStatus::Active,
                m.joined_at,
                m.organization_id,
            )
        }),
    }
}
