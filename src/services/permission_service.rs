//! 权限检查服务
//!
//! 令牌里的角色在签发时固定，这里总是按存储中的最新成员关系判断。

use crate::{
    auth::AuthContext,
    error::AppError,
    models::membership::{MemberStatus, Membership},
    repository::MembershipStore,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct PermissionService {
    memberships: Arc<dyn MembershipStore>,
}

impl PermissionService {
    pub fn new(memberships: Arc<dyn MembershipStore>) -> Self {
        Self { memberships }
    }

    /// 调用方在 `org_id` 中的有效成员关系
    ///
    /// 会话不属于该组织、没有成员关系或成员已停用时返回 Forbidden。
    pub async fn require_member(
        &self,
        ctx: &AuthContext,
        org_id: Uuid,
    ) -> Result<Membership, AppError> {
        ctx.require_org(org_id)?;

        let membership = self
            .memberships
            .find_membership(ctx.user_id, org_id)
            .await?
            .ok_or(AppError::Forbidden)?;

        if membership.status == MemberStatus::Inactive {
            tracing::warn!(user_id = %ctx.user_id, org_id = %org_id, "Inactive member rejected");
            return Err(AppError::Forbidden);
        }

        Ok(membership)
    }

    /// 调用方必须是 `org_id` 的在职管理角色
    pub async fn require_manager(
        &self,
        ctx: &AuthContext,
        org_id: Uuid,
    ) -> Result<Membership, AppError> {
        let membership = self.require_member(ctx, org_id).await?;

        if membership.status != MemberStatus::Active || !membership.default_role.can_manage() {
            tracing::warn!(
                user_id = %ctx.user_id,
                org_id = %org_id,
                role = %membership.default_role,
                "Management action rejected"
            );
            return Err(AppError::Forbidden);
        }

        Ok(membership)
    }

    /// 检查用户是否为组织成员（不论会话）
    pub async fn is_member(&self, user_id: Uuid, org_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .memberships
            .find_membership(user_id, org_id)
            .await?
            .is_some_and(|m| m.status != MemberStatus::Inactive))
    }
}
