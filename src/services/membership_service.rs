//! 组织人员管理：邀请、列表、状态变更

use crate::{
    auth::{AuthContext, PasswordHasher, SecretGenerator},
    error::AppError,
    models::{
        membership::{MemberStatus, MemberSummary, Membership, Role},
        user::{normalize_email, User},
    },
    repository::{CredentialStore, MembershipStore},
    services::PermissionService,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

pub struct MembershipService {
    credentials: Arc<dyn CredentialStore>,
    memberships: Arc<dyn MembershipStore>,
    permissions: PermissionService,
    hasher: PasswordHasher,
}

impl MembershipService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        memberships: Arc<dyn MembershipStore>,
        permissions: PermissionService,
    ) -> Self {
        Self {
            credentials,
            memberships,
            permissions,
            hasher: PasswordHasher::new(),
        }
    }

    /// 邀请人员加入组织
    ///
    /// 已注册的用户直接获得 Invited 成员关系；未注册的邮箱会创建一个
    /// 持有随机不可用凭据的账户。
    pub async fn invite(
        &self,
        ctx: &AuthContext,
        org_id: Uuid,
        email: &str,
        role: Role,
    ) -> Result<MemberSummary, AppError> {
        self.permissions.require_manager(ctx, org_id).await?;

        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AppError::validation("Invalid email address"));
        }

        let user = match self.credentials.find_user_by_email(&email).await? {
            Some(existing) => {
                let membership =
                    Membership::new(existing.id, org_id, role, MemberStatus::Invited);
                self.memberships.add_membership(&membership).await?;
                existing
            }
            None => {
                let secret_hash = self.hasher.hash(&SecretGenerator::temporary_secret())?;
                let user = User::new(&email, secret_hash);
                let membership = Membership::new(user.id, org_id, role, MemberStatus::Invited);
                self.credentials
                    .create_user_with_membership(&user, &membership)
                    .await?;
                user
            }
        };

        tracing::info!(
            invited_by = %ctx.user_id,
            user_id = %user.id,
            org_id = %org_id,
            role = %role,
            "Staff invited"
        );

        self.memberships
            .find_membership(user.id, org_id)
            .await?
            .map(|m| MemberSummary {
                user_id: m.user_id,
                email: user.email.clone(),
                role: m.default_role,
                status: m.status,
                joined_at: m.joined_at,
            })
            .ok_or_else(|| AppError::internal_error("membership missing after invite"))
    }

    /// 组织人员列表，任何有效成员都可查看
    pub async fn list_staff(
        &self,
        ctx: &AuthContext,
        org_id: Uuid,
    ) -> Result<Vec<MemberSummary>, AppError> {
        self.permissions.require_member(ctx, org_id).await?;
        self.memberships.list_staff(org_id).await
    }

    /// 变更成员状态，任意状态之间都可以直接切换
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        org_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> Result<(), AppError> {
        self.permissions.require_manager(ctx, org_id).await?;

        let updated = self
            .memberships
            .update_membership_status(user_id, org_id, status)
            .await?;

        if !updated {
            return Err(AppError::not_found("membership"));
        }

        tracing::info!(
            changed_by = %ctx.user_id,
            user_id = %user_id,
            org_id = %org_id,
            ?status,
            "Membership status updated"
        );
        Ok(())
    }
}
