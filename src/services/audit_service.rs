//! 审计工作流服务：创建审计、分配人员、状态流转与临时公开链接

use crate::{
    auth::{AuthContext, SecretGenerator},
    error::AppError,
    models::{
        audit::{AcceptanceStatus, Audit, AuditAssignment, AuditStatus},
        membership::{MemberStatus, Role},
    },
    repository::{AuditStore, MembershipStore},
    services::PermissionService,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateLength;

const MAX_TITLE_LEN: u64 = 200;

pub struct AuditService {
    audits: Arc<dyn AuditStore>,
    memberships: Arc<dyn MembershipStore>,
    permissions: PermissionService,
}

impl AuditService {
    pub fn new(
        audits: Arc<dyn AuditStore>,
        memberships: Arc<dyn MembershipStore>,
        permissions: PermissionService,
    ) -> Self {
        Self {
            audits,
            memberships,
            permissions,
        }
    }

    /// 在调用方组织内创建审计，创建者自动成为已接受的首席审计员
    pub async fn create_audit(&self, ctx: &AuthContext, title: &str) -> Result<Audit, AppError> {
        self.permissions.require_member(ctx, ctx.org_id).await?;

        let title = title.trim();
        if !title.validate_length(Some(1), Some(MAX_TITLE_LEN), None) {
            return Err(AppError::validation(
                "Audit title must be between 1 and 200 characters",
            ));
        }

        let audit = Audit::new(title, ctx.org_id);
        let lead = AuditAssignment::new(
            audit.id,
            ctx.user_id,
            Role::LeadAuditor,
            AcceptanceStatus::Accepted,
        );

        self.audits.create_audit_with_lead(&audit, &lead).await?;

        tracing::info!(audit_id = %audit.id, org_id = %audit.owner_org_id, created_by = %ctx.user_id, "Audit created");
        Ok(audit)
    }

    /// 把本组织成员分配到审计
    ///
    /// 外部角色（Assistant / Observer）的分配会生成临时公开链接。
    pub async fn assign_staff(
        &self,
        ctx: &AuthContext,
        audit_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<AuditAssignment, AppError> {
        let audit = self.load_audit(audit_id).await?;
        self.permissions.require_manager(ctx, audit.owner_org_id).await?;

        if audit.status.is_terminal() {
            return Err(AppError::conflict("audit is finalized"));
        }

        // 被分配者必须是调用方组织的成员
        let target = self.memberships.find_membership(user_id, ctx.org_id).await?;
        match target {
            Some(m) if m.status != MemberStatus::Inactive => {}
            _ => {
                tracing::warn!(
                    audit_id = %audit_id,
                    user_id = %user_id,
                    org_id = %ctx.org_id,
                    "Assignment of non-member rejected"
                );
                return Err(AppError::Forbidden);
            }
        }

        let mut assignment =
            AuditAssignment::new(audit_id, user_id, role, AcceptanceStatus::Pending);
        if role.receives_public_link() {
            assignment.temporary_link = Some(SecretGenerator::temporary_link());
        }

        self.audits.create_assignment(&assignment).await?;

        tracing::info!(
            audit_id = %audit_id,
            user_id = %user_id,
            role = %role,
            public_link = assignment.temporary_link.is_some(),
            "Staff assigned to audit"
        );
        Ok(assignment)
    }

    /// 用户持有有效分配的全部审计
    pub async fn get_my_audits(&self, ctx: &AuthContext) -> Result<Vec<Audit>, AppError> {
        self.audits.list_audits_for_user(ctx.user_id).await
    }

    /// 通过临时公开链接访问审计
    ///
    /// 链接不存在、分配已停用、审计已定稿都返回同一个 NotFound。
    pub async fn get_public_audit(&self, link: &str) -> Result<Audit, AppError> {
        let unavailable = || AppError::not_found("audit");

        if link.is_empty() {
            return Err(unavailable());
        }

        let assignment = self
            .audits
            .find_active_assignment_by_link(link)
            .await?
            .ok_or_else(unavailable)?;

        let audit = self
            .audits
            .find_audit(assignment.audit_id)
            .await?
            .ok_or_else(unavailable)?;

        if audit.status.is_terminal() {
            tracing::debug!(audit_id = %audit.id, "Public link used on finalized audit");
            return Err(unavailable());
        }

        Ok(audit)
    }

    /// 单个审计详情：所属组织成员或持有有效分配的用户可见
    pub async fn get_audit(&self, ctx: &AuthContext, audit_id: Uuid) -> Result<Audit, AppError> {
        let audit = self.load_audit(audit_id).await?;

        if ctx.org_id == audit.owner_org_id
            && self.permissions.is_member(ctx.user_id, audit.owner_org_id).await?
        {
            return Ok(audit);
        }

        match self.audits.find_assignment(audit_id, ctx.user_id).await? {
            Some(a) if a.is_active => Ok(audit),
            _ => Err(AppError::not_found("audit")),
        }
    }

    /// 审计状态流转
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        audit_id: Uuid,
        next: AuditStatus,
    ) -> Result<Audit, AppError> {
        let audit = self.load_audit(audit_id).await?;

        if !self.can_direct(ctx, &audit).await? {
            return Err(AppError::Forbidden);
        }

        if audit.status.is_terminal() {
            return Err(AppError::conflict("audit is finalized"));
        }
        if !audit.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "cannot move audit from {:?} to {:?}",
                audit.status, next
            )));
        }

        let updated = self
            .audits
            .update_audit_status(audit_id, audit.status, next)
            .await?;
        if !updated {
            return Err(AppError::conflict("audit status changed concurrently"));
        }

        tracing::info!(audit_id = %audit_id, from = ?audit.status, to = ?next, changed_by = %ctx.user_id, "Audit status updated");

        self.load_audit(audit_id).await
    }

    /// 被分配者接受或拒绝分配
    pub async fn respond_to_assignment(
        &self,
        ctx: &AuthContext,
        audit_id: Uuid,
        accept: bool,
    ) -> Result<AuditAssignment, AppError> {
        let assignment = self
            .audits
            .find_assignment(audit_id, ctx.user_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| AppError::not_found("assignment"))?;

        let audit = self.load_audit(audit_id).await?;
        if audit.status.is_terminal() {
            return Err(AppError::conflict("audit is finalized"));
        }

        if assignment.acceptance_status != AcceptanceStatus::Pending {
            return Err(AppError::conflict("assignment already answered"));
        }

        let status = if accept {
            AcceptanceStatus::Accepted
        } else {
            AcceptanceStatus::Rejected
        };

        if !self
            .audits
            .update_acceptance(audit_id, ctx.user_id, status)
            .await?
        {
            return Err(AppError::conflict("assignment already answered"));
        }

        tracing::info!(audit_id = %audit_id, user_id = %ctx.user_id, ?status, "Assignment answered");

        self.audits
            .find_assignment(audit_id, ctx.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("assignment"))
    }

    /// 停用分配，其临时链接随之失效
    pub async fn deactivate_assignment(
        &self,
        ctx: &AuthContext,
        audit_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let audit = self.load_audit(audit_id).await?;
        self.permissions.require_manager(ctx, audit.owner_org_id).await?;

        if !self.audits.deactivate_assignment(audit_id, user_id).await? {
            return Err(AppError::not_found("assignment"));
        }

        tracing::info!(audit_id = %audit_id, user_id = %user_id, changed_by = %ctx.user_id, "Assignment deactivated");
        Ok(())
    }

    async fn load_audit(&self, audit_id: Uuid) -> Result<Audit, AppError> {
        self.audits
            .find_audit(audit_id)
            .await?
            .ok_or_else(|| AppError::not_found("audit"))
    }

    /// 所属组织的管理角色，或已接受的首席审计员，可以推进审计
    async fn can_direct(&self, ctx: &AuthContext, audit: &Audit) -> Result<bool, AppError> {
        if ctx.org_id == audit.owner_org_id {
            match self.permissions.require_manager(ctx, audit.owner_org_id).await {
                Ok(_) => return Ok(true),
                Err(AppError::Forbidden) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(self
            .audits
            .find_assignment(audit.id, ctx.user_id)
            .await?
            .is_some_and(|a| {
                a.is_active
                    && a.role_in_audit == Role::LeadAuditor
                    && a.acceptance_status == AcceptanceStatus::Accepted
            }))
    }
}
