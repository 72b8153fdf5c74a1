//! 内存存储引擎
//!
//! 与 `PgStore` 满足相同的能力接口和唯一约束，每个原子操作只持有一次写锁，
//! 先校验全部约束再写入，因此失败时不会留下部分数据。
//! 可以通过 [`MemoryStore::fail_on`] 在指定写入步骤注入一次故障。

use super::{AuditStore, CredentialStore, MembershipStore, RevocationLedger, Store};
use crate::{
    db::HealthStatus,
    error::AppError,
    models::{
        audit::{AcceptanceStatus, Audit, AuditAssignment, AuditStatus},
        auth::RevokedToken,
        membership::{MemberStatus, MemberSummary, Membership},
        organization::Organization,
        user::{normalize_email, User},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// 可注入故障的写入步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStep {
    InsertOrganization,
    InsertUser,
    InsertMembership,
    InsertAudit,
    InsertAssignment,
    InsertRevocation,
}

/// 与 PgStore 的唯一约束冲突一致的错误
fn duplicate(constraint: &str) -> AppError {
    tracing::debug!(constraint, "Unique constraint violated");
    AppError::conflict("resource already exists")
}

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    memberships: BTreeMap<(Uuid, Uuid), Membership>,
    audits: HashMap<Uuid, Audit>,
    assignments: BTreeMap<(Uuid, Uuid), AuditAssignment>,
    revoked: HashMap<String, RevokedToken>,
    faults: HashSet<WriteStep>,
}

impl Tables {
    /// 消费一次性故障
    fn check_fault(&mut self, step: WriteStep) -> Result<(), AppError> {
        if self.faults.remove(&step) {
            tracing::debug!(?step, "Injected store fault");
            return Err(AppError::internal_error("injected store fault"));
        }
        Ok(())
    }

    fn email_taken(&self, email: &str) -> bool {
        let email = normalize_email(email);
        self.users.values().any(|u| u.email == email)
    }

    fn check_new_user(&mut self, user: &User) -> Result<(), AppError> {
        self.check_fault(WriteStep::InsertUser)?;
        if self.users.contains_key(&user.id) || self.email_taken(&user.email) {
            return Err(duplicate("users_email_key"));
        }
        Ok(())
    }

    fn check_new_membership(&mut self, membership: &Membership) -> Result<(), AppError> {
        self.check_fault(WriteStep::InsertMembership)?;
        if self
            .memberships
            .contains_key(&(membership.user_id, membership.organization_id))
        {
            return Err(duplicate("memberships_pkey"));
        }
        Ok(())
    }

    fn check_new_assignment(&mut self, assignment: &AuditAssignment) -> Result<(), AppError> {
        self.check_fault(WriteStep::InsertAssignment)?;
        if self
            .assignments
            .contains_key(&(assignment.audit_id, assignment.user_id))
        {
            return Err(duplicate("audit_assignments_pkey"));
        }
        if let Some(link) = &assignment.temporary_link {
            let taken = self
                .assignments
                .values()
                .any(|a| a.temporary_link.as_deref() == Some(link.as_str()));
            if taken {
                return Err(duplicate("audit_assignments_temporary_link_key"));
            }
        }
        Ok(())
    }
}

/// 内存存储，主要用于测试与本地开发
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 下一次执行到 `step` 的写入时失败，失败后故障自动清除
    pub async fn fail_on(&self, step: WriteStep) {
        self.tables.write().await.faults.insert(step);
    }

    pub async fn organization_count(&self) -> usize {
        self.tables.read().await.organizations.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn audit_count(&self) -> usize {
        self.tables.read().await.audits.len()
    }

    pub async fn assignment_count(&self) -> usize {
        self.tables.read().await.assignments.len()
    }

    pub async fn revocation_count(&self) -> usize {
        self.tables.read().await.revoked.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user_with_org(
        &self,
        org: &Organization,
        user: &User,
        membership: &Membership,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.check_fault(WriteStep::InsertOrganization)?;
        if tables.organizations.contains_key(&org.id) {
            return Err(duplicate("organizations_pkey"));
        }
        tables.check_new_user(user)?;
        tables.check_new_membership(membership)?;

        tables.organizations.insert(org.id, org.clone());
        tables.users.insert(user.id, user.clone());
        tables
            .memberships
            .insert((membership.user_id, membership.organization_id), membership.clone());

        Ok(())
    }

    async fn create_user_with_membership(
        &self,
        user: &User,
        membership: &Membership,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.check_new_user(user)?;
        tables.check_new_membership(membership)?;

        tables.users.insert(user.id, user.clone());
        tables
            .memberships
            .insert((membership.user_id, membership.organization_id), membership.clone());

        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.check_new_membership(membership)?;
        tables
            .memberships
            .insert((membership.user_id, membership.organization_id), membership.clone());

        Ok(())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .memberships
            .get(&(user_id, org_id))
            .cloned())
    }

    async fn list_memberships_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let tables = self.tables.read().await;
        let mut memberships: Vec<Membership> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| (m.joined_at, m.organization_id));
        Ok(memberships)
    }

    async fn list_staff(&self, org_id: Uuid) -> Result<Vec<MemberSummary>, AppError> {
        let tables = self.tables.read().await;
        let mut staff: Vec<MemberSummary> = tables
            .memberships
            .values()
            .filter(|m| m.organization_id == org_id)
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|u| MemberSummary {
                    user_id: m.user_id,
                    email: u.email.clone(),
                    role: m.default_role,
                    status: m.status,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        staff.sort_by_key(|s| (s.joined_at, s.user_id));
        Ok(staff)
    }

    async fn update_membership_status(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        status: MemberStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.memberships.get_mut(&(user_id, org_id)) {
            Some(membership) => {
                membership.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn create_audit_with_lead(
        &self,
        audit: &Audit,
        lead: &AuditAssignment,
    ) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.check_fault(WriteStep::InsertAudit)?;
        if tables.audits.contains_key(&audit.id) {
            return Err(duplicate("audits_pkey"));
        }
        tables.check_new_assignment(lead)?;

        tables.audits.insert(audit.id, audit.clone());
        tables
            .assignments
            .insert((lead.audit_id, lead.user_id), lead.clone());

        Ok(())
    }

    async fn create_assignment(&self, assignment: &AuditAssignment) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.check_new_assignment(assignment)?;
        tables
            .assignments
            .insert((assignment.audit_id, assignment.user_id), assignment.clone());

        Ok(())
    }

    async fn find_audit(&self, audit_id: Uuid) -> Result<Option<Audit>, AppError> {
        Ok(self.tables.read().await.audits.get(&audit_id).cloned())
    }

    async fn find_assignment(
        &self,
        audit_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AuditAssignment>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .assignments
            .get(&(audit_id, user_id))
            .cloned())
    }

    async fn find_active_assignment_by_link(
        &self,
        link: &str,
    ) -> Result<Option<AuditAssignment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .values()
            .find(|a| a.is_active && a.temporary_link.as_deref() == Some(link))
            .cloned())
    }

    async fn list_audits_for_user(&self, user_id: Uuid) -> Result<Vec<Audit>, AppError> {
        let tables = self.tables.read().await;
        let mut audits: Vec<Audit> = tables
            .assignments
            .values()
            .filter(|a| a.user_id == user_id && a.is_active)
            .filter_map(|a| tables.audits.get(&a.audit_id).cloned())
            .collect();
        audits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(audits)
    }

    async fn update_audit_status(
        &self,
        audit_id: Uuid,
        from: AuditStatus,
        to: AuditStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.audits.get_mut(&audit_id) {
            Some(audit) if audit.status == from => {
                audit.status = to;
                audit.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_acceptance(
        &self,
        audit_id: Uuid,
        user_id: Uuid,
        status: AcceptanceStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.assignments.get_mut(&(audit_id, user_id)) {
            Some(assignment) if assignment.acceptance_status == AcceptanceStatus::Pending => {
                assignment.acceptance_status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_assignment(&self, audit_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.assignments.get_mut(&(audit_id, user_id)) {
            Some(assignment) => {
                assignment.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RevocationLedger for MemoryStore {
    async fn insert_revocation(&self, entry: &RevokedToken) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.check_fault(WriteStep::InsertRevocation)?;
        tables
            .revoked
            .entry(entry.token.clone())
            .or_insert_with(|| entry.clone());

        Ok(())
    }

    async fn exists(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.tables.read().await.revoked.contains_key(token))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.revoked.len();
        tables.revoked.retain(|_, entry| entry.expires_at >= now);
        Ok((before - tables.revoked.len()) as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
