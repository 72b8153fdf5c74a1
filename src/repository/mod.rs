//! Database repository layer
//!
//! 按能力拆分的存储接口，由同一个存储引擎实现（`PgStore`），
//! 测试中可用 `MemoryStore` 替换。

pub mod audit_repo;
pub mod auth_repo;
pub mod membership_repo;
pub mod memory;
pub mod pg_store;
pub mod user_repo;

pub use memory::{MemoryStore, WriteStep};
pub use pg_store::PgStore;

use crate::{
    db::HealthStatus,
    error::AppError,
    models::{
        audit::{AcceptanceStatus, Audit, AuditAssignment, AuditStatus},
        auth::RevokedToken,
        membership::{MemberStatus, MemberSummary, Membership},
        organization::Organization,
        user::User,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 用户身份与凭据
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 原子地创建组织、用户和首个成员关系
    async fn create_user_with_org(
        &self,
        org: &Organization,
        user: &User,
        membership: &Membership,
    ) -> Result<(), AppError>;

    /// 原子地创建用户及其成员关系（邀请新用户）
    async fn create_user_with_membership(
        &self,
        user: &User,
        membership: &Membership,
    ) -> Result<(), AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

/// 组织成员关系
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// (user, org) 已存在时返回 Conflict
    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError>;

    async fn find_membership(
        &self,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Membership>, AppError>;

    async fn list_memberships_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError>;

    /// 按 joined_at、user_id 排序
    async fn list_staff(&self, org_id: Uuid) -> Result<Vec<MemberSummary>, AppError>;

    /// 返回是否有行被更新
    async fn update_membership_status(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        status: MemberStatus,
    ) -> Result<bool, AppError>;
}

/// 审计与审计分配
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// 原子地创建审计及其首席审计员分配
    async fn create_audit_with_lead(
        &self,
        audit: &Audit,
        lead: &AuditAssignment,
    ) -> Result<(), AppError>;

    /// (audit, user) 或临时链接重复时返回 Conflict
    async fn create_assignment(&self, assignment: &AuditAssignment) -> Result<(), AppError>;

    async fn find_audit(&self, audit_id: Uuid) -> Result<Option<Audit>, AppError>;

    async fn find_assignment(
        &self,
        audit_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AuditAssignment>, AppError>;

    /// 只匹配 is_active 的分配
    async fn find_active_assignment_by_link(
        &self,
        link: &str,
    ) -> Result<Option<AuditAssignment>, AppError>;

    /// 用户持有有效分配的所有审计（跨组织）
    async fn list_audits_for_user(&self, user_id: Uuid) -> Result<Vec<Audit>, AppError>;

    /// 仅当当前状态为 `from` 时更新，返回是否更新成功
    async fn update_audit_status(
        &self,
        audit_id: Uuid,
        from: AuditStatus,
        to: AuditStatus,
    ) -> Result<bool, AppError>;

    /// 仅当当前为 Pending 时更新
    async fn update_acceptance(
        &self,
        audit_id: Uuid,
        user_id: Uuid,
        status: AcceptanceStatus,
    ) -> Result<bool, AppError>;

    async fn deactivate_assignment(&self, audit_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
}

/// 已吊销会话令牌的账本，按原始令牌字符串查询
#[async_trait]
pub trait RevocationLedger: Send + Sync {
    /// 重复插入同一令牌不报错
    async fn insert_revocation(&self, entry: &RevokedToken) -> Result<(), AppError>;

    async fn exists(&self, token: &str) -> Result<bool, AppError>;

    /// 删除过期条目，返回删除数量
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

/// 完整的存储引擎
#[async_trait]
pub trait Store: CredentialStore + MembershipStore + AuditStore + RevocationLedger {
    async fn health_check(&self) -> HealthStatus;
}
