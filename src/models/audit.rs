//! 审计工作项模型
//! 审计本身及其人员分配

use super::membership::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 审计状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// 计划中
    #[serde(alias = "Planificada")]
    Planned,
    /// 进行中
    #[serde(alias = "En_Curso")]
    InProgress,
    /// 已定稿（终态）
    #[serde(alias = "Finalizada")]
    Finalized,
    /// 已暂停
    #[serde(alias = "Pausada")]
    Paused,
}

impl AuditStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditStatus::Finalized)
    }

    /// Planned → InProgress → (Paused ⇄ InProgress) → Finalized
    pub fn can_transition_to(&self, next: AuditStatus) -> bool {
        use AuditStatus::*;
        matches!(
            (self, next),
            (Planned, InProgress)
                | (InProgress, Paused)
                | (Paused, InProgress)
                | (InProgress, Finalized)
                | (Paused, Finalized)
        )
    }
}

impl Default for AuditStatus {
    fn default() -> Self {
        AuditStatus::Planned
    }
}

/// 审计，归创建它的组织独占
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Audit {
    pub id: Uuid,
    pub title: String,
    pub owner_org_id: Uuid,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    pub fn new(title: &str, owner_org_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            owner_org_id,
            status: AuditStatus::Planned,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 分配接受状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "acceptance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    #[serde(alias = "Pendiente")]
    Pending,
    #[serde(alias = "Aceptado")]
    Accepted,
    #[serde(alias = "Rechazado")]
    Rejected,
}

impl Default for AcceptanceStatus {
    fn default() -> Self {
        AcceptanceStatus::Pending
    }
}

/// 审计分配，(audit_id, user_id) 唯一
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditAssignment {
    pub audit_id: Uuid,
    pub user_id: Uuid,
    pub role_in_audit: Role,
    pub acceptance_status: AcceptanceStatus,
    pub is_active: bool,
    /// 临时公开链接，仅在分配有效且审计未定稿时可用
    pub temporary_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditAssignment {
    pub fn new(audit_id: Uuid, user_id: Uuid, role: Role, acceptance: AcceptanceStatus) -> Self {
        Self {
            audit_id,
            user_id,
            role_in_audit: role,
            acceptance_status: acceptance,
            is_active: true,
            temporary_link: None,
            created_at: Utc::now(),
        }
    }
}

/// 创建审计请求
#[derive(Debug, Deserialize)]
pub struct CreateAuditRequest {
    pub title: String,
}

/// 分配人员请求
#[derive(Debug, Deserialize)]
pub struct AssignStaffRequest {
    pub user_id: Uuid,
    pub role_in_audit: Role,
}

/// 更新审计状态请求
#[derive(Debug, Deserialize)]
pub struct UpdateAuditStatusRequest {
    pub status: AuditStatus,
}

/// 响应分配请求
#[derive(Debug, Deserialize)]
pub struct RespondAssignmentRequest {
    pub accept: bool,
}
