//! 成员关系模型
//! 用户在某个组织中的角色与状态

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 角色（组织默认角色与审计内角色共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 咨询方，注册时创建组织的用户默认角色
    #[serde(alias = "Consultora")]
    Consultant,
    /// 首席审计员
    #[serde(alias = "Auditor_Lider")]
    LeadAuditor,
    /// 内部审计员
    #[serde(alias = "Auditor_Interno")]
    InternalAuditor,
    /// 助理（外部参与者）
    #[serde(alias = "Auxiliar")]
    Assistant,
    /// 观察员（外部参与者）
    #[serde(alias = "Observador")]
    Observer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Consultant => "consultant",
            Role::LeadAuditor => "lead_auditor",
            Role::InternalAuditor => "internal_auditor",
            Role::Assistant => "assistant",
            Role::Observer => "observer",
        }
    }

    /// 可以管理组织人员与审计分配
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Consultant | Role::LeadAuditor)
    }

    /// 外部角色的审计分配会获得临时公开链接
    pub fn receives_public_link(&self) -> bool {
        matches!(self, Role::Assistant | Role::Observer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 成员状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    #[serde(alias = "Activo")]
    Active,
    #[serde(alias = "Inactivo")]
    Inactive,
    #[serde(alias = "Invitado")]
    Invited,
}

impl Default for MemberStatus {
    fn default() -> Self {
        MemberStatus::Invited
    }
}

/// 成员关系，(user_id, organization_id) 唯一
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub default_role: Role,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, organization_id: Uuid, role: Role, status: MemberStatus) -> Self {
        Self {
            user_id,
            organization_id,
            default_role: role,
            status,
            joined_at: Utc::now(),
        }
    }
}

/// 人员列表条目（附带成员邮箱）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberSummary {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
}

/// 邀请成员请求
#[derive(Debug, Deserialize)]
pub struct InviteStaffRequest {
    pub email: String,
    pub role: Role,
}

/// 更新成员状态请求
#[derive(Debug, Deserialize)]
pub struct UpdateStaffStatusRequest {
    pub status: MemberStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_legacy_names() {
        let role: Role = serde_json::from_str("\"Observador\"").unwrap();
        assert_eq!(role, Role::Observer);
        let role: Role = serde_json::from_str("\"Auditor_Lider\"").unwrap();
        assert_eq!(role, Role::LeadAuditor);
        let role: Role = serde_json::from_str("\"Auxiliar\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn test_role_serializes_canonical_name() {
        assert_eq!(serde_json::to_string(&Role::InternalAuditor).unwrap(), "\"internal_auditor\"");
        assert_eq!(Role::Consultant.to_string(), "consultant");
    }

    #[test]
    fn test_public_link_roles() {
        assert!(Role::Assistant.receives_public_link());
        assert!(Role::Observer.receives_public_link());
        assert!(!Role::LeadAuditor.receives_public_link());
        assert!(!Role::InternalAuditor.receives_public_link());
        assert!(!Role::Consultant.receives_public_link());
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn test_default_status_is_invited() {
        assert_eq!(MemberStatus::default(), MemberStatus::Invited);
    }
}
