//! 审计工作流服务集成测试（内存存储）

use iso_stack::{
    auth::AuthContext,
    error::{AppError, ErrorKind},
    middleware::AppState,
    models::{
        audit::{AcceptanceStatus, AuditStatus},
        membership::{MemberStatus, Role},
    },
    repository::{AuditStore, MembershipStore, WriteStep},
};
use std::collections::HashSet;
use uuid::Uuid;

mod common;
use common::{create_test_app_state, register, session_for};

/// 邀请并激活一名成员，返回其会话
async fn add_member(state: &AppState, owner: &AuthContext, email: &str, role: Role) -> AuthContext {
    let member = state
        .membership_service
        .invite(owner, owner.org_id, email, role)
        .await
        .unwrap();
    state
        .membership_service
        .update_status(owner, owner.org_id, member.user_id, MemberStatus::Active)
        .await
        .unwrap();
    session_for(state, member.user_id, owner.org_id, role)
}

#[tokio::test]
async fn test_create_audit_assigns_creator_as_lead() {
    let (state, store) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;

    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    assert_eq!(audit.title, "Q1 Review");
    assert_eq!(audit.status, AuditStatus::Planned);
    assert_eq!(audit.owner_org_id, owner.org_id);
    assert_eq!(store.assignment_count().await, 1);

    let lead = store
        .find_assignment(audit.id, owner.user_id)
        .await
        .unwrap()
        .expect("Lead assignment should exist");
    assert_eq!(lead.role_in_audit, Role::LeadAuditor);
    assert_eq!(lead.acceptance_status, AcceptanceStatus::Accepted);
    assert!(lead.is_active);
    assert!(lead.temporary_link.is_none());
}

#[tokio::test]
async fn test_create_audit_is_atomic() {
    let (state, store) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;

    // 首领分配写入失败时，审计本身也不应留下
    store.fail_on(WriteStep::InsertAssignment).await;
    let err = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(store.audit_count().await, 0);
    assert_eq!(store.assignment_count().await, 0);
    assert!(state.audit_service.get_my_audits(&owner).await.unwrap().is_empty());

    store.fail_on(WriteStep::InsertAudit).await;
    assert!(state.audit_service.create_audit(&owner, "Q1 Review").await.is_err());
    assert_eq!(store.audit_count().await, 0);
    assert_eq!(store.assignment_count().await, 0);

    // 故障消费后可以正常创建
    state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();
    assert_eq!(store.audit_count().await, 1);
    assert_eq!(store.assignment_count().await, 1);
}

#[tokio::test]
async fn test_create_audit_title_validation() {
    let (state, store) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;

    let too_long = "x".repeat(201);
    for title in ["", "   ", too_long.as_str()] {
        let err = state
            .audit_service
            .create_audit(&owner, title)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert_eq!(store.assignment_count().await, 0);

    assert!(state
        .audit_service
        .create_audit(&owner, &"x".repeat(200))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_public_link_only_for_external_roles() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    let mut links = HashSet::new();
    let cases = [
        ("assistant@x.com", Role::Assistant, true),
        ("observer@x.com", Role::Observer, true),
        ("lead@x.com", Role::LeadAuditor, false),
        ("internal@x.com", Role::InternalAuditor, false),
        ("consultant@x.com", Role::Consultant, false),
    ];

    for (email, role, expects_link) in cases {
        let member = add_member(&state, &owner, email, Role::InternalAuditor).await;
        let assignment = state
            .audit_service
            .assign_staff(&owner, audit.id, member.user_id, role)
            .await
            .unwrap();

        assert_eq!(assignment.acceptance_status, AcceptanceStatus::Pending);
        match assignment.temporary_link {
            Some(link) => {
                assert!(expects_link, "{role} should not get a link");
                assert!(!link.is_empty());
                assert!(links.insert(link), "links must be unique");
            }
            None => assert!(!expects_link, "{role} should get a link"),
        }
    }

    assert_eq!(links.len(), 2);
}

#[tokio::test]
async fn test_cross_tenant_assignment_forbidden() {
    let (state, store) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let outsider = register(&state, "z@x.com", "Zeta").await;

    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();
    let before = store.assignment_count().await;

    // 被分配者不属于调用方组织
    let err = state
        .audit_service
        .assign_staff(&owner, audit.id, outsider.user_id, Role::Observer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert!(store
        .find_assignment(audit.id, outsider.user_id)
        .await
        .unwrap()
        .is_none());

    // 调用方不属于审计所属组织
    let err = state
        .audit_service
        .assign_staff(&outsider, audit.id, outsider.user_id, Role::Observer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    assert_eq!(store.assignment_count().await, before);
}

#[tokio::test]
async fn test_assign_staff_errors() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let member = add_member(&state, &owner, "b@x.com", Role::Assistant).await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    let err = state
        .audit_service
        .assign_staff(&owner, Uuid::new_v4(), member.user_id, Role::Assistant)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // 非管理角色
    let err = state
        .audit_service
        .assign_staff(&member, audit.id, member.user_id, Role::Assistant)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    state
        .audit_service
        .assign_staff(&owner, audit.id, member.user_id, Role::Assistant)
        .await
        .unwrap();
    let err = state
        .audit_service
        .assign_staff(&owner, audit.id, member.user_id, Role::Observer)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_public_link_lifecycle() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let member = add_member(&state, &owner, "b@x.com", Role::Observer).await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    let link = state
        .audit_service
        .assign_staff(&owner, audit.id, member.user_id, Role::Observer)
        .await
        .unwrap()
        .temporary_link
        .expect("Observer should get a link");

    let fetched = state.audit_service.get_public_audit(&link).await.unwrap();
    assert_eq!(fetched.id, audit.id);

    for next in [AuditStatus::InProgress, AuditStatus::Finalized] {
        state
            .audit_service
            .update_status(&owner, audit.id, next)
            .await
            .unwrap();
    }

    let finalized_err = state.audit_service.get_public_audit(&link).await.unwrap_err();
    let missing_err = state
        .audit_service
        .get_public_audit("tl_does_not_exist")
        .await
        .unwrap_err();

    // 调用方无法区分两种失败
    assert_eq!(finalized_err.kind(), ErrorKind::NotFound);
    assert_eq!(finalized_err.kind(), missing_err.kind());
    assert_eq!(finalized_err.status_code(), missing_err.status_code());
    assert_eq!(finalized_err.user_message(), missing_err.user_message());
}

#[tokio::test]
async fn test_deactivated_assignment_link_unavailable() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let member = add_member(&state, &owner, "b@x.com", Role::Assistant).await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();
    let link = state
        .audit_service
        .assign_staff(&owner, audit.id, member.user_id, Role::Assistant)
        .await
        .unwrap()
        .temporary_link
        .unwrap();

    state
        .audit_service
        .deactivate_assignment(&owner, audit.id, member.user_id)
        .await
        .unwrap();

    let err = state.audit_service.get_public_audit(&link).await.unwrap_err();
    let missing = state.audit_service.get_public_audit("").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.user_message(), missing.user_message());

    // 停用后不再出现在“我的审计”中
    let mine = state.audit_service.get_my_audits(&member).await.unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_finalized_audit_rejects_changes() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let member = add_member(&state, &owner, "b@x.com", Role::Observer).await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    for next in [AuditStatus::InProgress, AuditStatus::Finalized] {
        state
            .audit_service
            .update_status(&owner, audit.id, next)
            .await
            .unwrap();
    }

    let err = state
        .audit_service
        .assign_staff(&owner, audit.id, member.user_id, Role::Observer)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = state
        .audit_service
        .update_status(&owner, audit.id, AuditStatus::InProgress)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_status_transitions() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    // Planned 不能直接暂停或定稿
    for invalid in [AuditStatus::Paused, AuditStatus::Finalized, AuditStatus::Planned] {
        let err = state
            .audit_service
            .update_status(&owner, audit.id, invalid)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    for next in [
        AuditStatus::InProgress,
        AuditStatus::Paused,
        AuditStatus::InProgress,
        AuditStatus::Paused,
        AuditStatus::Finalized,
    ] {
        let updated = state
            .audit_service
            .update_status(&owner, audit.id, next)
            .await
            .unwrap();
        assert_eq!(updated.status, next);
    }
}

#[tokio::test]
async fn test_status_change_requires_standing() {
    let (state, _) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let internal = add_member(&state, &owner, "b@x.com", Role::InternalAuditor).await;
    let outsider = register(&state, "z@x.com", "Zeta").await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    for ctx in [&internal, &outsider] {
        let err = state
            .audit_service
            .update_status(ctx, audit.id, AuditStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    // 创建审计的内部审计员是已接受的首席审计员
    let own_audit = state
        .audit_service
        .create_audit(&internal, "Internal")
        .await
        .unwrap();
    let updated = state
        .audit_service
        .update_status(&internal, own_audit.id, AuditStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(updated.status, AuditStatus::InProgress);
}

#[tokio::test]
async fn test_respond_to_assignment() {
    let (state, store) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let member = add_member(&state, &owner, "b@x.com", Role::InternalAuditor).await;
    let audit = state
        .audit_service
        .create_audit(&owner, "Q1 Review")
        .await
        .unwrap();

    // 没有分配
    let err = state
        .audit_service
        .respond_to_assignment(&member, audit.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    state
        .audit_service
        .assign_staff(&owner, audit.id, member.user_id, Role::InternalAuditor)
        .await
        .unwrap();

    let answered = state
        .audit_service
        .respond_to_assignment(&member, audit.id, false)
        .await
        .unwrap();
    assert_eq!(answered.acceptance_status, AcceptanceStatus::Rejected);

    let err = state
        .audit_service
        .respond_to_assignment(&member, audit.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = store
        .find_assignment(audit.id, member.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.acceptance_status, AcceptanceStatus::Rejected);
}

#[tokio::test]
async fn test_my_audits_span_tenants() {
    let (state, store) = create_test_app_state();
    let owner = register(&state, "a@x.com", "Acme").await;
    let other = register(&state, "b@x.com", "Beta").await;

    // b 也是 Acme 的成员
    let member = state
        .membership_service
        .invite(&owner, owner.org_id, "b@x.com", Role::Observer)
        .await
        .unwrap();
    store
        .update_membership_status(member.user_id, owner.org_id, MemberStatus::Active)
        .await
        .unwrap();

    let acme_audit = state
        .audit_service
        .create_audit(&owner, "Acme audit")
        .await
        .unwrap();
    state
        .audit_service
        .assign_staff(&owner, acme_audit.id, other.user_id, Role::Observer)
        .await
        .unwrap();
    let beta_audit = state
        .audit_service
        .create_audit(&other, "Beta audit")
        .await
        .unwrap();

    // 以 Beta 会话查看
    let mine = state.audit_service.get_my_audits(&other).await.unwrap();
    let ids: HashSet<Uuid> = mine.iter().map(|a| a.id).collect();
    assert_eq!(ids, HashSet::from([acme_audit.id, beta_audit.id]));

    // 被分配的用户可以查看其他组织的审计详情
    let seen = state
        .audit_service
        .get_audit(&other, acme_audit.id)
        .await
        .unwrap();
    assert_eq!(seen.id, acme_audit.id);

    // 与审计无关的组织看不到
    let outsider = register(&state, "z@x.com", "Zeta").await;
    let err = state
        .audit_service
        .get_audit(&outsider, acme_audit.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
