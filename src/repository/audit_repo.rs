//! Audit repository (审计与分配数据访问)

use super::{AuditStore, PgStore};
use crate::{
    error::AppError,
    models::audit::{AcceptanceStatus, Audit, AuditAssignment, AuditStatus},
};
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

impl PgStore {
    async fn insert_assignment<'e, E>(executor: E, assignment: &AuditAssignment) -> Result<(), AppError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_assignments (
                audit_id, user_id, role_in_audit, acceptance_status, is_active, temporary_link, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(assignment.audit_id)
        .bind(assignment.user_id)
        .bind(assignment.role_in_audit)
        .bind(assignment.acceptance_status)
        .bind(assignment.is_active)
        .bind(&assignment.temporary_link)
        .bind(assignment.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    async fn insert_audit(tx: &mut Transaction<'static, Postgres>, audit: &Audit) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audits (id, title, owner_org_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(audit.id)
        .bind(&audit.title)
        .bind(audit.owner_org_id)
        .bind(audit.status)
        .bind(audit.created_at)
        .bind(audit.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn create_audit_with_lead(
        &self,
        audit: &Audit,
        lead: &AuditAssignment,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        Self::insert_audit(&mut tx, audit).await?;
        Self::insert_assignment(&mut *tx, lead).await?;

        Self::commit(tx).await
    }

    async fn create_assignment(&self, assignment: &AuditAssignment) -> Result<(), AppError> {
        Self::insert_assignment(&self.db, assignment).await
    }

    async fn find_audit(&self, audit_id: Uuid) -> Result<Option<Audit>, AppError> {
        let audit = sqlx::query_as::<_, Audit>("SELECT * FROM audits WHERE id = $1")
            .bind(audit_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(audit)
    }

    async fn find_assignment(
        &self,
        audit_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AuditAssignment>, AppError> {
        let assignment = sqlx::query_as::<_, AuditAssignment>(
            "SELECT * FROM audit_assignments WHERE audit_id = $1 AND user_id = $2",
        )
        .bind(audit_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(assignment)
    }

    async fn find_active_assignment_by_link(
        &self,
        link: &str,
    ) -> Result<Option<AuditAssignment>, AppError> {
        let assignment = sqlx::query_as::<_, AuditAssignment>(
            "SELECT * FROM audit_assignments WHERE temporary_link = $1 AND is_active = TRUE",
        )
        .bind(link)
        .fetch_optional(&self.db)
        .await?;

        Ok(assignment)
    }

    async fn list_audits_for_user(&self, user_id: Uuid) -> Result<Vec<Audit>, AppError> {
        let audits = sqlx::query_as::<_, Audit>(
            r#"
            SELECT a.*
            FROM audits a
            JOIN audit_assignments aa ON aa.audit_id = a.id
            WHERE aa.user_id = $1 AND aa.is_active = TRUE
            ORDER BY a.created_at DESC, a.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(audits)
    }

    async fn update_audit_status(
        &self,
        audit_id: Uuid,
        from: AuditStatus,
        to: AuditStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE audits SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(audit_id)
        .bind(from)
        .bind(to)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_acceptance(
        &self,
        audit_id: Uuid,
        user_id: Uuid,
        status: AcceptanceStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE audit_assignments
            SET acceptance_status = $3
            WHERE audit_id = $1 AND user_id = $2 AND acceptance_status = 'pending'
            "#,
        )
        .bind(audit_id)
        .bind(user_id)
        .bind(status)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_assignment(&self, audit_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE audit_assignments SET is_active = FALSE WHERE audit_id = $1 AND user_id = $2",
        )
        .bind(audit_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
